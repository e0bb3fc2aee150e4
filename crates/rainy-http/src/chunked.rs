//! Chunked transfer-encoding decoder.
//!
//! [`ChunkedDecoder`] is an explicit state machine that decodes
//! `Transfer-Encoding: chunked` framing **in place**: chunk data is
//! compacted to the front of the caller's buffer, overwriting the framing
//! bytes, so decoding never allocates. The decoder value is the program
//! counter of the body stream — it must be kept alive and threaded through
//! successive [`decode`][ChunkedDecoder::decode] calls while a body spans
//! multiple socket reads. Each call consumes one buffer of freshly read,
//! not-yet-decoded bytes.
//!
//! ```
//! use rainy_http::{ChunkedDecoder, DecodeStatus};
//!
//! let mut decoder = ChunkedDecoder::new().consume_trailer(true);
//! let mut buf = *b"5\r\nhello\r\n0\r\n\r\n";
//! match decoder.decode(&mut buf).unwrap() {
//!     DecodeStatus::Complete { decoded, trailing } => {
//!         assert_eq!(&buf[..decoded], b"hello");
//!         assert_eq!(trailing, 0);
//!     }
//!     DecodeStatus::Partial { .. } => unreachable!(),
//! }
//! ```

use crate::grammar::decode_hex;
use memchr::memchr;
use std::fmt;

/// A chunk-size field may not carry more hex digits than fit the counter.
/// This is the guard against overflowing the size accumulator.
const MAX_SIZE_DIGITS: u8 = (u64::BITS / 4) as u8;

/// Decoder states, in the order a conforming body visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ChunkSize,
    ChunkExt,
    ChunkData,
    ChunkCrlf,
    TrailerLineHead,
    TrailerLineMiddle,
    Complete,
}

/// Malformed chunked framing. Terminal for the body stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkedError {
    /// A chunk-size field starts with a non-hex byte, or has more digits
    /// than fit the size counter.
    InvalidSize,
    /// The line terminator after chunk data is missing.
    InvalidTerminator,
}

impl fmt::Display for ChunkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "invalid chunk size"),
            Self::InvalidTerminator => write!(f, "missing terminator after chunk data"),
        }
    }
}

impl std::error::Error for ChunkedError {}

/// Outcome of one [`ChunkedDecoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The terminal chunk (and trailer section, when enabled) was consumed.
    /// `buf[..decoded]` holds decoded body bytes; the final `trailing` bytes
    /// of the buffer (moved to follow the decoded run) belong to the next
    /// message on the connection.
    Complete {
        /// Decoded body bytes at the front of the buffer.
        decoded: usize,
        /// Leftover bytes after the body, e.g. a pipelined request.
        trailing: usize,
    },
    /// All input was consumed but the body is not finished. `buf[..decoded]`
    /// holds the bytes decoded by this call; feed the next raw fragment in a
    /// fresh call.
    Partial {
        /// Decoded body bytes at the front of the buffer.
        decoded: usize,
    },
}

/// Resumable in-place decoder for one chunked body.
///
/// Create one per body, optionally enable
/// [`consume_trailer`][Self::consume_trailer], and call
/// [`decode`][Self::decode] with each successive buffer of raw bytes.
#[derive(Debug, Clone)]
pub struct ChunkedDecoder {
    bytes_left_in_chunk: u64,
    hex_count: u8,
    consume_trailer: bool,
    state: State,
}

impl ChunkedDecoder {
    /// Create a decoder that stops at the terminal zero-size chunk, leaving
    /// any trailer section in the buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes_left_in_chunk: 0,
            hex_count: 0,
            consume_trailer: false,
            state: State::ChunkSize,
        }
    }

    /// When enabled, the decoder also consumes the trailer section and its
    /// terminating blank line before reporting completion.
    #[must_use]
    pub fn consume_trailer(mut self, consume: bool) -> Self {
        self.consume_trailer = consume;
        self
    }

    /// Returns true while the decoder is inside chunk data, i.e. the next
    /// input bytes are body bytes rather than framing.
    #[must_use]
    pub fn is_in_data(&self) -> bool {
        self.state == State::ChunkData
    }

    /// Returns true once the terminal chunk has been consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// Decode raw chunked bytes in place.
    ///
    /// `buf` must hold only not-yet-decoded input; on return its front holds
    /// the decoded output as described by [`DecodeStatus`]. Errors are
    /// terminal: the decoder must not be reused afterwards.
    pub fn decode(&mut self, buf: &mut [u8]) -> Result<DecodeStatus, ChunkedError> {
        let len = buf.len();
        let mut src = 0;
        let mut dst = 0;
        loop {
            match self.state {
                State::ChunkSize => {
                    while src < len {
                        let Some(digit) = decode_hex(buf[src]) else {
                            if self.hex_count == 0 {
                                return Err(ChunkedError::InvalidSize);
                            }
                            break;
                        };
                        if self.hex_count == MAX_SIZE_DIGITS {
                            return Err(ChunkedError::InvalidSize);
                        }
                        self.bytes_left_in_chunk =
                            self.bytes_left_in_chunk * 16 + u64::from(digit);
                        self.hex_count += 1;
                        src += 1;
                    }
                    if src == len {
                        return Ok(DecodeStatus::Partial { decoded: dst });
                    }
                    self.hex_count = 0;
                    self.state = State::ChunkExt;
                }
                State::ChunkExt => {
                    // Chunk extensions are skipped, not validated.
                    let Some(at) = memchr(b'\n', &buf[src..len]) else {
                        return Ok(DecodeStatus::Partial { decoded: dst });
                    };
                    src += at + 1;
                    if self.bytes_left_in_chunk == 0 {
                        self.state = if self.consume_trailer {
                            State::TrailerLineHead
                        } else {
                            State::Complete
                        };
                    } else {
                        self.state = State::ChunkData;
                    }
                }
                State::ChunkData => {
                    let avail = len - src;
                    if (avail as u64) < self.bytes_left_in_chunk {
                        if dst != src {
                            buf.copy_within(src..len, dst);
                        }
                        dst += avail;
                        self.bytes_left_in_chunk -= avail as u64;
                        return Ok(DecodeStatus::Partial { decoded: dst });
                    }
                    // Fits in usize: it is no larger than `avail`.
                    let take = self.bytes_left_in_chunk as usize;
                    if dst != src {
                        buf.copy_within(src..src + take, dst);
                    }
                    src += take;
                    dst += take;
                    self.bytes_left_in_chunk = 0;
                    self.state = State::ChunkCrlf;
                }
                State::ChunkCrlf => {
                    while src < len && buf[src] == b'\r' {
                        src += 1;
                    }
                    if src == len {
                        return Ok(DecodeStatus::Partial { decoded: dst });
                    }
                    if buf[src] != b'\n' {
                        return Err(ChunkedError::InvalidTerminator);
                    }
                    src += 1;
                    self.state = State::ChunkSize;
                }
                State::TrailerLineHead => {
                    // Skipping CRs here is idempotent, so a read boundary
                    // between the final CR and LF resumes correctly.
                    while src < len && buf[src] == b'\r' {
                        src += 1;
                    }
                    if src == len {
                        return Ok(DecodeStatus::Partial { decoded: dst });
                    }
                    if buf[src] == b'\n' {
                        src += 1;
                        self.state = State::Complete;
                        continue;
                    }
                    self.state = State::TrailerLineMiddle;
                }
                State::TrailerLineMiddle => {
                    let Some(at) = memchr(b'\n', &buf[src..len]) else {
                        return Ok(DecodeStatus::Partial { decoded: dst });
                    };
                    src += at + 1;
                    self.state = State::TrailerLineHead;
                }
                State::Complete => {
                    let trailing = len - src;
                    if dst != src {
                        buf.copy_within(src..len, dst);
                    }
                    return Ok(DecodeStatus::Complete {
                        decoded: dst,
                        trailing,
                    });
                }
            }
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}
