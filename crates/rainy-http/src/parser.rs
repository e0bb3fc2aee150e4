//! Wire-level HTTP/1.x scanners.
//!
//! This module parses request lines, status lines, and header blocks
//! directly from byte buffers. Parsing is zero-copy: every extracted token
//! is a slice of the input, and header storage is a caller-owned
//! fixed-capacity slice of [`Header`] slots.
//!
//! # Resumption
//!
//! All three entry points are designed for buffers filled incrementally from
//! a socket. A parse over a truncated buffer yields [`Status::Partial`]; the
//! caller reads more bytes into the *same* accumulated buffer and retries,
//! passing the previous buffer length as `last_len`. The retry is gated by a
//! cheap completeness probe that scans for the header-block terminator
//! starting just before the old buffer end, so already-checked bytes are not
//! rescanned; once the terminator is known to exist, the full structural
//! parse runs exactly once. No parser state is carried between attempts
//! (contrast with [`crate::ChunkedDecoder`], which is stateful by design).
//!
//! # Example
//!
//! ```
//! use rainy_http::{parse_request, Status, EMPTY_HEADER};
//!
//! let buf = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let mut headers = [EMPTY_HEADER; 8];
//! let head = match parse_request(buf, &mut headers, 0).unwrap() {
//!     Status::Complete(head) => head,
//!     Status::Partial => unreachable!(),
//! };
//! assert_eq!(head.method(), "GET");
//! assert_eq!(head.path(), "/index.html");
//! assert_eq!(head.headers().len(), 1);
//! assert_eq!(head.headers()[0].name(), "Host");
//! assert_eq!(head.header_len(), buf.len());
//! ```

use crate::grammar::{is_printable_ascii, is_token_char};
use std::fmt;

/// Wire-level parsing error. Always terminal for the message: unlike
/// [`Status::Partial`], feeding more bytes cannot fix a malformed prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A method or request-target token is empty or contains a forbidden byte.
    InvalidToken,
    /// The version literal is not `HTTP/1.` followed by a digit.
    InvalidVersion,
    /// The status code is not exactly three digits.
    InvalidStatus,
    /// A header name is empty or contains a non-token byte.
    InvalidHeaderName,
    /// A field value or reason phrase contains a control byte.
    InvalidHeaderValue,
    /// A CR is not followed by LF.
    InvalidNewline,
    /// A header line starts with whitespace (obsolete line folding).
    FoldedHeader,
    /// The caller-supplied header storage is full.
    TooManyHeaders,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid token in request line"),
            Self::InvalidVersion => write!(f, "invalid HTTP version"),
            Self::InvalidStatus => write!(f, "invalid status code"),
            Self::InvalidHeaderName => write!(f, "invalid header name"),
            Self::InvalidHeaderValue => write!(f, "invalid byte in field value"),
            Self::InvalidNewline => write!(f, "bare CR in line terminator"),
            Self::FoldedHeader => write!(f, "obsolete header line folding"),
            Self::TooManyHeaders => write!(f, "too many headers"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Outcome of a parse attempt over a possibly-truncated buffer.
///
/// `Result<Status<T>, ParseError>` is the tri-state every entry point
/// returns: complete, incomplete (read more and retry), or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status<T> {
    /// The element was fully parsed.
    Complete(T),
    /// The buffer ends before the element does; retry with more bytes.
    Partial,
}

impl<T> Status<T> {
    /// Returns true if the parse completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Returns true if more input is required.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial)
    }

    /// Returns the parsed element.
    ///
    /// # Panics
    ///
    /// Panics if the status is [`Status::Partial`].
    #[must_use]
    pub fn unwrap(self) -> T {
        match self {
            Self::Complete(value) => value,
            Self::Partial => panic!("called `Status::unwrap()` on a partial parse"),
        }
    }
}

/// A single parsed header. Both fields alias the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'buf> {
    name: &'buf str,
    value: &'buf [u8],
}

/// Empty header slot, for initializing caller-owned header storage.
pub const EMPTY_HEADER: Header<'static> = Header { name: "", value: &[] };

impl<'buf> Header<'buf> {
    /// Returns the header name, case preserved.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'buf str {
        self.name
    }

    /// Returns the header value with trailing whitespace removed.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &'buf [u8] {
        self.value
    }

    /// Returns the header value as a string, if valid UTF-8.
    #[must_use]
    pub fn value_str(&self) -> Option<&'buf str> {
        std::str::from_utf8(self.value).ok()
    }

    /// Returns true if this header name matches (case-insensitive).
    #[must_use]
    pub fn name_eq_ignore_case(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

/// Connection-semantics flags collected during the single header scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ConnectionFlags {
    connection: bool,
    close: bool,
    upgrade: bool,
}

/// A parsed request line plus header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHead<'buf, 'headers> {
    method: &'buf str,
    path: &'buf str,
    minor_version: u8,
    headers: &'headers [Header<'buf>],
    header_len: usize,
    has_query: bool,
    flags: ConnectionFlags,
}

impl<'buf, 'headers> RequestHead<'buf, 'headers> {
    /// Returns the request method token.
    #[must_use]
    pub fn method(&self) -> &'buf str {
        self.method
    }

    /// Returns the raw request target, query string included. No decoding
    /// or normalization is performed.
    #[must_use]
    pub fn path(&self) -> &'buf str {
        self.path
    }

    /// Returns the HTTP minor version (the digit after `HTTP/1.`).
    #[must_use]
    pub fn minor_version(&self) -> u8 {
        self.minor_version
    }

    /// Returns the parsed headers, in wire order.
    #[must_use]
    pub fn headers(&self) -> &'headers [Header<'buf>] {
        self.headers
    }

    /// Returns the byte length of the head, including the blank line.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Returns true if the request target contains a `?`.
    #[must_use]
    pub fn has_query(&self) -> bool {
        self.has_query
    }

    /// Returns true if a `Connection` header was present.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.flags.connection
    }

    /// Returns true if `Connection: close` was present.
    #[must_use]
    pub fn has_close(&self) -> bool {
        self.flags.close
    }

    /// Returns true if `Connection: upgrade` or an `Upgrade` header was present.
    #[must_use]
    pub fn has_upgrade(&self) -> bool {
        self.flags.upgrade
    }
}

/// A parsed status line plus header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead<'buf, 'headers> {
    minor_version: u8,
    status: u16,
    reason: &'buf str,
    headers: &'headers [Header<'buf>],
    header_len: usize,
    flags: ConnectionFlags,
}

impl<'buf, 'headers> ResponseHead<'buf, 'headers> {
    /// Returns the HTTP minor version.
    #[must_use]
    pub fn minor_version(&self) -> u8 {
        self.minor_version
    }

    /// Returns the three-digit status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the reason phrase, possibly empty.
    #[must_use]
    pub fn reason(&self) -> &'buf str {
        self.reason
    }

    /// Returns the parsed headers, in wire order.
    #[must_use]
    pub fn headers(&self) -> &'headers [Header<'buf>] {
        self.headers
    }

    /// Returns the byte length of the head, including the blank line.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Returns true if a `Connection` header was present.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.flags.connection
    }

    /// Returns true if `Connection: close` was present.
    #[must_use]
    pub fn has_close(&self) -> bool {
        self.flags.close
    }

    /// Returns true if `Connection: upgrade` or an `Upgrade` header was present.
    #[must_use]
    pub fn has_upgrade(&self) -> bool {
        self.flags.upgrade
    }
}

/// A standalone parsed header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBlock<'buf, 'headers> {
    headers: &'headers [Header<'buf>],
    header_len: usize,
    flags: ConnectionFlags,
}

impl<'buf, 'headers> HeaderBlock<'buf, 'headers> {
    /// Returns the parsed headers, in wire order.
    #[must_use]
    pub fn headers(&self) -> &'headers [Header<'buf>] {
        self.headers
    }

    /// Returns the byte length of the block, including the blank line.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Returns true if a `Connection` header was present.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.flags.connection
    }

    /// Returns true if `Connection: close` was present.
    #[must_use]
    pub fn has_close(&self) -> bool {
        self.flags.close
    }

    /// Returns true if `Connection: upgrade` or an `Upgrade` header was present.
    #[must_use]
    pub fn has_upgrade(&self) -> bool {
        self.flags.upgrade
    }
}

// ============================================================================
// Internal scanning machinery
// ============================================================================

/// Why a scan stopped early. The public entry points fold `Partial` into
/// `Ok(Status::Partial)` and `Malformed` into `Err`.
enum Interrupt {
    Partial,
    Malformed(ParseError),
}

impl From<ParseError> for Interrupt {
    fn from(err: ParseError) -> Self {
        Self::Malformed(err)
    }
}

type Scan<T> = Result<T, Interrupt>;

#[inline]
fn peek(buf: &[u8], pos: usize) -> Scan<u8> {
    buf.get(pos).copied().ok_or(Interrupt::Partial)
}

/// Consume `\r\n` or a bare `\n`; anything else is `err`.
fn expect_line_break(buf: &[u8], pos: &mut usize, err: ParseError) -> Scan<()> {
    match peek(buf, *pos)? {
        b'\r' => {
            *pos += 1;
            if peek(buf, *pos)? != b'\n' {
                return Err(ParseError::InvalidNewline.into());
            }
            *pos += 1;
            Ok(())
        }
        b'\n' => {
            *pos += 1;
            Ok(())
        }
        _ => Err(err.into()),
    }
}

/// Scan a field value or reason phrase up to (and past) the line terminator.
///
/// Returns the token without the terminator. Bytes above 0x7F pass through;
/// NUL, DEL, and control bytes other than HTAB are malformed.
fn scan_to_eol<'buf>(buf: &'buf [u8], pos: &mut usize) -> Scan<&'buf [u8]> {
    let start = *pos;
    loop {
        let b = peek(buf, *pos)?;
        match b {
            b'\r' => {
                let token = &buf[start..*pos];
                *pos += 1;
                if peek(buf, *pos)? != b'\n' {
                    return Err(ParseError::InvalidNewline.into());
                }
                *pos += 1;
                return Ok(token);
            }
            b'\n' => {
                let token = &buf[start..*pos];
                *pos += 1;
                return Ok(token);
            }
            b'\t' => *pos += 1,
            _ if !is_printable_ascii(b) && b < 0x80 => {
                return Err(ParseError::InvalidHeaderValue.into());
            }
            _ => *pos += 1,
        }
    }
}

/// Scan the method token up to the following space.
fn scan_method<'buf>(buf: &'buf [u8], pos: &mut usize) -> Scan<&'buf str> {
    let start = *pos;
    loop {
        let b = peek(buf, *pos)?;
        if b == b' ' {
            break;
        }
        if !is_token_char(b) {
            return Err(ParseError::InvalidToken.into());
        }
        *pos += 1;
    }
    if *pos == start {
        return Err(ParseError::InvalidToken.into());
    }
    // Token bytes are a subset of ASCII.
    std::str::from_utf8(&buf[start..*pos]).map_err(|_| ParseError::InvalidToken.into())
}

/// Scan the request target up to the following space, noting whether a `?`
/// was seen. The target is not decoded.
fn scan_target<'buf>(buf: &'buf [u8], pos: &mut usize, has_query: &mut bool) -> Scan<&'buf [u8]> {
    let start = *pos;
    loop {
        let b = peek(buf, *pos)?;
        if b == b' ' {
            break;
        }
        if b == b'?' {
            *has_query = true;
        } else if !is_printable_ascii(b) && b < 0x80 {
            return Err(ParseError::InvalidToken.into());
        }
        *pos += 1;
    }
    if *pos == start {
        return Err(ParseError::InvalidToken.into());
    }
    Ok(&buf[start..*pos])
}

/// Scan `HTTP/1.` plus one digit, returning the minor version.
fn scan_version(buf: &[u8], pos: &mut usize) -> Scan<u8> {
    // Shortest possible remainder is `HTTP/1.x` plus a line terminator.
    if buf.len() - *pos < 9 {
        return Err(Interrupt::Partial);
    }
    if &buf[*pos..*pos + 7] != b"HTTP/1." {
        return Err(ParseError::InvalidVersion.into());
    }
    *pos += 7;
    let digit = buf[*pos];
    if !digit.is_ascii_digit() {
        return Err(ParseError::InvalidVersion.into());
    }
    *pos += 1;
    Ok(digit - b'0')
}

/// Header-block loop: fill `slots` until the blank line, tracking connection
/// semantics along the way.
fn scan_headers<'buf>(
    buf: &'buf [u8],
    pos: &mut usize,
    slots: &mut [Header<'buf>],
) -> Scan<(usize, ConnectionFlags)> {
    let mut count = 0;
    let mut flags = ConnectionFlags::default();
    loop {
        match peek(buf, *pos)? {
            b'\r' => {
                *pos += 1;
                if peek(buf, *pos)? != b'\n' {
                    return Err(ParseError::InvalidNewline.into());
                }
                *pos += 1;
                break;
            }
            b'\n' => {
                *pos += 1;
                break;
            }
            // Continuation lines are rejected outright rather than joined;
            // folded values are a known smuggling vector.
            b' ' | b'\t' if count != 0 => return Err(ParseError::FoldedHeader.into()),
            _ => {}
        }
        if count == slots.len() {
            return Err(ParseError::TooManyHeaders.into());
        }

        let name_start = *pos;
        loop {
            let b = peek(buf, *pos)?;
            if b == b':' {
                break;
            }
            if !is_token_char(b) {
                return Err(ParseError::InvalidHeaderName.into());
            }
            *pos += 1;
        }
        if *pos == name_start {
            return Err(ParseError::InvalidHeaderName.into());
        }
        let name = std::str::from_utf8(&buf[name_start..*pos])
            .map_err(|_| ParseError::InvalidHeaderName)?;
        *pos += 1; // ':'
        while matches!(peek(buf, *pos)?, b' ' | b'\t') {
            *pos += 1;
        }
        let mut value = scan_to_eol(buf, pos)?;
        while let [rest @ .., b' ' | b'\t'] = value {
            value = rest;
        }

        if name.eq_ignore_ascii_case("connection") {
            flags.connection = true;
            if value.eq_ignore_ascii_case(b"close") {
                flags.close = true;
            } else if value.eq_ignore_ascii_case(b"upgrade") {
                flags.upgrade = true;
            }
        } else if name.eq_ignore_ascii_case("upgrade") {
            flags.upgrade = true;
        }

        slots[count] = Header { name, value };
        count += 1;
    }
    Ok((count, flags))
}

/// Completeness probe: look for the header-block terminator (`\r\n\r\n` or
/// the bare-`\n` equivalent) starting just before the previous attempt's
/// buffer end, so the known-good prefix is not rescanned.
fn probe_complete(buf: &[u8], last_len: usize) -> Scan<usize> {
    let mut pos = last_len.saturating_sub(3);
    let mut newlines = 0u32;
    loop {
        match buf.get(pos).copied() {
            None => return Err(Interrupt::Partial),
            Some(b'\r') => {
                pos += 1;
                match buf.get(pos).copied() {
                    None => return Err(Interrupt::Partial),
                    Some(b'\n') => {
                        pos += 1;
                        newlines += 1;
                    }
                    Some(_) => return Err(ParseError::InvalidNewline.into()),
                }
            }
            Some(b'\n') => {
                pos += 1;
                newlines += 1;
            }
            Some(_) => {
                pos += 1;
                newlines = 0;
            }
        }
        if newlines == 2 {
            return Ok(pos);
        }
    }
}

fn scan_request<'buf, 'headers>(
    buf: &'buf [u8],
    slots: &'headers mut [Header<'buf>],
) -> Scan<RequestHead<'buf, 'headers>> {
    let mut pos = 0;
    // Tolerate one empty line before the request line.
    match peek(buf, pos)? {
        b'\r' => {
            pos += 1;
            if peek(buf, pos)? != b'\n' {
                return Err(ParseError::InvalidNewline.into());
            }
            pos += 1;
        }
        b'\n' => pos += 1,
        _ => {}
    }
    let method = scan_method(buf, &mut pos)?;
    pos += 1; // single space
    let mut has_query = false;
    let target = scan_target(buf, &mut pos, &mut has_query)?;
    let path = std::str::from_utf8(target).map_err(|_| ParseError::InvalidToken)?;
    pos += 1; // single space
    let minor_version = scan_version(buf, &mut pos)?;
    expect_line_break(buf, &mut pos, ParseError::InvalidVersion)?;
    let (count, flags) = scan_headers(buf, &mut pos, slots)?;
    Ok(RequestHead {
        method,
        path,
        minor_version,
        headers: &slots[..count],
        header_len: pos,
        has_query,
        flags,
    })
}

fn scan_response<'buf, 'headers>(
    buf: &'buf [u8],
    slots: &'headers mut [Header<'buf>],
) -> Scan<ResponseHead<'buf, 'headers>> {
    let mut pos = 0;
    let minor_version = scan_version(buf, &mut pos)?;
    if peek(buf, pos)? != b' ' {
        return Err(ParseError::InvalidStatus.into());
    }
    pos += 1;
    // Status code plus at least a line terminator.
    if buf.len() - pos < 4 {
        return Err(Interrupt::Partial);
    }
    let mut status = 0u16;
    for _ in 0..3 {
        let b = buf[pos];
        if !b.is_ascii_digit() {
            return Err(ParseError::InvalidStatus.into());
        }
        status = status * 10 + u16::from(b - b'0');
        pos += 1;
    }
    let reason = match peek(buf, pos)? {
        b' ' => {
            pos += 1;
            let token = scan_to_eol(buf, &mut pos)?;
            std::str::from_utf8(token).map_err(|_| ParseError::InvalidHeaderValue)?
        }
        b'\r' | b'\n' => {
            expect_line_break(buf, &mut pos, ParseError::InvalidStatus)?;
            ""
        }
        // A fourth digit lands here.
        _ => return Err(ParseError::InvalidStatus.into()),
    };
    let (count, flags) = scan_headers(buf, &mut pos, slots)?;
    Ok(ResponseHead {
        minor_version,
        status,
        reason,
        headers: &slots[..count],
        header_len: pos,
        flags,
    })
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse a request line plus header block.
///
/// `headers` is caller-owned storage (initialize with [`EMPTY_HEADER`]);
/// filling beyond its capacity is [`ParseError::TooManyHeaders`], never
/// truncation. `last_len` is the buffer length at the previous attempt, or
/// zero on the first attempt.
pub fn parse_request<'buf, 'headers>(
    buf: &'buf [u8],
    headers: &'headers mut [Header<'buf>],
    last_len: usize,
) -> Result<Status<RequestHead<'buf, 'headers>>, ParseError> {
    if last_len != 0 {
        match probe_complete(buf, last_len) {
            Ok(_) => {}
            Err(Interrupt::Partial) => return Ok(Status::Partial),
            Err(Interrupt::Malformed(err)) => return Err(err),
        }
    }
    match scan_request(buf, headers) {
        Ok(head) => Ok(Status::Complete(head)),
        Err(Interrupt::Partial) => Ok(Status::Partial),
        Err(Interrupt::Malformed(err)) => Err(err),
    }
}

/// Parse a status line plus header block. Same contract as
/// [`parse_request`].
pub fn parse_response<'buf, 'headers>(
    buf: &'buf [u8],
    headers: &'headers mut [Header<'buf>],
    last_len: usize,
) -> Result<Status<ResponseHead<'buf, 'headers>>, ParseError> {
    if last_len != 0 {
        match probe_complete(buf, last_len) {
            Ok(_) => {}
            Err(Interrupt::Partial) => return Ok(Status::Partial),
            Err(Interrupt::Malformed(err)) => return Err(err),
        }
    }
    match scan_response(buf, headers) {
        Ok(head) => Ok(Status::Complete(head)),
        Err(Interrupt::Partial) => Ok(Status::Partial),
        Err(Interrupt::Malformed(err)) => Err(err),
    }
}

/// Parse a standalone header block (e.g. chunked-body trailers). Same
/// contract as [`parse_request`].
pub fn parse_headers<'buf, 'headers>(
    buf: &'buf [u8],
    headers: &'headers mut [Header<'buf>],
    last_len: usize,
) -> Result<Status<HeaderBlock<'buf, 'headers>>, ParseError> {
    if last_len != 0 {
        match probe_complete(buf, last_len) {
            Ok(_) => {}
            Err(Interrupt::Partial) => return Ok(Status::Partial),
            Err(Interrupt::Malformed(err)) => return Err(err),
        }
    }
    let mut pos = 0;
    match scan_headers(buf, &mut pos, headers) {
        Ok((count, flags)) => Ok(Status::Complete(HeaderBlock {
            headers: &headers[..count],
            header_len: pos,
            flags,
        })),
        Err(Interrupt::Partial) => Ok(Status::Partial),
        Err(Interrupt::Malformed(err)) => Err(err),
    }
}
