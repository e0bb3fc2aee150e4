//! Zero-copy, resumable HTTP/1.x wire parser.
//!
//! This crate parses request lines, status lines, header blocks, and
//! chunked-transfer bodies directly from caller-owned byte buffers. Nothing
//! is allocated on the parse path: every extracted token aliases the input,
//! header storage is caller-supplied and fixed-capacity, and the chunked
//! decoder rewrites its buffer in place.
//!
//! # Features
//!
//! - Zero-copy request and response head parsing
//! - Incremental parsing across partial socket reads (`last_len` protocol)
//! - In-place, resumable chunked-transfer decoding
//! - Raw query-string splitting
//! - A [`Message`] facade deriving body length, method classification, and
//!   connection semantics
//!
//! # Example
//!
//! ```
//! use rainy_http::{Message, Status};
//!
//! let buf = b"GET /items?id=7 HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let mut message = Message::new();
//! match message.parse_request(buf, 0).unwrap() {
//!     Status::Complete(header_len) => {
//!         assert_eq!(header_len, buf.len());
//!         assert_eq!(message.url(), "/items");
//!         assert_eq!(message.query("id"), Some("7"));
//!     }
//!     Status::Partial => { /* read more bytes, retry with last_len */ }
//! }
//! ```

#![deny(unsafe_code)]

mod chunked;
mod grammar;
mod message;
mod parser;
mod query;

pub use chunked::{ChunkedDecoder, ChunkedError, DecodeStatus};
pub use message::{MAX_HEADERS, Message, Method};
pub use parser::{
    EMPTY_HEADER, Header, HeaderBlock, ParseError, RequestHead, ResponseHead, Status,
    parse_headers, parse_request, parse_response,
};
pub use query::{QueryPairs, parse_query};
