//! Message facade over the wire scanners.
//!
//! [`Message`] owns fixed-capacity header storage and the state derived
//! from one parsed request or response: classified method, body length,
//! connection semantics, and the query map. It is a plain value object —
//! create one per connection and re-drive [`parse_request`][Message::parse_request]
//! (or [`parse_response`][Message::parse_response]) as reads accumulate,
//! then reuse it for the next pipelined message.
//!
//! ```
//! use rainy_http::{Message, Method, Status};
//!
//! let buf = b"GET /a?x=1&y=2 HTTP/1.1\r\nHost: h\r\nContent-Length: 0\r\n\r\n";
//! let mut message = Message::new();
//! let header_len = match message.parse_request(buf, 0).unwrap() {
//!     Status::Complete(len) => len,
//!     Status::Partial => unreachable!(),
//! };
//! assert_eq!(header_len, buf.len());
//! assert_eq!(message.method_kind(), Some(Method::Get));
//! assert_eq!(message.url(), "/a");
//! assert_eq!(message.query("x"), Some("1"));
//! assert_eq!(message.body_len(), Some(0));
//! ```

use crate::parser::{self, EMPTY_HEADER, Header, ParseError, Status};
use crate::query;
use std::collections::HashMap;
use std::fmt;

/// Header-count capacity of a [`Message`]. A message with more distinct
/// header fields is rejected with [`ParseError::TooManyHeaders`]; the cap is
/// the parser's defense against header flooding and is deliberately not
/// growable.
pub const MAX_HEADERS: usize = 100;

/// The standard request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method.
    Get,
    /// HEAD method.
    Head,
    /// POST method.
    Post,
    /// PUT method.
    Put,
    /// DELETE method.
    Delete,
    /// PATCH method.
    Patch,
    /// CONNECT method.
    Connect,
    /// OPTIONS method.
    Options,
    /// TRACE method.
    Trace,
}

/// Two-character hash table over the standard methods. The hash is not
/// collision-proof for arbitrary tokens, so a slot hit is only a candidate;
/// [`Method::lookup`] confirms it with an exact comparison.
const METHOD_TABLE: [Option<Method>; 20] = [
    Some(Method::Post),
    Some(Method::Get),
    Some(Method::Delete),
    None,
    None,
    None,
    Some(Method::Put),
    Some(Method::Trace),
    None,
    None,
    Some(Method::Options),
    None,
    None,
    None,
    Some(Method::Head),
    None,
    None,
    None,
    Some(Method::Patch),
    Some(Method::Connect),
];

impl Method {
    /// Parse a method from its exact wire bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Self::Get),
            b"HEAD" => Some(Self::Head),
            b"POST" => Some(Self::Post),
            b"PUT" => Some(Self::Put),
            b"DELETE" => Some(Self::Delete),
            b"PATCH" => Some(Self::Patch),
            b"CONNECT" => Some(Self::Connect),
            b"OPTIONS" => Some(Self::Options),
            b"TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Classify a method token.
    ///
    /// A two-character hash narrows the candidates, then an exact comparison
    /// confirms the match; an unrecognized token returns `None` and should
    /// be treated as opaque rather than trusted.
    #[must_use]
    pub fn lookup(method: &str) -> Option<Self> {
        let bytes = method.as_bytes();
        if bytes.len() < 2 {
            return None;
        }
        let index = usize::from((bytes[0] & !0x20) ^ (bytes[1].wrapping_add(1) & !0x20)) % 20;
        let candidate = METHOD_TABLE[index]?;
        (candidate.as_str() == method).then_some(candidate)
    }

    /// Return the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed HTTP message plus its derived state.
///
/// All string accessors return slices of the buffer passed to the last
/// `parse_*` call; the buffer must stay alive and unmodified while they are
/// in use (the `'buf` lifetime enforces this).
#[derive(Debug)]
pub struct Message<'buf> {
    status: u16,
    reason: &'buf str,
    minor_version: u8,
    num_headers: usize,
    header_len: usize,
    body_len: Option<usize>,
    has_connection: bool,
    has_close: bool,
    has_upgrade: bool,
    headers: [Header<'buf>; MAX_HEADERS],
    method: &'buf str,
    url: &'buf str,
    full_url: &'buf str,
    queries: HashMap<&'buf str, &'buf str>,
}

impl<'buf> Message<'buf> {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 0,
            reason: "",
            minor_version: 0,
            num_headers: 0,
            header_len: 0,
            body_len: None,
            has_connection: false,
            has_close: false,
            has_upgrade: false,
            headers: [EMPTY_HEADER; MAX_HEADERS],
            method: "",
            url: "",
            full_url: "",
            queries: HashMap::new(),
        }
    }

    fn reset(&mut self) {
        self.status = 0;
        self.reason = "";
        self.minor_version = 0;
        self.num_headers = 0;
        self.header_len = 0;
        self.body_len = None;
        self.has_connection = false;
        self.has_close = false;
        self.has_upgrade = false;
        self.method = "";
        self.url = "";
        self.full_url = "";
        self.queries.clear();
    }

    /// Parse a request head from `buf`, replacing any previously parsed
    /// message.
    ///
    /// On `Complete` the returned value is the header length in bytes; the
    /// body, if any, starts at that offset. `last_len` follows the same
    /// resumption contract as [`crate::parse_request`].
    pub fn parse_request(
        &mut self,
        buf: &'buf [u8],
        last_len: usize,
    ) -> Result<Status<usize>, ParseError> {
        self.reset();
        let head = match parser::parse_request(buf, &mut self.headers, last_len)? {
            Status::Complete(head) => head,
            Status::Partial => return Ok(Status::Partial),
        };

        let method = head.method();
        let path = head.path();
        let has_query = head.has_query();
        self.num_headers = head.headers().len();
        self.header_len = head.header_len();
        self.minor_version = head.minor_version();
        self.has_connection = head.has_connection();
        self.has_close = head.has_close();
        self.has_upgrade = head.has_upgrade();

        self.method = method;
        self.full_url = path;
        self.url = path;
        self.body_len = match Method::lookup(method) {
            Some(Method::Get | Method::Head) => Some(0),
            _ => self.content_length(),
        };
        if has_query {
            if let Some(at) = path.find('?') {
                self.queries = query::parse_query(&path[at + 1..]);
                self.url = &path[..at];
            }
        }
        Ok(Status::Complete(self.header_len))
    }

    /// Parse a response head from `buf`, replacing any previously parsed
    /// message. Same contract as [`Self::parse_request`].
    pub fn parse_response(
        &mut self,
        buf: &'buf [u8],
        last_len: usize,
    ) -> Result<Status<usize>, ParseError> {
        self.reset();
        let head = match parser::parse_response(buf, &mut self.headers, last_len)? {
            Status::Complete(head) => head,
            Status::Partial => return Ok(Status::Partial),
        };

        self.status = head.status();
        self.reason = head.reason();
        self.num_headers = head.headers().len();
        self.header_len = head.header_len();
        self.minor_version = head.minor_version();
        self.body_len = self.content_length();
        Ok(Status::Complete(self.header_len))
    }

    /// Content-Length as a plain integer; `None` when the header is absent
    /// or not a valid length.
    fn content_length(&self) -> Option<usize> {
        let value = self.header("content-length")?;
        let value = std::str::from_utf8(value).ok()?;
        value.trim().parse().ok()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the raw method token.
    #[must_use]
    pub fn method(&self) -> &'buf str {
        self.method
    }

    /// Classify the method against the standard set; `None` for any other
    /// token.
    #[must_use]
    pub fn method_kind(&self) -> Option<Method> {
        Method::lookup(self.method)
    }

    /// Returns the URL with any query string removed.
    #[must_use]
    pub fn url(&self) -> &'buf str {
        self.url
    }

    /// Returns the URL exactly as it appeared in the request line.
    #[must_use]
    pub fn full_url(&self) -> &'buf str {
        self.full_url
    }

    /// Returns the response status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the response reason phrase.
    #[must_use]
    pub fn reason(&self) -> &'buf str {
        self.reason
    }

    /// Returns the HTTP minor version.
    #[must_use]
    pub fn minor_version(&self) -> u8 {
        self.minor_version
    }

    /// Returns the header length of the parsed message in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Returns the body length in bytes, or `None` when it is unknown
    /// (missing or invalid `Content-Length` — the body is then chunked or an
    /// error).
    #[must_use]
    pub fn body_len(&self) -> Option<usize> {
        self.body_len
    }

    /// Returns header length plus body length, when the latter is known.
    #[must_use]
    pub fn total_len(&self) -> Option<usize> {
        self.body_len.map(|body| self.header_len + body)
    }

    /// Returns the parsed headers, in wire order.
    #[must_use]
    pub fn headers(&self) -> &[Header<'buf>] {
        &self.headers[..self.num_headers]
    }

    /// Finds a header value by name (case-insensitive). The first match
    /// wins; repeated headers are all present in [`Self::headers`].
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&'buf [u8]> {
        self.headers()
            .iter()
            .find(|header| header.name_eq_ignore_case(name))
            .map(Header::value)
    }

    fn header_str(&self, name: &str) -> Option<&'buf str> {
        std::str::from_utf8(self.header(name)?).ok()
    }

    /// Returns the query map. Populated only when the request target
    /// contained a `?`; duplicate names keep the last occurrence.
    #[must_use]
    pub fn queries(&self) -> &HashMap<&'buf str, &'buf str> {
        &self.queries
    }

    /// Looks up a single query value.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&'buf str> {
        self.queries.get(name).copied()
    }

    /// Returns true if a `Connection` header was present.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.has_connection
    }

    /// Returns true if `Connection: close` was present.
    #[must_use]
    pub fn has_close(&self) -> bool {
        self.has_close
    }

    /// Returns true if the message asked for a protocol upgrade.
    #[must_use]
    pub fn has_upgrade(&self) -> bool {
        self.has_upgrade
    }

    // ========================================================================
    // Classification predicates
    // ========================================================================

    /// Returns true if the body uses chunked transfer encoding.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .is_some_and(|value| value.eq_ignore_ascii_case(b"chunked"))
    }

    /// Returns true for `multipart/*` content.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.header_str("content-type")
            .is_some_and(|value| value.contains("multipart"))
    }

    /// Returns the multipart boundary token from the Content-Type header.
    #[must_use]
    pub fn boundary(&self) -> Option<&'buf str> {
        let content_type = self.header_str("content-type")?;
        let at = content_type.find("=--")?;
        Some(&content_type[at + 1..])
    }

    /// Returns true for a websocket upgrade.
    #[must_use]
    pub fn is_websocket(&self) -> bool {
        self.header("upgrade")
            .is_some_and(|value| value.eq_ignore_ascii_case(b"websocket"))
    }

    /// Connection keep-alive classification: websocket upgrades stay open,
    /// as does any message without an explicit non-keep-alive `Connection`
    /// header.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        if self.is_websocket() {
            return true;
        }
        match self.header("connection") {
            None => true,
            Some(value) => value.is_empty() || value.eq_ignore_ascii_case(b"keep-alive"),
        }
    }

    /// Returns true if the peer advertised range support.
    #[must_use]
    pub fn accepts_ranges(&self) -> bool {
        self.header("accept-ranges").is_some_and(|value| !value.is_empty())
    }

    /// Returns true if a `Location` header is present.
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.header("location").is_some_and(|value| !value.is_empty())
    }
}

impl Default for Message<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed<'buf>(buf: &'buf [u8]) -> Message<'buf> {
        let mut message = Message::new();
        let status = message.parse_request(buf, 0).expect("well-formed request");
        assert!(status.is_complete());
        message
    }

    // ========================================================================
    // Method classification
    // ========================================================================

    #[test]
    fn lookup_classifies_standard_methods() {
        for method in [
            Method::Get,
            Method::Head,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Connect,
            Method::Options,
            Method::Trace,
        ] {
            assert_eq!(Method::lookup(method.as_str()), Some(method));
            assert_eq!(Method::from_bytes(method.as_str().as_bytes()), Some(method));
        }
    }

    #[test]
    fn lookup_rejects_hash_collisions() {
        // Tokens that land on a populated slot must still fail the exact
        // comparison instead of being misclassified.
        assert_eq!(Method::lookup("GETX"), None);
        assert_eq!(Method::lookup("get"), None);
        assert_eq!(Method::lookup("PURGE"), None);
        assert_eq!(Method::lookup("P"), None);
        assert_eq!(Method::lookup(""), None);
    }

    // ========================================================================
    // Request facade
    // ========================================================================

    #[test]
    fn round_trip_request() {
        let buf: &[u8] = b"GET /a?x=1&y=2 HTTP/1.1\r\nHost: h\r\nContent-Length: 0\r\n\r\n";
        let message = parsed(buf);

        assert_eq!(message.method(), "GET");
        assert_eq!(message.method_kind(), Some(Method::Get));
        assert_eq!(message.url(), "/a");
        assert_eq!(message.full_url(), "/a?x=1&y=2");
        assert_eq!(message.query("x"), Some("1"));
        assert_eq!(message.query("y"), Some("2"));
        assert_eq!(message.queries().len(), 2);
        assert_eq!(message.body_len(), Some(0));
        assert_eq!(message.header_len(), buf.len());
        assert_eq!(message.total_len(), Some(buf.len()));
        assert_eq!(message.header("host"), Some(b"h".as_slice()));
    }

    #[test]
    fn get_body_len_is_zero_even_with_content_length() {
        let message = parsed(b"GET / HTTP/1.1\r\nContent-Length: 42\r\n\r\n");
        assert_eq!(message.body_len(), Some(0));
    }

    #[test]
    fn post_body_len_from_content_length() {
        let message = parsed(b"POST /up HTTP/1.1\r\nContent-Length: 42\r\n\r\n");
        assert_eq!(message.body_len(), Some(42));
        assert_eq!(message.total_len(), Some(message.header_len() + 42));
    }

    #[test]
    fn missing_content_length_is_unknown() {
        let message = parsed(b"POST /up HTTP/1.1\r\nHost: h\r\n\r\n");
        assert_eq!(message.body_len(), None);
        assert_eq!(message.total_len(), None);
    }

    #[test]
    fn invalid_content_length_is_unknown() {
        let message = parsed(b"POST /up HTTP/1.1\r\nContent-Length: banana\r\n\r\n");
        assert_eq!(message.body_len(), None);
    }

    #[test]
    fn unknown_method_is_opaque() {
        let message = parsed(b"PURGE /cache HTTP/1.1\r\nContent-Length: 7\r\n\r\n");
        assert_eq!(message.method(), "PURGE");
        assert_eq!(message.method_kind(), None);
        // Not classified as GET, so the declared length is honored.
        assert_eq!(message.body_len(), Some(7));
    }

    #[test]
    fn no_query_leaves_map_empty() {
        let message = parsed(b"GET /plain HTTP/1.1\r\n\r\n");
        assert_eq!(message.url(), "/plain");
        assert_eq!(message.full_url(), "/plain");
        assert!(message.queries().is_empty());
        assert_eq!(message.query("x"), None);
    }

    #[test]
    fn duplicate_query_names_last_wins() {
        let message = parsed(b"GET /a?k=1&k=2 HTTP/1.1\r\n\r\n");
        assert_eq!(message.query("k"), Some("2"));
    }

    #[test]
    fn message_is_reusable_across_parses() {
        let buf = b"GET /a?x=1 HTTP/1.1\r\nConnection: close\r\n\r\n";
        let second = b"POST /b HTTP/1.1\r\nContent-Length: 3\r\n\r\n";

        let mut message = Message::new();
        assert!(message.parse_request(buf, 0).unwrap().is_complete());
        assert!(message.has_close());
        assert_eq!(message.query("x"), Some("1"));

        assert!(message.parse_request(second, 0).unwrap().is_complete());
        assert_eq!(message.method_kind(), Some(Method::Post));
        assert_eq!(message.url(), "/b");
        assert!(!message.has_close());
        assert!(message.queries().is_empty());
        assert_eq!(message.body_len(), Some(3));
    }

    #[test]
    fn partial_request_reports_partial() {
        let buf = b"GET /a?x=1 HTTP/1.1\r\nHost: h\r\n\r\n";
        let mut message = Message::new();
        assert!(message.parse_request(&buf[..10], 0).unwrap().is_partial());
        assert!(message.parse_request(buf, 10).unwrap().is_complete());
        assert_eq!(message.url(), "/a");
    }

    #[test]
    fn exact_capacity_parses() {
        let mut buf = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..MAX_HEADERS {
            buf.extend_from_slice(format!("H{i}: v\r\n").as_bytes());
        }
        buf.extend_from_slice(b"\r\n");
        let mut message = Message::new();
        assert!(message.parse_request(&buf, 0).unwrap().is_complete());
        assert_eq!(message.headers().len(), MAX_HEADERS);
    }

    #[test]
    fn capacity_overflow_propagates() {
        let mut buf = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..=MAX_HEADERS {
            buf.extend_from_slice(format!("H{i}: v\r\n").as_bytes());
        }
        buf.extend_from_slice(b"\r\n");
        let mut message = Message::new();
        assert_eq!(
            message.parse_request(&buf, 0),
            Err(ParseError::TooManyHeaders)
        );
    }

    // ========================================================================
    // Response facade
    // ========================================================================

    #[test]
    fn response_round_trip() {
        let buf = b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\n";
        let mut message = Message::new();
        let status = message.parse_response(buf, 0).unwrap();
        assert_eq!(status, Status::Complete(buf.len()));
        assert_eq!(message.status(), 404);
        assert_eq!(message.reason(), "Not Found");
        assert_eq!(message.minor_version(), 1);
        assert_eq!(message.body_len(), Some(9));
    }

    #[test]
    fn response_without_content_length() {
        let buf = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
        let mut message = Message::new();
        assert!(message.parse_response(buf, 0).unwrap().is_complete());
        assert_eq!(message.body_len(), None);
        assert!(message.is_chunked());
    }

    // ========================================================================
    // Classification predicates
    // ========================================================================

    #[test]
    fn chunked_detection() {
        let message = parsed(b"POST /up HTTP/1.1\r\nTransfer-Encoding: Chunked\r\n\r\n");
        assert!(message.is_chunked());
        let message = parsed(b"POST /up HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n");
        assert!(!message.is_chunked());
    }

    #[test]
    fn multipart_detection_and_boundary() {
        let message = parsed(
            b"POST /up HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=--xyz\r\n\r\n",
        );
        assert!(message.is_multipart());
        assert_eq!(message.boundary(), Some("--xyz"));

        let message = parsed(b"POST /up HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n");
        assert!(!message.is_multipart());
        assert_eq!(message.boundary(), None);
    }

    #[test]
    fn websocket_detection() {
        let message = parsed(
            b"GET /ws HTTP/1.1\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
        );
        assert!(message.is_websocket());
        assert!(message.has_upgrade());
        assert!(message.keep_alive());
    }

    #[test]
    fn keep_alive_defaults_to_true() {
        assert!(parsed(b"GET / HTTP/1.1\r\n\r\n").keep_alive());
        assert!(parsed(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n").keep_alive());
        assert!(!parsed(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").keep_alive());
    }

    #[test]
    fn range_and_location_predicates() {
        let buf = b"HTTP/1.1 302 Found\r\nLocation: /next\r\nAccept-Ranges: bytes\r\n\r\n";
        let mut message = Message::new();
        assert!(message.parse_response(buf, 0).unwrap().is_complete());
        assert!(message.accepts_ranges());
        assert!(message.has_location());
    }
}
