//! Raw query-string splitting.
//!
//! Splits a query string on `&` and the first `=` of each segment, without
//! percent-decoding or any other normalization — the bytes are handed to the
//! caller exactly as they appeared on the wire.
//!
//! ```
//! use rainy_http::QueryPairs;
//!
//! let pairs: Vec<_> = QueryPairs::new("a=1&flag&&=skipped&a=2").collect();
//! assert_eq!(pairs, vec![("a", "1"), ("flag", ""), ("a", "2")]);
//! ```

use std::collections::HashMap;

/// Zero-copy iterator over `name=value` pairs of a query string.
///
/// Empty segments (from `&&` or trailing `&`) and segments with an empty
/// name are skipped; a name without `=` yields an empty value.
#[derive(Debug, Clone)]
pub struct QueryPairs<'a> {
    segments: std::str::Split<'a, char>,
}

impl<'a> QueryPairs<'a> {
    /// Split `query` (without the leading `?`).
    #[must_use]
    pub fn new(query: &'a str) -> Self {
        Self {
            segments: query.split('&'),
        }
    }
}

impl<'a> Iterator for QueryPairs<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let segment = self.segments.next()?;
            if segment.is_empty() {
                continue;
            }
            let (name, value) = match segment.find('=') {
                Some(at) => (&segment[..at], &segment[at + 1..]),
                None => (segment, ""),
            };
            if name.is_empty() {
                continue;
            }
            return Some((name, value));
        }
    }
}

/// Collect a query string into a name→value map. Duplicate names keep the
/// last occurrence; use [`QueryPairs`] directly when every occurrence
/// matters.
#[must_use]
pub fn parse_query(query: &str) -> HashMap<&str, &str> {
    QueryPairs::new(query).collect()
}
