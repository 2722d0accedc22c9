//! Incremental request parser.
//!
//! Finds the *first* occurrence of the `\r\n\r\n` terminator rather than
//! requiring the accumulated buffer to end with it, and keeps whatever bytes
//! follow the terminator buffered for the next call. A client that writes
//! two requests back-to-back in one packet, or whose second request arrives
//! before the first response goes out, still gets both requests parsed
//! instead of stalling on the "ends with" check.
//!
//! Header lines are split on every `:`, and a line is kept only when that
//! split yields exactly two pieces; a header whose value itself contains a
//! colon (`Host: example.com:8080`, timestamps, etc.) is silently dropped
//! rather than kept with a truncated or merged value.

use crate::message::HttpRequest;

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Buffers partial requests as persistent state across calls on the same
/// connection.
#[derive(Default)]
pub struct HttpParser {
    buffer: Vec<u8>,
}

impl HttpParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly received bytes in. Returns the next complete request, if
    /// the buffer now contains one; leftover bytes (a pipelined second
    /// request, or a partial one) stay buffered.
    pub fn feed(&mut self, packet: &[u8]) -> Option<HttpRequest> {
        self.buffer.extend_from_slice(packet);

        let terminator_at = find_subslice(&self.buffer, TERMINATOR)?;
        let head_end = terminator_at + TERMINATOR.len();
        let head = self.buffer[..head_end].to_vec();
        self.buffer.drain(..head_end);

        parse_head(&head)
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_head(head: &[u8]) -> Option<HttpRequest> {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n");

    let request_line = lines.next()?;
    let mut parts = request_line.split(' ');
    let method = parts.next()?.to_string();
    let url = parts.next()?.to_string();
    let version = parts.next()?.to_string();
    if method.is_empty() || url.is_empty() || version.is_empty() {
        return None;
    }

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let pieces: Vec<&str> = line.split(':').collect();
        if let [name, value] = pieces[..] {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Some(HttpRequest { method, url, version, headers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_get() {
        let mut parser = HttpParser::new();
        let request = parser
            .feed(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "/index.html");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(request.header("host"), Some("localhost"));
    }

    #[test]
    fn accumulates_partial_requests_across_feeds() {
        let mut parser = HttpParser::new();
        assert!(parser.feed(b"GET /a HTTP/1.1\r\nHost: ").is_none());
        let request = parser.feed(b"example.com\r\n\r\n").unwrap();
        assert_eq!(request.url, "/a");
        assert_eq!(request.header("host"), Some("example.com"));
    }

    #[test]
    fn keeps_pipelined_remainder_for_the_next_feed() {
        let mut parser = HttpParser::new();
        let first = parser
            .feed(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n")
            .unwrap();
        assert_eq!(first.url, "/a");
        let second = parser.feed(b"").unwrap();
        assert_eq!(second.url, "/b");
    }

    #[test]
    fn drops_header_lines_with_more_than_one_colon() {
        let mut parser = HttpParser::new();
        let request = parser
            .feed(b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nAccept: */*\r\n\r\n")
            .unwrap();
        assert_eq!(request.header("host"), None);
        assert_eq!(request.header("accept"), Some("*/*"));
    }
}
