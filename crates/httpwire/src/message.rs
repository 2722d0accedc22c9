//! Request/response types. Headers are kept as an ordered list of pairs
//! rather than a map: lookup-by-name is rare on this path, and a pipelined
//! client can legally repeat a header name, which a map would silently drop.

#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub version: String,
    pub status: String,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn new(version: impl Into<String>, status: &str, status_text: &str) -> Self {
        Self {
            version: version.into(),
            status: status.to_string(),
            status_text: status_text.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn ok(version: impl Into<String>) -> Self {
        Self::new(version, "200", "OK")
    }

    pub fn not_found(version: impl Into<String>) -> Self {
        Self::new(version, "404", "Not Found")
    }

    pub fn bad_request(version: impl Into<String>) -> Self {
        Self::new(version, "400", "Bad Request")
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status line, each header as `name:value\r\n`, then the blank line
    /// separating headers from body.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(64 + self.headers.len() * 32);
        out.push_str(&self.version);
        out.push(' ');
        out.push_str(&self.status);
        out.push(' ');
        out.push_str(&self.status_text);
        out.push_str("\r\n");
        for (k, v) in &self.headers {
            out.push_str(k);
            out.push(':');
            out.push_str(v);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_line_and_headers() {
        let response = HttpResponse::ok("HTTP/1.1").header("content-length", "5");
        assert_eq!(response.serialize(), "HTTP/1.1 200 OK\r\ncontent-length:5\r\n\r\n");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = HttpRequest {
            method: "GET".into(),
            url: "/".into(),
            version: "HTTP/1.1".into(),
            headers: vec![("Content-Length".into(), "0".into())],
        };
        assert_eq!(request.header("content-length"), Some("0"));
    }
}
