//! Raw request/response exchange with the server.
//!
//! The client only needs one timed POST per attempt, so the seam is a
//! single-method trait. [`HttpTransport`] is the default implementation;
//! tests plug in scripted transports.

mod error;
mod http;

use std::fmt;
use std::io::Read;
use std::time::Duration;

use url::Url;

pub use error::{TransportError, TransportResult};
pub use http::HttpTransport;

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Full target, credentials and options included.
    pub url: Url,
    /// Header pairs, sent in order.
    pub headers: Vec<(String, String)>,
    /// Raw query text.
    pub body: String,
    /// Total time allowed for the exchange, body included.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Look up a request header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response body stream. Dropping it closes the underlying resource.
pub type ResponseBody = Box<dyn Read + Send>;

/// A received response with a still-open body.
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Build a response from a status, headers and a body stream.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Look up a response header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Something that can perform a timed request/response exchange.
pub trait Transport: Send + Sync {
    /// Send the request and return the response with its body unread.
    fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = HttpResponse::new(
            200,
            vec![("Content-Encoding".into(), "gzip".into())],
            Box::new(Cursor::new(Vec::new())),
        );
        assert_eq!(response.header("content-encoding"), Some("gzip"));
        assert_eq!(response.header("x-missing"), None);
        assert!(response.is_success());
    }

    #[test]
    fn test_status_ranges() {
        let body = || -> ResponseBody { Box::new(Cursor::new(Vec::new())) };
        assert!(HttpResponse::new(204, vec![], body()).is_success());
        assert!(!HttpResponse::new(404, vec![], body()).is_success());
        assert!(!HttpResponse::new(500, vec![], body()).is_success());
    }
}
