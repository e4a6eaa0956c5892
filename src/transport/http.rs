//! Blocking HTTP transport backed by `reqwest`.

use tracing::trace;

use super::error::TransportResult;
use super::{HttpRequest, HttpResponse, Transport};

/// Default transport: one blocking `reqwest` client reused across requests.
///
/// The client-wide timeout is disabled; each request carries its own total
/// timeout, and credentials embedded in the URL are sent as basic auth.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with its own connection client.
    pub fn new() -> TransportResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        trace!(host = ?request.url.host_str(), timeout = ?request.timeout, "sending request");

        let mut builder = self.client.post(request.url).body(request.body);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        Ok(HttpResponse::new(status, headers, Box::new(response)))
    }
}
