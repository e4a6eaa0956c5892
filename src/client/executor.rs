//! Request pipeline: option encoding, retry with linear backoff, failure
//! classification and response decoding.

use std::io::Read;
use std::sync::{Arc, Once};
use std::thread;

use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::error::{ClientError, ClientResult};
use super::settings::{RequestOptions, Settings};
use crate::logging::Logger;
use crate::transport::{HttpRequest, HttpResponse, ResponseBody, Transport};

static HTML_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title>([^<]*)</title>").expect("valid title regex"));

/// Sends queries for one connection.
pub(crate) struct Executor {
    host: String,
    port: u16,
    user: String,
    password: String,
    pub(crate) settings: Settings,
    transport: Arc<dyn Transport>,
    pub(crate) logger: Logger,
    announced: Once,
}

impl Executor {
    pub(crate) fn new(
        host: String,
        port: u16,
        user: String,
        password: String,
        settings: Settings,
        transport: Arc<dyn Transport>,
        logger: Logger,
    ) -> Self {
        Self {
            host,
            port,
            user,
            password,
            settings,
            transport,
            logger,
            announced: Once::new(),
        }
    }

    /// `user:****@host:port`, safe to log.
    pub(crate) fn masked_target(&self) -> String {
        format!(
            "{}:{}@{}:{}",
            self.user,
            "*".repeat(self.password.len()),
            self.host,
            self.port
        )
    }

    /// Run `query` and return the open response body.
    ///
    /// Up to `attempts` tries; try `k > 0` first sleeps `k * wait`. Memory
    /// limit failures are returned at once, other failures are retried and
    /// the last one is returned when tries run out. Request-build failures
    /// are never retried.
    pub(crate) fn do_query(&self, query: &str) -> ClientResult<ResponseBody> {
        let attempts = self.settings.attempts().max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let wait = self.settings.attempt_wait() * attempt;
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }

            let options = self.settings.request_options();
            let request = self.build_request(query, &options)?;

            let error = match self.transport.send(request) {
                Ok(response) if response.is_success() => return Ok(decode_body(response)),
                Ok(response) => status_error(response),
                Err(e) => ClientError::transport(&self.masked_target(), e),
            };

            if error.is_memory_limit() {
                self.logger.error(&format!("Catch error {}", error));
                return Err(error);
            }

            if attempt + 1 < attempts {
                self.logger.warn(&format!(
                    "Catch warning {} (attempt {} of {})",
                    error,
                    attempt + 1,
                    attempts
                ));
            }
            last_error = Some(error);
        }

        let error = last_error.unwrap_or_else(|| ClientError::Transport {
            target: self.masked_target(),
            message: "no attempt was made".to_string(),
        });
        self.logger.error(&format!("Catch error {}", error));
        Err(error)
    }

    fn build_request(&self, query: &str, options: &RequestOptions) -> ClientResult<HttpRequest> {
        let url = self.build_url(options).map_err(|message| {
            let error = ClientError::RequestBuild {
                target: self.masked_target(),
                message,
            };
            self.logger.fatal(&format!("Catch error {}", error));
            error
        })?;

        let mut headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
        ];
        if options.compression {
            headers.push(("Accept-Encoding".to_string(), "gzip".to_string()));
        }

        Ok(HttpRequest {
            url,
            headers,
            body: query.to_string(),
            timeout: options.total_timeout(),
        })
    }

    fn build_url(&self, options: &RequestOptions) -> Result<Url, String> {
        let protocol = self.settings.protocol();
        let base = format!("{}://{}:{}/", protocol, self.host, self.port);
        let mut url = Url::parse(&base).map_err(|e| e.to_string())?;

        url.set_username(&self.user)
            .map_err(|_| format!("user can't be set for {} URLs", protocol))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| format!("password can't be set for {} URLs", protocol))?;
        }

        let pairs = options.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        self.announced.call_once(|| {
            self.logger
                .info(&format!("Connection FQDN is {}", self.masked_target()));
        });

        Ok(url)
    }
}

/// Body stream, gunzipped when the server compressed it.
fn decode_body(response: HttpResponse) -> ResponseBody {
    let gzip = response
        .header("Content-Encoding")
        .is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("gzip"));

    if gzip {
        Box::new(GzDecoder::new(response.body))
    } else {
        response.body
    }
}

/// Turn a non-2xx response into an error carrying the server's message.
fn status_error(response: HttpResponse) -> ClientError {
    let status = response.status;
    let mut body = decode_body(response);

    let mut bytes = Vec::new();
    if let Err(e) = body.read_to_end(&mut bytes) {
        return ClientError::Status {
            status,
            message: format!("status {}, body unreadable: {}", status, e),
        };
    }

    ClientError::Status {
        status,
        message: error_message(status, &String::from_utf8_lossy(&bytes)),
    }
}

/// Plain bodies are the message; HTML error pages contribute their title.
fn error_message(status: u16, body: &str) -> String {
    let text = body.trim();

    let message = if text.starts_with('<') {
        HTML_TITLE
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|title| title.as_str().trim())
            .unwrap_or(text)
    } else {
        text
    };

    if message.is_empty() {
        format!("unexpected status {}", status)
    } else {
        message.to_string()
    }
}
