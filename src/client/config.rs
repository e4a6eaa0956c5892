//! Connection configuration.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ClientResult;
use super::settings::UNSET;

/// One mebibyte, for memory ceilings.
pub const MEGABYTE: i64 = 1024 * 1024;

/// One gibibyte, for memory ceilings.
pub const GIGABYTE: i64 = 1024 * MEGABYTE;

/// Initial settings of a [`Connection`](super::Connection).
///
/// Every tunable can still be changed on the live connection. Negative
/// numbers mean "unset" and are never transmitted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// URL scheme, `http` or `https`. Defaults to `http`, matching port 8123.
    pub protocol: String,
    /// Server memory ceiling per query, in bytes.
    pub max_memory_usage: i64,
    /// Timeouts in whole seconds.
    pub connect_timeout: i64,
    pub send_timeout: i64,
    pub receive_timeout: i64,
    /// Ask the server for gzip-compressed responses.
    pub compression: bool,
    /// Attempts per query, 1 means no retry.
    pub attempts: i64,
    /// Base backoff between attempts, in milliseconds.
    pub attempt_wait_ms: u64,
    /// Concurrent throttled queries, 0 means unlimited.
    pub max_requests: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8123,
            user: "default".to_string(),
            password: String::new(),
            protocol: "http".to_string(),
            max_memory_usage: UNSET,
            connect_timeout: UNSET,
            send_timeout: UNSET,
            receive_timeout: UNSET,
            compression: false,
            attempts: 1,
            attempt_wait_ms: 0,
            max_requests: 0,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given server.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> ClientResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            super::ClientError::InvalidConfig(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Set user and password.
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn max_memory_usage(mut self, bytes: i64) -> Self {
        self.max_memory_usage = bytes;
        self
    }

    /// Set connect, send and receive timeouts in seconds.
    pub fn timeouts(mut self, connect: i64, send: i64, receive: i64) -> Self {
        self.connect_timeout = connect;
        self.send_timeout = send;
        self.receive_timeout = receive;
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Set retry attempts and the base wait between them.
    pub fn attempts(mut self, amount: i64, wait_ms: u64) -> Self {
        self.attempts = amount;
        self.attempt_wait_ms = wait_ms;
        self
    }

    pub fn max_requests(mut self, limit: i64) -> Self {
        self.max_requests = limit;
        self
    }
}

// Hand-written so the password never reaches logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"*".repeat(self.password.len()))
            .field("protocol", &self.protocol)
            .field("max_memory_usage", &self.max_memory_usage)
            .field("connect_timeout", &self.connect_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("receive_timeout", &self.receive_timeout)
            .field("compression", &self.compression)
            .field("attempts", &self.attempts)
            .field("attempt_wait_ms", &self.attempt_wait_ms)
            .field("max_requests", &self.max_requests)
            .finish()
    }
}
