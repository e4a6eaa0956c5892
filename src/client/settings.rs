//! Live per-connection tunables.
//!
//! Each field is synchronized on its own. A request reads them one by one,
//! so an update racing with an in-flight request may be seen partially.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

/// Query-string key for the server memory ceiling.
pub const MAX_MEMORY_USAGE: &str = "max_memory_usage";
pub const CONNECT_TIMEOUT: &str = "connect_timeout";
pub const SEND_TIMEOUT: &str = "send_timeout";
pub const RECEIVE_TIMEOUT: &str = "receive_timeout";
pub const ENABLE_HTTP_COMPRESSION: &str = "enable_http_compression";

/// Value meaning "not set, use the server default".
pub const UNSET: i64 = -1;

pub(crate) struct Settings {
    protocol: RwLock<String>,
    max_memory_usage: AtomicI64,
    connect_timeout: AtomicI64,
    send_timeout: AtomicI64,
    receive_timeout: AtomicI64,
    compression: AtomicBool,
    attempts: AtomicU32,
    attempt_wait_ms: AtomicU64,
}

impl Settings {
    pub(crate) fn new(protocol: String) -> Self {
        Self {
            protocol: RwLock::new(protocol),
            max_memory_usage: AtomicI64::new(UNSET),
            connect_timeout: AtomicI64::new(UNSET),
            send_timeout: AtomicI64::new(UNSET),
            receive_timeout: AtomicI64::new(UNSET),
            compression: AtomicBool::new(false),
            attempts: AtomicU32::new(1),
            attempt_wait_ms: AtomicU64::new(0),
        }
    }

    pub(crate) fn protocol(&self) -> String {
        self.protocol.read().clone()
    }

    pub(crate) fn set_protocol(&self, protocol: &str) {
        *self.protocol.write() = protocol.to_string();
    }

    pub(crate) fn max_memory_usage(&self) -> i64 {
        self.max_memory_usage.load(Ordering::Relaxed)
    }

    pub(crate) fn set_max_memory_usage(&self, bytes: i64) {
        self.max_memory_usage.store(bytes, Ordering::Relaxed);
    }

    pub(crate) fn connect_timeout(&self) -> i64 {
        self.connect_timeout.load(Ordering::Relaxed)
    }

    pub(crate) fn set_connect_timeout(&self, secs: i64) {
        self.connect_timeout.store(secs, Ordering::Relaxed);
    }

    pub(crate) fn send_timeout(&self) -> i64 {
        self.send_timeout.load(Ordering::Relaxed)
    }

    pub(crate) fn set_send_timeout(&self, secs: i64) {
        self.send_timeout.store(secs, Ordering::Relaxed);
    }

    pub(crate) fn receive_timeout(&self) -> i64 {
        self.receive_timeout.load(Ordering::Relaxed)
    }

    pub(crate) fn set_receive_timeout(&self, secs: i64) {
        self.receive_timeout.store(secs, Ordering::Relaxed);
    }

    pub(crate) fn compression(&self) -> bool {
        self.compression.load(Ordering::Relaxed)
    }

    pub(crate) fn set_compression(&self, enabled: bool) {
        self.compression.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn attempt_wait(&self) -> Duration {
        Duration::from_millis(self.attempt_wait_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn set_attempts(&self, amount: u32, wait: Duration) {
        self.attempts.store(amount, Ordering::Relaxed);
        let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self.attempt_wait_ms.store(wait_ms, Ordering::Relaxed);
    }

    /// Read the per-request options.
    pub(crate) fn request_options(&self) -> RequestOptions {
        RequestOptions {
            max_memory_usage: self.max_memory_usage(),
            connect_timeout: self.connect_timeout(),
            send_timeout: self.send_timeout(),
            receive_timeout: self.receive_timeout(),
            compression: self.compression(),
        }
    }
}

/// Options carried by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestOptions {
    pub max_memory_usage: i64,
    pub connect_timeout: i64,
    pub send_timeout: i64,
    pub receive_timeout: i64,
    pub compression: bool,
}

impl RequestOptions {
    /// Client-side limit: the sum of the positive timeouts, if any.
    pub fn total_timeout(&self) -> Option<Duration> {
        let secs = [self.connect_timeout, self.send_timeout, self.receive_timeout]
            .into_iter()
            .filter(|secs| *secs > 0)
            .fold(0i64, i64::saturating_add);

        (secs > 0).then(|| Duration::from_secs(secs as u64))
    }

    /// Query-string pairs, positive or enabled values only.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let numeric = [
            (MAX_MEMORY_USAGE, self.max_memory_usage),
            (CONNECT_TIMEOUT, self.connect_timeout),
            (SEND_TIMEOUT, self.send_timeout),
            (RECEIVE_TIMEOUT, self.receive_timeout),
        ];
        for (key, value) in numeric {
            if value > 0 {
                pairs.push((key, value.to_string()));
            }
        }
        if self.compression {
            pairs.push((ENABLE_HTTP_COMPRESSION, "1".to_string()));
        }
        pairs
    }
}
