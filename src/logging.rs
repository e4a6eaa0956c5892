//! Pluggable log sink.
//!
//! A [`Logger`] holds five independently replaceable callbacks, one per
//! severity. The default forwards to `tracing`, so an application that
//! installs a subscriber gets client logs without extra wiring.

use std::fmt;
use std::sync::Arc;

/// A single severity slot.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Severity levels understood by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Five-slot log sink held by a connection.
#[derive(Clone)]
pub struct Logger {
    debug: LogFn,
    info: LogFn,
    warn: LogFn,
    error: LogFn,
    fatal: LogFn,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            debug: Arc::new(|message: &str| tracing::debug!("{}", message)),
            info: Arc::new(|message: &str| tracing::info!("{}", message)),
            warn: Arc::new(|message: &str| tracing::warn!("{}", message)),
            error: Arc::new(|message: &str| tracing::error!("{}", message)),
            fatal: Arc::new(|message: &str| tracing::error!(fatal = true, "{}", message)),
        }
    }
}

impl Logger {
    /// Logger that discards everything.
    pub fn silent() -> Self {
        let noop: LogFn = Arc::new(|_: &str| {});
        Self {
            debug: noop.clone(),
            info: noop.clone(),
            warn: noop.clone(),
            error: noop.clone(),
            fatal: noop,
        }
    }

    /// Replace the slot for `level`.
    pub fn set(&mut self, level: Level, callback: impl Fn(&str) + Send + Sync + 'static) {
        let callback: LogFn = Arc::new(callback);
        match level {
            Level::Debug => self.debug = callback,
            Level::Info => self.info = callback,
            Level::Warn => self.warn = callback,
            Level::Error => self.error = callback,
            Level::Fatal => self.fatal = callback,
        }
        self.debug(&format!("Set custom {:?} logger", level));
    }

    /// Builder form of [`Logger::set`].
    pub fn with(mut self, level: Level, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.set(level, callback);
        self
    }

    pub fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => (self.debug)(message),
            Level::Info => (self.info)(message),
            Level::Warn => (self.warn)(message),
            Level::Error => (self.error)(message),
            Level::Fatal => (self.fatal)(message),
        }
    }

    pub fn debug(&self, message: &str) {
        (self.debug)(message)
    }

    pub fn info(&self, message: &str) {
        (self.info)(message)
    }

    pub fn warn(&self, message: &str) {
        (self.warn)(message)
    }

    pub fn error(&self, message: &str) {
        (self.error)(message)
    }

    pub fn fatal(&self, message: &str) {
        (self.fatal)(message)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// In-memory sink for tests: records `(level, message)` pairs.
#[cfg(test)]
pub(crate) fn recording() -> (Logger, Arc<parking_lot::Mutex<Vec<(Level, String)>>>) {
    let records = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut logger = Logger::silent();
    for level in [Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal] {
        let records = Arc::clone(&records);
        logger.set(level, move |message| {
            records.lock().push((level, message.to_string()))
        });
    }
    records.lock().clear();
    (logger, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_independent() {
        let (mut logger, records) = recording();
        logger.set(Level::Info, |_| {});
        records.lock().clear();

        logger.info("dropped");
        logger.warn("kept");
        logger.fatal("also kept");

        let records = records.lock();
        assert_eq!(
            *records,
            vec![
                (Level::Warn, "kept".to_string()),
                (Level::Fatal, "also kept".to_string()),
            ]
        );
    }

    #[test]
    fn test_silent_logger_accepts_all_levels() {
        let logger = Logger::silent();
        for level in [Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal] {
            logger.log(level, "nothing");
        }
    }
}
