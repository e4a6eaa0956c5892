//! Connection handle: live configuration plus throttled and forced entry
//! points.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use super::config::ConnectionConfig;
use super::error::{ClientError, ClientResult};
use super::executor::Executor;
use super::settings::Settings;
use crate::logging::Logger;
use crate::query::{cut_off, insert_statement, with_fetch_format, Format, LOG_QUERY_LIMIT};
use crate::result::{Row, RowIter};
use crate::throttle::{Throttle, ThrottlePermit};
use crate::transport::{HttpTransport, Transport};

struct ConnectionInner {
    executor: Executor,
    throttle: Arc<Throttle>,
}

/// A client for one server.
///
/// Thread-safe: clones share configuration, transport and throttle, so a
/// connection can be handed to many threads. Setters take effect on the
/// next request that reads them.
///
/// Throttled calls (`exec`, `fetch`, `fetch_one`, `insert_batch`) wait for
/// a free slot when `max_requests` is reached. A fetch keeps its slot until
/// its [`RowIter`] is closed or dropped, so a caller holding an open
/// iterator must use the `forced_*` variants for nested queries.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

/// Builder for connections with a custom transport or log sink.
pub struct ConnectionBuilder {
    config: ConnectionConfig,
    transport: Option<Arc<dyn Transport>>,
    logger: Logger,
}

impl ConnectionBuilder {
    /// Use `transport` instead of the default HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Send client logs to `logger`.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> ClientResult<Connection> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransport::new().map_err(|e| ClientError::InvalidConfig(e.to_string()))?,
            ),
        };

        let config = self.config;
        let executor = Executor::new(
            config.host.clone(),
            config.port,
            config.user.clone(),
            config.password.clone(),
            Settings::new(config.protocol.clone()),
            transport,
            self.logger,
        );

        let connection = Connection {
            inner: Arc::new(ConnectionInner {
                executor,
                throttle: Arc::new(Throttle::new(0)),
            }),
        };

        // Negative config values mean "unset" and keep the defaults.
        if config.max_memory_usage >= 0 {
            connection.set_max_memory_usage(config.max_memory_usage);
        }
        if config.connect_timeout >= 0 {
            connection.set_connect_timeout(config.connect_timeout);
        }
        if config.send_timeout >= 0 {
            connection.set_send_timeout(config.send_timeout);
        }
        if config.receive_timeout >= 0 {
            connection.set_receive_timeout(config.receive_timeout);
        }
        connection.set_compression(config.compression);
        connection.set_attempts(config.attempts, Duration::from_millis(config.attempt_wait_ms));
        connection.set_max_requests(config.max_requests);

        connection.logger().info("Clickhouse is initialized");
        Ok(connection)
    }
}

impl Connection {
    /// Connect with the default HTTP transport.
    pub fn new(config: ConnectionConfig) -> ClientResult<Self> {
        Self::builder(config).build()
    }

    /// Shorthand for a server with credentials and default settings.
    pub fn connect(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> ClientResult<Self> {
        Self::new(ConnectionConfig::new(host, port).credentials(user, password))
    }

    pub fn builder(config: ConnectionConfig) -> ConnectionBuilder {
        ConnectionBuilder {
            config,
            transport: None,
            logger: Logger::default(),
        }
    }

    fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    fn logger(&self) -> &Logger {
        &self.inner.executor.logger
    }

    fn settings(&self) -> &Settings {
        &self.inner.executor.settings
    }

    // ---- configuration ----

    /// Set the URL scheme used from the next request on.
    pub fn set_protocol(&self, protocol: &str) {
        self.settings().set_protocol(protocol);
        self.logger().debug(&format!("Set protocol = {}", protocol));
    }

    pub fn protocol(&self) -> String {
        self.settings().protocol()
    }

    /// Server memory ceiling per query in bytes. Negative values are ignored.
    pub fn set_max_memory_usage(&self, bytes: i64) {
        if bytes < 0 {
            self.logger()
                .debug(&format!("Ignore negative max_memory_usage = {}", bytes));
            return;
        }
        self.settings().set_max_memory_usage(bytes);
        self.logger().debug(&format!("Set max_memory_usage = {}", bytes));
    }

    pub fn max_memory_usage(&self) -> i64 {
        self.settings().max_memory_usage()
    }

    /// Connect timeout in seconds. Negative values are ignored.
    pub fn set_connect_timeout(&self, secs: i64) {
        if secs < 0 {
            self.logger()
                .debug(&format!("Ignore negative connect_timeout = {}", secs));
            return;
        }
        self.settings().set_connect_timeout(secs);
        self.logger().debug(&format!("Set connect_timeout = {} s", secs));
    }

    pub fn connect_timeout(&self) -> i64 {
        self.settings().connect_timeout()
    }

    /// Send timeout in seconds. Negative values are ignored.
    pub fn set_send_timeout(&self, secs: i64) {
        if secs < 0 {
            self.logger()
                .debug(&format!("Ignore negative send_timeout = {}", secs));
            return;
        }
        self.settings().set_send_timeout(secs);
        self.logger().debug(&format!("Set send_timeout = {} s", secs));
    }

    pub fn send_timeout(&self) -> i64 {
        self.settings().send_timeout()
    }

    /// Receive timeout in seconds. Negative values are ignored.
    pub fn set_receive_timeout(&self, secs: i64) {
        if secs < 0 {
            self.logger()
                .debug(&format!("Ignore negative receive_timeout = {}", secs));
            return;
        }
        self.settings().set_receive_timeout(secs);
        self.logger().debug(&format!("Set receive_timeout = {} s", secs));
    }

    pub fn receive_timeout(&self) -> i64 {
        self.settings().receive_timeout()
    }

    pub fn set_compression(&self, enabled: bool) {
        self.settings().set_compression(enabled);
        self.logger()
            .debug(&format!("Set compression = {}", u8::from(enabled)));
    }

    pub fn compression(&self) -> bool {
        self.settings().compression()
    }

    /// Attempts per query and the base backoff. Attempt `k` (from 0) waits
    /// `k * wait` first. An amount below 1 is ignored.
    pub fn set_attempts(&self, amount: i64, wait: Duration) {
        let amount = match u32::try_from(amount) {
            Ok(amount) if amount > 0 => amount,
            _ => {
                self.logger()
                    .debug(&format!("Ignore attempts amount = {}", amount));
                return;
            }
        };
        self.settings().set_attempts(amount, wait);
        self.logger().debug(&format!(
            "Set attempts amount ({}) and wait ({:?})",
            amount, wait
        ));
    }

    pub fn attempts(&self) -> u32 {
        self.settings().attempts()
    }

    /// Cap on concurrent throttled queries, 0 for no cap. Negative values
    /// are ignored.
    pub fn set_max_requests(&self, limit: i64) {
        let Ok(limit) = usize::try_from(limit) else {
            self.logger()
                .debug(&format!("Ignore negative max request pool = {}", limit));
            return;
        };
        self.inner.throttle.set_ceiling(limit);
        self.logger()
            .debug(&format!("Set max request pool = {}", limit));
    }

    pub fn max_requests(&self) -> usize {
        self.inner.throttle.ceiling()
    }

    /// Throttled queries currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.inner.throttle.in_flight()
    }

    // ---- queries ----

    /// Run a statement and discard its output.
    pub fn exec(&self, query: &str) -> ClientResult<()> {
        let _permit = self.inner.throttle.acquire();
        self.forced_exec(query)
    }

    /// [`Connection::exec`] without waiting for a throttle slot.
    pub fn forced_exec(&self, query: &str) -> ClientResult<()> {
        self.logger().debug(&format!(
            "Try to execute: {}",
            cut_off(query, LOG_QUERY_LIMIT)
        ));

        let mut body = self.executor().do_query(query)?;
        io::copy(&mut body, &mut io::sink()).map_err(|e| {
            let error = ClientError::from(e);
            self.logger().error(&format!("Catch error {}", error));
            error
        })?;

        self.logger().debug(&format!(
            "The query is executed {}",
            cut_off(query, LOG_QUERY_LIMIT)
        ));
        Ok(())
    }

    /// Run a query and stream its rows.
    ///
    /// Any trailing `FORMAT` clause is replaced so the server answers with
    /// tab-separated rows and a header line. The throttle slot is held by
    /// the returned iterator.
    pub fn fetch(&self, query: &str) -> ClientResult<RowIter> {
        let permit = self.inner.throttle.acquire();
        self.fetch_with(query, Some(permit))
    }

    /// [`Connection::fetch`] without waiting for a throttle slot.
    pub fn forced_fetch(&self, query: &str) -> ClientResult<RowIter> {
        self.fetch_with(query, None)
    }

    /// Run a query and return its first row, if any. The response is closed
    /// before returning.
    pub fn fetch_one(&self, query: &str) -> ClientResult<Option<Row>> {
        let permit = self.inner.throttle.acquire();
        self.fetch_one_with(query, Some(permit))
    }

    /// [`Connection::fetch_one`] without waiting for a throttle slot.
    pub fn forced_fetch_one(&self, query: &str) -> ClientResult<Option<Row>> {
        self.fetch_one_with(query, None)
    }

    /// Insert a pre-formatted payload into `database.table`.
    ///
    /// The payload is sent verbatim after the `INSERT ... FORMAT` line.
    pub fn insert_batch(
        &self,
        database: &str,
        table: &str,
        columns: &[&str],
        format: Format,
        mut data: impl Read,
    ) -> ClientResult<()> {
        let mut query = insert_statement(database, table, columns, format);
        data.read_to_string(&mut query)?;
        query.push('\n');

        self.exec(&query)
    }

    fn fetch_with(&self, query: &str, permit: Option<ThrottlePermit>) -> ClientResult<RowIter> {
        self.logger().debug(&format!(
            "Try to execute: {}",
            cut_off(query, LOG_QUERY_LIMIT)
        ));

        let query = with_fetch_format(query);
        let body = self.executor().do_query(&query)?;

        RowIter::open(body, self.logger().clone(), permit)
    }

    fn fetch_one_with(
        &self,
        query: &str,
        permit: Option<ThrottlePermit>,
    ) -> ClientResult<Option<Row>> {
        let mut iter = self.fetch_with(query, permit)?;

        let row = if iter.advance() { iter.take_row() } else { None };
        let error = iter.err().cloned();
        iter.close();

        match error {
            Some(error) => Err(error),
            None => Ok(row),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.executor().masked_target())
            .field("protocol", &self.protocol())
            .field("max_requests", &self.max_requests())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
