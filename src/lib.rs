//! chstream - a streaming ClickHouse HTTP client
//!
//! Queries go out over the server's HTTP interface. Results come back as
//! tab-separated text and are decoded one row at a time, never buffered
//! whole. Each connection carries its own execution policy: timeouts,
//! memory ceiling, compression, retries and a cap on concurrent queries.
//!
//! # Example
//!
//! ```no_run
//! use chstream::{Connection, ConnectionConfig};
//!
//! let conn = Connection::new(ConnectionConfig::new("localhost", 8123)).unwrap();
//! conn.set_attempts(3, std::time::Duration::from_secs(1));
//!
//! let mut rows = conn.fetch("SELECT name, engine FROM system.databases").unwrap();
//! while rows.advance() {
//!     let row = rows.row().unwrap();
//!     println!("{} {}", row.string("name").unwrap(), row.string("engine").unwrap());
//! }
//! if let Some(err) = rows.err() {
//!     eprintln!("{}", err);
//! }
//! ```

pub mod client;
pub mod escape;
pub mod logging;
pub mod query;
pub mod result;
pub mod throttle;
pub mod transport;

pub use client::{ClientError, ClientResult, Connection, ConnectionBuilder, ConnectionConfig};
pub use escape::{escape, unescape};
pub use logging::{Level, Logger};
pub use query::Format;
pub use result::{Row, RowIter};
