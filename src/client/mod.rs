//! Client API for chstream.
//!
//! [`Connection`] is the entry point: it owns the live settings, the
//! request pipeline and the concurrency throttle.

mod config;
mod connection;
mod error;
mod executor;
mod settings;

pub use config::{ConnectionConfig, GIGABYTE, MEGABYTE};
pub use connection::{Connection, ConnectionBuilder};
pub use error::{ClientError, ClientResult};
pub use settings::{
    CONNECT_TIMEOUT, ENABLE_HTTP_COMPRESSION, MAX_MEMORY_USAGE, RECEIVE_TIMEOUT, SEND_TIMEOUT,
    UNSET,
};
