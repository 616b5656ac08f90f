//! Tether: blocking client-side TCP transport
//!
//! This crate wraps a single TCP connection as a buffered byte stream for
//! protocol codecs to read and write. It handles:
//! - Lazy or eager connection establishment, optionally through a pluggable
//!   connection factory
//! - Socket tuning (no-delay, linger, timeouts) applied to every new socket
//! - A precise error taxonomy separating "not open", "already open",
//!   configuration mistakes, timeouts and end of stream

pub mod transport;

pub use transport::{
    ConnectionFactory, SocketConfig, SocketTransport, TcpConnector, TransportError,
    TransportErrorKind,
};
