//! Connection factory abstraction for pluggable connection establishment

use socket2::Socket;
use std::io;
use std::time::Duration;

/// Factory for creating connected sockets.
///
/// A transport configured with a factory never dials on its own; it hands the
/// target and timeout to the factory and adopts whatever connected socket
/// comes back. Proxies and custom resolvers plug in here.
pub trait ConnectionFactory: Send + Sync {
    /// Connect to `host:port`, returning a connected socket.
    ///
    /// A zero `timeout` means no connect deadline.
    fn create(&self, host: &str, port: u16, timeout: Duration) -> io::Result<Socket>;

    /// Human-readable name for this factory
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<F> ConnectionFactory for F
where
    F: Fn(&str, u16, Duration) -> io::Result<Socket> + Send + Sync,
{
    fn create(&self, host: &str, port: u16, timeout: Duration) -> io::Result<Socket> {
        self(host, port, timeout)
    }
}
