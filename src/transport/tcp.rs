//! Direct TCP dialing

use crate::transport::traits::ConnectionFactory;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Create an unconnected TCP socket for the given address family
pub fn new_tcp_socket(domain: Domain) -> io::Result<Socket> {
    Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
}

/// Address family of a socket, read back from its local address
pub fn socket_domain(socket: &Socket) -> Option<Domain> {
    socket.local_addr().ok().map(|addr| addr.domain())
}

/// Resolve `host:port` into candidate addresses
pub fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}:{} resolved to no addresses", host, port),
        ));
    }
    Ok(addrs)
}

/// Connect `socket` to `addr`, bounded by `timeout` unless it is zero
pub fn connect_with_deadline(socket: &Socket, addr: SocketAddr, timeout: Duration) -> io::Result<()> {
    let addr = SockAddr::from(addr);
    if timeout.is_zero() {
        socket.connect(&addr)
    } else {
        socket.connect_timeout(&addr, timeout)
    }
}

/// Factory that dials the target directly, trying every resolved address
#[derive(Debug, Clone)]
pub struct TcpConnector {
    name: &'static str,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpConnector {
    /// Create a new direct TCP connector
    pub fn new() -> Self {
        Self { name: "tcp" }
    }

    /// Create a connector that reports a custom name in logs
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl ConnectionFactory for TcpConnector {
    fn create(&self, host: &str, port: u16, timeout: Duration) -> io::Result<Socket> {
        let mut last_err = None;
        for addr in resolve(host, port)? {
            let socket = new_tcp_socket(Domain::for_address(addr))?;
            match connect_with_deadline(&socket, addr, timeout) {
                Ok(()) => return Ok(socket),
                Err(e) => {
                    debug!("[{}] Connect to {} failed: {}", self.name, addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_tcp_connector_names() {
        assert_eq!(TcpConnector::new().name(), "tcp");
        assert_eq!(TcpConnector::named("relay").name(), "relay");
    }

    #[test]
    fn test_connector_connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let socket = TcpConnector::new()
            .create("127.0.0.1", port, Duration::from_secs(2))
            .expect("connect failed");
        let peer = socket.peer_addr().unwrap().as_socket().unwrap();
        assert_eq!(peer.port(), port);
        assert_eq!(socket_domain(&socket), Some(Domain::IPV4));
    }

    #[test]
    fn test_connector_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TcpConnector::new().create("127.0.0.1", port, Duration::from_millis(200));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_literal() {
        let addrs = resolve("127.0.0.1", 8080).unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }
}
