//! Blocking TCP socket transport
//!
//! A [`SocketTransport`] owns one TCP connection and exposes it as a buffered
//! byte stream. It can adopt an already connected socket, ask a
//! [`ConnectionFactory`] for one, or store a host and port and connect later
//! through [`SocketTransport::open`].
//!
//! The transport is single-owner: everything that can replace the socket
//! takes `&mut self`. Wrap it in a `Mutex` to share it between threads.

use crate::transport::config::SocketConfig;
use crate::transport::error::TransportError;
use crate::transport::tcp;
use crate::transport::traits::ConnectionFactory;
use socket2::{Domain, Socket};
use std::fmt;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Buffered views over one socket
struct Streams {
    reader: BufReader<Socket>,
    writer: BufWriter<Socket>,
}

impl Streams {
    fn new(socket: &Socket, config: &SocketConfig) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::with_capacity(config.read_buffer_size, socket.try_clone()?),
            writer: BufWriter::with_capacity(config.write_buffer_size, socket.try_clone()?),
        })
    }
}

/// The owned OS socket plus its streams, once connected
struct Channel {
    socket: Socket,
    streams: Option<Streams>,
}

impl Channel {
    fn unconnected(socket: Socket) -> Self {
        Self {
            socket,
            streams: None,
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.peer_addr().is_ok()
    }
}

/// Client-side TCP transport over a single connection
pub struct SocketTransport {
    host: Option<String>,
    port: u16,
    config: SocketConfig,
    factory: Option<Box<dyn ConnectionFactory>>,
    channel: Option<Channel>,
}

impl SocketTransport {
    /// Adopt an existing socket.
    ///
    /// The socket is configured right away; if it is already connected the
    /// buffered streams are set up too. A transport built this way has no
    /// host, so it cannot be reopened after `close()`.
    pub fn from_socket(socket: Socket) -> Result<Self, TransportError> {
        Self::from_socket_with_config(socket, SocketConfig::default())
    }

    /// Adopt an existing socket with explicit tuning
    pub fn from_socket_with_config(
        socket: Socket,
        config: SocketConfig,
    ) -> Result<Self, TransportError> {
        configure(&socket, &config);
        let mut transport = Self {
            host: None,
            port: 0,
            config,
            factory: None,
            channel: Some(Channel::unconnected(socket)),
        };
        if transport.is_open() {
            transport.init_streams()?;
        }
        Ok(transport)
    }

    /// Adopt a connected standard library stream
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        Self::from_socket(Socket::from(stream))
    }

    /// Connect through `factory` immediately.
    ///
    /// Fails with `NotOpen` if the factory cannot produce a connection.
    pub fn with_factory<F>(
        factory: F,
        host: impl Into<String>,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, TransportError>
    where
        F: ConnectionFactory + 'static,
    {
        Self::with_factory_config(factory, host, port, SocketConfig::with_timeout(timeout))
    }

    /// Connect through `factory` immediately, with explicit tuning
    pub fn with_factory_config<F>(
        factory: F,
        host: impl Into<String>,
        port: u16,
        config: SocketConfig,
    ) -> Result<Self, TransportError>
    where
        F: ConnectionFactory + 'static,
    {
        let mut transport = Self {
            host: Some(host.into()),
            port,
            config,
            factory: Some(Box::new(factory)),
            channel: None,
        };
        transport.connect_via_factory()?;
        Ok(transport)
    }

    /// Transport that will connect to `host:port` on [`open`](Self::open).
    /// No socket is created yet.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(host, port, SocketConfig::default())
    }

    /// Like [`new`](Self::new), with a connect and read/write timeout
    pub fn with_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self::with_config(host, port, SocketConfig::with_timeout(timeout))
    }

    /// Like [`new`](Self::new), with explicit tuning
    pub fn with_config(host: impl Into<String>, port: u16, config: SocketConfig) -> Self {
        Self {
            host: Some(host.into()),
            port,
            config,
            factory: None,
            channel: None,
        }
    }

    /// Remote host, if this transport was built from a host and port
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Remote port; zero for adopted sockets
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Current timeout. Zero means blocking without limit.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Socket tuning applied to every new socket
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Address of the connected peer
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.channel.as_ref()?.socket.peer_addr().ok()?.as_socket()
    }

    /// Whether a socket exists and is connected
    pub fn is_open(&self) -> bool {
        self.channel.as_ref().is_some_and(Channel::is_connected)
    }

    /// Connect to the configured host and port.
    ///
    /// Host and port are validated before any socket is touched. When a
    /// factory is configured it always produces a fresh connection. On any
    /// failure the transport is left closed.
    pub fn open(&mut self) -> Result<(), TransportError> {
        if self.is_open() {
            return Err(TransportError::AlreadyOpen);
        }

        let host = match self.host.as_deref() {
            None => {
                return Err(TransportError::InvalidConfig(
                    "Transport has no remote host and is not connectable".into(),
                ))
            }
            Some("") => {
                return Err(TransportError::InvalidConfig("Cannot open an empty host".into()))
            }
            Some(host) => host.to_owned(),
        };
        if self.port == 0 {
            return Err(TransportError::InvalidConfig("Cannot open without port".into()));
        }

        if self.factory.is_some() {
            return self.connect_via_factory();
        }

        let addrs = match tcp::resolve(&host, self.port) {
            Ok(addrs) => addrs,
            Err(e) => {
                self.close();
                return Err(TransportError::not_open_with(
                    format!("Could not resolve {}:{}", host, self.port),
                    e,
                ));
            }
        };

        let mut last_err = None;
        for addr in addrs {
            let socket = match self.take_or_create_socket(Domain::for_address(addr)) {
                Ok(socket) => socket,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            match tcp::connect_with_deadline(&socket, addr, self.config.timeout) {
                Ok(()) => {
                    info!("[Socket] Connected to {}", addr);
                    self.channel = Some(Channel::unconnected(socket));
                    return self.init_streams();
                }
                Err(e) => {
                    debug!("[Socket] Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        self.close();
        Err(TransportError::not_open_with(
            format!("Could not connect to {}:{}", host, self.port),
            last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected)),
        ))
    }

    /// The underlying socket, created on first access.
    ///
    /// With a factory this connects and sets up streams. Without one it
    /// creates an unconnected IPv4 socket and does not dial; host and port
    /// are not validated here, that is `open()`'s job.
    pub fn socket(&mut self) -> Result<&Socket, TransportError> {
        Ok(&self.ensure_channel()?.socket)
    }

    /// Change the timeout for future connects, reads and writes.
    ///
    /// Applied to the current socket immediately if there is one, otherwise
    /// remembered for the next socket. An operation already blocked keeps
    /// its old deadline.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
        match &self.channel {
            Some(channel) => {
                if let Err(e) = set_io_timeout(&channel.socket, self.config.io_timeout()) {
                    warn!("[Socket] Could not set socket timeout: {}", e);
                }
            }
            None => warn!(
                "[Socket] No socket yet, timeout of {:?} deferred until one is created",
                timeout
            ),
        }
    }

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `EndOfFile` once the peer has closed and `TimedOut` when the
    /// socket timeout expires.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let streams = self.streams_mut()?;
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match streams.reader.read(buf) {
                Ok(0) => return Err(TransportError::EndOfFile),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::from_io(e)),
            }
        }
    }

    /// Fill `buf` completely, blocking until enough bytes arrive
    pub fn read_all(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut filled = 0;
        while filled < buf.len() {
            filled += self.read(&mut buf[filled..])?;
        }
        Ok(())
    }

    /// Buffer `buf` for sending. Call [`flush`](Self::flush) to push it out.
    pub fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let streams = self.streams_mut()?;
        streams.writer.write_all(buf).map_err(TransportError::from_io)
    }

    /// Push buffered bytes out to the socket
    pub fn flush(&mut self) -> Result<(), TransportError> {
        let streams = self.streams_mut()?;
        streams.writer.flush().map_err(TransportError::from_io)
    }

    /// Release the streams and the socket. Never fails; closing a closed
    /// transport does nothing.
    pub fn close(&mut self) {
        let Some(channel) = self.channel.take() else {
            return;
        };

        if let Some(Streams { reader, mut writer }) = channel.streams {
            if let Err(e) = writer.flush() {
                debug!("[Socket] Dropping unflushed bytes on close: {}", e);
            }
            // into_parts skips the second flush BufWriter would attempt on drop
            let _ = writer.into_parts();
            drop(reader);
        }

        match channel.socket.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => warn!("[Socket] Could not close socket: {}", e),
        }
        debug!("[Socket] Closed");
    }

    fn ensure_channel(&mut self) -> Result<&mut Channel, TransportError> {
        if self.channel.is_none() {
            if self.factory.is_some() {
                self.connect_via_factory()?;
            } else {
                let socket = tcp::new_tcp_socket(Domain::IPV4)
                    .map_err(|e| TransportError::not_open_with("Could not create socket", e))?;
                configure(&socket, &self.config);
                self.channel = Some(Channel::unconnected(socket));
            }
        }
        self.channel
            .as_mut()
            .ok_or_else(|| TransportError::not_open("Socket is not available"))
    }

    /// Reuse the idle socket when it was never connected and its address
    /// family fits, otherwise tear it down and build a new configured one
    fn take_or_create_socket(&mut self, domain: Domain) -> io::Result<Socket> {
        let reusable = self.channel.as_ref().is_some_and(|channel| {
            channel.streams.is_none() && tcp::socket_domain(&channel.socket) == Some(domain)
        });
        if reusable {
            if let Some(channel) = self.channel.take() {
                return Ok(channel.socket);
            }
        }
        if self.channel.is_some() {
            debug!("[Socket] Replacing stale or mismatched socket");
            self.close();
        }
        let socket = tcp::new_tcp_socket(domain)?;
        configure(&socket, &self.config);
        Ok(socket)
    }

    fn connect_via_factory(&mut self) -> Result<(), TransportError> {
        self.close();

        let Some(factory) = self.factory.as_deref() else {
            return Err(TransportError::not_open("No connection factory configured"));
        };
        let host = self.host.as_deref().unwrap_or_default();
        let socket = factory
            .create(host, self.port, self.config.timeout)
            .map_err(|e| {
                TransportError::not_open_with(
                    format!(
                        "{} factory could not connect to {}:{}",
                        factory.name(),
                        host,
                        self.port
                    ),
                    e,
                )
            })?;
        info!(
            "[Socket] Connected to {}:{} via {} factory",
            host,
            self.port,
            factory.name()
        );

        configure(&socket, &self.config);
        self.channel = Some(Channel::unconnected(socket));
        self.init_streams()
    }

    fn init_streams(&mut self) -> Result<(), TransportError> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(TransportError::not_open("Socket is not available"));
        };
        match Streams::new(&channel.socket, &self.config) {
            Ok(streams) => {
                channel.streams = Some(streams);
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(TransportError::not_open_with(
                    "Could not initialize socket streams",
                    e,
                ))
            }
        }
    }

    fn streams_mut(&mut self) -> Result<&mut Streams, TransportError> {
        self.channel
            .as_mut()
            .and_then(|channel| channel.streams.as_mut())
            .ok_or_else(|| TransportError::not_open("Transport is not open"))
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("config", &self.config)
            .field("factory", &self.factory.as_ref().map(|factory| factory.name()))
            .field("open", &self.is_open())
            .finish()
    }
}

/// Apply linger, no-delay and timeout to a fresh socket.
///
/// These are performance tunables: each step runs even if an earlier one
/// failed, and failures are only logged. The socket stays usable with OS
/// defaults.
fn configure(socket: &Socket, config: &SocketConfig) {
    if let Err(e) = socket.set_linger(config.linger) {
        error!("[Socket] Could not configure linger: {}", e);
    }
    if let Err(e) = socket.set_tcp_nodelay(config.no_delay) {
        error!("[Socket] Could not configure no-delay: {}", e);
    }
    if let Err(e) = set_io_timeout(socket, config.io_timeout()) {
        error!("[Socket] Could not configure timeout: {}", e);
    }
}

fn set_io_timeout(socket: &Socket, timeout: Option<Duration>) -> io::Result<()> {
    socket.set_read_timeout(timeout)?;
    socket.set_write_timeout(timeout)
}
