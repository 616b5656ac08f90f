pub mod config;
pub mod error;
pub mod socket;
pub mod tcp;
pub mod traits;

pub use config::{SocketConfig, DEFAULT_BUFFER_SIZE};
pub use error::{TransportError, TransportErrorKind};
pub use socket::SocketTransport;
pub use tcp::TcpConnector;
pub use traits::ConnectionFactory;
