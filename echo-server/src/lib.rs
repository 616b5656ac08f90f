//! TCP echo endpoint
//!
//! Every accepted connection gets its own task that writes back each byte it
//! reads until the client closes.

use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Default bind address
pub const DEFAULT_ADDR: &str = "127.0.0.1:9090";

/// Read buffer capacity per connection
const READ_BUFFER_SIZE: usize = 4096;

/// Accept connections forever, echoing each one on its own task
pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    loop {
        let (socket, addr) = listener.accept().await?;
        info!("[Echo] Connection from: {}", addr);

        tokio::spawn(async move {
            match echo(socket).await {
                Ok(total) => info!("[Echo] Client disconnected: {} ({} bytes)", addr, total),
                Err(e) => warn!("[Echo] Connection error from {}: {}", addr, e),
            }
        });
    }
}

/// Echo one connection until EOF, returning the number of bytes echoed
async fn echo(mut socket: TcpStream) -> std::io::Result<u64> {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut total = 0u64;

    loop {
        let n = socket.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        socket.write_all(&buf).await?;
        debug!("[Echo] Echoed {} bytes", n);
        total += n as u64;
        buf.clear();
    }
}

/// Parse the bind address, falling back to [`DEFAULT_ADDR`]
pub fn bind_addr(arg: Option<&str>) -> anyhow::Result<SocketAddr> {
    Ok(arg.unwrap_or(DEFAULT_ADDR).parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr() {
        assert_eq!(bind_addr(None).unwrap().port(), 9090);
        assert_eq!(bind_addr(Some("0.0.0.0:7000")).unwrap().port(), 7000);
        assert!(bind_addr(Some("not-an-addr")).is_err());
    }

    #[tokio::test]
    async fn test_echoes_ping() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"ping").await.unwrap();

        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"ping");
    }

    #[tokio::test]
    async fn test_echo_reports_total_on_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            echo(socket).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello world").await.unwrap();
        let mut reply = [0u8; 11];
        client.read_exact(&mut reply).await.unwrap();
        client.shutdown().await.unwrap();

        let total = server.await.unwrap().unwrap();
        assert_eq!(total, 11);
        assert_eq!(&reply, b"hello world");
    }
}
