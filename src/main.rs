use anyhow::{bail, Context, Result};
use std::time::Duration;
use tether::{SocketConfig, SocketTransport};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage: tether-probe <host> <port> [timeout_ms] [message]";

/// Command line settings for a single probe
#[derive(Debug, Clone)]
struct ProbeConfig {
    host: String,
    port: u16,
    socket: SocketConfig,
    message: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9090,
            socket: SocketConfig::with_timeout(Duration::from_secs(5)),
            message: "ping".into(),
        }
    }
}

impl ProbeConfig {
    fn from_args(args: &[String]) -> Result<Self> {
        let mut config = ProbeConfig::default();
        match args {
            [host, port, rest @ ..] => {
                config.host = host.clone();
                config.port = port.parse().with_context(|| format!("invalid port: {}", port))?;
                if let Some(timeout) = rest.first() {
                    let ms: u64 = timeout
                        .parse()
                        .with_context(|| format!("invalid timeout: {}", timeout))?;
                    config.socket.timeout = Duration::from_millis(ms);
                }
                if let Some(message) = rest.get(1) {
                    config.message = message.clone();
                }
                if rest.len() > 2 {
                    bail!(USAGE);
                }
            }
            [] => {}
            _ => bail!(USAGE),
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ProbeConfig::from_args(&args)?;

    info!("Probing {}:{}", config.host, config.port);
    info!("  timeout: {:?}", config.socket.timeout);

    let mut transport = SocketTransport::with_config(&config.host, config.port, config.socket.clone());
    transport.open()?;

    transport.write(config.message.as_bytes())?;
    transport.flush()?;

    let mut reply = vec![0u8; config.message.len()];
    transport.read_all(&mut reply)?;
    transport.close();

    println!("{}", String::from_utf8_lossy(&reply));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_defaults_without_args() {
        let config = ProbeConfig::from_args(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.message, "ping");
    }

    #[test]
    fn test_full_args() {
        let config = ProbeConfig::from_args(&args(&["localhost", "7000", "200", "hello"])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 7000);
        assert_eq!(config.socket.timeout, Duration::from_millis(200));
        assert_eq!(config.message, "hello");
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(ProbeConfig::from_args(&args(&["localhost", "http"])).is_err());
        assert!(ProbeConfig::from_args(&args(&["localhost"])).is_err());
    }
}
