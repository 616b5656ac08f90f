//! Socket tuning applied to every channel a transport creates or adopts

use std::time::Duration;

/// Default size of the buffered reader and writer, in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Configuration for a socket transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Connect deadline and blocking read/write timeout. Zero blocks forever.
    pub timeout: Duration,
    /// Capacity of the buffered reader
    pub read_buffer_size: usize,
    /// Capacity of the buffered writer
    pub write_buffer_size: usize,
    /// Disable send coalescing (`TCP_NODELAY`)
    pub no_delay: bool,
    /// `SO_LINGER` value; `None` closes without waiting for unsent data
    pub linger: Option<Duration>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            no_delay: true,
            linger: None,
        }
    }
}

impl SocketConfig {
    /// Configuration with the given timeout and defaults for everything else
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Timeout in the form the socket APIs expect, `None` meaning infinite
    pub fn io_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SocketConfig::default();
        assert_eq!(config.timeout, Duration::ZERO);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.write_buffer_size, 1024);
        assert!(config.no_delay);
        assert!(config.linger.is_none());
    }

    #[test]
    fn test_zero_timeout_is_infinite() {
        assert_eq!(SocketConfig::default().io_timeout(), None);

        let config = SocketConfig::with_timeout(Duration::from_millis(250));
        assert_eq!(config.io_timeout(), Some(Duration::from_millis(250)));
    }
}
