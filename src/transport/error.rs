//! Error taxonomy for socket transports

use std::io;
use thiserror::Error;

/// Coarse classification of a [`TransportError`], with stable numeric codes
/// that protocol layers can put on the wire or in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Unknown = 0,
    NotOpen = 1,
    AlreadyOpen = 2,
    TimedOut = 3,
    EndOfFile = 4,
}

impl TransportErrorKind {
    /// Numeric code for this kind
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Unknown => write!(f, "unknown"),
            TransportErrorKind::NotOpen => write!(f, "not open"),
            TransportErrorKind::AlreadyOpen => write!(f, "already open"),
            TransportErrorKind::TimedOut => write!(f, "timed out"),
            TransportErrorKind::EndOfFile => write!(f, "end of file"),
        }
    }
}

/// Errors that can occur while opening or using a transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport not open: {reason}")]
    NotOpen {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("Socket already connected")]
    AlreadyOpen,

    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport timed out: {0}")]
    TimedOut(#[source] io::Error),

    #[error("End of file: peer closed the connection")]
    EndOfFile,

    #[error("Transport I/O error: {0}")]
    Io(#[source] io::Error),
}

impl TransportError {
    /// A `NotOpen` error with no underlying cause
    pub fn not_open(reason: impl Into<String>) -> Self {
        TransportError::NotOpen {
            reason: reason.into(),
            source: None,
        }
    }

    /// A `NotOpen` error wrapping the I/O failure that caused it
    pub fn not_open_with(reason: impl Into<String>, source: io::Error) -> Self {
        TransportError::NotOpen {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Map a read/write failure, separating socket timeouts from other errors.
    ///
    /// A blocking socket whose timeout fires reports `WouldBlock` on Unix and
    /// `TimedOut` on Windows.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::TimedOut(err),
            io::ErrorKind::UnexpectedEof => TransportError::EndOfFile,
            _ => TransportError::Io(err),
        }
    }

    /// Classification of this error.
    ///
    /// Configuration mistakes surface as `NotOpen`: the transport could not
    /// be opened.
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::NotOpen { .. } | TransportError::InvalidConfig(_) => {
                TransportErrorKind::NotOpen
            }
            TransportError::AlreadyOpen => TransportErrorKind::AlreadyOpen,
            TransportError::TimedOut(_) => TransportErrorKind::TimedOut,
            TransportError::EndOfFile => TransportErrorKind::EndOfFile,
            TransportError::Io(_) => TransportErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_codes() {
        assert_eq!(TransportErrorKind::Unknown.code(), 0);
        assert_eq!(TransportErrorKind::NotOpen.code(), 1);
        assert_eq!(TransportErrorKind::AlreadyOpen.code(), 2);
        assert_eq!(TransportErrorKind::TimedOut.code(), 3);
        assert_eq!(TransportErrorKind::EndOfFile.code(), 4);
    }

    #[test]
    fn test_invalid_config_is_not_open_kind() {
        let err = TransportError::InvalidConfig("Cannot open without port".into());
        assert_eq!(err.kind(), TransportErrorKind::NotOpen);
    }

    #[test]
    fn test_from_io_classification() {
        let timeout = TransportError::from_io(io::Error::from(io::ErrorKind::WouldBlock));
        assert_eq!(timeout.kind(), TransportErrorKind::TimedOut);

        let eof = TransportError::from_io(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(eof, TransportError::EndOfFile));

        let reset = TransportError::from_io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(reset.kind(), TransportErrorKind::Unknown);
    }

    #[test]
    fn test_not_open_keeps_source() {
        let err = TransportError::not_open_with(
            "connect failed",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        let source = err.source().expect("missing source");
        assert!(!source.to_string().is_empty());
        assert_eq!(err.to_string(), "Transport not open: connect failed");
    }
}
