//! Error types
//!
//! The relay core never fails as a whole: a broken peer is removed and the
//! remaining peers keep being served. Errors only surface from server
//! bootstrap and from individual peer deliveries.

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug)]
pub enum Error {
    /// Socket or listener failure
    Io(std::io::Error),
    /// The outbound queue of a peer is gone (the peer disconnected)
    PeerClosed(u64),
    /// Invalid server configuration
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::PeerClosed(id) => write!(f, "Peer {} closed", id),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::PeerClosed(_) | Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
