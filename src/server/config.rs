//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::relay::hub::DEFAULT_PEER_QUEUE_CAPACITY;

/// Default maximum data-channel message size (10 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum signaling message size (4 MiB)
pub const DEFAULT_SIGNAL_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Host advertised in the broadcaster URL (detected when unset)
    pub public_host: Option<String>,

    /// Scheme advertised in the broadcaster URL
    ///
    /// `https` by default: browsers only grant camera access to pages
    /// served from a secure origin, which a TLS-terminating proxy provides.
    pub public_scheme: String,

    /// Directory holding `index.html`, `broadcast.html` and static assets
    pub static_dir: Option<PathBuf>,

    /// Maximum WebSocket message size on the data channel
    pub max_message_size: usize,

    /// Maximum WebSocket message size on the signaling channel
    pub signal_max_message_size: usize,

    /// Outbound queue length per connection
    pub peer_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8443)),
            public_host: None,
            public_scheme: "https".into(),
            static_dir: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            signal_max_message_size: DEFAULT_SIGNAL_MAX_MESSAGE_SIZE,
            peer_queue_capacity: DEFAULT_PEER_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the advertised host
    pub fn public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into());
        self
    }

    /// Set the advertised scheme
    pub fn public_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.public_scheme = scheme.into();
        self
    }

    /// Serve pages and assets from a directory
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Set the data-channel message size limit
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the signaling message size limit
    pub fn signal_max_message_size(mut self, size: usize) -> Self {
        self.signal_max_message_size = size;
        self
    }

    /// Set the outbound queue length per connection
    pub fn peer_queue_capacity(mut self, capacity: usize) -> Self {
        self.peer_queue_capacity = capacity;
        self
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_message_size == 0 || self.signal_max_message_size == 0 {
            return Err(Error::Config("message size limits must be non-zero".into()));
        }
        if self.peer_queue_capacity == 0 {
            return Err(Error::Config("peer queue capacity must be non-zero".into()));
        }
        if self.public_scheme.is_empty() {
            return Err(Error::Config("public scheme must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8443);
        assert_eq!(config.public_scheme, "https");
        assert_eq!(config.max_message_size, 10 * 1024 * 1024);
        assert_eq!(config.signal_max_message_size, 4 * 1024 * 1024);
        assert_eq!(config.peer_queue_capacity, DEFAULT_PEER_QUEUE_CAPACITY);
        assert!(config.public_host.is_none());
        assert!(config.static_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .public_host("relay.local")
            .public_scheme("http")
            .static_dir("static")
            .max_message_size(1024)
            .signal_max_message_size(512)
            .peer_queue_capacity(8);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.public_host.as_deref(), Some("relay.local"));
        assert_eq!(config.public_scheme, "http");
        assert_eq!(config.static_dir, Some(PathBuf::from("static")));
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.signal_max_message_size, 512);
        assert_eq!(config.peer_queue_capacity, 8);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        assert!(ServerConfig::default().max_message_size(0).validate().is_err());
        assert!(ServerConfig::default().peer_queue_capacity(0).validate().is_err());
        assert!(ServerConfig::default().public_scheme("").validate().is_err());
    }
}
