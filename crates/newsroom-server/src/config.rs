//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default max body size for REST requests (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default interval between orphaned-thread sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Default age after which an ownerless thread is swept.
pub const DEFAULT_ORPHAN_MAX_AGE: Duration = Duration::from_secs(3600);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// HTTP Basic credentials required on every `/api` route except health.
    pub admin_username: String,
    pub admin_password: String,

    /// Upper bound on one chat turn. `None` lets a turn run until it ends.
    pub turn_timeout: Option<Duration>,

    /// Maximum REST request body size in bytes.
    pub max_body_size: usize,

    /// Run the orphaned-thread sweeper when a store is attached.
    pub cleanup_enabled: bool,
    pub cleanup_interval: Duration,
    pub orphan_max_age: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            turn_timeout: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            cleanup_enabled: true,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            orphan_max_age: DEFAULT_ORPHAN_MAX_AGE,
        }
    }
}

impl ServerConfig {
    /// Create a config with the given admin credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            admin_username: username.into(),
            admin_password: password.into(),
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    /// Set the maximum REST request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Enable or disable the orphaned-thread sweeper.
    pub fn with_cleanup(mut self, enabled: bool) -> Self {
        self.cleanup_enabled = enabled;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_orphan_max_age(mut self, max_age: Duration) -> Self {
        self.orphan_max_age = max_age;
        self
    }
}
