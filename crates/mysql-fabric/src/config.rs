//! Directory cache configuration.

use std::time::Duration;

/// Configuration for the directory cache.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DirectoryConfig {
    /// How long a snapshot is used before it is refreshed.
    pub ttl: Duration,
    /// Upper bound on one directory fetch.
    pub refresh_timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            refresh_timeout: Duration::from_secs(10),
        }
    }
}

impl DirectoryConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot time-to-live.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the fetch timeout.
    #[must_use]
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }
}
