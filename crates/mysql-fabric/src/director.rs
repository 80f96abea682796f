//! Routing keys to sessions.

use std::sync::Arc;

use mysql_client::{Config, Session};

use crate::cache::DirectoryCache;
use crate::config::DirectoryConfig;
use crate::directory::Directory;
use crate::error::ShardError;
use crate::group::{AccessMode, Server};

/// Resolves routing keys to group members and opens sessions to them.
///
/// Every session is opened from a copy of the base configuration with only
/// the host and port replaced. One connection attempt is made per call.
#[derive(Debug)]
pub struct ShardDirector {
    cache: DirectoryCache,
    base: Config,
}

impl ShardDirector {
    /// Create a director with default cache configuration.
    pub fn new(directory: Arc<dyn Directory>, base: Config) -> Self {
        Self::with_config(directory, base, DirectoryConfig::default())
    }

    /// Create a director with custom cache configuration.
    pub fn with_config(directory: Arc<dyn Directory>, base: Config, config: DirectoryConfig) -> Self {
        Self {
            cache: DirectoryCache::with_config(directory, config),
            base,
        }
    }

    /// The directory cache.
    #[must_use]
    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    /// Force the next lookup to fetch fresh directory data.
    ///
    /// Call this after a connection failure before retrying, so a promoted
    /// member is picked up.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Select the member serving `key` of a sharded table.
    pub async fn lookup(
        &self,
        database: &str,
        table: &str,
        key: &str,
        mode: AccessMode,
    ) -> Result<(String, Server), ShardError> {
        let snapshot = self.cache.snapshot().await?;
        let group = snapshot.resolve(database, table, key)?;
        let server = group.select(mode)?;
        tracing::debug!(
            database = database,
            table = table,
            group = group.name(),
            server = %server,
            "resolved shard key"
        );
        Ok((group.name().to_string(), server.clone()))
    }

    /// Select the member of the global group for a sharded table.
    pub async fn lookup_global(
        &self,
        database: &str,
        table: &str,
        mode: AccessMode,
    ) -> Result<(String, Server), ShardError> {
        let snapshot = self.cache.snapshot().await?;
        let group = snapshot.resolve_global(database, table)?;
        let server = group.select(mode)?;
        Ok((group.name().to_string(), server.clone()))
    }

    /// Open a session to the member serving `key` of a sharded table.
    pub async fn connect(
        &self,
        database: &str,
        table: &str,
        key: &str,
        mode: AccessMode,
    ) -> Result<Session, ShardError> {
        let (group, server) = self.lookup(database, table, key, mode).await?;
        self.open(group, server).await
    }

    /// Open a session to the global group of a sharded table.
    pub async fn connect_global(
        &self,
        database: &str,
        table: &str,
        mode: AccessMode,
    ) -> Result<Session, ShardError> {
        let (group, server) = self.lookup_global(database, table, mode).await?;
        self.open(group, server).await
    }

    async fn open(&self, group: String, server: Server) -> Result<Session, ShardError> {
        let config = self.base.clone().host(server.host.clone()).port(server.port);
        match Session::open(config).await {
            Ok(session) => Ok(session),
            Err(source) => {
                tracing::warn!(
                    group = %group,
                    server = %server,
                    error = %source,
                    "failed to open session to group member"
                );
                Err(ShardError::Connect {
                    group,
                    host: server.host,
                    port: server.port,
                    source,
                })
            }
        }
    }
}
