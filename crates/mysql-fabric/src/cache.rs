//! Directory snapshot cache.
//!
//! The cache holds an immutable [`DirectorySnapshot`] behind an `Arc`.
//! Readers clone the `Arc` and resolve against it without holding a lock;
//! a refresh builds a new snapshot and swaps it in whole.
//!
//! ## Expiration
//!
//! Snapshots expire after a configurable TTL (default: 5 minutes) and are
//! refreshed on the next lookup. [`DirectoryCache::invalidate`] forces the
//! next lookup to refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::config::DirectoryConfig;
use crate::directory::{Directory, DirectoryDump};
use crate::error::{DirectoryError, ShardError};
use crate::group::ServerGroup;
use crate::mapping::ShardMapping;

/// An immutable view of the directory.
#[derive(Debug)]
pub struct DirectorySnapshot {
    dump: DirectoryDump,
    fetched_at: Instant,
}

impl DirectorySnapshot {
    /// Wrap a validated dump.
    pub fn new(dump: DirectoryDump) -> Result<Self, DirectoryError> {
        dump.validate()?;
        Ok(Self {
            dump,
            fetched_at: Instant::now(),
        })
    }

    /// Time since the snapshot was fetched.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// The mapping sharding a table.
    pub fn mapping_for(&self, database: &str, table: &str) -> Result<&ShardMapping, ShardError> {
        let id = self
            .dump
            .tables
            .get(&(database.to_string(), table.to_string()))
            .ok_or_else(|| ShardError::UnknownTable {
                database: database.to_string(),
                table: table.to_string(),
            })?;
        self.dump
            .mappings
            .get(id)
            .ok_or(ShardError::UnknownMapping(*id))
    }

    /// A group by name.
    pub fn group(&self, name: &str) -> Result<&ServerGroup, ShardError> {
        self.dump
            .groups
            .get(name)
            .ok_or_else(|| ShardError::UnknownGroup(name.to_string()))
    }

    /// The group holding `key` of a sharded table.
    pub fn resolve(
        &self,
        database: &str,
        table: &str,
        key: &str,
    ) -> Result<&ServerGroup, ShardError> {
        let mapping = self.mapping_for(database, table)?;
        self.group(mapping.group_for(key)?)
    }

    /// The global group of the mapping sharding a table.
    pub fn resolve_global(&self, database: &str, table: &str) -> Result<&ServerGroup, ShardError> {
        let mapping = self.mapping_for(database, table)?;
        self.group(mapping.global_group())
    }
}

/// Caching front for a [`Directory`].
pub struct DirectoryCache {
    directory: Arc<dyn Directory>,
    config: DirectoryConfig,
    current: RwLock<Option<Arc<DirectorySnapshot>>>,
    /// Serializes fetches so concurrent lookups share one refresh.
    refreshing: Mutex<()>,
}

impl DirectoryCache {
    /// Create a cache with default configuration.
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self::with_config(directory, DirectoryConfig::default())
    }

    /// Create a cache with custom configuration.
    pub fn with_config(directory: Arc<dyn Directory>, config: DirectoryConfig) -> Self {
        Self {
            directory,
            config,
            current: RwLock::new(None),
            refreshing: Mutex::new(()),
        }
    }

    /// Cache configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn fresh(&self) -> Option<Arc<DirectorySnapshot>> {
        self.current
            .read()
            .as_ref()
            .filter(|snapshot| snapshot.age() < self.config.ttl)
            .cloned()
    }

    /// The current snapshot, refreshing it first if it has expired.
    pub async fn snapshot(&self) -> Result<Arc<DirectorySnapshot>, ShardError> {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let _guard = self.refreshing.lock().await;
        // another caller may have refreshed while we waited
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }
        self.fetch().await
    }

    /// Fetch a new snapshot now, regardless of age.
    pub async fn refresh(&self) -> Result<Arc<DirectorySnapshot>, ShardError> {
        let _guard = self.refreshing.lock().await;
        self.fetch().await
    }

    async fn fetch(&self) -> Result<Arc<DirectorySnapshot>, ShardError> {
        let limit = self.config.refresh_timeout;
        let result = match tokio::time::timeout(limit, self.directory.fetch()).await {
            Ok(fetched) => fetched.and_then(DirectorySnapshot::new),
            Err(_) => Err(DirectoryError::Timeout(limit)),
        };

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.current.write() = Some(Arc::clone(&snapshot));
                tracing::info!(
                    tables = snapshot.dump.tables.len(),
                    groups = snapshot.dump.groups.len(),
                    "directory snapshot refreshed"
                );
                Ok(snapshot)
            }
            Err(e) => {
                if self.current.read().is_some() {
                    tracing::warn!(error = %e, "directory refresh failed, cached snapshot is stale");
                }
                Err(e.into())
            }
        }
    }

    /// Force the next lookup to refresh.
    pub fn invalidate(&self) {
        *self.current.write() = None;
        tracing::debug!("directory snapshot invalidated");
    }
}

impl std::fmt::Debug for DirectoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCache")
            .field("config", &self.config)
            .field("cached", &self.current.read().is_some())
            .finish_non_exhaustive()
    }
}
