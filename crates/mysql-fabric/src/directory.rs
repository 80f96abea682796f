//! Directory sources.
//!
//! A [`Directory`] answers with the full routing state in one
//! [`DirectoryDump`]. How it talks to a directory service is up to the
//! implementation; [`StaticDirectory`] serves a dump held in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::DirectoryError;
use crate::group::ServerGroup;
use crate::mapping::ShardMapping;

/// Routing state as reported by a directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryDump {
    /// (database, table) to mapping id.
    pub tables: HashMap<(String, String), u32>,
    /// Mappings by id.
    pub mappings: HashMap<u32, ShardMapping>,
    /// Groups by name.
    pub groups: HashMap<String, ServerGroup>,
}

impl DirectoryDump {
    /// Create an empty dump.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sharded table.
    #[must_use]
    pub fn with_table(
        mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        mapping: u32,
    ) -> Self {
        self.tables.insert((database.into(), table.into()), mapping);
        self
    }

    /// Add a mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: ShardMapping) -> Self {
        self.mappings.insert(mapping.id(), mapping);
        self
    }

    /// Add a group.
    #[must_use]
    pub fn with_group(mut self, group: ServerGroup) -> Self {
        self.groups.insert(group.name().to_string(), group);
        self
    }

    /// Check that every reference resolves.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        for ((database, table), id) in &self.tables {
            if !self.mappings.contains_key(id) {
                return Err(DirectoryError::Invalid(format!(
                    "table {database}.{table} refers to unknown mapping {id}"
                )));
            }
        }
        for mapping in self.mappings.values() {
            let global = std::iter::once(mapping.global_group());
            for group in global.chain(mapping.groups()) {
                if !self.groups.contains_key(group) {
                    return Err(DirectoryError::Invalid(format!(
                        "mapping {} refers to unknown group '{group}'",
                        mapping.id()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Source of directory data.
///
/// # Example
///
/// ```rust,ignore
/// struct HttpDirectory {
///     endpoint: String,
/// }
///
/// #[async_trait::async_trait]
/// impl Directory for HttpDirectory {
///     async fn fetch(&self) -> Result<DirectoryDump, DirectoryError> {
///         // query the directory service and build the dump
///     }
/// }
/// ```
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch the current routing state.
    async fn fetch(&self) -> Result<DirectoryDump, DirectoryError>;
}

/// A directory serving an in-memory dump.
///
/// The dump can be replaced to simulate directory changes.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    dump: RwLock<DirectoryDump>,
}

impl StaticDirectory {
    /// Create a directory serving `dump`.
    pub fn new(dump: DirectoryDump) -> Self {
        Self {
            dump: RwLock::new(dump),
        }
    }

    /// Replace the served dump.
    pub fn replace(&self, dump: DirectoryDump) {
        *self.dump.write() = dump;
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn fetch(&self) -> Result<DirectoryDump, DirectoryError> {
        Ok(self.dump.read().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::group::Server;
    use crate::mapping::MappingKind;

    fn dump() -> DirectoryDump {
        DirectoryDump::new()
            .with_table("shop", "orders", 1)
            .with_mapping(
                ShardMapping::new(1, MappingKind::Range, "global")
                    .with_shard("1", "shard-1")
                    .unwrap(),
            )
            .with_group(ServerGroup::new("global").with_server(Server::primary("g", 3306)))
            .with_group(ServerGroup::new("shard-1").with_server(Server::primary("s1", 3306)))
    }

    #[test]
    fn test_validate() {
        dump().validate().unwrap();

        let missing_group = dump().with_mapping(
            ShardMapping::new(2, MappingKind::Range, "global")
                .with_shard("1", "shard-9")
                .unwrap(),
        );
        assert!(matches!(missing_group.validate(), Err(DirectoryError::Invalid(_))));

        let missing_mapping = dump().with_table("shop", "items", 3);
        assert!(missing_mapping.validate().is_err());
    }

    #[tokio::test]
    async fn test_static_directory_replace() {
        let directory = StaticDirectory::new(dump());
        assert_eq!(directory.fetch().await.unwrap().groups.len(), 2);

        directory.replace(DirectoryDump::new());
        assert!(directory.fetch().await.unwrap().groups.is_empty());
    }
}
