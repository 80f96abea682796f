//! Shard resolution error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while fetching directory data.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory service could not be reached.
    #[error("directory unreachable: {0}")]
    Unreachable(String),

    /// The directory did not answer in time.
    #[error("directory refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The directory answered with data that cannot be used.
    #[error("invalid directory data: {0}")]
    Invalid(String),
}

/// Errors raised while resolving a routing key to a server.
#[derive(Debug, Error)]
pub enum ShardError {
    /// The group has no live read-write member.
    #[error("no read-write server in group '{group}'")]
    NoReadWriteServer {
        /// Group that was searched.
        group: String,
    },

    /// No mapping is registered for the table.
    #[error("table {database}.{table} is not sharded")]
    UnknownTable {
        /// Database name.
        database: String,
        /// Table name.
        table: String,
    },

    /// A table refers to a mapping the directory does not define.
    #[error("unknown shard mapping {0}")]
    UnknownMapping(u32),

    /// A mapping refers to a group the directory does not define.
    #[error("unknown server group '{0}'")]
    UnknownGroup(String),

    /// The key cannot be interpreted for the mapping kind.
    #[error("invalid shard key '{key}': {reason}")]
    InvalidKey {
        /// Key as given.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The key sorts below every lower bound of a range mapping.
    #[error("no shard of mapping {mapping} holds key '{key}'")]
    NoShardForKey {
        /// Key as given.
        key: String,
        /// Mapping that was searched.
        mapping: u32,
    },

    /// Directory data could not be fetched.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The selected member could not be reached.
    #[error("failed to connect to {host}:{port} in group '{group}': {source}")]
    Connect {
        /// Group the member belongs to.
        group: String,
        /// Member host.
        host: String,
        /// Member port.
        port: u16,
        /// Underlying client error.
        #[source]
        source: mysql_client::Error,
    },
}

impl ShardError {
    /// Check if the directory service itself failed.
    #[must_use]
    pub fn is_directory_error(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Check if this is a communication failure.
    ///
    /// Communication failures may succeed on a later attempt, typically
    /// after [`ShardDirector::invalidate`](crate::ShardDirector::invalidate).
    #[must_use]
    pub fn is_communication_error(&self) -> bool {
        match self {
            Self::Directory(DirectoryError::Unreachable(_) | DirectoryError::Timeout(_)) => true,
            Self::Connect { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// The group this error concerns, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::NoReadWriteServer { group } | Self::Connect { group, .. } => Some(group),
            Self::UnknownGroup(group) => Some(group),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_read_write_names_group() {
        let err = ShardError::NoReadWriteServer {
            group: "shard-2".into(),
        };
        assert!(err.to_string().contains("shard-2"));
        assert_eq!(err.group(), Some("shard-2"));
        assert!(!err.is_directory_error());
        assert!(!err.is_communication_error());
    }

    #[test]
    fn test_directory_errors_are_distinct() {
        let err = ShardError::from(DirectoryError::Unreachable("connection refused".into()));
        assert!(err.is_directory_error());
        assert!(err.is_communication_error());
        assert_eq!(err.group(), None);

        let err = ShardError::from(DirectoryError::Invalid("empty group name".into()));
        assert!(err.is_directory_error());
        assert!(!err.is_communication_error());
    }
}
