//! # mysql-fabric
//!
//! Shard routing for sharded MySQL fleets.
//!
//! A routing key is resolved in three steps:
//!
//! 1. The (database, table) pair names a [`ShardMapping`].
//! 2. The mapping turns the key into a server group name.
//! 3. The [`ServerGroup`] yields the member to talk to: the live read-write
//!    member, or for read-only work a secondary.
//!
//! Directory data is fetched through the [`Directory`] trait and kept in a
//! [`DirectoryCache`] as an immutable snapshot that is swapped whole on
//! refresh, so concurrent lookups never see a half-updated mapping.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mysql_client::Config;
//! use mysql_fabric::{AccessMode, ShardDirector, StaticDirectory};
//!
//! let director = ShardDirector::new(Arc::new(StaticDirectory::new(dump)), Config::new());
//! let mut session = director
//!     .connect("shop", "orders", "10042", AccessMode::ReadWrite)
//!     .await?;
//! ```
//!
//! The director opens one session per call and never retries; failover
//! across group members is driven by the caller after
//! [`ShardDirector::invalidate`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod directory;
pub mod director;
pub mod error;
pub mod group;
pub mod mapping;

pub use cache::{DirectoryCache, DirectorySnapshot};
pub use config::DirectoryConfig;
pub use directory::{Directory, DirectoryDump, StaticDirectory};
pub use director::ShardDirector;
pub use error::{DirectoryError, ShardError};
pub use group::{AccessMode, Server, ServerGroup, ServerMode, ServerStatus};
pub use mapping::{MappingKind, ShardMapping, hash_key};
