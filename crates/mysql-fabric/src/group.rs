//! Server groups and member selection.

use std::fmt;
use std::str::FromStr;

use crate::error::ShardError;

/// What a member accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMode {
    /// Reads and writes.
    ReadWrite,
    /// Reads only.
    ReadOnly,
    /// No client traffic.
    Offline,
}

impl FromStr for ServerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ_WRITE" | "RW" => Ok(Self::ReadWrite),
            "READ_ONLY" | "RO" => Ok(Self::ReadOnly),
            "OFFLINE" => Ok(Self::Offline),
            _ => Err(format!("unknown server mode: {s}")),
        }
    }
}

/// Replication role of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    /// Replication source.
    Primary,
    /// Replica.
    Secondary,
    /// Standby, not replicating.
    Spare,
    /// Marked failed by the directory.
    Faulty,
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(Self::Primary),
            "SECONDARY" => Ok(Self::Secondary),
            "SPARE" => Ok(Self::Spare),
            "FAULTY" => Ok(Self::Faulty),
            _ => Err(format!("unknown server status: {s}")),
        }
    }
}

/// Kind of work a caller wants a member for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// The read-write member.
    #[default]
    ReadWrite,
    /// A read-only member, falling back to the read-write member.
    ReadOnly,
}

/// A group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Accepted traffic.
    pub mode: ServerMode,
    /// Replication role.
    pub status: ServerStatus,
}

impl Server {
    /// Create a member.
    pub fn new(host: impl Into<String>, port: u16, mode: ServerMode, status: ServerStatus) -> Self {
        Self {
            host: host.into(),
            port,
            mode,
            status,
        }
    }

    /// A read-write primary.
    pub fn primary(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, ServerMode::ReadWrite, ServerStatus::Primary)
    }

    /// A read-only secondary.
    pub fn secondary(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, ServerMode::ReadOnly, ServerStatus::Secondary)
    }

    /// Whether the member may be selected at all.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status != ServerStatus::Faulty && self.mode != ServerMode::Offline
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A named set of servers holding one shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerGroup {
    name: String,
    servers: Vec<Server>,
}

impl ServerGroup {
    /// Create a group with no members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            servers: Vec::new(),
        }
    }

    /// Add a member. Member order is kept.
    #[must_use]
    pub fn with_server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in directory order.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// The live read-write member.
    ///
    /// The first one wins if the directory reports several.
    pub fn read_write(&self) -> Result<&Server, ShardError> {
        let mut writers = self
            .servers
            .iter()
            .filter(|s| s.mode == ServerMode::ReadWrite && s.is_live());
        let Some(selected) = writers.next() else {
            return Err(ShardError::NoReadWriteServer {
                group: self.name.clone(),
            });
        };
        let extra = writers.count();
        if extra > 0 {
            tracing::warn!(
                group = %self.name,
                selected = %selected,
                extra = extra,
                "group has more than one read-write member"
            );
        }
        Ok(selected)
    }

    /// Select a member for the given access mode.
    pub fn select(&self, mode: AccessMode) -> Result<&Server, ShardError> {
        if mode == AccessMode::ReadOnly {
            if let Some(server) = self
                .servers
                .iter()
                .find(|s| s.mode == ServerMode::ReadOnly && s.is_live())
            {
                return Ok(server);
            }
            tracing::debug!(group = %self.name, "no read-only member, using read-write member");
        }
        self.read_write()
    }
}
