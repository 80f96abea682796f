//! Capability and server status flags.

use bitflags::bitflags;

bitflags! {
    /// Client/server capability flags exchanged during the handshake.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// New, more secure passwords.
        const LONG_PASSWORD = 1;
        /// Return found rows instead of affected rows.
        const FOUND_ROWS = 1 << 1;
        /// Get all column flags.
        const LONG_FLAG = 1 << 2;
        /// A database can be named in the handshake response.
        const CONNECT_WITH_DB = 1 << 3;
        /// Compression protocol.
        const COMPRESS = 1 << 5;
        /// `LOAD DATA LOCAL` support.
        const LOCAL_FILES = 1 << 7;
        /// 4.1 protocol (ERR packets carry a SQL state).
        const PROTOCOL_41 = 1 << 9;
        /// Interactive client timeouts.
        const INTERACTIVE = 1 << 10;
        /// Switch to TLS after the handshake.
        const SSL = 1 << 11;
        /// Transaction status in OK packets.
        const TRANSACTIONS = 1 << 13;
        /// 4.1 authentication (length-prefixed auth response).
        const SECURE_CONNECTION = 1 << 15;
        /// Multiple statements per `COM_QUERY`.
        const MULTI_STATEMENTS = 1 << 16;
        /// Multiple result sets.
        const MULTI_RESULTS = 1 << 17;
        /// Multiple result sets for prepared statements.
        const PS_MULTI_RESULTS = 1 << 18;
        /// Pluggable authentication.
        const PLUGIN_AUTH = 1 << 19;
        /// Connection attributes.
        const CONNECT_ATTRS = 1 << 20;
        /// Length-encoded auth response in the handshake response.
        const PLUGIN_AUTH_LENENC_CLIENT_DATA = 1 << 21;
        /// Session state tracking in OK packets.
        const SESSION_TRACK = 1 << 23;
        /// OK packets replace EOF packets.
        const DEPRECATE_EOF = 1 << 24;
    }
}

impl Capabilities {
    /// Flags this client asks for. The negotiated set is the intersection
    /// with what the server advertises.
    pub const CLIENT_DEFAULT: Self = Self::LONG_PASSWORD
        .union(Self::LONG_FLAG)
        .union(Self::PROTOCOL_41)
        .union(Self::TRANSACTIONS)
        .union(Self::SECURE_CONNECTION)
        .union(Self::MULTI_STATEMENTS)
        .union(Self::MULTI_RESULTS)
        .union(Self::PS_MULTI_RESULTS)
        .union(Self::PLUGIN_AUTH)
        .union(Self::PLUGIN_AUTH_LENENC_CLIENT_DATA);

    /// Negotiate against the server's advertised flags.
    ///
    /// `CONNECT_WITH_DB` is requested only when a database is named.
    #[must_use]
    pub fn negotiate(server: Self, with_database: bool) -> Self {
        let mut wanted = Self::CLIENT_DEFAULT;
        if with_database {
            wanted |= Self::CONNECT_WITH_DB;
        }
        wanted & server
    }
}

bitflags! {
    /// Server status flags carried by OK and EOF packets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u16 {
        /// A transaction is active.
        const IN_TRANS = 0x0001;
        /// Autocommit mode is on.
        const AUTOCOMMIT = 0x0002;
        /// Another result set follows.
        const MORE_RESULTS_EXISTS = 0x0008;
        /// No good index was used.
        const NO_GOOD_INDEX_USED = 0x0010;
        /// No index was used.
        const NO_INDEX_USED = 0x0020;
        /// A cursor exists.
        const CURSOR_EXISTS = 0x0040;
        /// Last row of a cursor was sent.
        const LAST_ROW_SENT = 0x0080;
        /// Current database was dropped.
        const DB_DROPPED = 0x0100;
        /// `NO_BACKSLASH_ESCAPES` SQL mode is on.
        const NO_BACKSLASH_ESCAPES = 0x0200;
        /// Result metadata changed.
        const METADATA_CHANGED = 0x0400;
        /// Query was logged as slow.
        const QUERY_WAS_SLOW = 0x0800;
        /// Output parameters follow.
        const PS_OUT_PARAMS = 0x1000;
        /// Read-only transaction is active.
        const IN_TRANS_READONLY = 0x2000;
        /// Session state changed.
        const SESSION_STATE_CHANGED = 0x4000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_is_intersection() {
        let server = Capabilities::PROTOCOL_41
            | Capabilities::SECURE_CONNECTION
            | Capabilities::CONNECT_WITH_DB
            | Capabilities::SSL;
        let negotiated = Capabilities::negotiate(server, false);
        assert!(negotiated.contains(Capabilities::PROTOCOL_41));
        assert!(!negotiated.contains(Capabilities::CONNECT_WITH_DB));
        assert!(!negotiated.contains(Capabilities::SSL));

        let with_db = Capabilities::negotiate(server, true);
        assert!(with_db.contains(Capabilities::CONNECT_WITH_DB));
    }

    #[test]
    fn test_status_truncates_unknown_bits() {
        let status = StatusFlags::from_bits_truncate(0x8000 | 0x0008);
        assert!(status.contains(StatusFlags::MORE_RESULTS_EXISTS));
    }
}
