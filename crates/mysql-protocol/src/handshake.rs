//! Connection-phase packets: initial handshake, handshake response,
//! auth-switch request and `COM_CHANGE_USER`.
//!
//! ```text
//! server -> client  InitialHandshake (protocol 10, seed, capabilities)
//! client -> server  HandshakeResponse (user, scrambled password, db)
//! server -> client  OK | ERR | AuthSwitchRequest
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::capabilities::{Capabilities, StatusFlags};
use crate::codec::{
    read_lenenc_bytes, read_null_terminated, read_null_terminated_string, write_lenenc_bytes,
    write_null_terminated,
};
use crate::command::Command;
use crate::error::ProtocolError;

/// The only handshake protocol version spoken by supported servers.
pub const PROTOCOL_VERSION: u8 = 10;

/// Header byte of an auth-switch request during the connection phase.
pub const AUTH_SWITCH_HEADER: u8 = 0xFE;

/// Length of the first seed fragment in the initial handshake.
const SEED_PART1_LEN: usize = 8;

/// Initial handshake sent by the server (protocol version 10).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialHandshake {
    /// Server version string.
    pub server_version: String,
    /// Server-side connection (thread) id.
    pub connection_id: u32,
    /// Random seed used for password scrambling.
    pub seed: Bytes,
    /// Capabilities advertised by the server.
    pub capabilities: Capabilities,
    /// Server default collation index.
    pub collation: u8,
    /// Server status flags.
    pub status: StatusFlags,
    /// Default authentication plugin, if the server names one.
    pub auth_plugin: Option<String>,
}

impl InitialHandshake {
    /// Parse the initial handshake payload.
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        if !src.has_remaining() {
            return Err(ProtocolError::incomplete(1, 0));
        }
        let protocol_version = src.get_u8();
        if protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedProtocolVersion(protocol_version));
        }

        let server_version = read_null_terminated_string(&mut src, "server version")?;

        // connection id + seed part 1 + filler + capabilities (lower)
        let fixed = 4 + SEED_PART1_LEN + 1 + 2;
        if src.remaining() < fixed {
            return Err(ProtocolError::incomplete(fixed, src.remaining()));
        }
        let connection_id = src.get_u32_le();
        let mut seed = BytesMut::from(&src.split_to(SEED_PART1_LEN)[..]);
        src.advance(1);
        let lower = u32::from(src.get_u16_le());

        // Pre-4.1 servers stop here.
        if !src.has_remaining() {
            return Ok(Self {
                server_version,
                connection_id,
                seed: seed.freeze(),
                capabilities: Capabilities::from_bits_truncate(lower),
                collation: 0,
                status: StatusFlags::empty(),
                auth_plugin: None,
            });
        }

        // collation + status + capabilities (upper) + seed length + reserved
        let extended = 1 + 2 + 2 + 1 + 10;
        if src.remaining() < extended {
            return Err(ProtocolError::incomplete(extended, src.remaining()));
        }
        let collation = src.get_u8();
        let status = StatusFlags::from_bits_truncate(src.get_u16_le());
        let upper = u32::from(src.get_u16_le()) << 16;
        let capabilities = Capabilities::from_bits_truncate(lower | upper);
        let seed_len = usize::from(src.get_u8());
        src.advance(10);

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // Part 2 is max(13, seed_len - 8) bytes; its last byte is a NUL
            // that is not part of the seed.
            let part2_len = seed_len.saturating_sub(SEED_PART1_LEN).max(13);
            if src.remaining() < part2_len {
                return Err(ProtocolError::incomplete(part2_len, src.remaining()));
            }
            let part2 = src.split_to(part2_len);
            let useful = part2
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(part2.len());
            seed.extend_from_slice(&part2[..useful]);
        }

        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) && src.has_remaining()
        {
            // Some servers omit the terminator on the last field.
            let name = match read_null_terminated(&mut src.clone()) {
                Ok(name) => name,
                Err(_) => src.clone(),
            };
            Some(
                String::from_utf8(name.to_vec())
                    .map_err(|_| ProtocolError::InvalidUtf8("auth plugin name"))?,
            )
        } else {
            None
        };

        Ok(Self {
            server_version,
            connection_id,
            seed: seed.freeze(),
            capabilities,
            collation,
            status,
            auth_plugin,
        })
    }

    /// Encode the handshake (server side, used by test servers).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64 + self.server_version.len());
        buf.put_u8(PROTOCOL_VERSION);
        write_null_terminated(&mut buf, self.server_version.as_bytes());
        buf.put_u32_le(self.connection_id);

        let split = self.seed.len().min(SEED_PART1_LEN);
        let mut part1 = [0u8; SEED_PART1_LEN];
        part1[..split].copy_from_slice(&self.seed[..split]);
        buf.put_slice(&part1);
        buf.put_u8(0);

        let caps = self.capabilities.bits();
        buf.put_u16_le((caps & 0xFFFF) as u16);
        buf.put_u8(self.collation);
        buf.put_u16_le(self.status.bits());
        buf.put_u16_le((caps >> 16) as u16);
        buf.put_u8(if self.capabilities.contains(Capabilities::PLUGIN_AUTH) {
            (self.seed.len() + 1) as u8
        } else {
            0
        });
        buf.put_slice(&[0u8; 10]);

        if self.capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let part2 = &self.seed[split..];
            buf.put_slice(part2);
            // pad to 12 bytes then terminate
            for _ in part2.len()..12 {
                buf.put_u8(0);
            }
            buf.put_u8(0);
        }
        if let Some(plugin) = &self.auth_plugin {
            write_null_terminated(&mut buf, plugin.as_bytes());
        }
        buf.freeze()
    }
}

/// Client handshake response (`HandshakeResponse41`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Negotiated capability flags.
    pub capabilities: Capabilities,
    /// Largest packet the client will send.
    pub max_packet_size: u32,
    /// Collation index for the session.
    pub collation: u8,
    /// Login user.
    pub username: String,
    /// Plugin-specific authentication response.
    pub auth_response: Bytes,
    /// Initial database.
    pub database: Option<String>,
    /// Plugin that produced `auth_response`.
    pub auth_plugin: Option<String>,
}

impl HandshakeResponse {
    /// Encode the response payload.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64 + self.username.len() + self.auth_response.len());
        buf.put_u32_le(self.capabilities.bits());
        buf.put_u32_le(self.max_packet_size);
        buf.put_u8(self.collation);
        buf.put_slice(&[0u8; 23]);
        write_null_terminated(&mut buf, self.username.as_bytes());

        if self
            .capabilities
            .contains(Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA)
        {
            write_lenenc_bytes(&mut buf, &self.auth_response);
        } else if self.capabilities.contains(Capabilities::SECURE_CONNECTION) {
            buf.put_u8(self.auth_response.len() as u8);
            buf.put_slice(&self.auth_response);
        } else {
            write_null_terminated(&mut buf, &self.auth_response);
        }

        if self.capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            write_null_terminated(&mut buf, self.database.as_deref().unwrap_or("").as_bytes());
        }
        if self.capabilities.contains(Capabilities::PLUGIN_AUTH) {
            write_null_terminated(
                &mut buf,
                self.auth_plugin.as_deref().unwrap_or("").as_bytes(),
            );
        }
        buf.freeze()
    }

    /// Parse a response payload (server side, used by test servers).
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        let fixed = 4 + 4 + 1 + 23;
        if src.remaining() < fixed {
            return Err(ProtocolError::incomplete(fixed, src.remaining()));
        }
        let capabilities = Capabilities::from_bits_truncate(src.get_u32_le());
        let max_packet_size = src.get_u32_le();
        let collation = src.get_u8();
        src.advance(23);
        let username = read_null_terminated_string(&mut src, "username")?;

        let auth_response = if capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA)
        {
            read_lenenc_bytes(&mut src)?.unwrap_or_default()
        } else if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            if !src.has_remaining() {
                return Err(ProtocolError::incomplete(1, 0));
            }
            let len = usize::from(src.get_u8());
            if src.remaining() < len {
                return Err(ProtocolError::incomplete(len, src.remaining()));
            }
            src.split_to(len)
        } else {
            read_null_terminated(&mut src)?
        };

        let database = if capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            Some(read_null_terminated_string(&mut src, "database")?).filter(|db| !db.is_empty())
        } else {
            None
        };
        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) && src.has_remaining()
        {
            Some(read_null_terminated_string(&mut src, "auth plugin name")?)
        } else {
            None
        };

        Ok(Self {
            capabilities,
            max_packet_size,
            collation,
            username,
            auth_response,
            database,
            auth_plugin,
        })
    }
}

/// Request from the server to continue with a different auth plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchRequest {
    /// Plugin the server wants.
    pub plugin: String,
    /// Plugin data (a fresh seed for scramble-based plugins).
    pub plugin_data: Bytes,
}

impl AuthSwitchRequest {
    /// Parse an auth-switch request, including its `0xFE` header byte.
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        if !src.has_remaining() || src.get_u8() != AUTH_SWITCH_HEADER {
            return Err(ProtocolError::malformed(
                "auth switch request",
                "missing 0xFE header",
            ));
        }
        let plugin = read_null_terminated_string(&mut src, "auth plugin name")?;
        // Scramble-based plugins terminate the seed with a NUL.
        let mut plugin_data = src;
        if plugin_data.last() == Some(&0) {
            plugin_data.truncate(plugin_data.len() - 1);
        }
        Ok(Self {
            plugin,
            plugin_data,
        })
    }

    /// Encode the request (server side, used by test servers).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.plugin.len() + self.plugin_data.len() + 1);
        buf.put_u8(AUTH_SWITCH_HEADER);
        write_null_terminated(&mut buf, self.plugin.as_bytes());
        write_null_terminated(&mut buf, &self.plugin_data);
        buf.freeze()
    }
}

/// `COM_CHANGE_USER` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeUser {
    /// New user.
    pub username: String,
    /// Plugin-specific authentication response.
    pub auth_response: Bytes,
    /// New default database.
    pub database: Option<String>,
    /// Collation index for the session.
    pub collation: u8,
    /// Plugin that produced `auth_response`.
    pub auth_plugin: Option<String>,
}

impl ChangeUser {
    /// Encode the command payload for the negotiated capabilities.
    #[must_use]
    pub fn encode(&self, capabilities: Capabilities) -> Bytes {
        let mut buf = BytesMut::with_capacity(32 + self.username.len() + self.auth_response.len());
        buf.put_u8(Command::ChangeUser as u8);
        write_null_terminated(&mut buf, self.username.as_bytes());
        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            buf.put_u8(self.auth_response.len() as u8);
            buf.put_slice(&self.auth_response);
        } else {
            write_null_terminated(&mut buf, &self.auth_response);
        }
        write_null_terminated(&mut buf, self.database.as_deref().unwrap_or("").as_bytes());
        if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.put_u16_le(u16::from(self.collation));
        }
        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            write_null_terminated(
                &mut buf,
                self.auth_plugin.as_deref().unwrap_or("").as_bytes(),
            );
        }
        buf.freeze()
    }

    /// Parse the command payload (server side, used by test servers).
    pub fn decode(mut src: Bytes, capabilities: Capabilities) -> Result<Self, ProtocolError> {
        if !src.has_remaining() || src.get_u8() != Command::ChangeUser as u8 {
            return Err(ProtocolError::malformed("change user", "wrong command byte"));
        }
        let username = read_null_terminated_string(&mut src, "username")?;
        let auth_response = if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            if !src.has_remaining() {
                return Err(ProtocolError::incomplete(1, 0));
            }
            let len = usize::from(src.get_u8());
            if src.remaining() < len {
                return Err(ProtocolError::incomplete(len, src.remaining()));
            }
            src.split_to(len)
        } else {
            read_null_terminated(&mut src)?
        };
        let database =
            Some(read_null_terminated_string(&mut src, "database")?).filter(|db| !db.is_empty());
        let collation = if capabilities.contains(Capabilities::PROTOCOL_41) && src.remaining() >= 2
        {
            src.get_u16_le() as u8
        } else {
            0
        };
        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) && src.has_remaining()
        {
            Some(read_null_terminated_string(&mut src, "auth plugin name")?)
        } else {
            None
        };
        Ok(Self {
            username,
            auth_response,
            database,
            collation,
            auth_plugin,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_handshake() -> InitialHandshake {
        InitialHandshake {
            server_version: "8.0.36-fabric".into(),
            connection_id: 42,
            seed: Bytes::from_static(b"abcdefghijklmnopqrst"),
            capabilities: Capabilities::CLIENT_DEFAULT | Capabilities::CONNECT_WITH_DB,
            collation: 45,
            status: StatusFlags::AUTOCOMMIT,
            auth_plugin: Some("mysql_native_password".into()),
        }
    }

    #[test]
    fn test_handshake_roundtrip() {
        let handshake = sample_handshake();
        let decoded = InitialHandshake::decode(handshake.encode()).unwrap();
        assert_eq!(decoded, handshake);
        assert_eq!(decoded.seed.len(), 20);
    }

    #[test]
    fn test_handshake_rejects_protocol_9() {
        let err = InitialHandshake::decode(Bytes::from_static(&[9, b'x', 0])).unwrap_err();
        assert_eq!(err, ProtocolError::UnsupportedProtocolVersion(9));
    }

    #[test]
    fn test_handshake_truncated() {
        let encoded = sample_handshake().encode();
        let truncated = encoded.slice(..20);
        assert!(InitialHandshake::decode(truncated).is_err());
    }

    #[test]
    fn test_handshake_response_roundtrip() {
        let response = HandshakeResponse {
            capabilities: Capabilities::CLIENT_DEFAULT | Capabilities::CONNECT_WITH_DB,
            max_packet_size: 16 * 1024 * 1024,
            collation: 33,
            username: "app".into(),
            auth_response: Bytes::from_static(&[7u8; 20]),
            database: Some("orders".into()),
            auth_plugin: Some("mysql_native_password".into()),
        };
        let decoded = HandshakeResponse::decode(response.encode()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_auth_switch_strips_terminator() {
        let request = AuthSwitchRequest {
            plugin: "mysql_native_password".into(),
            plugin_data: Bytes::from_static(b"01234567890123456789"),
        };
        let decoded = AuthSwitchRequest::decode(request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_change_user_roundtrip() {
        let caps = Capabilities::CLIENT_DEFAULT;
        let change = ChangeUser {
            username: "reporting".into(),
            auth_response: Bytes::from_static(&[1u8; 20]),
            database: Some("audit".into()),
            collation: 33,
            auth_plugin: Some("mysql_native_password".into()),
        };
        let decoded = ChangeUser::decode(change.encode(caps), caps).unwrap();
        assert_eq!(decoded, change);
    }
}
