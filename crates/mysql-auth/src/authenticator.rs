//! Builds the client's side of the login and change-user handshakes.

use bytes::Bytes;
use mysql_protocol::{Capabilities, ChangeUser, HandshakeResponse, InitialHandshake};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::exchange::AuthExchange;
use crate::method::AuthMethod;

/// Password authenticator for MySQL logins.
///
/// Pure: it turns server handshakes into response payloads and leaves all
/// IO to the caller.
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Credentials,
    allow_cleartext: bool,
}

impl Authenticator {
    /// Create an authenticator. Cleartext passwords are refused unless
    /// enabled with [`allow_cleartext`](Self::allow_cleartext).
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            allow_cleartext: false,
        }
    }

    /// Allow the `mysql_clear_password` plugin.
    #[must_use]
    pub fn allow_cleartext(mut self, allow: bool) -> Self {
        self.allow_cleartext = allow;
        self
    }

    /// The credentials in use.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Answer the server's initial handshake.
    ///
    /// Returns the response to send and the plugin it was computed with.
    /// A server plugin this client does not know falls back to
    /// `mysql_native_password`; the server will then request a switch.
    pub fn handshake_response(
        &self,
        handshake: &InitialHandshake,
        database: Option<&str>,
        collation: u8,
        max_packet_size: u32,
    ) -> Result<(HandshakeResponse, AuthMethod), AuthError> {
        if !handshake
            .capabilities
            .contains(Capabilities::PROTOCOL_41 | Capabilities::SECURE_CONNECTION)
        {
            return Err(AuthError::UnsupportedMethod(
                "pre-4.1 authentication".into(),
            ));
        }

        let database = database.filter(|db| !db.is_empty());
        let capabilities = Capabilities::negotiate(handshake.capabilities, database.is_some());

        let method = match handshake.auth_plugin.as_deref() {
            Some(name) => AuthMethod::from_plugin_name(name, self.allow_cleartext)
                .unwrap_or(AuthMethod::NativePassword),
            None => AuthMethod::NativePassword,
        };
        let auth_response = method.respond(&self.credentials, &handshake.seed)?;

        tracing::debug!(
            username = self.credentials.username(),
            connection_id = handshake.connection_id,
            method = method.plugin_name(),
            capabilities = capabilities.bits(),
            "building handshake response"
        );

        let response = HandshakeResponse {
            capabilities,
            max_packet_size,
            collation,
            username: self.credentials.username().to_string(),
            auth_response,
            database: database.map(str::to_string),
            auth_plugin: capabilities
                .contains(Capabilities::PLUGIN_AUTH)
                .then(|| method.plugin_name().to_string()),
        };
        Ok((response, method))
    }

    /// Build a `COM_CHANGE_USER` request against the connection's seed.
    pub fn change_user(
        &self,
        seed: &[u8],
        database: Option<&str>,
        collation: u8,
        capabilities: Capabilities,
    ) -> Result<ChangeUser, AuthError> {
        let auth_response = AuthMethod::NativePassword.respond(&self.credentials, seed)?;
        Ok(ChangeUser {
            username: self.credentials.username().to_string(),
            auth_response,
            database: database.filter(|db| !db.is_empty()).map(str::to_string),
            collation,
            auth_plugin: capabilities
                .contains(Capabilities::PLUGIN_AUTH)
                .then(|| AuthMethod::NativePassword.plugin_name().to_string()),
        })
    }

    /// Start the reply exchange for a response computed with `method`.
    #[must_use]
    pub fn exchange(&self, method: AuthMethod) -> AuthExchange {
        AuthExchange::new(self.credentials.clone(), method, self.allow_cleartext)
    }

    /// Response bytes for `method` against `seed`, for callers that build
    /// their own packets.
    pub fn respond(&self, method: AuthMethod, seed: &[u8]) -> Result<Bytes, AuthError> {
        method.respond(&self.credentials, seed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_protocol::StatusFlags;

    fn handshake(plugin: Option<&str>) -> InitialHandshake {
        InitialHandshake {
            server_version: "5.7.44".into(),
            connection_id: 7,
            seed: Bytes::from((1..=20).collect::<Vec<u8>>()),
            capabilities: Capabilities::CLIENT_DEFAULT | Capabilities::CONNECT_WITH_DB,
            collation: 33,
            status: StatusFlags::AUTOCOMMIT,
            auth_plugin: plugin.map(str::to_string),
        }
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_handshake_response_native() {
        let auth = Authenticator::new(Credentials::new("app", "secret"));
        let (response, method) = auth
            .handshake_response(&handshake(Some("mysql_native_password")), Some("shop"), 45, 1 << 24)
            .unwrap();

        assert_eq!(method, AuthMethod::NativePassword);
        assert_eq!(response.username, "app");
        assert_eq!(response.collation, 45);
        assert_eq!(response.database.as_deref(), Some("shop"));
        assert!(response.capabilities.contains(Capabilities::CONNECT_WITH_DB));
        assert_eq!(
            hex(&response.auth_response),
            "b32bb3a583e1340c0a1108d58b1be49781ad8c2f"
        );
        assert_eq!(
            response.auth_plugin.as_deref(),
            Some("mysql_native_password")
        );
    }

    #[test]
    fn test_empty_database_not_sent() {
        let auth = Authenticator::new(Credentials::new("app", "secret"));
        let (response, _) = auth
            .handshake_response(&handshake(None), Some(""), 33, 1 << 24)
            .unwrap();
        assert!(response.database.is_none());
        assert!(!response.capabilities.contains(Capabilities::CONNECT_WITH_DB));
    }

    #[test]
    fn test_unknown_plugin_falls_back_to_native() {
        let auth = Authenticator::new(Credentials::new("app", "secret"));
        let (_, method) = auth
            .handshake_response(&handshake(Some("caching_sha2_password")), None, 33, 1 << 24)
            .unwrap();
        assert_eq!(method, AuthMethod::NativePassword);
    }

    #[test]
    fn test_pre_41_server_rejected() {
        let auth = Authenticator::new(Credentials::new("app", "secret"));
        let mut old = handshake(None);
        old.capabilities = Capabilities::LONG_PASSWORD;
        assert!(matches!(
            auth.handshake_response(&old, None, 33, 1 << 24),
            Err(AuthError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_bad_seed_length() {
        let auth = Authenticator::new(Credentials::new("app", "secret"));
        let mut short = handshake(None);
        short.seed = Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(matches!(
            auth.handshake_response(&short, None, 33, 1 << 24),
            Err(AuthError::InvalidSeed { length: 8 })
        ));
    }

    #[test]
    fn test_change_user() {
        let auth = Authenticator::new(Credentials::new("report", "password"));
        let change = auth
            .change_user(b"abcdefghijklmnopqrst", Some("stats"), 33, Capabilities::CLIENT_DEFAULT)
            .unwrap();
        assert_eq!(change.username, "report");
        assert_eq!(
            hex(&change.auth_response),
            "bfdd49584b917d42c758edd2a7a541f721843041"
        );
        assert_eq!(change.database.as_deref(), Some("stats"));
    }
}
