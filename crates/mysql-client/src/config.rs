//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use mysql_auth::{Credentials, PasswordEncoding};
use mysql_protocol::CharsetMap;
use mysql_protocol::packet::DEFAULT_MAX_MESSAGE_SIZE;

use crate::error::Error;
use crate::liveness::LivenessStrategy;

/// Timeouts for the blocking phases of a session.
///
/// An elapsed timeout closes the session; a partially read frame is never
/// reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Time to establish the TCP connection (default: 15s).
    pub connect_timeout: Duration,
    /// Time to complete the handshake and authentication (default: 30s).
    pub login_timeout: Duration,
    /// Time for one command round trip (default: 30s).
    pub command_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            login_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TCP connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the login timeout.
    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set the command timeout.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Total time allowed to open a session (TCP + login).
    #[must_use]
    pub fn total_connect_timeout(&self) -> Duration {
        self.connect_timeout + self.login_timeout
    }
}

/// Configuration for opening a [`Session`](crate::Session).
///
/// This struct is marked `#[non_exhaustive]`; construct it with
/// [`Config::default()`] or [`Config::from_connection_string()`] and the
/// chained setters.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Server hostname or IP address.
    pub host: String,

    /// Server port (default: 3306).
    pub port: u16,

    /// Initial database.
    pub database: Option<String>,

    /// Login credentials. The password encoding is taken from `charset`
    /// when the session logs in; see [`Config::login_credentials`].
    pub credentials: Credentials,

    /// Connection charset name (default: `utf8mb4`).
    pub charset: String,

    /// Charset name to collation index table, shared read-only between
    /// sessions.
    pub charset_map: Arc<CharsetMap>,

    /// Whether `mysql_clear_password` may be used when the server asks.
    pub allow_cleartext_password: bool,

    /// Max packet size announced in the handshake response.
    pub max_packet_size: u32,

    /// Ceiling on a reassembled message, in either direction.
    pub max_message_size: usize,

    /// Timeouts.
    pub timeouts: TimeoutConfig,

    /// Liveness check used by `is_valid`.
    pub liveness: LivenessStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: None,
            credentials: Credentials::new("", ""),
            charset: "utf8mb4".to_string(),
            charset_map: Arc::new(CharsetMap::default()),
            allow_cleartext_password: false,
            max_packet_size: DEFAULT_MAX_MESSAGE_SIZE as u32,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            timeouts: TimeoutConfig::default(),
            liveness: LivenessStrategy::default(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1"
}

fn parse_secs(value: &str) -> Result<Duration, Error> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Config(format!("invalid timeout: {value}")))
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// Keys are case-insensitive:
    /// ```text
    /// Server=db1:3306;Database=shop;User=app;Password=secret;CharacterEncoding=latin1;
    /// ConnectTimeout=5;CommandTimeout=30;Liveness=select1;AllowCleartextPasswords=false
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();
        let mut user = String::new();
        let mut password = String::new();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "host" | "data source" => {
                    if let Some((host, port)) = value.rsplit_once(':') {
                        config.host = host.to_string();
                        config.port = port
                            .parse()
                            .map_err(|_| Error::Config(format!("invalid port: {port}")))?;
                    } else {
                        config.host = value.to_string();
                    }
                }
                "port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid port: {value}")))?;
                }
                "database" | "initial catalog" => {
                    config.database = (!value.is_empty()).then(|| value.to_string());
                }
                "user" | "user id" | "uid" | "username" => {
                    user = value.to_string();
                }
                "password" | "pwd" => {
                    password = value.to_string();
                }
                "characterencoding" | "charset" | "character set" => {
                    config.charset = value.to_string();
                }
                "connecttimeout" | "connect timeout" | "connection timeout" => {
                    config.timeouts.connect_timeout = parse_secs(value)?;
                }
                "commandtimeout" | "command timeout" => {
                    config.timeouts.command_timeout = parse_secs(value)?;
                }
                "logintimeout" | "login timeout" => {
                    config.timeouts.login_timeout = parse_secs(value)?;
                }
                "liveness" => {
                    config.liveness = value.parse().map_err(Error::Config)?;
                }
                "allowcleartextpasswords" | "allow cleartext passwords" => {
                    config.allow_cleartext_password = parse_bool(value);
                }
                "maxpacketsize" | "max packet size" => {
                    config.max_packet_size = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid packet size: {value}")))?;
                }
                _ => {
                    // Ignore unknown options for forward compatibility
                    tracing::debug!(key = key, "ignoring unknown connection string option");
                }
            }
        }

        config.credentials = Credentials::new(user, password);
        Ok(config)
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the initial database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the connection charset. The password encoding follows it.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Replace the charset map.
    #[must_use]
    pub fn charset_map(mut self, map: Arc<CharsetMap>) -> Self {
        self.charset_map = map;
        self
    }

    /// Allow the cleartext password plugin.
    #[must_use]
    pub fn allow_cleartext_password(mut self, allow: bool) -> Self {
        self.allow_cleartext_password = allow;
        self
    }

    /// Set the reassembled message ceiling.
    #[must_use]
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the command timeout.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.command_timeout = timeout;
        self
    }

    /// Set the liveness strategy.
    #[must_use]
    pub fn liveness(mut self, strategy: LivenessStrategy) -> Self {
        self.liveness = strategy;
        self
    }

    /// The credentials used to log in, with the password encoded in the
    /// connection charset.
    #[must_use]
    pub fn login_credentials(&self) -> Credentials {
        self.credentials
            .clone()
            .with_encoding(PasswordEncoding::for_charset(&self.charset))
    }

    /// Resolve the handshake collation byte for the configured charset.
    pub fn collation(&self) -> Result<u8, Error> {
        self.charset_map
            .resolve(&self.charset)
            .map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3306);
        assert_eq!(config.charset, "utf8mb4");
        assert_eq!(config.collation().unwrap(), 45);
        assert!(!config.allow_cleartext_password);
    }

    #[test]
    fn test_connection_string() {
        let config = Config::from_connection_string(
            "Server=db1.internal:3307; Database=shop; User=app; Password=s3cr=t; \
             CharacterEncoding=latin1; ConnectTimeout=5; CommandTimeout=60; Liveness=select1",
        )
        .unwrap();
        assert_eq!(config.host, "db1.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.database.as_deref(), Some("shop"));
        assert_eq!(config.credentials.username(), "app");
        assert_eq!(&config.credentials.password_bytes().unwrap()[..], b"s3cr=t");
        assert_eq!(config.login_credentials().encoding(), PasswordEncoding::Latin1);
        assert_eq!(config.timeouts.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.timeouts.command_timeout, Duration::from_secs(60));
        assert_eq!(config.liveness, LivenessStrategy::SelectOne);
        assert_eq!(config.collation().unwrap(), 8);
    }

    #[test]
    fn test_connection_string_errors() {
        assert!(matches!(
            Config::from_connection_string("Server=db1;Port=abc"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("Server"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("Liveness=sometimes"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_password_encoding_ignores_call_order() {
        let before = Config::new()
            .charset("latin1")
            .credentials(Credentials::new("app", "pässword"));
        let after = Config::new()
            .credentials(Credentials::new("app", "pässword"))
            .charset("latin1");

        for config in [before, after] {
            let credentials = config.login_credentials();
            assert_eq!(credentials.encoding(), PasswordEncoding::Latin1);
            assert_eq!(&credentials.password_bytes().unwrap()[..], b"p\xe4ssword");
        }
    }

    #[test]
    fn test_unmapped_charset_falls_back() {
        let config = Config::new().charset("klingon");
        assert_eq!(config.collation().unwrap(), 33);
    }

    #[test]
    fn test_collation_beyond_one_byte_is_config_error() {
        let map = CharsetMap::default().with("utf8mb4", 309);
        let config = Config::new().charset_map(Arc::new(map));
        assert!(matches!(config.collation(), Err(Error::Config(_))));
    }
}
