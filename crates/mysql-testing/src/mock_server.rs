//! Mock MySQL server for unit testing.
//!
//! ## Features
//!
//! - Real initial handshake with a fixed seed
//! - `mysql_native_password` verification against configured accounts
//! - Optional auth switch to a fresh seed
//! - Canned responses: OK, result sets, errors, errors mid result set,
//!   multiple result sets, late replies, dropped connections and stalls
//! - Query text and column values in the charset the client negotiated
//! - `COM_PING`, `COM_INIT_DB`, `COM_CHANGE_USER`, `COM_RESET_CONNECTION`
//!   and `COM_QUIT`
//! - A log of every query received, for ordering assertions

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use mysql_auth::scramble411;
use mysql_codec::{CodecError, LegacyConnection};
use mysql_protocol::codec::write_lenenc_int;
use mysql_protocol::{
    AuthSwitchRequest, Capabilities, ChangeUser, ColumnDefinition, ColumnFlags, ColumnType,
    Command, EofPacket, ErrPacket, HandshakeResponse, InitialHandshake, OkPacket,
    ProtocolError, RawRow, StatusFlags, TextEncoding,
};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast};

const NATIVE_PASSWORD: &str = "mysql_native_password";

const COM_QUIT: u8 = Command::Quit as u8;
const COM_INIT_DB: u8 = Command::InitDb as u8;
const COM_QUERY: u8 = Command::Query as u8;
const COM_PING: u8 = Command::Ping as u8;
const COM_CHANGE_USER: u8 = Command::ChangeUser as u8;
const COM_RESET_CONNECTION: u8 = Command::ResetConnection as u8;

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error on a client connection.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The client sent a malformed payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type for mock server operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

/// Mock response configuration.
#[derive(Clone)]
pub enum MockResponse {
    /// OK packet (for INSERT/UPDATE/DELETE and other statements).
    Ok {
        /// Affected rows count.
        affected_rows: u64,
        /// Generated `AUTO_INCREMENT` value.
        last_insert_id: u64,
    },

    /// A result set.
    Rows {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Row data in text form; `None` is NULL.
        rows: Vec<Vec<Option<String>>>,
    },

    /// An ERR packet.
    Error {
        /// Error code.
        code: u16,
        /// SQL state.
        sql_state: String,
        /// Message.
        message: String,
    },

    /// A result set whose rows are cut short by an ERR packet.
    RowsThenError {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Rows sent before the error.
        rows: Vec<Vec<Option<String>>>,
        /// Error code.
        code: u16,
        /// Error message.
        message: String,
    },

    /// Several results; all but the last carry `MORE_RESULTS_EXISTS`.
    Multi(Vec<MockResponse>),

    /// Close the connection without answering.
    Disconnect,

    /// Never answer.
    Stall,

    /// Wait, then send the inner response.
    Delayed(Duration, Box<MockResponse>),

    /// Compute the response from the query text.
    Custom(Arc<dyn Fn(&str) -> MockResponse + Send + Sync>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok {
                affected_rows,
                last_insert_id,
            } => f
                .debug_struct("Ok")
                .field("affected_rows", affected_rows)
                .field("last_insert_id", last_insert_id)
                .finish(),
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", &rows.len())
                .finish(),
            Self::Error { code, message, .. } => f
                .debug_struct("Error")
                .field("code", code)
                .field("message", message)
                .finish(),
            Self::RowsThenError { rows, code, .. } => f
                .debug_struct("RowsThenError")
                .field("rows", &rows.len())
                .field("code", code)
                .finish(),
            Self::Multi(parts) => f.debug_tuple("Multi").field(&parts.len()).finish(),
            Self::Disconnect => f.write_str("Disconnect"),
            Self::Stall => f.write_str("Stall"),
            Self::Delayed(delay, inner) => f.debug_tuple("Delayed").field(delay).field(inner).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// An OK response with no affected rows.
    pub fn ok() -> Self {
        Self::affected(0)
    }

    /// An OK response with an affected rows count.
    pub fn affected(count: u64) -> Self {
        Self::Ok {
            affected_rows: count,
            last_insert_id: 0,
        }
    }

    /// An OK response for an insert that generated an id.
    pub fn inserted(count: u64, last_insert_id: u64) -> Self {
        Self::Ok {
            affected_rows: count,
            last_insert_id,
        }
    }

    /// An error response with SQL state `HY000`.
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::error_with_state(code, "HY000", message)
    }

    /// An error response with an explicit SQL state.
    pub fn error_with_state(
        code: u16,
        sql_state: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Error {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }

    /// A result set.
    pub fn rows(columns: Vec<MockColumn>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// A single-column, single-row result set.
    pub fn scalar(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::rows(vec![MockColumn::varchar(name)], vec![vec![Some(value.into())]])
    }

    /// Send `response` after `delay`.
    pub fn delayed(delay: Duration, response: MockResponse) -> Self {
        Self::Delayed(delay, Box::new(response))
    }

    /// A single `BIGINT` column named `n` holding `0..count`.
    pub fn counting(count: usize) -> Self {
        Self::rows(
            vec![MockColumn::bigint("n")],
            (0..count).map(|i| vec![Some(i.to_string())]).collect(),
        )
    }
}

/// Mock column definition.
#[derive(Debug, Clone)]
pub struct MockColumn {
    /// Column name.
    pub name: String,
    /// Wire column type.
    pub column_type: ColumnType,
    /// Column flags.
    pub flags: ColumnFlags,
    /// Collation index.
    pub collation: u16,
}

impl MockColumn {
    /// Create a new column definition (utf8mb4).
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            flags: ColumnFlags::empty(),
            collation: 45,
        }
    }

    /// Create an INT column.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Long)
    }

    /// Create a BIGINT column.
    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::LongLong)
    }

    /// Create a VARCHAR column.
    pub fn varchar(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::VarString)
    }

    /// Create a DOUBLE column.
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Double)
    }

    /// Create a DATETIME column.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::DateTime)
    }

    /// Add flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the collation.
    #[must_use]
    pub fn with_collation(mut self, collation: u16) -> Self {
        self.collation = collation;
        self
    }

    fn definition(&self) -> ColumnDefinition {
        ColumnDefinition::new(self.name.clone(), self.column_type)
            .with_flags(self.flags)
            .with_collation(self.collation)
    }
}

/// Configuration for the mock server.
pub struct MockServerConfig {
    /// Canned responses by exact query text.
    responses: HashMap<String, MockResponse>,
    /// Response for unmatched queries.
    default_response: MockResponse,
    /// Accounts: username to password.
    users: HashMap<String, String>,
    /// Version string sent in the handshake.
    server_version: String,
    /// Handshake seed.
    seed: Bytes,
    /// Seed for an auth switch after the handshake response, if any.
    switch_seed: Option<Bytes>,
    /// ERR sent instead of the handshake, if any.
    greeting_error: Option<ErrPacket>,
}

impl MockServerConfig {
    fn find_response(&self, sql: &str) -> &MockResponse {
        self.responses.get(sql).unwrap_or(&self.default_response)
    }

    fn verify(&self, username: &str, seed: &[u8], auth_response: &[u8]) -> bool {
        let Some(password) = self.users.get(username) else {
            return false;
        };
        if password.is_empty() {
            return auth_response.is_empty();
        }
        auth_response == scramble411(password.as_bytes(), seed)
    }
}

/// Builder for [`MockMySqlServer`].
pub struct MockServerBuilder {
    config: MockServerConfig,
}

impl MockServerBuilder {
    /// Create a builder with one account, `root` with an empty password.
    pub fn new() -> Self {
        Self {
            config: MockServerConfig {
                responses: HashMap::new(),
                default_response: MockResponse::ok(),
                users: HashMap::from([("root".to_string(), String::new())]),
                server_version: "8.0.36-mock".to_string(),
                seed: Bytes::from_static(b"abcdefghijklmnopqrst"),
                switch_seed: None,
                greeting_error: None,
            },
        }
    }

    /// Add a response for a specific SQL query.
    pub fn with_response(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.config.responses.insert(sql.into(), response);
        self
    }

    /// Set the response for unmatched queries.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.config.default_response = response;
        self
    }

    /// Add an account.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.users.insert(username.into(), password.into());
        self
    }

    /// Set the server version string.
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.config.server_version = version.into();
        self
    }

    /// Set the 20-byte handshake seed.
    pub fn with_seed(mut self, seed: impl Into<Bytes>) -> Self {
        self.config.seed = seed.into();
        self
    }

    /// Request an auth switch to `mysql_native_password` with a new seed.
    pub fn with_auth_switch(mut self, seed: impl Into<Bytes>) -> Self {
        self.config.switch_seed = Some(seed.into());
        self
    }

    /// Greet every connection with an ERR packet instead of a handshake.
    pub fn with_greeting_error(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting_error = Some(ErrPacket::new(code, "HY000", message));
        self
    }

    /// Build and start the mock server.
    pub async fn build(self) -> Result<MockMySqlServer> {
        MockMySqlServer::start(self.config).await
    }
}

impl Default for MockServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A mock MySQL server for testing.
pub struct MockMySqlServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    connection_count: Arc<Mutex<usize>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockMySqlServer {
    /// Create a new builder for the mock server.
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Start the mock server on an available port.
    pub async fn start(config: MockServerConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let config = Arc::new(config);
        let connection_count = Arc::new(Mutex::new(0usize));
        let queries = Arc::new(Mutex::new(Vec::new()));
        let next_id = Arc::new(AtomicU32::new(1));

        let server = Self {
            addr,
            shutdown_tx: shutdown_tx.clone(),
            connection_count: Arc::clone(&connection_count),
            queries: Arc::clone(&queries),
        };

        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _peer_addr)) => {
                                let config = Arc::clone(&config);
                                let count = Arc::clone(&connection_count);
                                let queries = Arc::clone(&queries);
                                let connection_id = next_id.fetch_add(1, Ordering::Relaxed);
                                tokio::spawn(async move {
                                    *count.lock().await += 1;
                                    if let Err(e) = handle_connection(stream, config, connection_id, queries).await {
                                        tracing::debug!(error = %e, "mock connection ended with error");
                                    }
                                    let mut c = count.lock().await;
                                    *c = c.saturating_sub(1);
                                });
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "accept error");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Ok(server)
    }

    /// Get the server's listening address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the host string for connection configuration.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// A client configuration pointing at this server, logged in as `root`.
    pub fn config(&self) -> mysql_client::Config {
        mysql_client::Config::new()
            .host(self.host())
            .port(self.port())
            .credentials(mysql_client::Credentials::new("root", ""))
    }

    /// Get the current connection count.
    pub async fn connection_count(&self) -> usize {
        *self.connection_count.lock().await
    }

    /// Every query received so far, in arrival order.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    /// Stop accepting connections.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for MockMySqlServer {
    fn drop(&mut self) {
        self.stop();
    }
}

type Connection = LegacyConnection<TcpStream>;

async fn handle_connection(
    stream: TcpStream,
    config: Arc<MockServerConfig>,
    connection_id: u32,
    queries: Arc<Mutex<Vec<String>>>,
) -> Result<()> {
    let mut conn = LegacyConnection::new(stream);

    if let Some(err) = &config.greeting_error {
        conn.send_message(err.encode()).await?;
        return Ok(());
    }

    let handshake = InitialHandshake {
        server_version: config.server_version.clone(),
        connection_id,
        seed: config.seed.clone(),
        capabilities: Capabilities::CLIENT_DEFAULT | Capabilities::CONNECT_WITH_DB,
        collation: 45,
        status: StatusFlags::AUTOCOMMIT,
        auth_plugin: Some(NATIVE_PASSWORD.to_string()),
    };
    conn.send_message(handshake.encode()).await?;

    let response = HandshakeResponse::decode(conn.read_message().await?.payload)?;
    let capabilities = response.capabilities;
    let text = TextEncoding::for_collation(u16::from(response.collation));
    let mut seed = config.seed.clone();
    let mut auth_response = response.auth_response.clone();

    if let Some(switch_seed) = &config.switch_seed {
        let request = AuthSwitchRequest {
            plugin: NATIVE_PASSWORD.to_string(),
            plugin_data: switch_seed.clone(),
        };
        conn.send_message(request.encode()).await?;
        auth_response = conn.read_message().await?.payload;
        seed = switch_seed.clone();
    }

    if !config.verify(&response.username, &seed, &auth_response) {
        conn.send_message(access_denied(&response.username)).await?;
        return Ok(());
    }
    send_ok(&mut conn, OkPacket::default()).await?;
    tracing::debug!(connection_id, username = %response.username, "mock login accepted");

    loop {
        conn.reset_sequence();
        let payload = match conn.read_message().await {
            Ok(message) => message.payload,
            Err(CodecError::ConnectionClosed) => break,
            Err(e) => return Err(e.into()),
        };

        match payload.first().copied() {
            Some(COM_QUIT) => break,
            Some(COM_PING | COM_RESET_CONNECTION | COM_INIT_DB) => {
                send_ok(&mut conn, OkPacket::default()).await?;
            }
            Some(COM_QUERY) => {
                let sql = match text.decode(&payload[1..]) {
                    Some(sql) => sql.into_owned(),
                    None => String::from_utf8_lossy(&payload[1..]).into_owned(),
                };
                queries.lock().await.push(sql.clone());
                let response = config.find_response(&sql);
                if !send_response(&mut conn, response, &sql).await? {
                    break;
                }
            }
            Some(COM_CHANGE_USER) => {
                let request = ChangeUser::decode(payload, capabilities)?;
                if config.verify(&request.username, &config.seed, &request.auth_response) {
                    send_ok(&mut conn, OkPacket::default()).await?;
                } else {
                    conn.send_message(access_denied(&request.username)).await?;
                }
            }
            other => {
                let err = ErrPacket::new(
                    1047,
                    "08S01",
                    format!("Unknown command {:?}", other.unwrap_or(0)),
                );
                conn.send_message(err.encode()).await?;
            }
        }
    }

    Ok(())
}

fn access_denied(username: &str) -> Bytes {
    ErrPacket::new(
        1045,
        "28000",
        format!("Access denied for user '{username}'@'localhost' (using password: YES)"),
    )
    .encode()
}

fn status(more: bool) -> StatusFlags {
    if more {
        StatusFlags::AUTOCOMMIT | StatusFlags::MORE_RESULTS_EXISTS
    } else {
        StatusFlags::AUTOCOMMIT
    }
}

async fn send_ok(conn: &mut Connection, mut ok: OkPacket) -> Result<()> {
    ok.status |= StatusFlags::AUTOCOMMIT;
    conn.send_message(ok.encode()).await?;
    Ok(())
}

async fn send_eof(conn: &mut Connection, more: bool) -> Result<()> {
    let eof = EofPacket {
        warnings: 0,
        status: status(more),
    };
    conn.send_message(eof.encode()).await?;
    Ok(())
}

async fn send_header(conn: &mut Connection, columns: &[MockColumn]) -> Result<()> {
    let mut count = BytesMut::new();
    write_lenenc_int(&mut count, columns.len() as u64);
    conn.send_message(count.freeze()).await?;
    for column in columns {
        conn.send_message(column.definition().encode()).await?;
    }
    send_eof(conn, false).await
}

/// Send text rows, each value in its column's charset.
async fn send_rows(
    conn: &mut Connection,
    columns: &[MockColumn],
    rows: &[Vec<Option<String>>],
) -> Result<()> {
    for row in rows {
        let mut values = Vec::with_capacity(row.len());
        for (i, value) in row.iter().enumerate() {
            let collation = columns.get(i).map_or(45, |c| c.collation);
            let encoded = value
                .as_deref()
                .map(|v| TextEncoding::for_collation(collation).encode(v, "column value"))
                .transpose()?;
            values.push(encoded);
        }
        let payload = RawRow::encode(values.iter().map(|v| v.as_deref()));
        conn.send_message(payload).await?;
    }
    Ok(())
}

/// One step of a response on the wire.
enum Step {
    Pause(Duration),
    Send(MockResponse, bool),
}

/// Resolve custom handlers, delays and nested results into the sequence
/// of steps sent on the wire. Each result is paired with its
/// `MORE_RESULTS_EXISTS` bit.
fn flatten(response: &MockResponse, sql: &str, more: bool, out: &mut Vec<Step>) {
    match response {
        MockResponse::Multi(parts) => {
            let last = parts.len().saturating_sub(1);
            for (i, part) in parts.iter().enumerate() {
                flatten(part, sql, more || i < last, out);
            }
        }
        MockResponse::Custom(handler) => flatten(&handler(sql), sql, more, out),
        MockResponse::Delayed(delay, inner) => {
            out.push(Step::Pause(*delay));
            flatten(inner, sql, more, out);
        }
        other => out.push(Step::Send(other.clone(), more)),
    }
}

/// Send the response to a query. Returns `false` when the connection should
/// close.
async fn send_response(conn: &mut Connection, response: &MockResponse, sql: &str) -> Result<bool> {
    let mut steps = Vec::new();
    flatten(response, sql, false, &mut steps);

    for step in steps {
        let (result, more) = match step {
            Step::Pause(delay) => {
                tokio::time::sleep(delay).await;
                continue;
            }
            Step::Send(result, more) => (result, more),
        };
        match result {
            MockResponse::Ok {
                affected_rows,
                last_insert_id,
            } => {
                let ok = OkPacket {
                    affected_rows,
                    last_insert_id,
                    status: status(more),
                    ..OkPacket::default()
                };
                send_ok(conn, ok).await?;
            }
            MockResponse::Rows { columns, rows } => {
                send_header(conn, &columns).await?;
                send_rows(conn, &columns, &rows).await?;
                send_eof(conn, more).await?;
            }
            MockResponse::Error {
                code,
                sql_state,
                message,
            } => {
                conn.send_message(ErrPacket::new(code, sql_state, message).encode())
                    .await?;
                // an error ends the response
                break;
            }
            MockResponse::RowsThenError {
                columns,
                rows,
                code,
                message,
            } => {
                send_header(conn, &columns).await?;
                send_rows(conn, &columns, &rows).await?;
                conn.send_message(ErrPacket::new(code, "HY000", message).encode())
                    .await?;
                break;
            }
            MockResponse::Disconnect => return Ok(false),
            MockResponse::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Ok(false);
            }
            MockResponse::Multi(_) | MockResponse::Custom(_) | MockResponse::Delayed(..) => {}
        }
    }
    Ok(true)
}
