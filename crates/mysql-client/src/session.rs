//! Session: one authenticated connection to a MySQL server.

use std::sync::Arc;

use bytes::Bytes;
use mysql_auth::{
    AuthError, AuthExchange, AuthMethod, AuthStep, Authenticator, Credentials, PasswordEncoding,
};
use mysql_codec::{CodecError, FrameTransport, LegacyCodec, LegacyConnection, MessageAssembler};
use mysql_protocol::command::{self, Command};
use mysql_protocol::response::ERR_HEADER;
use mysql_protocol::{
    Capabilities, ColumnDefinition, EofPacket, ErrPacket, InitialHandshake, OkPacket,
    ProtocolError, RawRow, Response, StatusFlags, TextEncoding,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::Config;
use crate::error::{Diagnostics, Error, Result};
use crate::liveness::LivenessStrategy;
use crate::row::{Column, Row};
use crate::stream::{BufferedRows, ExecuteResult, StreamedRows};

/// What the server announced in its initial handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server version string.
    pub server_version: String,
    /// Server-side connection (thread) id.
    pub connection_id: u32,
    /// Capabilities the server offered.
    pub capabilities: Capabilities,
    /// Server default collation.
    pub collation: u8,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            server_version: String::new(),
            connection_id: 0,
            capabilities: Capabilities::empty(),
            collation: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Waiting for the next command.
    Ready,
    /// Rows of a result set are still on the wire.
    PendingResult,
    /// A command or row read is between its first write and the end of
    /// its reply. Seen from outside an operation, the caller dropped it
    /// midway and the wire position is unknown.
    InFlight,
    /// Closed explicitly or after a fatal error.
    Closed,
}

/// Outcome of the first reply to a command.
enum Outcome {
    Done(OkPacket),
    Rows(Arc<[Column]>),
}

/// An authenticated MySQL session.
///
/// Commands are strictly sequential: every command's response is fully
/// consumed (or discarded) before the next command is written. Transport
/// failures, framing violations, timeouts and connection-class server
/// errors (`08xxx`) close the session; every later command reports
/// [`Error::SessionClosed`]. So does a command whose future was dropped
/// before its reply was read, for example by an outer
/// `tokio::time::timeout`.
pub struct Session {
    transport: Box<dyn FrameTransport>,
    config: Config,
    authenticator: Authenticator,
    server: ServerInfo,
    seed: Bytes,
    capabilities: Capabilities,
    collation: u8,
    encoding: TextEncoding,
    database: Option<String>,
    status: StatusFlags,
    state: SessionState,
}

impl Session {
    /// Connect to the configured server and authenticate.
    pub async fn open(config: Config) -> Result<Self> {
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = ?config.database,
            "connecting to MySQL server"
        );

        let addr = format!("{}:{}", config.host, config.port);
        let stream = timeout(config.timeouts.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::ConnectTimeout {
                host: config.host.clone(),
                port: config.port,
            })?
            .map_err(|source| Error::Connect {
                host: config.host.clone(),
                port: config.port,
                source,
            })?;

        stream.set_nodelay(true).map_err(|source| Error::Connect {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        Self::open_with_transport(config, stream).await
    }

    /// Authenticate over an already connected byte stream.
    ///
    /// The whole handshake is bounded by the login timeout.
    pub async fn open_with_transport<T>(config: Config, stream: T) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let collation = config.collation()?;
        let codec = LegacyCodec::new().with_max_message_size(config.max_message_size);
        let assembler = MessageAssembler::with_max_message_size(config.max_message_size);
        let transport = Box::new(LegacyConnection::with_codec(stream, codec, assembler));

        let authenticator = Authenticator::new(config.login_credentials())
            .allow_cleartext(config.allow_cleartext_password);
        let mut session = Self {
            transport,
            database: config.database.clone(),
            config,
            authenticator,
            server: ServerInfo::default(),
            seed: Bytes::new(),
            capabilities: Capabilities::empty(),
            collation,
            encoding: TextEncoding::for_collation(u16::from(collation)),
            status: StatusFlags::empty(),
            state: SessionState::Ready,
        };

        let limit = session.config.timeouts.login_timeout;
        match timeout(limit, session.handshake()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                session.state = SessionState::Closed;
                return Err(e);
            }
            Err(_) => return Err(session.timed_out("login", limit)),
        }

        tracing::info!(
            host = %session.config.host,
            connection_id = session.server.connection_id,
            server_version = %session.server.server_version,
            "session established"
        );
        Ok(session)
    }

    async fn handshake(&mut self) -> Result<()> {
        let payload = self.read_payload().await?;
        if payload.first() == Some(&ERR_HEADER) {
            // e.g. "Too many connections" before any handshake
            let err = ErrPacket::decode(payload).map_err(|e| self.protocol(e))?;
            let error = self.server_error(err);
            self.state = SessionState::Closed;
            return Err(error);
        }
        let handshake = InitialHandshake::decode(payload).map_err(|e| self.protocol(e))?;

        tracing::debug!(
            server_version = %handshake.server_version,
            connection_id = handshake.connection_id,
            auth_plugin = ?handshake.auth_plugin,
            "received initial handshake"
        );

        let (response, method) = self
            .authenticator
            .handshake_response(
                &handshake,
                self.database.as_deref(),
                self.collation,
                self.config.max_packet_size,
            )
            .map_err(|source| self.auth_failure(source))?;

        self.capabilities = response.capabilities;
        self.server = ServerInfo {
            server_version: handshake.server_version,
            connection_id: handshake.connection_id,
            capabilities: handshake.capabilities,
            collation: handshake.collation,
        };
        self.seed = handshake.seed;

        self.write_payload(response.encode()).await?;
        let exchange = self.authenticator.exchange(method);
        let ok = self.run_exchange(exchange).await?;
        self.status = ok.status;
        Ok(())
    }

    /// Answer authentication packets until the server accepts or refuses.
    async fn run_exchange(&mut self, mut exchange: AuthExchange) -> Result<OkPacket> {
        loop {
            let payload = self.read_payload().await?;
            match exchange.next(payload) {
                Ok(AuthStep::Complete(ok)) => {
                    self.state = SessionState::Ready;
                    return Ok(ok);
                }
                Ok(AuthStep::Respond(reply)) => self.write_payload(reply).await?,
                Err(source) => {
                    self.state = SessionState::Closed;
                    return Err(self.auth_failure(source));
                }
            }
        }
    }

    /// Server details from the initial handshake.
    #[must_use]
    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    /// Capabilities negotiated for this session.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Collation index sent in the handshake.
    #[must_use]
    pub fn collation(&self) -> u8 {
        self.collation
    }

    /// Current default database, as last set by this session.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Server status from the last completed response.
    #[must_use]
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Text encoding of the connection charset, used for command text.
    #[must_use]
    pub fn text_encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Whether the session has been closed, or abandoned in the middle of
    /// a command.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed | SessionState::InFlight)
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connection context for error reports.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let activity = self.transport.activity();
        Diagnostics {
            host: self.config.host.clone(),
            port: self.config.port,
            last_frame: activity.last_frame(),
            since_last_received: activity.since_last_received(),
            since_last_sent: activity.since_last_sent(),
        }
    }

    /// Run a query and buffer its whole result set.
    ///
    /// A statement that produces no result set yields an empty source.
    pub async fn query(&mut self, sql: &str) -> Result<BufferedRows> {
        self.query_stream(sql).await?.buffer().await
    }

    /// Run a query and read its rows as they are consumed.
    pub async fn query_stream(&mut self, sql: &str) -> Result<StreamedRows<'_>> {
        tracing::debug!(sql = sql, "executing query");
        let payload = command::encode_query(sql, self.encoding).map_err(Error::Encoding)?;
        match self.start_command(payload).await? {
            Outcome::Rows(columns) => Ok(StreamedRows::new(self, columns)),
            Outcome::Done(_) => Ok(StreamedRows::empty(self)),
        }
    }

    /// Run a statement that returns no rows.
    ///
    /// If the statement does produce a result set, its rows are discarded.
    pub async fn execute(&mut self, sql: &str) -> Result<ExecuteResult> {
        tracing::debug!(sql = sql, "executing statement");
        let payload = command::encode_query(sql, self.encoding).map_err(Error::Encoding)?;
        match self.start_command(payload).await? {
            Outcome::Done(ok) => Ok(ExecuteResult::from(ok)),
            Outcome::Rows(_) => {
                let status = self.skip_rows().await?;
                self.finish_result(status).await?;
                Ok(ExecuteResult {
                    status: self.status,
                    ..ExecuteResult::default()
                })
            }
        }
    }

    /// Send `COM_PING`.
    pub async fn ping(&mut self) -> Result<()> {
        self.simple_command(Command::Ping, command::encode_simple(Command::Ping))
            .await
            .map(drop)
    }

    /// Check the server with the configured [`LivenessStrategy`].
    ///
    /// Never fails: any error means the session is not valid.
    pub async fn is_valid(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        let result = match self.config.liveness {
            LivenessStrategy::NativePing => self.ping().await,
            LivenessStrategy::SelectOne => self
                .query(LivenessStrategy::CHECK_QUERY)
                .await
                .map(drop),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, strategy = %self.config.liveness, "liveness check failed");
                false
            }
        }
    }

    /// Change the default database with `COM_INIT_DB`.
    pub async fn use_database(&mut self, database: &str) -> Result<()> {
        let payload = command::encode_init_db(database, self.encoding).map_err(Error::Encoding)?;
        self.simple_command(Command::InitDb, payload).await?;
        self.database = Some(database.to_string());
        Ok(())
    }

    /// Reset session state (variables, temporary tables, transactions)
    /// with `COM_RESET_CONNECTION`.
    pub async fn reset_connection(&mut self) -> Result<()> {
        self.simple_command(
            Command::ResetConnection,
            command::encode_simple(Command::ResetConnection),
        )
        .await
        .map(drop)
    }

    /// Log in as a different user on the same connection with
    /// `COM_CHANGE_USER`.
    ///
    /// The reply is computed against the seed of the original handshake. A
    /// refused change closes the session.
    pub async fn reauthenticate(
        &mut self,
        credentials: Credentials,
        database: Option<&str>,
    ) -> Result<()> {
        self.ensure_open()?;
        let credentials =
            credentials.with_encoding(PasswordEncoding::for_charset(&self.config.charset));
        let authenticator =
            Authenticator::new(credentials).allow_cleartext(self.config.allow_cleartext_password);
        let request = authenticator
            .change_user(&self.seed, database, self.collation, self.capabilities)
            .map_err(|source| self.auth_failure(source))?;

        tracing::debug!(
            username = authenticator.credentials().username(),
            database = ?database,
            "changing user"
        );

        self.send_command(request.encode(self.capabilities)).await?;
        let ok = self
            .run_exchange(authenticator.exchange(AuthMethod::NativePassword))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "change user refused, session closed"))?;

        self.status = ok.status;
        self.authenticator = authenticator;
        self.database = database.filter(|db| !db.is_empty()).map(str::to_string);
        tracing::info!(
            username = self.authenticator.credentials().username(),
            "user changed"
        );
        Ok(())
    }

    /// Send `COM_QUIT` and close the session.
    pub async fn close(mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.drain_pending().await?;
        self.transport.reset_sequence();
        self.write_payload(command::encode_simple(Command::Quit))
            .await?;
        self.state = SessionState::Closed;
        tracing::info!(connection_id = self.server.connection_id, "session closed");
        Ok(())
    }

    /// Read the next row of the pending result set.
    ///
    /// Returns `None` once the terminating EOF has been read; any further
    /// result sets of the same command are then discarded.
    pub(crate) async fn read_row(&mut self, columns: &Arc<[Column]>) -> Result<Option<Row>> {
        self.ensure_open()?;
        if self.state == SessionState::Ready {
            return Ok(None);
        }

        self.state = SessionState::InFlight;
        let payload = self.read_payload().await?;
        if EofPacket::matches(&payload) {
            let eof = EofPacket::decode(payload).map_err(|e| self.protocol(e))?;
            self.finish_result(eof.status).await?;
            return Ok(None);
        }
        if payload.first() == Some(&ERR_HEADER) {
            let err = ErrPacket::decode(payload).map_err(|e| self.protocol(e))?;
            return Err(self.server_error(err));
        }

        let raw = RawRow::decode(payload, columns.len()).map_err(|e| self.protocol(e))?;
        self.state = SessionState::PendingResult;
        Ok(Some(Row::new(raw, Arc::clone(columns))))
    }

    /// Fail if the session is closed. A command left in flight by a
    /// dropped future closes the session here: its reply may still be on
    /// the wire and would be read as the reply to the next command.
    fn ensure_open(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready | SessionState::PendingResult => Ok(()),
            SessionState::Closed => Err(Error::SessionClosed),
            SessionState::InFlight => {
                self.state = SessionState::Closed;
                tracing::warn!(
                    connection_id = self.server.connection_id,
                    "previous command was abandoned before its reply was read, session closed"
                );
                Err(Error::SessionClosed)
            }
        }
    }

    /// Write a command as the first frame of a new exchange.
    async fn send_command(&mut self, payload: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.drain_pending().await?;
        self.transport.reset_sequence();
        self.state = SessionState::InFlight;
        self.write_payload(payload).await
    }

    async fn start_command(&mut self, payload: Bytes) -> Result<Outcome> {
        self.send_command(payload).await?;
        match self.read_response().await? {
            Response::Ok(ok) => {
                self.finish_result(ok.status).await?;
                Ok(Outcome::Done(ok))
            }
            Response::Err(err) => Err(self.server_error(err)),
            Response::ResultSet { column_count } => {
                let columns = self.read_columns(column_count).await?;
                self.state = SessionState::PendingResult;
                Ok(Outcome::Rows(columns))
            }
        }
    }

    /// Send a command that is answered with OK or ERR only.
    async fn simple_command(&mut self, command: Command, payload: Bytes) -> Result<OkPacket> {
        tracing::debug!(command = command.name(), "sending command");
        self.send_command(payload).await?;
        match self.read_response().await? {
            Response::Ok(ok) => {
                self.status = ok.status;
                self.state = SessionState::Ready;
                Ok(ok)
            }
            Response::Err(err) => Err(self.server_error(err)),
            Response::ResultSet { .. } => Err(self.protocol(ProtocolError::Malformed {
                what: "command response",
                reason: format!("{} answered with a result set", command.name()),
            })),
        }
    }

    async fn read_response(&mut self) -> Result<Response> {
        let payload = self.read_payload().await?;
        Response::decode(payload).map_err(|e| self.protocol(e))
    }

    async fn read_columns(&mut self, count: u64) -> Result<Arc<[Column]>> {
        let count = usize::try_from(count).map_err(|_| {
            self.protocol(ProtocolError::Malformed {
                what: "result set header",
                reason: format!("column count {count} out of range"),
            })
        })?;

        let mut columns = Vec::with_capacity(count.min(1024));
        for index in 0..count {
            let payload = self.read_payload().await?;
            let definition = ColumnDefinition::decode(payload).map_err(|e| self.protocol(e))?;
            columns.push(Column::new(index, definition));
        }

        let payload = self.read_payload().await?;
        if !EofPacket::matches(&payload) {
            return Err(self.protocol(ProtocolError::Malformed {
                what: "result set",
                reason: "missing EOF after column definitions".into(),
            }));
        }
        Ok(columns.into())
    }

    /// Record the status closing a result and discard any further results.
    async fn finish_result(&mut self, status: StatusFlags) -> Result<()> {
        self.status = status;
        if status.contains(StatusFlags::MORE_RESULTS_EXISTS) {
            self.drain_more_results().await?;
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Consume rows up to and including the terminating EOF.
    async fn skip_rows(&mut self) -> Result<StatusFlags> {
        self.state = SessionState::InFlight;
        let mut skipped = 0usize;
        loop {
            let payload = self.read_payload().await?;
            if EofPacket::matches(&payload) {
                let eof = EofPacket::decode(payload).map_err(|e| self.protocol(e))?;
                tracing::trace!(rows = skipped, "discarded unread rows");
                return Ok(eof.status);
            }
            if payload.first() == Some(&ERR_HEADER) {
                let err = ErrPacket::decode(payload).map_err(|e| self.protocol(e))?;
                return Err(self.server_error(err));
            }
            skipped += 1;
        }
    }

    async fn drain_more_results(&mut self) -> Result<()> {
        let mut more = true;
        while more {
            more = match self.read_response().await? {
                Response::Ok(ok) => {
                    self.status = ok.status;
                    ok.status.contains(StatusFlags::MORE_RESULTS_EXISTS)
                }
                Response::Err(err) => return Err(self.server_error(err)),
                Response::ResultSet { column_count } => {
                    self.read_columns(column_count).await?;
                    let status = self.skip_rows().await?;
                    self.status = status;
                    status.contains(StatusFlags::MORE_RESULTS_EXISTS)
                }
            };
        }
        Ok(())
    }

    /// Discard whatever is left of an abandoned result set.
    async fn drain_pending(&mut self) -> Result<()> {
        if self.state != SessionState::PendingResult {
            return Ok(());
        }
        tracing::debug!("draining unread result before next command");
        let drained = match self.skip_rows().await {
            Ok(status) => self.finish_result(status).await,
            Err(e) => Err(e),
        };
        match drained {
            // An error belonging to the abandoned command ends it; the
            // session can continue.
            Err(Error::Server { code, message, .. }) if !self.is_closed() => {
                tracing::warn!(code = code, message = %message, "discarded error from abandoned result");
                self.state = SessionState::Ready;
                Ok(())
            }
            other => other,
        }
    }

    async fn read_payload(&mut self) -> Result<Bytes> {
        let limit = self.config.timeouts.command_timeout;
        match timeout(limit, self.transport.read_frame()).await {
            Ok(Ok(frame)) => Ok(frame.payload),
            Ok(Err(e)) => Err(self.fail(e)),
            Err(_) => Err(self.timed_out("read", limit)),
        }
    }

    async fn write_payload(&mut self, payload: Bytes) -> Result<()> {
        let limit = self.config.timeouts.command_timeout;
        let discriminant = self.transport.next_discriminant();
        match timeout(limit, self.transport.write_frame(discriminant, payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.fail(e)),
            Err(_) => Err(self.timed_out("write", limit)),
        }
    }

    fn fail(&mut self, source: CodecError) -> Error {
        let error = Error::from_codec(source, self.diagnostics());
        self.state = SessionState::Closed;
        tracing::warn!(error = %error, "session closed after connection failure");
        error
    }

    fn protocol(&mut self, source: ProtocolError) -> Error {
        self.fail(CodecError::Protocol(source))
    }

    fn timed_out(&mut self, operation: &'static str, limit: std::time::Duration) -> Error {
        self.state = SessionState::Closed;
        tracing::warn!(operation = operation, limit = ?limit, "timed out, session closed");
        Error::Timeout {
            operation,
            limit,
            diagnostics: Box::new(self.diagnostics()),
        }
    }

    fn auth_failure(&self, source: AuthError) -> Error {
        Error::Authentication {
            source,
            diagnostics: Box::new(self.diagnostics()),
        }
    }

    /// An ERR reply ends the current command.
    fn server_error(&mut self, err: ErrPacket) -> Error {
        self.state = SessionState::Ready;
        if err.is_connection_error() {
            self.state = SessionState::Closed;
            tracing::warn!(
                code = err.code,
                sql_state = %err.sql_state,
                "connection-class server error, session closed"
            );
        }
        Error::Server {
            code: err.code,
            sql_state: err.sql_state,
            message: err.message,
            diagnostics: Box::new(self.diagnostics()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connection_id", &self.server.connection_id)
            .field("database", &self.database)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
