//! Client error types.

use std::fmt;
use std::time::Duration;

use mysql_auth::AuthError;
use mysql_codec::{CodecError, FrameInfo};
use mysql_protocol::ProtocolError;
use mysql_types::TypeError;
use thiserror::Error;

/// Where a failure happened: the server attempted and the last traffic
/// seen on the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Last frame exchanged, in either direction.
    pub last_frame: Option<FrameInfo>,
    /// Time since the last frame was received.
    pub since_last_received: Option<Duration>,
    /// Time since the last frame was sent.
    pub since_last_sent: Option<Duration>,
}

impl Diagnostics {
    /// Diagnostics with only the target known.
    #[must_use]
    pub fn for_target(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)?;
        if let Some(frame) = self.last_frame {
            write!(
                f,
                ", last frame {:?} #{} ({} bytes)",
                frame.direction, frame.discriminant, frame.length
            )?;
        }
        if let Some(elapsed) = self.since_last_received {
            write!(f, ", last received {elapsed:?} ago")?;
        }
        Ok(())
    }
}

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The TCP connection could not be established.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The TCP connection was not established within the connect timeout.
    #[error("connection to {host}:{port} timed out")]
    ConnectTimeout {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// The transport failed or closed. The session is unusable.
    #[error("communication failure: {source} ({diagnostics})")]
    Communication {
        /// Underlying transport error.
        source: CodecError,
        /// Connection context.
        diagnostics: Box<Diagnostics>,
    },

    /// The peer sent bytes that violate the framing or message format. The
    /// session is unusable.
    #[error("protocol violation: {source} ({diagnostics})")]
    Framing {
        /// Underlying framing error.
        source: CodecError,
        /// Connection context.
        diagnostics: Box<Diagnostics>,
    },

    /// Authentication failed. No session was established.
    #[error("authentication failed: {source} ({diagnostics})")]
    Authentication {
        /// Underlying authentication error.
        source: AuthError,
        /// Connection context.
        diagnostics: Box<Diagnostics>,
    },

    /// The server reported an error for a command.
    #[error("server error {code} ({sql_state}): {message}")]
    Server {
        /// Server error code.
        code: u16,
        /// SQL state.
        sql_state: String,
        /// Server message, verbatim.
        message: String,
        /// Connection context.
        diagnostics: Box<Diagnostics>,
    },

    /// A blocking operation exceeded its timeout. The session is closed.
    #[error("{operation} timed out after {limit:?} ({diagnostics})")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The configured limit.
        limit: Duration,
        /// Connection context.
        diagnostics: Box<Diagnostics>,
    },

    /// A column value could not be converted.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// A row source cursor was moved or indexed outside its rows.
    #[error("{operation} out of range (position {position:?}, size {size:?})")]
    OutOfRange {
        /// The cursor operation.
        operation: &'static str,
        /// Cursor position when the operation was attempted.
        position: Option<usize>,
        /// Number of rows, when known.
        size: Option<usize>,
    },

    /// The operation is not available on this row source.
    #[error("{0} is not supported on a forward-only row source")]
    NotSupported(&'static str),

    /// Command text cannot be sent in the connection charset.
    #[error("cannot encode command: {0}")]
    Encoding(#[source] ProtocolError),

    /// The session was closed, explicitly or after a fatal error.
    #[error("session is closed")]
    SessionClosed,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify a codec error: transport failures are communication errors,
    /// anything else is a framing violation.
    pub(crate) fn from_codec(source: CodecError, diagnostics: Diagnostics) -> Self {
        let diagnostics = Box::new(diagnostics);
        if source.is_io() || matches!(source, CodecError::ConnectionClosed) {
            Self::Communication {
                source,
                diagnostics,
            }
        } else {
            Self::Framing {
                source,
                diagnostics,
            }
        }
    }

    /// Check if this error is transient and may succeed on retry.
    ///
    /// The engine never retries by itself; this is advice for the caller.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. }
            | Self::ConnectTimeout { .. }
            | Self::Communication { .. }
            | Self::Timeout { .. } => true,
            // 1205: lock wait timeout, 1213: deadlock
            Self::Server { code, sql_state, .. } => {
                matches!(code, 1205 | 1213) || sql_state.starts_with("08")
            }
            _ => false,
        }
    }

    /// Check if this error leaves the session unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Communication { .. }
            | Self::Framing { .. }
            | Self::Authentication { .. }
            | Self::Timeout { .. }
            | Self::SessionClosed => true,
            Self::Server { sql_state, .. } => sql_state.starts_with("08"),
            _ => false,
        }
    }

    /// Check if this is a server error with a specific code.
    #[must_use]
    pub fn is_server_error(&self, code: u16) -> bool {
        matches!(self, Self::Server { code: c, .. } if *c == code)
    }

    /// The SQL state, if the server reported one.
    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Server { sql_state, .. } => Some(sql_state.as_str()),
            Self::Authentication {
                source: AuthError::Rejected { sql_state, .. },
                ..
            } => Some(sql_state.as_str()),
            _ => None,
        }
    }

    /// Connection context, when the failure happened on a connection.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Communication { diagnostics, .. }
            | Self::Framing { diagnostics, .. }
            | Self::Authentication { diagnostics, .. }
            | Self::Server { diagnostics, .. }
            | Self::Timeout { diagnostics, .. } => Some(diagnostics.as_ref()),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
