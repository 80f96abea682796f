//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The server rejected the credentials.
    #[error("authentication rejected ({code}, {sql_state}): {message}")]
    Rejected {
        /// Server error code.
        code: u16,
        /// SQL state.
        sql_state: String,
        /// Server message, verbatim.
        message: String,
    },

    /// The server's seed has the wrong length.
    #[error("invalid seed length {length}, expected 20 bytes")]
    InvalidSeed {
        /// Length received.
        length: usize,
    },

    /// Credentials cannot be used (e.g. password not representable in the
    /// configured encoding).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The server asked for a plugin this client does not implement.
    #[error("unsupported authentication method: {0}")]
    UnsupportedMethod(String),

    /// The server asked for the cleartext plugin without it being allowed.
    #[error("server requested mysql_clear_password but cleartext passwords are not allowed")]
    CleartextNotAllowed,

    /// A packet arrived that does not belong in the exchange.
    #[error("unexpected packet during authentication: {0}")]
    UnexpectedPacket(String),

    /// A handshake or reply payload could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(#[from] mysql_protocol::ProtocolError),
}

impl AuthError {
    /// Whether the server actively refused the login, as opposed to the
    /// exchange breaking down.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
