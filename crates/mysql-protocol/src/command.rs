//! Command-phase payloads (`COM_*`).

use bytes::{BufMut, Bytes, BytesMut};

use crate::collation::TextEncoding;
use crate::error::ProtocolError;

/// Command codes sent as the first payload byte of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Close the connection.
    Quit = 0x01,
    /// Change the default database.
    InitDb = 0x02,
    /// Text-protocol query.
    Query = 0x03,
    /// Liveness check.
    Ping = 0x0E,
    /// Re-authenticate as another user.
    ChangeUser = 0x11,
    /// Reset session state without re-authenticating.
    ResetConnection = 0x1F,
}

impl Command {
    /// Command name as the server documents it.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Quit => "COM_QUIT",
            Self::InitDb => "COM_INIT_DB",
            Self::Query => "COM_QUERY",
            Self::Ping => "COM_PING",
            Self::ChangeUser => "COM_CHANGE_USER",
            Self::ResetConnection => "COM_RESET_CONNECTION",
        }
    }
}

fn with_argument(command: Command, argument: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + argument.len());
    buf.put_u8(command as u8);
    buf.put_slice(argument);
    buf.freeze()
}

/// Encode a `COM_QUERY` payload with the statement in the connection
/// charset.
pub fn encode_query(sql: &str, encoding: TextEncoding) -> Result<Bytes, ProtocolError> {
    let text = encoding.encode(sql, "query")?;
    Ok(with_argument(Command::Query, &text))
}

/// Encode a `COM_INIT_DB` payload with the name in the connection charset.
pub fn encode_init_db(database: &str, encoding: TextEncoding) -> Result<Bytes, ProtocolError> {
    let name = encoding.encode(database, "database name")?;
    Ok(with_argument(Command::InitDb, &name))
}

/// Encode a command that carries no argument (`COM_PING`, `COM_QUIT`, ...).
#[must_use]
pub fn encode_simple(command: Command) -> Bytes {
    with_argument(command, &[])
}
