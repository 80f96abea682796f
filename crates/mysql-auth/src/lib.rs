//! # mysql-auth
//!
//! Authentication for MySQL connections, isolated from connection logic so
//! the exchange can be tested without a socket.
//!
//! ## Supported Plugins
//!
//! | Plugin | Description |
//! |--------|-------------|
//! | `mysql_native_password` | SHA-1 challenge/response (`scramble411`) |
//! | `mysql_clear_password` | Plain password, only when explicitly allowed |
//!
//! ## Flow
//!
//! ```text
//! InitialHandshake ─► Authenticator::handshake_response ─► server
//! server reply     ─► AuthExchange::next ─► Complete | Respond(bytes)
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod method;
pub mod scramble;

pub use authenticator::Authenticator;
pub use credentials::{Credentials, PasswordEncoding};
pub use error::AuthError;
pub use exchange::{AuthExchange, AuthStep};
pub use method::AuthMethod;
pub use scramble::{SCRAMBLE_LENGTH, scramble411, xor_string};
