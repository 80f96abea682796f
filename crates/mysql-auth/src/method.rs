//! Authentication plugins.

use bytes::{BufMut, Bytes, BytesMut};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::scramble::{SCRAMBLE_LENGTH, scramble411};

/// An authentication plugin this client can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// `mysql_native_password`: SHA-1 challenge/response.
    NativePassword,
    /// `mysql_clear_password`: the password itself, NUL-terminated.
    ClearPassword,
}

impl AuthMethod {
    /// Plugin name as sent on the wire.
    #[must_use]
    pub const fn plugin_name(self) -> &'static str {
        match self {
            Self::NativePassword => "mysql_native_password",
            Self::ClearPassword => "mysql_clear_password",
        }
    }

    /// Resolve a server-requested plugin name.
    pub fn from_plugin_name(name: &str, allow_cleartext: bool) -> Result<Self, AuthError> {
        match name {
            "mysql_native_password" => Ok(Self::NativePassword),
            "mysql_clear_password" if allow_cleartext => Ok(Self::ClearPassword),
            "mysql_clear_password" => Err(AuthError::CleartextNotAllowed),
            other => Err(AuthError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Whether the plugin sends the password in the clear.
    #[must_use]
    pub const fn is_cleartext(self) -> bool {
        matches!(self, Self::ClearPassword)
    }

    /// Compute the plugin's response to `seed`.
    pub fn respond(self, credentials: &Credentials, seed: &[u8]) -> Result<Bytes, AuthError> {
        match self {
            Self::NativePassword => {
                if seed.len() != SCRAMBLE_LENGTH {
                    return Err(AuthError::InvalidSeed { length: seed.len() });
                }
                // An empty password is sent as an empty response.
                if credentials.has_empty_password() {
                    return Ok(Bytes::new());
                }
                let password = credentials.password_bytes()?;
                Ok(Bytes::copy_from_slice(&scramble411(&password, seed)))
            }
            Self::ClearPassword => {
                let password = credentials.password_bytes()?;
                let mut buf = BytesMut::with_capacity(password.len() + 1);
                buf.put_slice(&password);
                buf.put_u8(0);
                Ok(buf.freeze())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_plugin_name() {
        assert_eq!(
            AuthMethod::from_plugin_name("mysql_native_password", false).unwrap(),
            AuthMethod::NativePassword
        );
        assert!(matches!(
            AuthMethod::from_plugin_name("mysql_clear_password", false),
            Err(AuthError::CleartextNotAllowed)
        ));
        assert!(matches!(
            AuthMethod::from_plugin_name("caching_sha2_password", true),
            Err(AuthError::UnsupportedMethod(name)) if name == "caching_sha2_password"
        ));
    }

    #[test]
    fn test_native_rejects_short_seed() {
        let creds = Credentials::new("app", "secret");
        assert!(matches!(
            AuthMethod::NativePassword.respond(&creds, &[1u8; 8]),
            Err(AuthError::InvalidSeed { length: 8 })
        ));
    }

    #[test]
    fn test_native_empty_password() {
        let creds = Credentials::new("app", "");
        let seed = [7u8; 20];
        assert!(AuthMethod::NativePassword.respond(&creds, &seed).unwrap().is_empty());
    }

    #[test]
    fn test_clear_password_is_nul_terminated() {
        let creds = Credentials::new("app", "secret");
        let response = AuthMethod::ClearPassword.respond(&creds, &[]).unwrap();
        assert_eq!(&response[..], b"secret\0");
    }
}
