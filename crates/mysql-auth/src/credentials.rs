//! Credential types for authentication.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

use crate::error::AuthError;

/// How a password string becomes the bytes that are hashed.
///
/// The server hashes the password bytes as they were stored, so the client
/// must use the same encoding the password was set with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordEncoding {
    /// UTF-8 (the server default for `utf8`/`utf8mb4` connections).
    #[default]
    Utf8,
    /// The server's `latin1` charset (Windows-1252).
    Latin1,
}

impl PasswordEncoding {
    /// Pick the encoding that matches a connection charset name.
    #[must_use]
    pub fn for_charset(charset: &str) -> Self {
        if charset.eq_ignore_ascii_case("latin1") || charset.eq_ignore_ascii_case("cp1252") {
            Self::Latin1
        } else {
            Self::Utf8
        }
    }

    /// Encode `password`.
    pub fn encode<'a>(&self, password: &'a str) -> Result<Cow<'a, [u8]>, AuthError> {
        match self {
            Self::Utf8 => Ok(Cow::Borrowed(password.as_bytes())),
            Self::Latin1 => {
                let (bytes, _, unmappable) = WINDOWS_1252.encode(password);
                if unmappable {
                    return Err(AuthError::InvalidCredentials(
                        "password contains characters outside latin1".into(),
                    ));
                }
                Ok(bytes)
            }
        }
    }
}

/// Username and password for a MySQL account.
#[derive(Clone)]
pub struct Credentials {
    username: Cow<'static, str>,
    password: Cow<'static, str>,
    encoding: PasswordEncoding,
}

impl Credentials {
    /// Create credentials with UTF-8 password encoding.
    pub fn new(
        username: impl Into<Cow<'static, str>>,
        password: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            encoding: PasswordEncoding::Utf8,
        }
    }

    /// Set the password encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: PasswordEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Login user.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether the password is empty.
    #[must_use]
    pub fn has_empty_password(&self) -> bool {
        self.password.is_empty()
    }

    /// Password bytes in the configured encoding.
    pub fn password_bytes(&self) -> Result<Cow<'_, [u8]>, AuthError> {
        self.encoding.encode(&self.password)
    }

    /// Configured password encoding.
    #[must_use]
    pub fn encoding(&self) -> PasswordEncoding {
        self.encoding
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("encoding", &self.encoding)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("app", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("app"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_latin1_encoding() {
        let bytes = PasswordEncoding::Latin1.encode("pässwörd").unwrap();
        assert_eq!(&bytes[..], b"p\xe4ssw\xf6rd");
        let utf8 = PasswordEncoding::Utf8.encode("pässwörd").unwrap();
        assert_eq!(utf8.len(), 10);
    }

    #[test]
    fn test_latin1_rejects_unmappable() {
        assert!(matches!(
            PasswordEncoding::Latin1.encode("密码"),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_encoding_for_charset() {
        assert_eq!(PasswordEncoding::for_charset("LATIN1"), PasswordEncoding::Latin1);
        assert_eq!(PasswordEncoding::for_charset("utf8mb4"), PasswordEncoding::Utf8);
    }
}
