//! Post-handshake authentication exchange.
//!
//! After the handshake response is sent the server answers with OK, ERR or
//! a request to switch plugins. [`AuthExchange`] interprets each reply and
//! says what, if anything, to send next.

use bytes::Bytes;
use mysql_protocol::handshake::AUTH_SWITCH_HEADER;
use mysql_protocol::response::{ERR_HEADER, OK_HEADER};
use mysql_protocol::{AuthSwitchRequest, ErrPacket, OkPacket};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::method::AuthMethod;

/// Header of an "auth more data" packet used by multi-round plugins.
const AUTH_MORE_DATA_HEADER: u8 = 0x01;

/// What the caller does after feeding a server reply to the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Login succeeded.
    Complete(OkPacket),
    /// Send these bytes as the next frame and read another reply.
    Respond(Bytes),
}

/// State of one login or change-user exchange.
#[derive(Debug)]
pub struct AuthExchange {
    credentials: Credentials,
    method: AuthMethod,
    allow_cleartext: bool,
    switched: bool,
}

impl AuthExchange {
    /// Start an exchange whose first response was computed with `method`.
    #[must_use]
    pub fn new(credentials: Credentials, method: AuthMethod, allow_cleartext: bool) -> Self {
        Self {
            credentials,
            method,
            allow_cleartext,
            switched: false,
        }
    }

    /// The plugin currently in use.
    #[must_use]
    pub fn method(&self) -> AuthMethod {
        self.method
    }

    /// Interpret a server reply.
    ///
    /// An auth switch is honoured once; a second one is a protocol
    /// violation.
    pub fn next(&mut self, payload: Bytes) -> Result<AuthStep, AuthError> {
        let Some(&header) = payload.first() else {
            return Err(AuthError::UnexpectedPacket("empty reply".into()));
        };

        match header {
            OK_HEADER => {
                let ok = OkPacket::decode(payload)?;
                tracing::debug!(
                    method = self.method.plugin_name(),
                    switched = self.switched,
                    "authentication complete"
                );
                Ok(AuthStep::Complete(ok))
            }
            ERR_HEADER => {
                let err = ErrPacket::decode(payload)?;
                tracing::debug!(code = err.code, sql_state = %err.sql_state, "authentication rejected");
                Err(AuthError::Rejected {
                    code: err.code,
                    sql_state: err.sql_state,
                    message: err.message,
                })
            }
            AUTH_SWITCH_HEADER if payload.len() == 1 => {
                // Pre-4.1 servers ask for the old password hash this way.
                Err(AuthError::UnsupportedMethod("mysql_old_password".into()))
            }
            AUTH_SWITCH_HEADER => {
                if self.switched {
                    return Err(AuthError::UnexpectedPacket(
                        "second auth switch request".into(),
                    ));
                }
                let request = AuthSwitchRequest::decode(payload)?;
                let method = AuthMethod::from_plugin_name(&request.plugin, self.allow_cleartext)?;
                tracing::debug!(
                    from = self.method.plugin_name(),
                    to = method.plugin_name(),
                    "server requested auth switch"
                );
                let response = method.respond(&self.credentials, &request.plugin_data)?;
                self.method = method;
                self.switched = true;
                Ok(AuthStep::Respond(response))
            }
            AUTH_MORE_DATA_HEADER => Err(AuthError::UnsupportedMethod(format!(
                "{} (additional auth data requested)",
                self.method.plugin_name()
            ))),
            other => Err(AuthError::UnexpectedPacket(format!(
                "reply header 0x{other:02x}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scramble::scramble411;

    fn exchange() -> AuthExchange {
        AuthExchange::new(
            Credentials::new("app", "secret"),
            AuthMethod::NativePassword,
            false,
        )
    }

    fn seed() -> Vec<u8> {
        (1..=20).collect()
    }

    #[test]
    fn test_ok_completes() {
        let ok = OkPacket::default();
        let step = exchange().next(ok.encode()).unwrap();
        assert_eq!(step, AuthStep::Complete(ok));
    }

    #[test]
    fn test_err_is_rejection_with_server_text() {
        let err = ErrPacket::new(1045, "28000", "Access denied for user 'app'");
        let result = exchange().next(err.encode());
        assert!(matches!(
            result,
            Err(AuthError::Rejected { code: 1045, ref sql_state, ref message })
                if sql_state == "28000" && message == "Access denied for user 'app'"
        ));
    }

    #[test]
    fn test_switch_then_ok() {
        let mut exchange = exchange();
        let switch = AuthSwitchRequest {
            plugin: "mysql_native_password".into(),
            plugin_data: Bytes::from(seed()),
        };
        let step = exchange.next(switch.encode()).unwrap();
        let expected = scramble411(b"secret", &seed());
        assert_eq!(step, AuthStep::Respond(Bytes::copy_from_slice(&expected)));

        let step = exchange.next(OkPacket::default().encode()).unwrap();
        assert!(matches!(step, AuthStep::Complete(_)));
    }

    #[test]
    fn test_second_switch_rejected() {
        let mut exchange = exchange();
        let switch = AuthSwitchRequest {
            plugin: "mysql_native_password".into(),
            plugin_data: Bytes::from(seed()),
        };
        exchange.next(switch.encode()).unwrap();
        assert!(matches!(
            exchange.next(switch.encode()),
            Err(AuthError::UnexpectedPacket(_))
        ));
    }

    #[test]
    fn test_switch_to_cleartext_requires_permission() {
        let switch = AuthSwitchRequest {
            plugin: "mysql_clear_password".into(),
            plugin_data: Bytes::new(),
        };
        assert!(matches!(
            exchange().next(switch.encode()),
            Err(AuthError::CleartextNotAllowed)
        ));

        let mut allowed = AuthExchange::new(
            Credentials::new("app", "secret"),
            AuthMethod::NativePassword,
            true,
        );
        let step = allowed.next(switch.encode()).unwrap();
        assert_eq!(step, AuthStep::Respond(Bytes::from_static(b"secret\0")));
        assert_eq!(allowed.method(), AuthMethod::ClearPassword);
    }

    #[test]
    fn test_old_password_switch_unsupported() {
        assert!(matches!(
            exchange().next(Bytes::from_static(&[0xFE])),
            Err(AuthError::UnsupportedMethod(name)) if name == "mysql_old_password"
        ));
    }

    #[test]
    fn test_more_data_unsupported() {
        assert!(matches!(
            exchange().next(Bytes::from_static(&[0x01, 0x03])),
            Err(AuthError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_empty_reply() {
        assert!(matches!(
            exchange().next(Bytes::new()),
            Err(AuthError::UnexpectedPacket(_))
        ));
    }
}
