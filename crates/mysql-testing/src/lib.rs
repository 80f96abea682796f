//! # mysql-testing
//!
//! Test infrastructure for the MySQL client and shard director.
//!
//! The [`MockMySqlServer`] speaks the legacy framing dialect over TCP: it
//! sends a real initial handshake, verifies `mysql_native_password`
//! replies against its configured accounts and answers queries from a
//! table of canned responses. No database is required.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_client::{Config, Credentials, Session};
//! use mysql_testing::{MockColumn, MockMySqlServer, MockResponse};
//!
//! #[tokio::test]
//! async fn test_with_mock_server() {
//!     let server = MockMySqlServer::builder()
//!         .with_user("app", "secret")
//!         .with_response(
//!             "SELECT id, name FROM users",
//!             MockResponse::rows(
//!                 vec![MockColumn::bigint("id"), MockColumn::varchar("name")],
//!                 vec![vec![Some("1".into()), Some("Alice".into())]],
//!             ),
//!         )
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let config = server.config().credentials(Credentials::new("app", "secret"));
//!     let mut session = Session::open(config).await.unwrap();
//!     let rows = session.query("SELECT id, name FROM users").await.unwrap();
//!     assert_eq!(rows.len(), 1);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_server;

pub use mock_server::{
    MockColumn, MockMySqlServer, MockResponse, MockServerBuilder, MockServerConfig,
    MockServerError,
};
