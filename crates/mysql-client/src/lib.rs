//! # mysql-client
//!
//! Async MySQL session built on the framing, authentication and value
//! crates of this workspace.
//!
//! A [`Session`] owns one connection. Commands run strictly one at a time:
//! each frame is sent and its response fully consumed before the next
//! command is written, which `&mut self` receivers enforce.
//!
//! ## Row Sources
//!
//! ```text
//! Session::query        -> BufferedRows   (bidirectional, random access)
//! Session::query_stream -> StreamedRows   (forward-only, one pass)
//! ```
//!
//! Both implement [`RowSource`]. Moving past either end of a source is an
//! [`Error::OutOfRange`], never a sentinel value.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_client::{Config, RowSource, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_connection_string(
//!         "Server=localhost;Database=shop;User=app;Password=secret",
//!     )?;
//!     let mut session = Session::open(config).await?;
//!
//!     let mut rows = session.query("SELECT id, name FROM customers").await?;
//!     while rows.has_next().await? {
//!         let row = rows.next().await?;
//!         let id: u64 = row.get(0)?;
//!         let name: Option<String> = row.get(1)?;
//!         println!("{id}: {name:?}");
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod liveness;
pub mod row;
pub mod session;
pub mod stream;

pub use config::{Config, TimeoutConfig};
pub use error::{Diagnostics, Error, Result};
pub use liveness::LivenessStrategy;
pub use mysql_auth::{Credentials, PasswordEncoding};
pub use mysql_protocol::{CharsetMap, StatusFlags};
pub use mysql_types::{FromSql, SqlValue};
pub use row::{Column, Row};
pub use session::{ServerInfo, Session};
pub use stream::{BufferedRows, ExecuteResult, RowSource, StreamedRows};
