//! # mysql-types
//!
//! MySQL column types to Rust type mappings and conversions.
//!
//! Values arrive from the text protocol as raw bytes. [`decode_text`] turns
//! them into a [`SqlValue`] strictly according to the column's declared
//! type and charset, and [`FromSql`] converts a `SqlValue` into the Rust
//! type the caller asks for.
//!
//! ## Features
//!
//! - `chrono` (default): date/time types via chrono
//! - `decimal` (default): exact decimals via rust_decimal
//!
//! ## Type Mappings
//!
//! | MySQL Type | Rust Type |
//! |------------|-----------|
//! | `TINYINT`..`BIGINT` | `i8`..`i64`, `u8`..`u64` when `UNSIGNED` |
//! | `FLOAT` | `f32` |
//! | `DOUBLE` | `f64` |
//! | `DECIMAL` | `rust_decimal::Decimal` |
//! | `DATE` | `chrono::NaiveDate` |
//! | `DATETIME`/`TIMESTAMP` | `chrono::NaiveDateTime` |
//! | `TIME` | `chrono::TimeDelta` (or `NaiveTime` within a day) |
//! | `YEAR` | `u16` |
//! | `BIT(n)` | `u64` |
//! | `CHAR`/`VARCHAR`/`TEXT`/`JSON` | `String` |
//! | `BINARY`/`VARBINARY`/`BLOB` | `Vec<u8>`, `bytes::Bytes` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decode;
pub mod error;
pub mod from_sql;
pub mod value;

pub use decode::{decode_string, decode_text};
pub use error::TypeError;
pub use from_sql::FromSql;
pub use value::SqlValue;
