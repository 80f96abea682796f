//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur during type conversion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: &'static str,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// Column text is not a valid literal of the column type.
    #[error("invalid {column_type} value: {text:?}")]
    InvalidValue {
        /// Column type name.
        column_type: &'static str,
        /// Offending text (lossily decoded).
        text: String,
    },

    /// Invalid encoding in string data.
    #[error("invalid {charset} string data")]
    InvalidEncoding {
        /// Charset the bytes were decoded with.
        charset: &'static str,
    },

    /// A zero date (`0000-00-00`) cannot be represented.
    #[error("zero date {0:?} cannot be represented")]
    ZeroDate(String),

    /// Column index beyond the row's arity.
    #[error("column index {index} out of range for {count} columns")]
    ColumnIndex {
        /// Requested index.
        index: usize,
        /// Number of columns.
        count: usize,
    },

    /// No column with the given name.
    #[error("no column named {0:?}")]
    UnknownColumn(String),
}

impl TypeError {
    pub(crate) fn invalid(column_type: &'static str, raw: &[u8]) -> Self {
        Self::InvalidValue {
            column_type,
            text: String::from_utf8_lossy(raw).into_owned(),
        }
    }
}
