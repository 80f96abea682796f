//! SQL value representation.

use bytes::Bytes;

/// A decoded MySQL column value.
///
/// Closed union of every shape the text protocol can produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    #[default]
    Null,
    /// Signed integer (`TINYINT`..`BIGINT`).
    Int(i64),
    /// Unsigned integer (`... UNSIGNED`).
    UInt(u64),
    /// Single precision float (`FLOAT`).
    Float(f32),
    /// Double precision float (`DOUBLE`).
    Double(f64),
    /// Exact decimal (`DECIMAL`/`NUMERIC`).
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// Date (`DATE`).
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// Date and time (`DATETIME`, `TIMESTAMP`).
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
    /// Signed time interval (`TIME`, range ±838:59:59).
    #[cfg(feature = "chrono")]
    Time(chrono::TimeDelta),
    /// Year (`YEAR`).
    Year(u16),
    /// Bit field (`BIT(n)`), big-endian.
    Bit(u64),
    /// Character data.
    String(String),
    /// Binary data (binary collation).
    Binary(Bytes),
    /// JSON document text.
    Json(String),
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as an i64, if it is an integer that fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Year(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a u64, if it is a non-negative integer.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) | Self::Bit(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Year(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an f64, if it is a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is binary or text.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            Self::String(v) | Self::Json(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    /// Get the type name as a string.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Int(_) => "BIGINT",
            Self::UInt(_) => "BIGINT UNSIGNED",
            Self::Float(_) => "FLOAT",
            Self::Double(_) => "DOUBLE",
            #[cfg(feature = "decimal")]
            Self::Decimal(_) => "DECIMAL",
            #[cfg(feature = "chrono")]
            Self::Date(_) => "DATE",
            #[cfg(feature = "chrono")]
            Self::DateTime(_) => "DATETIME",
            #[cfg(feature = "chrono")]
            Self::Time(_) => "TIME",
            Self::Year(_) => "YEAR",
            Self::Bit(_) => "BIT",
            Self::String(_) => "VARCHAR",
            Self::Binary(_) => "VARBINARY",
            Self::Json(_) => "JSON",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Bytes> for SqlValue {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null() {
        let value = SqlValue::from(None::<i64>);
        assert!(value.is_null());
        assert_eq!(value.type_name(), "NULL");
    }

    #[test]
    fn test_integer_accessors() {
        assert_eq!(SqlValue::UInt(u64::MAX).as_i64(), None);
        assert_eq!(SqlValue::UInt(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Int(-1).as_u64(), None);
        assert_eq!(SqlValue::Year(2024).as_u64(), Some(2024));
    }

    #[test]
    fn test_text_as_bytes() {
        let value = SqlValue::from("abc");
        assert_eq!(value.as_str(), Some("abc"));
        assert_eq!(value.as_bytes(), Some(&b"abc"[..]));
    }
}
