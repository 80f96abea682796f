//! Trait for converting from SQL values to Rust types.

use bytes::Bytes;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Trait for types that can be converted from SQL values.
///
/// This is the decoding strategy a caller picks when reading a column:
/// `row.get::<i64>(0)`, `row.get::<Option<String>>(1)`. Widening
/// conversions succeed; narrowing that loses information reports
/// [`TypeError::OutOfRange`].
pub trait FromSql: Sized {
    /// Convert from a SQL value to this type.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from an optional SQL value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    match value {
        SqlValue::Null => TypeError::UnexpectedNull,
        _ => TypeError::TypeMismatch {
            expected,
            actual: value.type_name(),
        },
    }
}

macro_rules! impl_from_sql_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromSql for $ty {
                fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
                    let out_of_range = || TypeError::OutOfRange {
                        target_type: stringify!($ty),
                    };
                    match value {
                        SqlValue::Int(v) => <$ty>::try_from(*v).map_err(|_| out_of_range()),
                        SqlValue::UInt(v) | SqlValue::Bit(v) => {
                            <$ty>::try_from(*v).map_err(|_| out_of_range())
                        }
                        SqlValue::Year(v) => <$ty>::try_from(*v).map_err(|_| out_of_range()),
                        _ => Err(mismatch(stringify!($ty), value)),
                    }
                }
            }
        )*
    };
}

impl_from_sql_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int(v) => Ok(*v != 0),
            SqlValue::UInt(v) | SqlValue::Bit(v) => Ok(*v != 0),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            _ => Err(mismatch("f32", value)),
        }
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Double(v) => Ok(*v),
            SqlValue::Float(v) => Ok(f64::from(*v)),
            _ => Err(mismatch("f64", value)),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(v) | SqlValue::Json(v) => Ok(v.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl FromSql for Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(v) => Ok(v.clone()),
            SqlValue::String(v) | SqlValue::Json(v) => Ok(Bytes::copy_from_slice(v.as_bytes())),
            _ => Err(mismatch("Bytes", value)),
        }
    }
}

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Ok(value.clone())
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

#[cfg(feature = "decimal")]
impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Decimal(v) => Ok(*v),
            SqlValue::Int(v) => Ok(Self::from(*v)),
            SqlValue::UInt(v) => Ok(Self::from(*v)),
            _ => Err(mismatch("Decimal", value)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDate {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Date(v) => Ok(*v),
            _ => Err(mismatch("NaiveDate", value)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::DateTime(v) => Ok(*v),
            SqlValue::Date(v) => Ok(v.and_time(chrono::NaiveTime::MIN)),
            _ => Err(mismatch("NaiveDateTime", value)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::TimeDelta {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Time(v) => Ok(*v),
            _ => Err(mismatch("TimeDelta", value)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            // Only intervals within one day are times of day.
            SqlValue::Time(v) => {
                let out_of_range = TypeError::OutOfRange {
                    target_type: "NaiveTime",
                };
                if *v < chrono::TimeDelta::zero() || *v >= chrono::TimeDelta::days(1) {
                    return Err(out_of_range);
                }
                Ok(Self::MIN + *v)
            }
            SqlValue::DateTime(v) => Ok(v.time()),
            _ => Err(mismatch("NaiveTime", value)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_widening() {
        assert_eq!(i64::from_sql(&SqlValue::Int(-5)).unwrap(), -5);
        assert_eq!(u64::from_sql(&SqlValue::Year(1999)).unwrap(), 1999);
        assert_eq!(f64::from_sql(&SqlValue::Float(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn test_narrowing_out_of_range() {
        assert_eq!(
            i8::from_sql(&SqlValue::Int(300)),
            Err(TypeError::OutOfRange { target_type: "i8" })
        );
        assert_eq!(
            u32::from_sql(&SqlValue::Int(-1)),
            Err(TypeError::OutOfRange { target_type: "u32" })
        );
        assert_eq!(
            i64::from_sql(&SqlValue::UInt(u64::MAX)),
            Err(TypeError::OutOfRange { target_type: "i64" })
        );
    }

    #[test]
    fn test_null_handling() {
        assert_eq!(i32::from_sql(&SqlValue::Null), Err(TypeError::UnexpectedNull));
        assert_eq!(Option::<i32>::from_sql(&SqlValue::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_sql(&SqlValue::Int(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_mismatch() {
        assert_eq!(
            i32::from_sql(&SqlValue::String("12".into())),
            Err(TypeError::TypeMismatch {
                expected: "i32",
                actual: "VARCHAR"
            })
        );
        assert!(String::from_sql(&SqlValue::Int(12)).is_err());
    }

    #[test]
    fn test_bool_from_tinyint() {
        assert!(bool::from_sql(&SqlValue::Int(1)).unwrap());
        assert!(!bool::from_sql(&SqlValue::Int(0)).unwrap());
        assert!(bool::from_sql(&SqlValue::Bit(1)).unwrap());
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_time_of_day_bounds() {
        use chrono::{NaiveTime, TimeDelta};

        let noon = SqlValue::Time(TimeDelta::hours(12));
        assert_eq!(
            NaiveTime::from_sql(&noon).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap()
        );
        assert!(NaiveTime::from_sql(&SqlValue::Time(TimeDelta::hours(25))).is_err());
        assert!(NaiveTime::from_sql(&SqlValue::Time(-TimeDelta::seconds(1))).is_err());
    }
}
