//! Text-protocol decoding for SQL values.
//!
//! Every column arrives as the server's textual rendering of the value.
//! Decoding follows the column definition strictly: text that is not a
//! valid literal of the declared type is an error, never coerced.

use bytes::Bytes;
use mysql_protocol::{ColumnDefinition, ColumnType, TextEncoding};

use crate::error::TypeError;
use crate::value::SqlValue;

/// Decode one column slot of a text row.
///
/// `raw` is `None` for SQL NULL.
pub fn decode_text(raw: Option<&[u8]>, column: &ColumnDefinition) -> Result<SqlValue, TypeError> {
    let Some(raw) = raw else {
        return Ok(SqlValue::Null);
    };

    match column.column_type {
        ColumnType::Null => Ok(SqlValue::Null),
        ColumnType::Year => parse_ascii::<u16>(raw, "YEAR").map(SqlValue::Year),
        ColumnType::Tiny
        | ColumnType::Short
        | ColumnType::Int24
        | ColumnType::Long
        | ColumnType::LongLong => decode_integer(raw, column),
        ColumnType::Float => parse_ascii::<f32>(raw, "FLOAT").map(SqlValue::Float),
        ColumnType::Double => parse_ascii::<f64>(raw, "DOUBLE").map(SqlValue::Double),
        ColumnType::Decimal | ColumnType::NewDecimal => decode_decimal(raw),
        ColumnType::Date | ColumnType::NewDate => decode_date(raw),
        ColumnType::DateTime
        | ColumnType::DateTime2
        | ColumnType::Timestamp
        | ColumnType::Timestamp2 => decode_datetime(raw),
        ColumnType::Time | ColumnType::Time2 => decode_time(raw),
        ColumnType::Bit => decode_bit(raw),
        ColumnType::Json => match std::str::from_utf8(raw) {
            Ok(text) => Ok(SqlValue::Json(text.to_owned())),
            Err(_) => Err(TypeError::InvalidEncoding { charset: "utf8" }),
        },
        ColumnType::Geometry => Ok(SqlValue::Binary(Bytes::copy_from_slice(raw))),
        _ => decode_string(raw, TextEncoding::for_collation(column.collation)),
    }
}

/// Decode character or byte data in the given encoding.
pub fn decode_string(raw: &[u8], encoding: TextEncoding) -> Result<SqlValue, TypeError> {
    if encoding == TextEncoding::Binary {
        return Ok(SqlValue::Binary(Bytes::copy_from_slice(raw)));
    }
    encoding
        .decode(raw)
        .map(|text| SqlValue::String(text.into_owned()))
        .ok_or(TypeError::InvalidEncoding {
            charset: encoding.name(),
        })
}

fn ascii<'a>(raw: &'a [u8], column_type: &'static str) -> Result<&'a str, TypeError> {
    match std::str::from_utf8(raw) {
        Ok(text) if !text.is_empty() => Ok(text),
        _ => Err(TypeError::invalid(column_type, raw)),
    }
}

fn parse_ascii<T: std::str::FromStr>(
    raw: &[u8],
    column_type: &'static str,
) -> Result<T, TypeError> {
    ascii(raw, column_type)?
        .parse()
        .map_err(|_| TypeError::invalid(column_type, raw))
}

fn decode_integer(raw: &[u8], column: &ColumnDefinition) -> Result<SqlValue, TypeError> {
    let name = column.column_type.name();
    if column.is_unsigned() {
        parse_ascii::<u64>(raw, name).map(SqlValue::UInt)
    } else {
        parse_ascii::<i64>(raw, name).map(SqlValue::Int)
    }
}

fn decode_bit(raw: &[u8]) -> Result<SqlValue, TypeError> {
    if raw.len() > 8 {
        return Err(TypeError::invalid("BIT", raw));
    }
    let value = raw
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
    Ok(SqlValue::Bit(value))
}

#[cfg(feature = "decimal")]
fn decode_decimal(raw: &[u8]) -> Result<SqlValue, TypeError> {
    use std::str::FromStr;

    let text = ascii(raw, "DECIMAL")?;
    rust_decimal::Decimal::from_str(text)
        .map(SqlValue::Decimal)
        .map_err(|_| TypeError::invalid("DECIMAL", raw))
}

#[cfg(not(feature = "decimal"))]
fn decode_decimal(raw: &[u8]) -> Result<SqlValue, TypeError> {
    // Without decimal support the exact text is kept.
    ascii(raw, "DECIMAL").map(|text| SqlValue::String(text.to_owned()))
}

fn reject_zero_date(raw: &[u8]) -> Result<(), TypeError> {
    if raw.starts_with(b"0000-00-00") {
        return Err(TypeError::ZeroDate(
            String::from_utf8_lossy(raw).into_owned(),
        ));
    }
    Ok(())
}

#[cfg(feature = "chrono")]
fn decode_date(raw: &[u8]) -> Result<SqlValue, TypeError> {
    reject_zero_date(raw)?;
    let text = ascii(raw, "DATE")?;
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(SqlValue::Date)
        .map_err(|_| TypeError::invalid("DATE", raw))
}

#[cfg(feature = "chrono")]
fn decode_datetime(raw: &[u8]) -> Result<SqlValue, TypeError> {
    reject_zero_date(raw)?;
    let text = ascii(raw, "DATETIME")?;
    chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(SqlValue::DateTime)
        .map_err(|_| TypeError::invalid("DATETIME", raw))
}

/// Largest hour count a `TIME` value can carry.
#[cfg(feature = "chrono")]
const MAX_TIME_HOURS: i64 = 838;

#[cfg(feature = "chrono")]
fn decode_time(raw: &[u8]) -> Result<SqlValue, TypeError> {
    use chrono::TimeDelta;

    let invalid = || TypeError::invalid("TIME", raw);
    let text = ascii(raw, "TIME")?;
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));

    let mut parts = whole.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) || !all_digits(seconds) {
        return Err(invalid());
    }
    if !fraction.is_empty() && (fraction.len() > 9 || !all_digits(fraction)) {
        return Err(invalid());
    }

    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: i64 = seconds.parse().map_err(|_| invalid())?;
    if hours > MAX_TIME_HOURS || minutes > 59 || seconds > 59 {
        return Err(invalid());
    }
    let nanos: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse().map_err(|_| invalid())?
    };

    let delta = TimeDelta::seconds(hours * 3600 + minutes * 60 + seconds)
        + TimeDelta::nanoseconds(nanos);
    Ok(SqlValue::Time(if negative { -delta } else { delta }))
}

#[cfg(not(feature = "chrono"))]
fn decode_date(raw: &[u8]) -> Result<SqlValue, TypeError> {
    reject_zero_date(raw)?;
    ascii(raw, "DATE").map(|text| SqlValue::String(text.to_owned()))
}

#[cfg(not(feature = "chrono"))]
fn decode_datetime(raw: &[u8]) -> Result<SqlValue, TypeError> {
    reject_zero_date(raw)?;
    ascii(raw, "DATETIME").map(|text| SqlValue::String(text.to_owned()))
}

#[cfg(not(feature = "chrono"))]
fn decode_time(raw: &[u8]) -> Result<SqlValue, TypeError> {
    ascii(raw, "TIME").map(|text| SqlValue::String(text.to_owned()))
}
