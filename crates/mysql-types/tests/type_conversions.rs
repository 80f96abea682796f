//! Type conversion edge case tests.
//!
//! Covers:
//! - NULL handling through `Option`
//! - Charset boundaries for text columns
//! - Integer range boundaries
//! - Strict rejection of malformed column text

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mysql_protocol::{ColumnDefinition, ColumnFlags, ColumnType};
use mysql_types::{FromSql, SqlValue, TypeError, decode_text};
use proptest::prelude::*;

fn column(column_type: ColumnType) -> ColumnDefinition {
    ColumnDefinition::new("c", column_type)
}

fn unsigned(column_type: ColumnType) -> ColumnDefinition {
    column(column_type).with_flags(ColumnFlags::UNSIGNED)
}

// ============================================================================
// NULL Handling
// ============================================================================

mod null_handling {
    use super::*;

    #[test]
    fn test_null_slot_to_option() {
        let value = decode_text(None, &column(ColumnType::VarString)).unwrap();
        assert_eq!(Option::<String>::from_sql(&value).unwrap(), None);
    }

    #[test]
    fn test_null_slot_to_non_option_fails() {
        let value = decode_text(None, &column(ColumnType::Long)).unwrap();
        assert!(matches!(i32::from_sql(&value), Err(TypeError::UnexpectedNull)));
    }

    #[test]
    fn test_empty_string_is_not_null() {
        let value = decode_text(Some(b""), &column(ColumnType::VarString)).unwrap();
        assert_eq!(
            Option::<String>::from_sql(&value).unwrap(),
            Some(String::new())
        );
    }
}

// ============================================================================
// Charset Boundaries
// ============================================================================

mod charsets {
    use super::*;

    #[test]
    fn test_utf8mb4_four_byte_characters() {
        let text = "emoji 🦀 and 日本語";
        let col = column(ColumnType::VarString).with_collation(45);
        let value = decode_text(Some(text.as_bytes()), &col).unwrap();
        assert_eq!(String::from_sql(&value).unwrap(), text);
    }

    #[test]
    fn test_latin1_high_bytes() {
        let col = column(ColumnType::String).with_collation(8);
        let value = decode_text(Some(&[0xC4, 0xD6, 0xDC]), &col).unwrap();
        assert_eq!(String::from_sql(&value).unwrap(), "ÄÖÜ");
    }

    #[test]
    fn test_latin2_is_not_latin1() {
        let col = column(ColumnType::VarString).with_collation(9);
        let value = decode_text(Some(&[0xA3, 0xB1]), &col).unwrap();
        assert_eq!(String::from_sql(&value).unwrap(), "Łą");
    }

    #[test]
    fn test_big5_text() {
        // "中文" in Big5
        let col = column(ColumnType::VarString).with_collation(1);
        let value = decode_text(Some(&[0xA4, 0xA4, 0xA4, 0xE5]), &col).unwrap();
        assert_eq!(String::from_sql(&value).unwrap(), "中文");
    }

    #[test]
    fn test_truncated_utf8_is_error() {
        // First two bytes of a three-byte sequence.
        let col = column(ColumnType::VarString).with_collation(33);
        assert!(matches!(
            decode_text(Some(&[0xE6, 0x97]), &col),
            Err(TypeError::InvalidEncoding { charset: "utf8" })
        ));
    }

    #[test]
    fn test_binary_column_to_bytes() {
        let col = column(ColumnType::Blob).with_collation(63);
        let value = decode_text(Some(&[0, 159, 146, 150]), &col).unwrap();
        assert_eq!(Vec::<u8>::from_sql(&value).unwrap(), vec![0, 159, 146, 150]);
        assert!(String::from_sql(&value).is_err());
    }

    #[test]
    fn test_json_is_text() {
        let col = column(ColumnType::Json).with_collation(63);
        let value = decode_text(Some(br#"{"a": 1}"#), &col).unwrap();
        assert_eq!(value, SqlValue::Json(r#"{"a": 1}"#.into()));
        assert_eq!(String::from_sql(&value).unwrap(), r#"{"a": 1}"#);
    }
}

// ============================================================================
// Integer Boundaries
// ============================================================================

mod integer_boundaries {
    use super::*;

    #[test]
    fn test_tinyint_extremes() {
        let col = column(ColumnType::Tiny);
        let min = decode_text(Some(b"-128"), &col).unwrap();
        let max = decode_text(Some(b"127"), &col).unwrap();
        assert_eq!(i8::from_sql(&min).unwrap(), i8::MIN);
        assert_eq!(i8::from_sql(&max).unwrap(), i8::MAX);
    }

    #[test]
    fn test_unsigned_bigint_max() {
        let value = decode_text(Some(b"18446744073709551615"), &unsigned(ColumnType::LongLong))
            .unwrap();
        assert_eq!(u64::from_sql(&value).unwrap(), u64::MAX);
        assert!(matches!(
            i64::from_sql(&value),
            Err(TypeError::OutOfRange { target_type: "i64" })
        ));
    }

    #[test]
    fn test_signed_bigint_overflow_is_invalid() {
        assert!(matches!(
            decode_text(Some(b"9223372036854775808"), &column(ColumnType::LongLong)),
            Err(TypeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_year() {
        let value = decode_text(Some(b"2155"), &column(ColumnType::Year)).unwrap();
        assert_eq!(value, SqlValue::Year(2155));
        assert_eq!(i32::from_sql(&value).unwrap(), 2155);
        assert!(u8::from_sql(&value).is_err());
    }
}

// ============================================================================
// Malformed Text
// ============================================================================

mod malformed {
    use super::*;

    #[test]
    fn test_float_rejects_garbage() {
        assert!(decode_text(Some(b"1.5x"), &column(ColumnType::Double)).is_err());
    }

    #[test]
    fn test_bit_longer_than_eight_bytes() {
        assert!(decode_text(Some(&[1u8; 9]), &column(ColumnType::Bit)).is_err());
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_datetime_without_time_is_error() {
        assert!(decode_text(Some(b"2024-01-01"), &column(ColumnType::DateTime)).is_err());
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_time_hours_beyond_range() {
        assert!(decode_text(Some(b"839:00:00"), &column(ColumnType::Time)).is_err());
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_signed_integers_decode_exactly(n in any::<i64>()) {
        let text = n.to_string();
        let value = decode_text(Some(text.as_bytes()), &column(ColumnType::LongLong)).unwrap();
        prop_assert_eq!(i64::from_sql(&value).unwrap(), n);
    }

    #[test]
    fn prop_narrowing_agrees_with_try_from(n in any::<i64>()) {
        let value = SqlValue::Int(n);
        match i16::try_from(n) {
            Ok(expected) => prop_assert_eq!(i16::from_sql(&value).unwrap(), expected),
            Err(_) => prop_assert!(i16::from_sql(&value).is_err()),
        }
    }

    #[test]
    fn prop_decode_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..32), code in any::<u8>()) {
        if let Ok(column_type) = ColumnType::try_from(code) {
            let _ = decode_text(Some(&raw), &column(column_type));
        }
    }
}
