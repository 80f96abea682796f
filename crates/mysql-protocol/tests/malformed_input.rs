//! Property tests: arbitrary server bytes produce errors, never panics.

#![allow(clippy::unwrap_used)]

use bytes::Bytes;
use mysql_protocol::{
    ColumnDefinition, ErrPacket, InitialHandshake, OkPacket, RawRow, Response, codec,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn handshake_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = InitialHandshake::decode(Bytes::from(data));
    }

    #[test]
    fn response_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let payload = Bytes::from(data);
        let _ = Response::decode(payload.clone());
        let _ = OkPacket::decode(payload.clone());
        let _ = ErrPacket::decode(payload.clone());
        let _ = ColumnDefinition::decode(payload);
    }

    #[test]
    fn row_slots_stay_in_bounds(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        columns in 0usize..16,
    ) {
        let payload = Bytes::from(data);
        if let Ok(row) = RawRow::decode(payload.clone(), columns) {
            prop_assert_eq!(row.slots.len(), columns);
            for slot in &row.slots {
                prop_assert!((slot.offset + slot.length) as usize <= payload.len());
            }
        }
    }

    #[test]
    fn lenenc_int_preserves_value(value in any::<u64>()) {
        let mut buf = bytes::BytesMut::new();
        codec::write_lenenc_int(&mut buf, value);
        let mut cursor = buf.freeze();
        prop_assert_eq!(codec::read_lenenc_int(&mut cursor).unwrap(), Some(value));
        prop_assert!(cursor.is_empty());
    }
}
