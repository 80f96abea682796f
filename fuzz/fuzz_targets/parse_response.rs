#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mysql_protocol::{ColumnDefinition, RawRow, Response};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    column_count: u8,
    payload: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let payload = Bytes::from(input.payload);
    let _ = Response::decode(payload.clone());
    let _ = ColumnDefinition::decode(payload.clone());
    if let Ok(row) = RawRow::decode(payload, usize::from(input.column_count)) {
        for i in 0..=usize::from(input.column_count) {
            let _ = row.value(i);
        }
    }
});
