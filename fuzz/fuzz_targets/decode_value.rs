#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mysql_protocol::{ColumnDefinition, ColumnFlags, ColumnType};

/// Column metadata plus one text-protocol value.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    column_type: u8,
    flags: u16,
    collation: u16,
    value: Option<Vec<u8>>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(column_type) = ColumnType::try_from(input.column_type) else {
        return;
    };
    let column = ColumnDefinition::new("c", column_type)
        .with_flags(ColumnFlags::from_bits_truncate(input.flags))
        .with_collation(input.collation);
    let _ = mysql_types::decode_text(input.value.as_deref(), &column);
});
