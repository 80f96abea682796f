#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mysql_codec::{LegacyCodec, MessageAssembler, TaggedCodec};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Legacy frames, reassembled into messages
    let mut codec = LegacyCodec::new().with_max_message_size(1 << 20);
    let mut assembler = MessageAssembler::with_max_message_size(1 << 20);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        if assembler.push(frame).is_err() {
            break;
        }
    }

    // Tagged frames
    let mut codec = TaggedCodec::new();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_frame)) = codec.decode(&mut buf) {}
});
