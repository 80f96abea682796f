#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mysql_protocol::{
    AuthSwitchRequest, Capabilities, ChangeUser, HandshakeResponse, InitialHandshake,
};

fuzz_target!(|data: &[u8]| {
    let payload = Bytes::copy_from_slice(data);
    let _ = InitialHandshake::decode(payload.clone());
    let _ = HandshakeResponse::decode(payload.clone());
    let _ = AuthSwitchRequest::decode(payload.clone());
    let _ = ChangeUser::decode(payload, Capabilities::CLIENT_DEFAULT);
});
