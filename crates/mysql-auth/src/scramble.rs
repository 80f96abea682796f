//! `mysql_native_password` scrambling.
//!
//! ```text
//! stage1 = SHA1(password)
//! stage2 = SHA1(stage1)
//! token  = SHA1(seed || stage2)
//! reply  = token XOR stage1
//! ```
//!
//! The server stores `stage2`, recomputes `token` from the seed it sent and
//! recovers `stage1` from the reply.

use sha1::{Digest, Sha1};

/// Length of a SHA-1 digest, of the seed and of the scrambled reply.
pub const SCRAMBLE_LENGTH: usize = 20;

/// Scramble `password` with the server `seed`.
#[must_use]
pub fn scramble411(password: &[u8], seed: &[u8]) -> [u8; SCRAMBLE_LENGTH] {
    let stage1: [u8; SCRAMBLE_LENGTH] = Sha1::digest(password).into();
    let stage2: [u8; SCRAMBLE_LENGTH] = Sha1::digest(stage1).into();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let mut reply: [u8; SCRAMBLE_LENGTH] = hasher.finalize().into();

    for (out, mask) in reply.iter_mut().zip(stage1) {
        *out ^= mask;
    }
    reply
}

/// XOR `from` with `scramble` repeated to cover it.
///
/// `to[i] = from[i] ^ scramble[i % scramble.len()]`. Applying it twice with
/// the same scramble gives back the input. An empty scramble leaves the
/// input unchanged.
#[must_use]
pub fn xor_string(from: &[u8], scramble: &[u8]) -> Vec<u8> {
    if scramble.is_empty() {
        return from.to_vec();
    }
    from.iter()
        .zip(scramble.iter().cycle())
        .map(|(a, b)| a ^ b)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn counting_seed() -> Vec<u8> {
        (1..=20).collect()
    }

    #[test]
    fn test_golden_secret_utf8() {
        let reply = scramble411("secret".as_bytes(), &counting_seed());
        assert_eq!(hex(&reply), "b32bb3a583e1340c0a1108d58b1be49781ad8c2f");
    }

    #[test]
    fn test_golden_password_alpha_seed() {
        let reply = scramble411(b"password", b"abcdefghijklmnopqrst");
        assert_eq!(hex(&reply), "bfdd49584b917d42c758edd2a7a541f721843041");
    }

    #[test]
    fn test_golden_non_ascii_depends_on_encoding() {
        let latin1 = scramble411(b"p\xe4ssw\xf6rd", &counting_seed());
        assert_eq!(hex(&latin1), "cf88f971198fe8c84ce47482da19a49e5a8f5185");

        let utf8 = scramble411("pässwörd".as_bytes(), &counting_seed());
        assert_eq!(hex(&utf8), "9891a8536587af22d12e126cf5f7a8ea86d63b0e");
    }

    #[test]
    fn test_deterministic() {
        let seed = counting_seed();
        assert_eq!(scramble411(b"x", &seed), scramble411(b"x", &seed));
        assert_ne!(scramble411(b"x", &seed), scramble411(b"y", &seed));
    }

    #[test]
    fn test_xor_string_short_scramble() {
        let out = xor_string(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF], &[0x0F, 0xF0]);
        assert_eq!(out, vec![0xF0, 0x0F, 0xF0, 0x0F, 0xF0]);
        assert_eq!(xor_string(b"abc", &[]), b"abc".to_vec());
    }
}
