//! Property tests for the scramble helpers.

use mysql_auth::{SCRAMBLE_LENGTH, scramble411, xor_string};
use proptest::prelude::*;

proptest! {
    #[test]
    fn xor_string_is_self_inverse(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        scramble in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        let once = xor_string(&data, &scramble);
        prop_assert_eq!(once.len(), data.len());
        prop_assert_eq!(xor_string(&once, &scramble), data);
    }

    #[test]
    fn scramble_is_deterministic_and_fixed_length(
        password in proptest::collection::vec(any::<u8>(), 0..64),
        seed in proptest::collection::vec(any::<u8>(), SCRAMBLE_LENGTH..=SCRAMBLE_LENGTH),
    ) {
        let first = scramble411(&password, &seed);
        prop_assert_eq!(first.len(), SCRAMBLE_LENGTH);
        prop_assert_eq!(first, scramble411(&password, &seed));
    }
}
