//! Fixed-width 160-bit identifier arithmetic.
//!
//! Ids (and key/distance values, which share the same representation) are
//! always a 20-byte big-endian sequence. Bit 0 is the least significant bit
//! of byte 19; bit 159 is the most significant bit of byte 0.

use bitvec::prelude::*;
use sha1::{Digest, Sha1};

/// Size of a key/identifier in bytes (SHA-1 digest size).
pub const KEY_BYTES: usize = 20;

/// Size of a key/identifier in bits.
pub const KEY_BITS: usize = 8 * KEY_BYTES;

/// A 160-bit node or key identifier.
pub type Id = [u8; KEY_BYTES];

/// Compute the key for an arbitrary byte string: its SHA-1 digest.
pub fn compute(bytes: &[u8]) -> Id {
    let digest = Sha1::digest(bytes);
    let mut id = [0u8; KEY_BYTES];
    id.copy_from_slice(&digest);
    id
}

/// The bitwise XOR of two ids, interpreted as a 160-bit unsigned integer.
pub fn distance(x: &Id, y: &Id) -> Id {
    let mut d = [0u8; KEY_BYTES];
    for i in 0..KEY_BYTES {
        d[i] = x[i] ^ y[i];
    }
    d
}

/// The value of bit `b` of `x` (bit 0 = LSB of the last byte).
///
/// Returns 0 for `b >= KEY_BITS`, matching the "undefined on malformed
/// input, but total" contract of §4.1.
pub fn bit(x: &Id, b: usize) -> u8 {
    if b >= KEY_BITS {
        return 0;
    }
    let bits = x.view_bits::<Msb0>();
    bits[KEY_BITS - 1 - b] as u8
}

/// The 0-based index of the highest set bit in a distance, or 0 if `d` is
/// all-zero (same id). Valid range: `0..=159`.
pub fn distance_bucket(d: &Id) -> usize {
    let bits = d.view_bits::<Msb0>();
    match bits.first_one() {
        Some(i) => KEY_BITS - 1 - i,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_at(byte: u8) -> Id {
        let mut id = [0u8; KEY_BYTES];
        id[0] = byte;
        id
    }

    #[test]
    fn distance_of_self_is_zero() {
        let id = compute(b"anything");
        assert_eq!(distance(&id, &id), [0u8; KEY_BYTES]);
        assert_eq!(distance_bucket(&[0u8; KEY_BYTES]), 0);
    }

    #[test]
    fn known_distance() {
        let mut a = [0u8; KEY_BYTES];
        a[19] = 1;
        let mut b = [0u8; KEY_BYTES];
        b[19] = 2;

        let mut expected = [0u8; KEY_BYTES];
        expected[19] = 3;
        assert_eq!(distance(&a, &b), expected);
    }

    #[test]
    fn distance_bucket_msb_is_159() {
        let mut d = [0u8; KEY_BYTES];
        d[0] = 0x80;
        assert_eq!(distance_bucket(&d), 159);
    }

    #[test]
    fn distance_bucket_bit_79_and_80() {
        let mut d79 = [0u8; KEY_BYTES];
        d79[10] = 0x80;
        assert_eq!(distance_bucket(&d79), 79);

        let mut d80 = [0u8; KEY_BYTES];
        d80[9] = 0x01;
        assert_eq!(distance_bucket(&d80), 80);
    }

    #[test]
    fn distance_bucket_is_in_range() {
        let a = compute(b"node-a");
        let b = compute(b"node-b");
        let d = distance(&a, &b);
        let bucket = distance_bucket(&d);
        assert!(bucket <= KEY_BITS - 1);
    }

    #[test]
    fn get_lowest_and_highest_bit() {
        let mut id = [0u8; KEY_BYTES];
        id[19] = 0x1;
        assert_eq!(bit(&id, 0), 1);
        assert_eq!(bit(&id, 1), 0);

        let mut id = [0u8; KEY_BYTES];
        id[0] = 0x80;
        assert_eq!(bit(&id, KEY_BITS - 1), 1);
        assert_eq!(bit(&id, KEY_BITS - 2), 0);
    }

    #[test]
    fn get_bit_out_of_range_is_zero() {
        let id = key_at(0xff);
        assert_eq!(bit(&id, KEY_BITS), 0);
    }
}
