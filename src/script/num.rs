//! Script number encoding: signed, little-endian, with the sign bit in the
//! high bit of the last byte.
//!
//! Grounded on `modified_src/op.py`'s `encode_num`/`decode_num`.

/// Encodes a signed integer into Script's little-endian sign-magnitude
/// format. Zero encodes as the empty byte string.
pub fn encode_num(num: i64) -> Vec<u8> {
    if num == 0 {
        return Vec::new();
    }
    let negative = num < 0;
    let mut abs_num = num.unsigned_abs();
    let mut result = Vec::new();
    while abs_num != 0 {
        result.push((abs_num & 0xff) as u8);
        abs_num >>= 8;
    }
    let last = *result.last().expect("loop ran at least once since num != 0");
    if last & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let last_idx = result.len() - 1;
        result[last_idx] |= 0x80;
    }
    result
}

/// Decodes a Script-number element back into a signed integer.
pub fn decode_num(element: &[u8]) -> i64 {
    if element.is_empty() {
        return 0;
    }
    let mut big_endian: Vec<u8> = element.iter().rev().copied().collect();
    let negative = big_endian[0] & 0x80 != 0;
    if negative {
        big_endian[0] &= 0x7f;
    }
    let mut result: i64 = 0;
    for &byte in &big_endian {
        result = (result << 8) + byte as i64;
    }
    if negative {
        -result
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_empty() {
        assert_eq!(encode_num(0), Vec::<u8>::new());
        assert_eq!(decode_num(&[]), 0);
    }

    #[test]
    fn round_trips_small_values() {
        for n in [-500, -1, 1, 127, 128, 255, 256, 65535, 70000] {
            assert_eq!(decode_num(&encode_num(n)), n);
        }
    }

    #[test]
    fn disambiguates_sign_on_high_bit() {
        // 0x80 alone would look negative-zero; encoding must append a byte.
        let encoded = encode_num(128);
        assert_eq!(encoded, vec![0x80, 0x00]);
        assert_eq!(decode_num(&encoded), 128);

        let encoded_neg = encode_num(-128);
        assert_eq!(encoded_neg, vec![0x80, 0x80]);
        assert_eq!(decode_num(&encoded_neg), -128);
    }
}
