//! Hashing and byte-format primitives: SHA-256, `hash256`, `hash160`, varints,
//! and base58check.
//!
//! Grounded on `modified_src/helper.py` (`hash160`, `hash256`,
//! `encode_base58`/`decode_base58`, `encode_varint`/`read_varint`).

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Base58 alphabet: digits + uppercase + lowercase, minus `0`, `O`, `I`, `l`.
const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Two rounds of SHA-256, Bitcoin's `hash256`.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// SHA-256 followed by RIPEMD-160, Bitcoin's `hash160`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA-256, used by RFC 6979 nonce derivation.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Encodes a byte slice as a base58 numeral string (no checksum).
///
/// Each leading `0x00` byte of `bytes` is rendered as a leading `'1'`, per
/// the Bitcoin convention of preserving the byte count of small values.
pub fn encode_base58(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    let mut num = num_bigint::BigUint::from_bytes_be(bytes);
    let fifty_eight = num_bigint::BigUint::from(58u32);
    let mut digits = Vec::new();
    while num > num_bigint::BigUint::from(0u32) {
        let (q, r) = num_integer::Integer::div_rem(&num, &fifty_eight);
        let r: u32 = num_traits::ToPrimitive::to_u32(&r).expect("remainder < 58");
        digits.push(BASE58_ALPHABET[r as usize]);
        num = q;
    }
    digits.reverse();
    let mut out = String::with_capacity(leading_zeros + digits.len());
    out.extend(std::iter::repeat('1').take(leading_zeros));
    out.push_str(std::str::from_utf8(&digits).expect("base58 alphabet is ASCII"));
    out
}

/// Encodes `bytes` followed by the first 4 bytes of `hash256(bytes)`, in
/// base58. Used for WIF and address encoding.
pub fn encode_base58_checksum(bytes: &[u8]) -> String {
    let checksum = hash256(bytes);
    let mut payload = bytes.to_vec();
    payload.extend_from_slice(&checksum[..4]);
    encode_base58(&payload)
}

/// Decodes a base58 numeral string back into bytes (no checksum check).
pub fn decode_base58(s: &str) -> Result<Vec<u8>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let leading_ones = s.chars().take_while(|&c| c == '1').count();
    let mut num = num_bigint::BigUint::from(0u32);
    let fifty_eight = num_bigint::BigUint::from(58u32);
    for c in s.chars() {
        let digit = BASE58_ALPHABET
            .iter()
            .position(|&b| b == c as u8)
            .ok_or_else(|| Error::Format(format!("invalid base58 character: {c:?}")))?;
        num = num * &fifty_eight + num_bigint::BigUint::from(digit as u32);
    }
    let mut body = num.to_bytes_be();
    if body == [0] && num == num_bigint::BigUint::from(0u32) {
        body.clear();
    }
    let mut out = vec![0u8; leading_ones];
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decodes a base58check string, verifying the trailing 4-byte `hash256`
/// checksum and returning the payload without it.
pub fn decode_base58_checksum(s: &str) -> Result<Vec<u8>> {
    let combined = decode_base58(s)?;
    if combined.len() < 4 {
        return Err(Error::Format("base58check payload too short".into()));
    }
    let (data, checksum) = combined.split_at(combined.len() - 4);
    let expected = &hash256(data)[..4];
    if expected != checksum {
        return Err(Error::Checksum {
            expected: hex::encode(expected),
            found: hex::encode(checksum),
        });
    }
    Ok(data.to_vec())
}

/// Encodes `value` as a Bitcoin varint.
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value < 0x1_0000 {
        let mut out = vec![0xfd];
        out.extend_from_slice(&(value as u16).to_le_bytes());
        out
    } else if value < 0x1_0000_0000 {
        let mut out = vec![0xfe];
        out.extend_from_slice(&(value as u32).to_le_bytes());
        out
    } else {
        let mut out = vec![0xff];
        out.extend_from_slice(&value.to_le_bytes());
        out
    }
}

/// Reads a varint from the front of `cursor`, advancing it past the bytes
/// consumed.
pub fn read_varint(cursor: &mut &[u8]) -> Result<u64> {
    let flag = take_bytes(cursor, 1)?[0];
    let value = match flag {
        0xfd => u16::from_le_bytes(take_bytes(cursor, 2)?.try_into().unwrap()) as u64,
        0xfe => u32::from_le_bytes(take_bytes(cursor, 4)?.try_into().unwrap()) as u64,
        0xff => u64::from_le_bytes(take_bytes(cursor, 8)?.try_into().unwrap()),
        small => small as u64,
    };
    Ok(value)
}

/// Splits `n` bytes off the front of `cursor`, reporting a `Format` error on
/// underrun. Shared by every wire-format reader in this crate.
pub(crate) fn take_bytes<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if cursor.len() < n {
        return Err(Error::Format(format!(
            "unexpected end of input: wanted {n} bytes, had {}",
            cursor.len()
        )));
    }
    let (head, tail) = cursor.split_at(n);
    *cursor = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash256_is_double_sha256() {
        let once = sha256(b"hello");
        let twice = sha256(&once);
        assert_eq!(hash256(b"hello"), twice);
    }

    #[test]
    fn varint_round_trips_all_ranges() {
        for value in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, u64::MAX] {
            let encoded = encode_varint(value);
            let mut cursor = encoded.as_slice();
            assert_eq!(read_varint(&mut cursor).unwrap(), value);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn base58_round_trips() {
        let data = b"\x00\x01hello world";
        let encoded = encode_base58(data);
        assert_eq!(decode_base58(&encoded).unwrap(), data);
    }

    #[test]
    fn base58_checksum_detects_tampering() {
        let encoded = encode_base58_checksum(b"deadbeef");
        let mut chars: Vec<char> = encoded.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '1' { '2' } else { '1' };
        let tampered: String = chars.into_iter().collect();
        assert!(decode_base58_checksum(&tampered).is_err());
    }

    #[test]
    fn base58_empty_round_trips() {
        assert_eq!(encode_base58(b""), "");
        assert_eq!(decode_base58("").unwrap(), Vec::<u8>::new());
    }
}
