//! secp256k1 keys, ECDSA signing/verification, and their Bitcoin wire
//! formats: SEC, DER, base58check addresses, and WIF.
//!
//! Grounded on `modified_src/ecc.py`'s `PrivateKey`, `PublicKey`, and
//! `Signature` classes.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::hash::{encode_base58_checksum, decode_base58_checksum, hash160, hmac_sha256, take_bytes};
use crate::point::Point;
use crate::secp256k1;

fn to_bytes_be_fixed(n: &BigUint, len: usize) -> Vec<u8> {
    let raw = n.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(raw.len())];
    out.extend_from_slice(&raw);
    out
}

/// A secp256k1 public key: a curve point `P != O`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    point: Point,
}

impl PublicKey {
    /// Wraps a curve point as a public key, rejecting the point at infinity.
    pub fn from_point(point: Point) -> Result<Self> {
        if point.is_infinity() {
            return Err(Error::Domain("public key cannot be the point at infinity".into()));
        }
        Ok(Self { point })
    }

    /// The underlying curve point.
    pub fn point(&self) -> &Point {
        &self.point
    }

    /// Encodes this key in SEC format: compressed (33 bytes) or uncompressed
    /// (65 bytes).
    pub fn sec(&self, compressed: bool) -> Vec<u8> {
        let x = self.point.x().expect("public key is never infinity");
        let y = self.point.y().expect("public key is never infinity");
        let x_bytes = to_bytes_be_fixed(x.num(), 32);
        if compressed {
            let mut out = Vec::with_capacity(33);
            out.push(if y.num() % 2u32 == BigUint::zero() { 0x02 } else { 0x03 });
            out.extend_from_slice(&x_bytes);
            out
        } else {
            let y_bytes = to_bytes_be_fixed(y.num(), 32);
            let mut out = Vec::with_capacity(65);
            out.push(0x04);
            out.extend_from_slice(&x_bytes);
            out.extend_from_slice(&y_bytes);
            out
        }
    }

    /// Parses a SEC-encoded public key, recovering `y` from its parity for
    /// the compressed form.
    pub fn from_sec(sec_bin: &[u8]) -> Result<Self> {
        if sec_bin.is_empty() {
            return Err(Error::Format("empty SEC encoding".into()));
        }
        match sec_bin[0] {
            0x04 => {
                if sec_bin.len() != 65 {
                    return Err(Error::Format("uncompressed SEC must be 65 bytes".into()));
                }
                let x = secp256k1::field_element(BigUint::from_bytes_be(&sec_bin[1..33]))?;
                let y = secp256k1::field_element(BigUint::from_bytes_be(&sec_bin[33..65]))?;
                let point = Point::affine(x, y, secp256k1::curve_a(), secp256k1::curve_b())?;
                Self::from_point(point)
            }
            prefix @ (0x02 | 0x03) => {
                if sec_bin.len() != 33 {
                    return Err(Error::Format("compressed SEC must be 33 bytes".into()));
                }
                let y_even = prefix == 0x02;
                let x = secp256k1::field_element(BigUint::from_bytes_be(&sec_bin[1..33]))?;
                let alpha = x.mul(&x)?.mul(&x)?.add(&secp256k1::curve_b())?;
                let beta = secp256k1::sqrt(&alpha);
                let beta_is_even = beta.num() % 2u32 == BigUint::zero();
                let (even_beta, odd_beta) = if beta_is_even {
                    (beta.clone(), secp256k1::field_element(secp256k1::p() - beta.num())?)
                } else {
                    (secp256k1::field_element(secp256k1::p() - beta.num())?, beta.clone())
                };
                let y = if y_even { even_beta } else { odd_beta };
                let point = Point::affine(x, y, secp256k1::curve_a(), secp256k1::curve_b())?;
                Self::from_point(point)
            }
            other => Err(Error::Format(format!("invalid SEC prefix byte: {other:#04x}"))),
        }
    }

    /// Verifies an ECDSA signature over digest `z` against this public key.
    pub fn verify(&self, z: &BigUint, sig: &Signature) -> bool {
        let n = secp256k1::n();
        if sig.r.is_zero() || sig.r >= n || sig.s.is_zero() || sig.s >= n {
            return false;
        }
        let s_inv = mod_pow(&sig.s, &(&n - 2u32), &n);
        let u = (z * &s_inv) % &n;
        let v = (&sig.r * &s_inv) % &n;
        let g = secp256k1::generator();
        let r = match g.scalar_mul(&u).and_then(|ug| {
            self.point.scalar_mul(&v).and_then(|vp| ug.add(&vp))
        }) {
            Ok(r) => r,
            Err(_) => return false,
        };
        if r.is_infinity() {
            return false;
        }
        *r.x().expect("checked non-infinity").num() == sig.r
    }

    /// Encodes this public key's Bitcoin address: `hash160(sec)`, with a
    /// network prefix, base58check-encoded.
    pub fn address(&self, compressed: bool, testnet: bool) -> String {
        let h160 = hash160(&self.sec(compressed));
        let prefix: u8 = if testnet { 0x6f } else { 0x00 };
        let mut payload = vec![prefix];
        payload.extend_from_slice(&h160);
        encode_base58_checksum(&payload)
    }
}

fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// An ECDSA signature `(r, s)`, with `1 <= r, s < n` (invariant S1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: BigUint,
    s: BigUint,
}

impl Signature {
    /// Builds a signature, checking `1 <= r, s < n`.
    pub fn new(r: BigUint, s: BigUint) -> Result<Self> {
        let n = secp256k1::n();
        if r.is_zero() || r >= n {
            return Err(Error::Domain("signature r out of range".into()));
        }
        if s.is_zero() || s >= n {
            return Err(Error::Domain("signature s out of range".into()));
        }
        Ok(Self { r, s })
    }

    /// `r` component.
    pub fn r(&self) -> &BigUint {
        &self.r
    }

    /// `s` component.
    pub fn s(&self) -> &BigUint {
        &self.s
    }

    /// Encodes this signature in DER format.
    fn der_minimal_int(value: &BigUint) -> Vec<u8> {
        let mut bytes = value.to_bytes_be();
        if bytes.is_empty() {
            bytes.push(0);
        }
        if bytes[0] & 0x80 != 0 {
            bytes.insert(0, 0x00);
        }
        bytes
    }

    /// DER-encodes this signature: `0x30 len (0x02 len_r r) (0x02 len_s s)`.
    pub fn der(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for component in [&self.r, &self.s] {
            let bytes = Self::der_minimal_int(component);
            body.push(0x02);
            body.push(bytes.len() as u8);
            body.extend_from_slice(&bytes);
        }
        let mut out = vec![0x30, body.len() as u8];
        out.extend_from_slice(&body);
        out
    }

    /// Parses a DER-encoded signature, strictly validating the sequence and
    /// integer length fields.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let tag = take_bytes(&mut cursor, 1)?[0];
        if tag != 0x30 {
            return Err(Error::Format("DER signature must start with 0x30".into()));
        }
        let length = take_bytes(&mut cursor, 1)?[0] as usize;
        if length + 2 != bytes.len() {
            return Err(Error::Format("DER signature length mismatch".into()));
        }
        let marker = take_bytes(&mut cursor, 1)?[0];
        if marker != 0x02 {
            return Err(Error::Format("expected DER integer marker for r".into()));
        }
        let r_len = take_bytes(&mut cursor, 1)?[0] as usize;
        let r = BigUint::from_bytes_be(take_bytes(&mut cursor, r_len)?);
        let marker = take_bytes(&mut cursor, 1)?[0];
        if marker != 0x02 {
            return Err(Error::Format("expected DER integer marker for s".into()));
        }
        let s_len = take_bytes(&mut cursor, 1)?[0] as usize;
        let s = BigUint::from_bytes_be(take_bytes(&mut cursor, s_len)?);
        if bytes.len() != 6 + r_len + s_len {
            return Err(Error::Format("DER signature has trailing data".into()));
        }
        Ok(Self { r, s })
    }
}

/// A secp256k1 private key: a scalar `e` with `1 <= e < n`, plus its cached
/// public key `P = eG` (invariant K1).
#[derive(Clone, Debug)]
pub struct PrivateKey {
    secret: BigUint,
    public: PublicKey,
}

impl PrivateKey {
    /// Constructs a private key, deriving and caching its public key.
    pub fn new(secret: BigUint) -> Result<Self> {
        let n = secp256k1::n();
        if secret.is_zero() || secret >= n {
            return Err(Error::Domain("private key must satisfy 1 <= e < n".into()));
        }
        let point = secp256k1::generator().scalar_mul(&secret)?;
        let public = PublicKey::from_point(point)?;
        Ok(Self { secret, public })
    }

    /// The cached public key `P = eG`.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Renders the secret as a 64-hex-digit zero-padded string.
    pub fn hex(&self) -> String {
        format!("{:0>64}", self.secret.to_str_radix(16))
    }

    /// Signs digest `z` with a deterministic RFC 6979 nonce, returning a
    /// low-s (BIP 62) signature.
    pub fn sign(&self, z: &BigUint) -> Signature {
        let n = secp256k1::n();
        loop {
            let k = self.deterministic_k(z);
            let r_point = secp256k1::generator()
                .scalar_mul(&k)
                .expect("k is reduced mod n by construction");
            let r = r_point.x().expect("generator scalar mul is never infinity for 0<k<n").num().clone();
            if r.is_zero() {
                continue;
            }
            let k_inv = k.modpow(&(&n - 2u32), &n);
            let mut s = ((z + &r * &self.secret) * &k_inv) % &n;
            if s.is_zero() {
                continue;
            }
            let half_n = &n / 2u32;
            if s > half_n {
                s = &n - &s;
            }
            return Signature::new(r, s).expect("r, s reduced mod n are in range");
        }
    }

    /// RFC 6979 deterministic nonce derivation via repeated HMAC-SHA-256,
    /// seeded on `(secret, z)`.
    fn deterministic_k(&self, z: &BigUint) -> BigUint {
        let n = secp256k1::n();
        let z = if z > &n { z - &n } else { z.clone() };
        let z_bytes = to_bytes_be_fixed(&z, 32);
        let secret_bytes = to_bytes_be_fixed(&self.secret, 32);

        let mut k = [0u8; 32];
        let mut v = [1u8; 32];

        let mut data = Vec::with_capacity(32 + 1 + 32 + 32);
        data.extend_from_slice(&v);
        data.push(0x00);
        data.extend_from_slice(&secret_bytes);
        data.extend_from_slice(&z_bytes);
        k = hmac_sha256(&k, &data);
        v = hmac_sha256(&k, &v);

        data.clear();
        data.extend_from_slice(&v);
        data.push(0x01);
        data.extend_from_slice(&secret_bytes);
        data.extend_from_slice(&z_bytes);
        k = hmac_sha256(&k, &data);
        v = hmac_sha256(&k, &v);

        loop {
            v = hmac_sha256(&k, &v);
            let candidate = BigUint::from_bytes_be(&v);
            if !candidate.is_zero() && candidate < n {
                return candidate;
            }
            let mut retry = Vec::with_capacity(33);
            retry.extend_from_slice(&v);
            retry.push(0x00);
            k = hmac_sha256(&k, &retry);
            v = hmac_sha256(&k, &v);
        }
    }

    /// Encodes this private key in Wallet Import Format.
    pub fn wif(&self, compressed: bool, testnet: bool) -> String {
        let mut payload = vec![if testnet { 0xef } else { 0x80 }];
        payload.extend_from_slice(&to_bytes_be_fixed(&self.secret, 32));
        if compressed {
            payload.push(0x01);
        }
        encode_base58_checksum(&payload)
    }

    /// Decodes a private key from Wallet Import Format.
    pub fn from_wif(wif: &str) -> Result<Self> {
        let combined = decode_base58_checksum(wif)?;
        let _testnet = match combined.first() {
            Some(0xef) => true,
            Some(0x80) => false,
            Some(other) => return Err(Error::Format(format!("invalid WIF prefix: {other:#04x}"))),
            None => return Err(Error::Format("empty WIF payload".into())),
        };
        let secret_bin = match combined.len() {
            34 => {
                if combined[33] != 0x01 {
                    return Err(Error::Format("invalid WIF compression suffix".into()));
                }
                &combined[1..33]
            }
            33 => &combined[1..33],
            other => return Err(Error::Format(format!("invalid WIF payload length: {other}"))),
        };
        Self::new(BigUint::from_bytes_be(secret_bin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use num_traits::One;

    #[test]
    fn deterministic_sign_verify_known_vector() {
        let sk = PrivateKey::new(BigUint::from(1u32)).unwrap();
        let z = BigUint::from_bytes_be(&sha256(b"Programming Bitcoin!"));
        let sig = sk.sign(&z);
        assert!(sk.public_key().verify(&z, &sig));
    }

    #[test]
    fn low_s_is_enforced() {
        let sk = PrivateKey::new(BigUint::from(12345u32)).unwrap();
        let z = BigUint::from_bytes_be(&sha256(b"low-s check"));
        let sig = sk.sign(&z);
        assert!(sig.s() <= &(secp256k1::n() / 2u32));
    }

    #[test]
    fn sec_round_trips_both_forms() {
        let sk = PrivateKey::new(BigUint::from(999u32)).unwrap();
        for compressed in [true, false] {
            let sec = sk.public_key().sec(compressed);
            let parsed = PublicKey::from_sec(&sec).unwrap();
            assert_eq!(&parsed, sk.public_key());
        }
    }

    #[test]
    fn wif_round_trips() {
        let sk = PrivateKey::new(BigUint::from(424242u32)).unwrap();
        for compressed in [true, false] {
            for testnet in [true, false] {
                let wif = sk.wif(compressed, testnet);
                let parsed = PrivateKey::from_wif(&wif).unwrap();
                assert_eq!(parsed.secret, sk.secret);
            }
        }
    }

    #[test]
    fn der_round_trips() {
        let sk = PrivateKey::new(BigUint::from(7u32)).unwrap();
        let z = BigUint::from_bytes_be(&sha256(b"der check"));
        let sig = sk.sign(&z);
        let der = sig.der();
        assert_eq!(Signature::from_der(&der).unwrap(), sig);
    }

    #[test]
    fn known_compressed_mainnet_address() {
        let secret = BigUint::from(888u32).pow(3);
        let sk = PrivateKey::new(secret).unwrap();
        assert_eq!(
            sk.public_key().address(true, false),
            "148dY81A9BmdpMhvYEVznrM45kWN32vSCN"
        );
        assert_eq!(
            sk.public_key().address(true, true),
            "mieaqB68xDCtbUBYFoUNcmZNwk74xcBfTP"
        );
    }

    #[test]
    fn known_wif() {
        let secret = BigUint::from(2u32).pow(256) - BigUint::from(2u32).pow(199);
        let sk = PrivateKey::new(secret).unwrap();
        assert_eq!(
            sk.wif(true, false),
            "L5oLkpV3aqBJ4BgssVAsax1iRa77G5CVYnv9adQ6Z87te7TyUdSC"
        );
    }

    #[test]
    fn verify_rejects_out_of_range_r_s() {
        let sk = PrivateKey::new(BigUint::from(55u32)).unwrap();
        let z = BigUint::from_bytes_be(&sha256(b"range check"));
        let bad = Signature { r: BigUint::zero(), s: BigUint::one() };
        assert!(!sk.public_key().verify(&z, &bad));
    }
}
