//! secp256k1 curve specialization: fixed constants, scalar-mod-n reduction,
//! and the `(p+1)/4` square root shortcut.
//!
//! Grounded on `modified_src/ecc.py`'s `SECP256K1` profile, `S256FieldElem`,
//! and `S256Point`.

use num_bigint::BigUint;
use num_traits::Num;
use once_cell::sync::Lazy;

use crate::error::Result;
use crate::field::FieldElement;
use crate::point::Point;

/// Hex-encoded field prime `p = 2^256 - 2^32 - 977`.
pub const P_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F";
/// Hex-encoded group order `n`.
pub const N_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141";
/// Hex-encoded generator x-coordinate.
pub const GX_HEX: &str = "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";
/// Hex-encoded generator y-coordinate.
pub const GY_HEX: &str = "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8";

fn biguint_from_hex(hex: &str) -> BigUint {
    BigUint::from_str_radix(hex, 16).expect("constant is valid hex")
}

static P: Lazy<BigUint> = Lazy::new(|| biguint_from_hex(P_HEX));
static N: Lazy<BigUint> = Lazy::new(|| biguint_from_hex(N_HEX));
static GX: Lazy<BigUint> = Lazy::new(|| biguint_from_hex(GX_HEX));
static GY: Lazy<BigUint> = Lazy::new(|| biguint_from_hex(GY_HEX));

/// The secp256k1 field prime.
pub fn p() -> BigUint {
    P.clone()
}

/// The secp256k1 group order.
pub fn n() -> BigUint {
    N.clone()
}

/// Builds a secp256k1 field element from an integer. The value must already
/// be in `[0, p)`, matching the original `S256FieldElem.__init__` contract.
pub fn field_element(num: BigUint) -> Result<FieldElement> {
    FieldElement::new(num, p())
}

/// The curve constant `a = 0` in the secp256k1 field.
pub fn curve_a() -> FieldElement {
    field_element(BigUint::from(0u32)).expect("0 is in range")
}

/// The curve constant `b = 7` in the secp256k1 field.
pub fn curve_b() -> FieldElement {
    field_element(BigUint::from(7u32)).expect("7 is in range")
}

/// The secp256k1 generator point `G`.
pub fn generator() -> Point {
    Point::affine(
        field_element(GX.clone()).expect("Gx is in range"),
        field_element(GY.clone()).expect("Gy is in range"),
        curve_a(),
        curve_b(),
    )
    .expect("G is on the curve by construction")
}

/// Reduces an arbitrary non-negative integer scalar mod `n`, as secp256k1
/// scalar multiplication always does (invariant F3).
pub fn reduce_scalar(k: &BigUint) -> BigUint {
    k % n()
}

/// Computes `v.sqrt()` in the secp256k1 field via `v^((p+1)/4)`, valid
/// because `p ≡ 3 (mod 4)`.
pub fn sqrt(v: &FieldElement) -> FieldElement {
    let exponent = (p() + BigUint::from(1u32)) / BigUint::from(4u32);
    v.pow(&num_bigint::BigInt::from(exponent))
}

/// Renders a field element as a 64-hex-digit zero-padded string, the
/// secp256k1-specific `__repr__` convention from the original source.
pub fn field_element_hex(v: &FieldElement) -> String {
    format!("{:0>64}", v.num().to_str_radix(16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_order_annihilates_generator() {
        let g = generator();
        let result = g.scalar_mul(&n()).unwrap();
        assert!(result.is_infinity());
    }

    #[test]
    fn scalar_reduction_mod_n_preserves_product() {
        let g = generator();
        let k = n() + BigUint::from(5u32);
        let reduced = reduce_scalar(&k);
        assert_eq!(g.scalar_mul(&k).unwrap(), g.scalar_mul(&reduced).unwrap());
    }

    #[test]
    fn sqrt_squares_back_to_input() {
        let v = field_element(BigUint::from(12345u32)).unwrap();
        let v_squared = v.mul(&v).unwrap();
        let root = sqrt(&v_squared);
        assert_eq!(root.mul(&root).unwrap(), v_squared);
    }

    #[test]
    fn generator_hex_constants_are_on_curve() {
        assert!(!generator().is_infinity());
    }
}
