//! Generic elliptic-curve point arithmetic over `y^2 = x^3 + ax + b`.
//!
//! Grounded on `modified_src/ecc.py`'s `ECPoint`. Per the design notes the
//! point-at-infinity sentinel (`x = None, y = None` in the original) is
//! modeled as a tagged variant rather than nullable coordinates, the way the
//! teacher's `k256::arithmetic::projective::ProjectivePoint` separates the
//! identity from affine coordinates instead of using nullable fields.

use crate::error::{Error, Result};
use crate::field::FieldElement;

/// A point on a short Weierstrass curve `y^2 = x^3 + ax + b`, or the point
/// at infinity (the group identity).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Point {
    /// The additive identity.
    Infinity {
        /// First curve constant, carried even at infinity so addition can
        /// reject mismatched curves.
        a: FieldElement,
        /// Second curve constant.
        b: FieldElement,
    },
    /// An affine point known to lie on the curve.
    Affine {
        /// x-coordinate.
        x: FieldElement,
        /// y-coordinate.
        y: FieldElement,
        /// First curve constant.
        a: FieldElement,
        /// Second curve constant.
        b: FieldElement,
    },
}

impl Point {
    /// Constructs the point at infinity for curve `(a, b)`.
    pub fn infinity(a: FieldElement, b: FieldElement) -> Self {
        Point::Infinity { a, b }
    }

    /// Constructs an affine point, checking `y^2 = x^3 + ax + b`.
    pub fn affine(x: FieldElement, y: FieldElement, a: FieldElement, b: FieldElement) -> Result<Self> {
        let lhs = y.mul(&y)?;
        let rhs = x.mul(&x)?.mul(&x)?.add(&a.mul(&x)?)?.add(&b)?;
        if lhs != rhs {
            return Err(Error::Domain(format!("({x}, {y}) is not on the curve")));
        }
        Ok(Point::Affine { x, y, a, b })
    }

    fn curve(&self) -> (&FieldElement, &FieldElement) {
        match self {
            Point::Infinity { a, b } | Point::Affine { a, b, .. } => (a, b),
        }
    }

    /// `true` if this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity { .. })
    }

    /// x-coordinate, if not infinity.
    pub fn x(&self) -> Option<&FieldElement> {
        match self {
            Point::Affine { x, .. } => Some(x),
            Point::Infinity { .. } => None,
        }
    }

    /// y-coordinate, if not infinity.
    pub fn y(&self) -> Option<&FieldElement> {
        match self {
            Point::Affine { y, .. } => Some(y),
            Point::Infinity { .. } => None,
        }
    }

    /// Point addition. See spec §4.2 for the five cases this implements:
    /// identity, vertical tangent, doubling, vertical secant (inverse pair),
    /// and the general chord case.
    pub fn add(&self, other: &Self) -> Result<Self> {
        let (a1, b1) = self.curve();
        let (a2, b2) = other.curve();
        if a1 != a2 || b1 != b2 {
            return Err(Error::Domain("points are not on the same curve".into()));
        }

        let (x1, y1) = match (self.x(), self.y()) {
            (Some(x), Some(y)) => (x, y),
            _ => return Ok(other.clone()),
        };
        let (x2, y2) = match (other.x(), other.y()) {
            (Some(x), Some(y)) => (x, y),
            _ => return Ok(self.clone()),
        };

        if x1 == x2 && y1 != y2 {
            // Vertical secant: inverse points sum to infinity.
            return Ok(Point::infinity(a1.clone(), b1.clone()));
        }

        if self == other {
            if y1.is_zero() {
                // Vertical tangent at a root of the curve equation.
                return Ok(Point::infinity(a1.clone(), b1.clone()));
            }
            let slope = x1
                .mul(x1)?
                .scalar_mul(3)
                .add(a1)?
                .div(&y1.scalar_mul(2))?;
            let x3 = slope.mul(&slope)?.sub(&x1.scalar_mul(2))?;
            let y3 = slope.mul(&x1.sub(&x3)?)?.sub(y1)?;
            return Point::affine(x3, y3, a1.clone(), b1.clone());
        }

        if x1 == x2 {
            return Ok(Point::infinity(a1.clone(), b1.clone()));
        }

        let slope = y2.sub(y1)?.div(&x2.sub(x1)?)?;
        let x3 = slope.mul(&slope)?.sub(x1)?.sub(x2)?;
        let y3 = slope.mul(&x1.sub(&x3)?)?.sub(y1)?;
        Point::affine(x3, y3, a1.clone(), b1.clone())
    }

    /// Scalar multiplication by double-and-add over the binary expansion of
    /// `coefficient`.
    pub fn scalar_mul(&self, coefficient: &num_bigint::BigUint) -> Result<Self> {
        use num_traits::Zero;
        let (a, b) = self.curve();
        let mut product = Point::infinity(a.clone(), b.clone());
        let mut doubling = self.clone();
        let mut coef = coefficient.clone();
        let one = num_bigint::BigUint::from(1u32);
        while !coef.is_zero() {
            if &coef & &one == one {
                product = product.add(&doubling)?;
            }
            doubling = doubling.add(&doubling)?;
            coef >>= 1u32;
        }
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn fe(num: u64, prime: u64) -> FieldElement {
        FieldElement::new(BigUint::from(num), BigUint::from(prime)).unwrap()
    }

    fn curve223(x: u64, y: u64) -> Result<Point> {
        Point::affine(fe(x, 223), fe(y, 223), fe(0, 223), fe(7, 223))
    }

    #[test]
    fn points_on_and_off_curve() {
        assert!(curve223(192, 105).is_ok());
        assert!(curve223(17, 56).is_ok());
        assert!(curve223(200, 119).is_err());
    }

    #[test]
    fn addition_matches_known_vector() {
        let p1 = curve223(192, 105).unwrap();
        let p2 = curve223(17, 56).unwrap();
        let sum = p1.add(&p2).unwrap();
        assert_eq!(sum, curve223(170, 142).unwrap());
    }

    #[test]
    fn scalar_mul_reaches_infinity() {
        let p = curve223(47, 71).unwrap();
        let result = p.scalar_mul(&BigUint::from(21u32)).unwrap();
        assert!(result.is_infinity());
    }

    #[test]
    fn identity_and_inverse_laws() {
        let p = curve223(192, 105).unwrap();
        let (a, b) = p.curve();
        let o = Point::infinity(a.clone(), b.clone());
        assert_eq!(p.add(&o).unwrap(), p);
        let neg = Point::affine(
            p.x().unwrap().clone(),
            p.y().unwrap().neg(),
            a.clone(),
            b.clone(),
        )
        .unwrap();
        assert!(p.add(&neg).unwrap().is_infinity());
    }
}
