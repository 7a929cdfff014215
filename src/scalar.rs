//! Scalar abstraction shared by the base field and its extension.
//!
//! Polynomial evaluation and codeword checks are written once against
//! [`RingScalar`] and instantiated with either [`Fr`] or [`E4`].

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::extension::E4;
use crate::field::Fr;

/// A commutative ring element that is a vector space over [`Fr`].
pub trait RingScalar:
    Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// The additive identity.
    const ZERO: Self;
    /// The multiplicative identity.
    const ONE: Self;
    /// Dimension over the base field.
    const DEGREE: usize;

    /// Multiplies by a base field element.
    fn mul_base(&self, s: Fr) -> Self;

    /// Embeds the value into `E4`.
    fn lift(&self) -> E4;

    /// Multiplies by an extension element, returning the product in `E4`.
    fn scale_ext(&self, e: &E4) -> E4;

    /// Returns the `i`-th base coordinate.
    fn coord(&self, i: usize) -> Fr;

    /// Overwrites the `i`-th base coordinate.
    fn set_coord(&mut self, i: usize, value: Fr);

    /// Returns `true` for zero.
    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl RingScalar for Fr {
    const ZERO: Fr = Fr::ZERO;
    const ONE: Fr = Fr::ONE;
    const DEGREE: usize = 1;

    #[inline]
    fn mul_base(&self, s: Fr) -> Fr {
        *self * s
    }

    #[inline]
    fn lift(&self) -> E4 {
        E4::from_base(*self)
    }

    #[inline]
    fn scale_ext(&self, e: &E4) -> E4 {
        e.mul_by_base(*self)
    }

    #[inline]
    fn coord(&self, _i: usize) -> Fr {
        *self
    }

    #[inline]
    fn set_coord(&mut self, _i: usize, value: Fr) {
        *self = value;
    }
}

impl RingScalar for E4 {
    const ZERO: E4 = E4::ZERO;
    const ONE: E4 = E4::ONE;
    const DEGREE: usize = 4;

    #[inline]
    fn mul_base(&self, s: Fr) -> E4 {
        self.mul_by_base(s)
    }

    #[inline]
    fn lift(&self) -> E4 {
        *self
    }

    #[inline]
    fn scale_ext(&self, e: &E4) -> E4 {
        *self * *e
    }

    #[inline]
    fn coord(&self, i: usize) -> Fr {
        self.coords()[i]
    }

    fn set_coord(&mut self, i: usize, value: Fr) {
        let mut c = self.coords();
        c[i] = value;
        *self = E4::from_coords(c);
    }
}
