//! KoalaBear prime field arithmetic.
//!
//! This module provides arithmetic in the prime field of order
//! `p = 2^31 - 2^24 + 1`.  The [`Fr`](struct.Fr.html) type stores its value in
//! Montgomery form (`a·R mod p` with `R = 2^32`) so that a multiplication costs
//! one 64-bit product and one reduction.  All operations keep their result in
//! the canonical range `[0, p)`, which makes the derived equality sound.
//!
//! The multiplicative group has order `2^24 · 127`, so the field supports
//! radix-2 NTTs up to size `2^24`.

use std::fmt;
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The field modulus `2^31 - 2^24 + 1`.
pub const MODULUS: u32 = 0x7f00_0001;

/// Number of bytes used by the canonical encoding of an element.
pub const BYTES: usize = 4;

/// Number of significant bits of the modulus.
pub const BITS: usize = 31;

/// `-p^{-1} mod 2^32`.
const MU: u32 = 0x7eff_ffff;

/// `2^32 mod p`, i.e. the Montgomery form of one.
const R_MOD_P: u32 = 0x01ff_fffe;

/// `2^64 mod p`, used to enter Montgomery form.
const R2_MOD_P: u32 = ((R_MOD_P as u64 * R_MOD_P as u64) % MODULUS as u64) as u32;

#[inline]
const fn mont_reduce(t: u64) -> u32 {
    let m = (t as u32).wrapping_mul(MU);
    let u = ((t + m as u64 * MODULUS as u64) >> 32) as u32;
    if u >= MODULUS {
        u - MODULUS
    } else {
        u
    }
}

/// An element of the KoalaBear field.
///
/// The wrapped integer is the Montgomery representation; use
/// [`Fr::as_canonical_u32`] to read the actual value.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Fr(u32);

impl Fr {
    /// The additive identity.
    pub const ZERO: Fr = Fr(0);
    /// The multiplicative identity.
    pub const ONE: Fr = Fr(R_MOD_P);
    /// A generator of the full multiplicative group.
    pub const GENERATOR: Fr = Fr::from_canonical_u32(3);
    /// Largest `k` such that `2^k` divides `p - 1`.
    pub const TWO_ADICITY: u32 = 24;

    /// Builds an element from any `u64`, reducing it modulo `p`.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Fr::from_canonical_u32((value % MODULUS as u64) as u32)
    }

    /// Builds an element from a value that is reduced modulo `p` first.
    #[inline]
    pub const fn from_canonical_u32(value: u32) -> Self {
        let v = value % MODULUS;
        Fr(mont_reduce(v as u64 * R2_MOD_P as u64))
    }

    /// Builds an element from a signed integer.
    pub fn from_i64(value: i64) -> Self {
        let reduced = value.rem_euclid(MODULUS as i64);
        Fr::new(reduced as u64)
    }

    /// Returns the canonical integer in `[0, p)`.
    #[inline]
    pub const fn as_canonical_u32(&self) -> u32 {
        mont_reduce(self.0 as u64)
    }

    /// Returns `true` for the zero element.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Samples a uniformly random element.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Fr::from_canonical_u32(rng.gen_range(0..MODULUS))
    }

    /// Doubles the element.
    #[inline]
    pub fn double(&self) -> Self {
        *self + *self
    }

    /// Squares the element.
    #[inline]
    pub fn square(&self) -> Self {
        *self * *self
    }

    /// Divides the element by two.
    #[inline]
    pub fn halve(&self) -> Self {
        let v = self.0;
        if v & 1 == 0 {
            Fr(v >> 1)
        } else {
            // v + p is even and below 2^32
            Fr((v + MODULUS) >> 1)
        }
    }

    /// Multiplies the element by `2^{-n}`.
    pub fn mul_2exp_neg_n(&self, n: u32) -> Self {
        (0..n).fold(*self, |acc, _| acc.halve())
    }

    /// Exponentiates the element by `e`.
    pub fn pow(&self, mut e: u64) -> Self {
        let mut base = *self;
        let mut result = Fr::ONE;
        while e > 0 {
            if e & 1 == 1 {
                result *= base;
            }
            base = base.square();
            e >>= 1;
        }
        result
    }

    /// Computes the multiplicative inverse, or `None` for zero.
    ///
    /// Uses Fermat's little theorem: `a^(p-2) mod p`.
    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        Some(self.pow(MODULUS as u64 - 2))
    }

    /// Inverts every element of `values` with a single field inversion.
    ///
    /// Zero entries are mapped to zero, matching the convention used by the
    /// batch inversion of the extension field.
    pub fn batch_inverse(values: &[Fr]) -> Vec<Fr> {
        let mut res = vec![Fr::ZERO; values.len()];
        let mut acc = Fr::ONE;
        for (r, v) in res.iter_mut().zip(values) {
            if v.is_zero() {
                continue;
            }
            *r = acc;
            acc *= *v;
        }
        // acc is a product of non-zero elements
        let mut inv = acc.inverse().unwrap_or(Fr::ZERO);
        for (r, v) in res.iter_mut().zip(values).rev() {
            if v.is_zero() {
                continue;
            }
            *r *= inv;
            inv *= *v;
        }
        res
    }

    /// Returns a primitive root of unity of the given power-of-two order.
    ///
    /// Returns `None` if `order` is not a power of two or exceeds `2^24`.
    pub fn root_of_unity(order: u64) -> Option<Self> {
        if !order.is_power_of_two() || order.trailing_zeros() > Self::TWO_ADICITY {
            return None;
        }
        Some(Self::GENERATOR.pow((MODULUS as u64 - 1) / order))
    }

    /// Encodes the canonical value as 4 big-endian bytes.
    #[inline]
    pub fn to_bytes_be(&self) -> [u8; BYTES] {
        self.as_canonical_u32().to_be_bytes()
    }

    /// Encodes the canonical value as 4 little-endian bytes.
    #[inline]
    pub fn to_bytes_le(&self) -> [u8; BYTES] {
        self.as_canonical_u32().to_le_bytes()
    }

    /// Decodes 4 big-endian bytes, rejecting non-canonical values.
    pub fn from_bytes_be(bytes: [u8; BYTES]) -> Option<Self> {
        let v = u32::from_be_bytes(bytes);
        (v < MODULUS).then(|| Fr::from_canonical_u32(v))
    }

    /// Interprets an arbitrary big-endian byte string as an integer and
    /// reduces it modulo `p`.
    pub fn from_bytes_be_reduce(bytes: &[u8]) -> Self {
        let p = MODULUS as u64;
        let v = bytes
            .iter()
            .fold(0u64, |acc, &b| ((acc << 8) | b as u64) % p);
        Fr::new(v)
    }
}

impl fmt::Debug for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fr({})", self.as_canonical_u32())
    }
}

impl fmt::Display for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_canonical_u32())
    }
}

impl From<u32> for Fr {
    fn from(value: u32) -> Self {
        Fr::from_canonical_u32(value)
    }
}

impl From<u64> for Fr {
    fn from(value: u64) -> Self {
        Fr::new(value)
    }
}

impl Add for Fr {
    type Output = Fr;

    #[inline]
    fn add(self, rhs: Fr) -> Fr {
        // both operands are below 2^31, the sum fits in a u32
        let s = self.0 + rhs.0;
        Fr(if s >= MODULUS { s - MODULUS } else { s })
    }
}

impl Sub for Fr {
    type Output = Fr;

    #[inline]
    fn sub(self, rhs: Fr) -> Fr {
        if self.0 >= rhs.0 {
            Fr(self.0 - rhs.0)
        } else {
            Fr(self.0 + MODULUS - rhs.0)
        }
    }
}

impl Mul for Fr {
    type Output = Fr;

    #[inline]
    fn mul(self, rhs: Fr) -> Fr {
        Fr(mont_reduce(self.0 as u64 * rhs.0 as u64))
    }
}

impl Neg for Fr {
    type Output = Fr;

    #[inline]
    fn neg(self) -> Fr {
        if self.0 == 0 {
            self
        } else {
            Fr(MODULUS - self.0)
        }
    }
}

impl AddAssign for Fr {
    #[inline]
    fn add_assign(&mut self, rhs: Fr) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fr {
    #[inline]
    fn sub_assign(&mut self, rhs: Fr) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fr {
    #[inline]
    fn mul_assign(&mut self, rhs: Fr) {
        *self = *self * rhs;
    }
}

impl Sum for Fr {
    fn sum<I: Iterator<Item = Fr>>(iter: I) -> Fr {
        iter.fold(Fr::ZERO, |acc, x| acc + x)
    }
}

impl Product for Fr {
    fn product<I: Iterator<Item = Fr>>(iter: I) -> Fr {
        iter.fold(Fr::ONE, |acc, x| acc * x)
    }
}

impl Serialize for Fr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_canonical_u32())
    }
}

impl<'de> Deserialize<'de> for Fr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u32::deserialize(deserializer)?;
        if v >= MODULUS {
            return Err(serde::de::Error::custom(format!(
                "field element {v} is not below the modulus"
            )));
        }
        Ok(Fr::from_canonical_u32(v))
    }
}
