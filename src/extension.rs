//! Degree-four extension of the KoalaBear field.
//!
//! The extension is built as a tower: `E2 = Fr[u]/(u² - 3)` and
//! `E4 = E2[v]/(v² - u)`.  Verifier challenges (`α`, the evaluation point)
//! live in `E4` so that the soundness error is driven by a ~124-bit field
//! while the committed data stays in the 31-bit base field.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::field::Fr;

/// Quadratic non-residue defining `E2`.
const NON_RESIDUE: u64 = 3;

#[inline]
fn mul_by_non_residue(a: Fr) -> Fr {
    a * Fr::new(NON_RESIDUE)
}

/// An element `a0 + a1·u` of the quadratic extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2 {
    /// Constant coordinate.
    pub a0: Fr,
    /// Coordinate of `u`.
    pub a1: Fr,
}

impl E2 {
    /// The additive identity.
    pub const ZERO: E2 = E2 {
        a0: Fr::ZERO,
        a1: Fr::ZERO,
    };
    /// The multiplicative identity.
    pub const ONE: E2 = E2 {
        a0: Fr::ONE,
        a1: Fr::ZERO,
    };

    /// Returns `true` for the zero element.
    pub fn is_zero(&self) -> bool {
        self.a0.is_zero() && self.a1.is_zero()
    }

    /// Multiplies by a base field element.
    #[inline]
    pub fn mul_by_base(&self, s: Fr) -> E2 {
        E2 {
            a0: self.a0 * s,
            a1: self.a1 * s,
        }
    }

    /// Multiplies by `u`, the non-residue generating `E4` over `E2`.
    #[inline]
    pub fn mul_by_non_residue(&self) -> E2 {
        E2 {
            a0: mul_by_non_residue(self.a1),
            a1: self.a0,
        }
    }

    /// Squares the element.
    pub fn square(&self) -> E2 {
        *self * *self
    }

    /// Computes the inverse, or `None` for zero.
    pub fn inverse(&self) -> Option<E2> {
        // (a0 + a1 u)^-1 = (a0 - a1 u) / (a0² - 3 a1²)
        let norm = self.a0.square() - mul_by_non_residue(self.a1.square());
        let inv = norm.inverse()?;
        Some(E2 {
            a0: self.a0 * inv,
            a1: -(self.a1 * inv),
        })
    }
}

impl Add for E2 {
    type Output = E2;

    #[inline]
    fn add(self, rhs: E2) -> E2 {
        E2 {
            a0: self.a0 + rhs.a0,
            a1: self.a1 + rhs.a1,
        }
    }
}

impl Sub for E2 {
    type Output = E2;

    #[inline]
    fn sub(self, rhs: E2) -> E2 {
        E2 {
            a0: self.a0 - rhs.a0,
            a1: self.a1 - rhs.a1,
        }
    }
}

impl Neg for E2 {
    type Output = E2;

    #[inline]
    fn neg(self) -> E2 {
        E2 {
            a0: -self.a0,
            a1: -self.a1,
        }
    }
}

impl Mul for E2 {
    type Output = E2;

    #[inline]
    fn mul(self, rhs: E2) -> E2 {
        // Karatsuba
        let b = self.a0 * rhs.a0;
        let c = self.a1 * rhs.a1;
        let a = (self.a0 + self.a1) * (rhs.a0 + rhs.a1);
        E2 {
            a0: b + mul_by_non_residue(c),
            a1: a - b - c,
        }
    }
}

/// An element `b0 + b1·v` of the quartic extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct E4 {
    /// Constant coordinate.
    pub b0: E2,
    /// Coordinate of `v`.
    pub b1: E2,
}

impl E4 {
    /// The additive identity.
    pub const ZERO: E4 = E4 {
        b0: E2::ZERO,
        b1: E2::ZERO,
    };
    /// The multiplicative identity.
    pub const ONE: E4 = E4 {
        b0: E2::ONE,
        b1: E2::ZERO,
    };

    /// Embeds a base field element.
    #[inline]
    pub fn from_base(s: Fr) -> E4 {
        E4 {
            b0: E2 {
                a0: s,
                a1: Fr::ZERO,
            },
            b1: E2::ZERO,
        }
    }

    /// Builds an element from its four base coordinates
    /// `[b0.a0, b0.a1, b1.a0, b1.a1]`.
    pub fn from_coords(c: [Fr; 4]) -> E4 {
        E4 {
            b0: E2 { a0: c[0], a1: c[1] },
            b1: E2 { a0: c[2], a1: c[3] },
        }
    }

    /// Returns the four base coordinates `[b0.a0, b0.a1, b1.a0, b1.a1]`.
    pub fn coords(&self) -> [Fr; 4] {
        [self.b0.a0, self.b0.a1, self.b1.a0, self.b1.a1]
    }

    /// Samples a uniformly random element.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> E4 {
        E4::from_coords([
            Fr::random(rng),
            Fr::random(rng),
            Fr::random(rng),
            Fr::random(rng),
        ])
    }

    /// Returns `true` for the zero element.
    pub fn is_zero(&self) -> bool {
        self.b0.is_zero() && self.b1.is_zero()
    }

    /// Multiplies by a base field element.
    #[inline]
    pub fn mul_by_base(&self, s: Fr) -> E4 {
        E4 {
            b0: self.b0.mul_by_base(s),
            b1: self.b1.mul_by_base(s),
        }
    }

    /// Squares the element.
    pub fn square(&self) -> E4 {
        *self * *self
    }

    /// Exponentiates the element by `e`.
    pub fn pow(&self, mut e: u64) -> E4 {
        let mut base = *self;
        let mut result = E4::ONE;
        while e > 0 {
            if e & 1 == 1 {
                result *= base;
            }
            base = base.square();
            e >>= 1;
        }
        result
    }

    /// Computes the inverse, or `None` for zero.
    pub fn inverse(&self) -> Option<E4> {
        // (b0 + b1 v)^-1 = (b0 - b1 v) / (b0² - u b1²)
        let norm = self.b0.square() - self.b1.square().mul_by_non_residue();
        let inv = norm.inverse()?;
        Some(E4 {
            b0: self.b0 * inv,
            b1: -(self.b1 * inv),
        })
    }

    /// Inverts every element with a single extension inversion; zero entries
    /// stay zero.
    pub fn batch_inverse(values: &[E4]) -> Vec<E4> {
        let mut res = vec![E4::ZERO; values.len()];
        let mut acc = E4::ONE;
        for (r, v) in res.iter_mut().zip(values) {
            if v.is_zero() {
                continue;
            }
            *r = acc;
            acc *= *v;
        }
        let mut inv = acc.inverse().unwrap_or(E4::ZERO);
        for (r, v) in res.iter_mut().zip(values).rev() {
            if v.is_zero() {
                continue;
            }
            *r *= inv;
            inv *= *v;
        }
        res
    }
}

impl fmt::Display for E4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{}*u+({}+{}*u)*v",
            self.b0.a0, self.b0.a1, self.b1.a0, self.b1.a1
        )
    }
}

impl From<Fr> for E4 {
    fn from(s: Fr) -> E4 {
        E4::from_base(s)
    }
}

impl Add for E4 {
    type Output = E4;

    #[inline]
    fn add(self, rhs: E4) -> E4 {
        E4 {
            b0: self.b0 + rhs.b0,
            b1: self.b1 + rhs.b1,
        }
    }
}

impl Sub for E4 {
    type Output = E4;

    #[inline]
    fn sub(self, rhs: E4) -> E4 {
        E4 {
            b0: self.b0 - rhs.b0,
            b1: self.b1 - rhs.b1,
        }
    }
}

impl Neg for E4 {
    type Output = E4;

    #[inline]
    fn neg(self) -> E4 {
        E4 {
            b0: -self.b0,
            b1: -self.b1,
        }
    }
}

impl Mul for E4 {
    type Output = E4;

    #[inline]
    fn mul(self, rhs: E4) -> E4 {
        let b = self.b0 * rhs.b0;
        let c = self.b1 * rhs.b1;
        let a = (self.b0 + self.b1) * (rhs.b0 + rhs.b1);
        E4 {
            b0: b + c.mul_by_non_residue(),
            b1: a - b - c,
        }
    }
}

impl AddAssign for E4 {
    #[inline]
    fn add_assign(&mut self, rhs: E4) {
        *self = *self + rhs;
    }
}

impl SubAssign for E4 {
    #[inline]
    fn sub_assign(&mut self, rhs: E4) {
        *self = *self - rhs;
    }
}

impl MulAssign for E4 {
    #[inline]
    fn mul_assign(&mut self, rhs: E4) {
        *self = *self * rhs;
    }
}
