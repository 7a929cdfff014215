//! Radix-2 number-theoretic transforms over KoalaBear.
//!
//! A [`Domain`] of size `n` is the subgroup generated by a primitive `n`-th
//! root of unity `ω`, optionally translated by a coset shift `s`.  Two
//! decimations are provided:
//!
//! * [`Decimation::Dif`] (Gentleman–Sande) reads its input in natural order
//!   and writes its output in bit-reversed order;
//! * [`Decimation::Dit`] (Cooley–Tukey) reads bit-reversed input and writes
//!   natural order output.
//!
//! Chaining a DIF transform with a DIT transform therefore never needs an
//! explicit permutation, which is what the Reed–Solomon fast path and the
//! Ring-SIS hasher rely on.

use crate::error::{Result, VortexError};
use crate::field::Fr;

/// Butterfly ordering of a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decimation {
    /// Decimation in frequency: natural input, bit-reversed output.
    Dif,
    /// Decimation in time: bit-reversed input, natural output.
    Dit,
}

/// Evaluation domain of power-of-two size with an optional coset shift.
#[derive(Clone, Debug)]
pub struct Domain {
    cardinality: usize,
    log_cardinality: u32,
    cardinality_inv: Fr,
    generator: Fr,
    generator_inv: Fr,
    shift: Fr,
    shift_inv: Fr,
    /// `ω^j` for `j < n/2`.
    twiddles: Vec<Fr>,
    /// `ω^{-j}` for `j < n/2`.
    twiddles_inv: Vec<Fr>,
}

impl Domain {
    /// Builds a domain of size `cardinality` whose coset shift is the
    /// multiplicative generator of the field.
    pub fn new(cardinality: usize) -> Result<Self> {
        Self::with_shift(cardinality, Fr::GENERATOR)
    }

    /// Builds a domain of size `cardinality` with the given coset shift.
    pub fn with_shift(cardinality: usize, shift: Fr) -> Result<Self> {
        if cardinality == 0 || !cardinality.is_power_of_two() {
            return Err(VortexError::Configuration(format!(
                "domain size {cardinality} is not a power of two"
            )));
        }
        let generator = Fr::root_of_unity(cardinality as u64).ok_or_else(|| {
            VortexError::Configuration(format!(
                "domain size {cardinality} exceeds the two-adicity of the field"
            ))
        })?;
        let shift_inv = shift
            .inverse()
            .ok_or_else(|| VortexError::Configuration("coset shift must be non-zero".into()))?;
        // both are non-zero since the domain is a subgroup
        let generator_inv = generator.inverse().unwrap_or(Fr::ONE);
        let cardinality_inv = Fr::new(cardinality as u64).inverse().unwrap_or(Fr::ONE);

        Ok(Self {
            cardinality,
            log_cardinality: cardinality.trailing_zeros(),
            cardinality_inv,
            generator,
            generator_inv,
            shift,
            shift_inv,
            twiddles: powers(generator, cardinality / 2),
            twiddles_inv: powers(generator_inv, cardinality / 2),
        })
    }

    /// Number of points of the domain.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// `log2` of the number of points.
    pub fn log_cardinality(&self) -> u32 {
        self.log_cardinality
    }

    /// `n^{-1}`.
    pub fn cardinality_inv(&self) -> Fr {
        self.cardinality_inv
    }

    /// Primitive `n`-th root of unity generating the domain.
    pub fn generator(&self) -> Fr {
        self.generator
    }

    /// Inverse of [`Domain::generator`].
    pub fn generator_inv(&self) -> Fr {
        self.generator_inv
    }

    /// Coset shift used by the `on_coset` transforms.
    pub fn shift(&self) -> Fr {
        self.shift
    }

    /// Inverse of the coset shift.
    pub fn shift_inv(&self) -> Fr {
        self.shift_inv
    }

    /// Returns the powers `s^i` of the coset shift, in natural order.
    pub fn coset_table(&self) -> Vec<Fr> {
        powers(self.shift, self.cardinality)
    }

    /// Forward transform: coefficients to evaluations.
    ///
    /// With `on_coset`, the evaluations are taken on `s·⟨ω⟩` instead of `⟨ω⟩`.
    pub fn fft(&self, a: &mut [Fr], decimation: Decimation, on_coset: bool) -> Result<()> {
        self.check_len(a)?;
        if on_coset {
            self.scale_by_shift(a, self.shift, decimation == Decimation::Dit);
        }
        match decimation {
            Decimation::Dif => dif(a, &self.twiddles),
            Decimation::Dit => dit(a, &self.twiddles),
        }
        Ok(())
    }

    /// Inverse transform: evaluations to coefficients.
    ///
    /// The output order follows `decimation` exactly like [`Domain::fft`].
    pub fn fft_inverse(&self, a: &mut [Fr], decimation: Decimation, on_coset: bool) -> Result<()> {
        self.check_len(a)?;
        match decimation {
            Decimation::Dif => dif(a, &self.twiddles_inv),
            Decimation::Dit => dit(a, &self.twiddles_inv),
        }
        for x in a.iter_mut() {
            *x *= self.cardinality_inv;
        }
        if on_coset {
            self.scale_by_shift(a, self.shift_inv, decimation == Decimation::Dif);
        }
        Ok(())
    }

    fn check_len(&self, a: &[Fr]) -> Result<()> {
        if a.len() != self.cardinality {
            return Err(VortexError::shape(
                "fft input",
                self.cardinality,
                a.len(),
            ));
        }
        Ok(())
    }

    /// Multiplies `a[i]` by `s^i`, or by `s^{bitrev(i)}` when the buffer is in
    /// bit-reversed order.
    fn scale_by_shift(&self, a: &mut [Fr], s: Fr, bit_reversed: bool) {
        let mut acc = Fr::ONE;
        let log = self.log_cardinality;
        for i in 0..a.len() {
            let pos = if bit_reversed {
                reverse_bits(i, log)
            } else {
                i
            };
            a[pos] *= acc;
            acc *= s;
        }
    }
}

fn powers(base: Fr, count: usize) -> Vec<Fr> {
    let mut out = Vec::with_capacity(count);
    let mut acc = Fr::ONE;
    for _ in 0..count {
        out.push(acc);
        acc *= base;
    }
    out
}

fn dif(a: &mut [Fr], twiddles: &[Fr]) {
    let n = a.len();
    let mut m = n / 2;
    while m >= 1 {
        let stride = n / (2 * m);
        for k in (0..n).step_by(2 * m) {
            for j in 0..m {
                let u = a[k + j];
                let v = a[k + j + m];
                a[k + j] = u + v;
                a[k + j + m] = (u - v) * twiddles[j * stride];
            }
        }
        m /= 2;
    }
}

fn dit(a: &mut [Fr], twiddles: &[Fr]) {
    let n = a.len();
    let mut m = 1;
    while m < n {
        let stride = n / (2 * m);
        for k in (0..n).step_by(2 * m) {
            for j in 0..m {
                let u = a[k + j];
                let v = a[k + j + m] * twiddles[j * stride];
                a[k + j] = u + v;
                a[k + j + m] = u - v;
            }
        }
        m *= 2;
    }
}

#[inline]
fn reverse_bits(i: usize, log: u32) -> usize {
    if log == 0 {
        0
    } else {
        i.reverse_bits() >> (usize::BITS - log)
    }
}

/// Permutes a power-of-two length slice into bit-reversed order.
pub fn bit_reverse<T>(a: &mut [T]) {
    let n = a.len();
    if n <= 2 {
        return;
    }
    let log = n.trailing_zeros();
    for i in 0..n {
        let j = reverse_bits(i, log);
        if i < j {
            a.swap(i, j);
        }
    }
}
