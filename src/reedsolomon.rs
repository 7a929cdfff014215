//! Reed–Solomon encoding of the committed rows.
//!
//! A row of `n` values is read as the evaluations on `⟨ω_n⟩` of a polynomial
//! of degree below `n`; its codeword is the evaluation of the same polynomial
//! on `⟨ω_{nρ}⟩`.  Since `ω_n = ω_{nρ}^ρ`, the codeword holds the row itself
//! at every `ρ`-th position.

use crate::error::{Result, VortexError};
use crate::fft::{bit_reverse, Decimation};
use crate::field::Fr;
use crate::params::Params;
use crate::scalar::RingScalar;

impl Params {
    /// Encodes `row` (length `nb_columns`) into `out` (length `size_codeword`).
    pub fn encode_reed_solomon(&self, row: &[Fr], out: &mut [Fr]) -> Result<()> {
        if row.len() != self.nb_columns {
            return Err(VortexError::shape("row", self.nb_columns, row.len()));
        }
        if out.len() != self.size_codeword() {
            return Err(VortexError::shape(
                "codeword buffer",
                self.size_codeword(),
                out.len(),
            ));
        }
        if self.reed_solomon_inv_rate == 2 {
            return self.encode_rate_two(row, out);
        }

        let n = self.nb_columns;
        out[..n].copy_from_slice(row);
        self.small_domain
            .fft_inverse(&mut out[..n], Decimation::Dif, false)?;
        bit_reverse(&mut out[..n]);
        out[n..].iter_mut().for_each(|x| *x = Fr::ZERO);
        self.big_domain.fft(out, Decimation::Dif, false)?;
        bit_reverse(out);
        Ok(())
    }

    /// Encodes a row into a freshly allocated codeword.
    pub fn encode(&self, row: &[Fr]) -> Result<Vec<Fr>> {
        let mut out = vec![Fr::ZERO; self.size_codeword()];
        self.encode_reed_solomon(row, &mut out)?;
        Ok(out)
    }

    /// `ρ = 2`: the odd positions of the codeword are the evaluations on the
    /// coset `ω_{2n}·⟨ω_n⟩`, obtained with one inverse and one forward
    /// transform of size `n`.
    fn encode_rate_two(&self, row: &[Fr], out: &mut [Fr]) -> Result<()> {
        let n = self.nb_columns;
        if self.coset_table_bit_reversed.len() != n {
            return Err(VortexError::Encoding(format!(
                "coset table has {} entries, expected {n}",
                self.coset_table_bit_reversed.len()
            )));
        }
        let mut coset = row.to_vec();
        // bit-reversed coefficients
        self.small_domain
            .fft_inverse(&mut coset, Decimation::Dif, false)?;
        for (c, s) in coset.iter_mut().zip(&self.coset_table_bit_reversed) {
            *c *= *s;
        }
        // natural-order evaluations on the coset
        self.small_domain.fft(&mut coset, Decimation::Dit, false)?;

        for ((pair, r), c) in out.chunks_exact_mut(2).zip(row).zip(&coset) {
            pair[0] = *r;
            pair[1] = *c;
        }
        Ok(())
    }

    /// Checks that `codeword` is the encoding of some row, coordinate by
    /// coordinate.
    ///
    /// Fails with [`VortexError::NotCodeword`] naming the first base-field
    /// coordinate whose interpolant has degree `nb_columns` or more.
    pub fn is_codeword<T: RingScalar>(&self, codeword: &[T]) -> Result<()> {
        let size = self.size_codeword();
        if codeword.len() != size {
            return Err(VortexError::shape("codeword", size, codeword.len()));
        }
        let mut coeffs = vec![Fr::ZERO; size];
        for coordinate in 0..T::DEGREE {
            for (c, x) in coeffs.iter_mut().zip(codeword) {
                *c = x.coord(coordinate);
            }
            self.big_domain
                .fft_inverse(&mut coeffs, Decimation::Dif, false)?;
            bit_reverse(&mut coeffs);
            if let Some(offset) = coeffs[self.nb_columns..].iter().position(|c| !c.is_zero()) {
                return Err(VortexError::NotCodeword {
                    coordinate,
                    degree: self.nb_columns + offset,
                });
            }
        }
        Ok(())
    }
}
