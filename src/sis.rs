//! Ring-SIS hashing over `Fr[X]/(X^d + 1)`.
//!
//! The input vector is cut into small limbs (8 or 16 bits), the limbs are
//! grouped into polynomials of degree `d`, and the digest is
//! `Σ_i A[i]·m_i mod (X^d + 1)` for public random polynomials `A[i]`.  The
//! products are computed in evaluation form on the coset `ψ·⟨ω⟩`, where `ψ`
//! is a primitive `2d`-th root of unity, so that a single inverse transform
//! at the end performs the negacyclic reduction.
//!
//! A limb enters the ring as the field element equal to its integer value,
//! so a digest is the plain negacyclic product of the limbs with the key.
//! Implementations that store the raw limb into the Montgomery word instead
//! hash to different digests, and their commitment roots do not match ours.

use blake2::digest::{consts::U32, Digest};
use blake2::Blake2b;
use tracing::debug;

use crate::error::{Result, VortexError};
use crate::fft::{Decimation, Domain};
use crate::field::{Fr, BITS, BYTES};
use crate::parallel::parallel_for;

type Blake2b256 = Blake2b<U32>;

const SIS_DOMAIN: &[u8] = b"SIS";

/// Ring-SIS public key and hasher.
#[derive(Clone, Debug)]
pub struct RingSis {
    seed: u64,
    log_two_bound: usize,
    degree: usize,
    domain: Domain,
    /// `A[i]` stored back to back, `degree` coefficients each.
    a: Vec<Fr>,
    /// Evaluations of `A[i]` on the coset, bit-reversed.
    ag: Vec<Fr>,
    max_nb_elements_to_hash: usize,
    kernel64: Option<Fft64Twiddles>,
}

impl RingSis {
    /// Generates a key.
    ///
    /// * `seed`: seed of the public polynomials;
    /// * `log_two_degree`: the ring is `Fr[X]/(X^{2^log_two_degree} + 1)`;
    /// * `log_two_bound`: bit size of the limbs the input is decomposed into;
    /// * `max_nb_elements_to_hash`: capacity of the key in field elements.
    pub fn new(
        seed: u64,
        log_two_degree: u32,
        log_two_bound: usize,
        max_nb_elements_to_hash: usize,
    ) -> Result<Self> {
        if log_two_bound == 0 || log_two_bound > 64 || log_two_bound > BITS {
            return Err(VortexError::Configuration(format!(
                "limb bit size {log_two_bound} out of range"
            )));
        }
        if log_two_bound % 8 != 0 {
            return Err(VortexError::Configuration(format!(
                "limb bit size {log_two_bound} must be a multiple of 8"
            )));
        }
        let limb_bytes = log_two_bound / 8;
        if BYTES % limb_bytes != 0 {
            return Err(VortexError::Configuration(format!(
                "limb size of {limb_bytes} bytes does not divide the element size"
            )));
        }
        if max_nb_elements_to_hash == 0 {
            return Err(VortexError::Configuration(
                "a ring-SIS key must hash at least one element".into(),
            ));
        }

        // the coset shift is a primitive 2d-th root of unity
        if log_two_degree >= Fr::TWO_ADICITY {
            return Err(VortexError::Configuration(format!(
                "ring degree 2^{log_two_degree} is too large"
            )));
        }
        let degree = 1usize << log_two_degree;
        let nb_limbs = max_nb_elements_to_hash
            .checked_mul(BYTES / limb_bytes)
            .ok_or_else(|| {
                VortexError::Configuration(format!(
                    "ring-SIS key capacity {max_nb_elements_to_hash} is too large"
                ))
            })?;
        let nb_polys = nb_limbs.div_ceil(degree);

        let shift = Fr::root_of_unity(2 * degree as u64).ok_or_else(|| {
            VortexError::Configuration(format!("ring degree {degree} is too large"))
        })?;
        let domain = Domain::with_shift(degree, shift)?;

        let mut a = vec![Fr::ZERO; nb_polys * degree];
        parallel_for(&mut a, degree, |i, poly| {
            for (j, c) in poly.iter_mut().enumerate() {
                *c = derive_element(seed, i as u64, j as u64);
            }
            Ok(())
        })?;
        let mut ag = a.clone();
        parallel_for(&mut ag, degree, |_, poly| {
            domain.fft(poly, Decimation::Dif, true)
        })?;

        let kernel64 = (degree == 64).then(|| Fft64Twiddles::new(&domain));

        debug!(
            seed,
            degree,
            log_two_bound,
            nb_polys,
            "generated ring-SIS key"
        );

        Ok(Self {
            seed,
            log_two_bound,
            degree,
            domain,
            a,
            ag,
            max_nb_elements_to_hash,
            kernel64,
        })
    }

    /// Seed the key was derived from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Degree `d` of the ring, which is also the digest length.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Bit size of the limbs.
    pub fn log_two_bound(&self) -> usize {
        self.log_two_bound
    }

    /// Maximum number of field elements a single call can hash.
    pub fn max_nb_elements_to_hash(&self) -> usize {
        self.max_nb_elements_to_hash
    }

    /// Number of public polynomials.
    pub fn nb_polynomials(&self) -> usize {
        self.a.len() / self.degree
    }

    /// Coefficients of the `i`-th public polynomial.
    pub fn a(&self, i: usize) -> &[Fr] {
        &self.a[i * self.degree..(i + 1) * self.degree]
    }

    fn ag(&self, i: usize) -> &[Fr] {
        &self.ag[i * self.degree..(i + 1) * self.degree]
    }

    /// Hashes `v` into `res`, which must hold exactly `degree` elements.
    pub fn hash(&self, v: &[Fr], res: &mut [Fr]) -> Result<()> {
        if res.len() != self.degree {
            return Err(VortexError::shape("SIS digest", self.degree, res.len()));
        }
        if v.len() > self.max_nb_elements_to_hash {
            return Err(VortexError::range(
                "SIS input length",
                v.len(),
                self.max_nb_elements_to_hash + 1,
            ));
        }
        res.iter_mut().for_each(|x| *x = Fr::ZERO);

        let mut k = vec![Fr::ZERO; self.degree];
        let mut limbs = Limbs::new(v, self.log_two_bound / 8);
        for i in 0..self.nb_polynomials() {
            let mut any = 0u32;
            let mut exhausted = false;
            for c in k.iter_mut() {
                match limbs.next() {
                    Some(l) => {
                        any |= l;
                        *c = Fr::from_canonical_u32(l);
                    }
                    None => {
                        exhausted = true;
                        *c = Fr::ZERO;
                    }
                }
            }
            // NTT(0) = 0, nothing to accumulate
            if any != 0 {
                self.block_fft(&mut k)?;
                for ((r, x), y) in res.iter_mut().zip(&k).zip(self.ag(i)) {
                    *r += *x * *y;
                }
            }
            if exhausted {
                break;
            }
        }

        // one inverse transform reduces modulo X^d + 1
        self.domain.fft_inverse(res, Decimation::Dit, true)
    }

    fn block_fft(&self, k: &mut [Fr]) -> Result<()> {
        match &self.kernel64 {
            Some(tw) => {
                fft64(k, tw);
                Ok(())
            }
            None => self.domain.fft(k, Decimation::Dif, true),
        }
    }
}

/// `A[i][j] = H("SIS" ‖ seed ‖ i ‖ j) mod p`, integers encoded on 8
/// big-endian bytes.
fn derive_element(seed: u64, i: u64, j: u64) -> Fr {
    let mut hasher = Blake2b256::new();
    hasher.update(SIS_DOMAIN);
    hasher.update(seed.to_be_bytes());
    hasher.update(i.to_be_bytes());
    hasher.update(j.to_be_bytes());
    Fr::from_bytes_be_reduce(&hasher.finalize())
}

/// Iterates over the little-endian limbs of the little-endian encoding of a
/// vector of elements.
#[derive(Debug)]
pub struct Limbs<'a> {
    elements: std::slice::Iter<'a, Fr>,
    limb_bytes: usize,
    buf: [u8; BYTES],
    pos: usize,
}

impl<'a> Limbs<'a> {
    /// `limb_bytes` is 1 or 2.
    pub fn new(v: &'a [Fr], limb_bytes: usize) -> Self {
        Self {
            elements: v.iter(),
            limb_bytes,
            buf: [0u8; BYTES],
            pos: BYTES,
        }
    }
}

impl Iterator for Limbs<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.pos == BYTES {
            self.buf = self.elements.next()?.to_bytes_le();
            self.pos = 0;
        }
        let limb = self.buf[self.pos..self.pos + self.limb_bytes]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        self.pos += self.limb_bytes;
        Some(limb)
    }
}

/// Twiddles of the unrolled 64-point coset transform.
#[derive(Clone, Debug)]
struct Fft64Twiddles {
    coset: [Fr; 64],
    /// Stage `s` works on blocks of half-size `32 >> s`.
    stages: [[Fr; 32]; 6],
}

impl Fft64Twiddles {
    fn new(domain: &Domain) -> Self {
        let mut coset = [Fr::ZERO; 64];
        for (c, s) in coset.iter_mut().zip(domain.coset_table()) {
            *c = s;
        }
        let mut stages = [[Fr::ZERO; 32]; 6];
        for (s, stage) in stages.iter_mut().enumerate() {
            let m = 32usize >> s;
            let w = domain.generator().pow((64 / (2 * m)) as u64);
            let mut acc = Fr::ONE;
            for t in stage.iter_mut().take(m) {
                *t = acc;
                acc *= w;
            }
        }
        Self { coset, stages }
    }
}

/// DIF transform of 64 elements on the coset, natural in, bit-reversed out.
fn fft64(a: &mut [Fr], tw: &Fft64Twiddles) {
    for (x, s) in a.iter_mut().zip(tw.coset.iter()) {
        *x *= *s;
    }
    for (s, stage) in tw.stages.iter().enumerate() {
        let m = 32usize >> s;
        for block in a.chunks_exact_mut(2 * m) {
            let (lo, hi) = block.split_at_mut(m);
            for ((u, v), w) in lo.iter_mut().zip(hi.iter_mut()).zip(&stage[..m]) {
                let (x, y) = (*u, *v);
                *u = x + y;
                *v = (x - y) * *w;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_vec(n: usize, seed: u64) -> Vec<Fr> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| Fr::random(&mut rng)).collect()
    }

    /// `Σ_i A[i]·m_i mod X^d + 1` computed coefficient by coefficient.
    fn schoolbook(key: &RingSis, v: &[Fr]) -> Vec<Fr> {
        let d = key.degree();
        let limbs: Vec<Fr> = Limbs::new(v, key.log_two_bound() / 8)
            .map(Fr::from_canonical_u32)
            .collect();
        let mut res = vec![Fr::ZERO; d];
        for (i, m) in limbs.chunks(d).enumerate() {
            let a = key.a(i);
            for (j, mj) in m.iter().enumerate() {
                for (l, al) in a.iter().enumerate() {
                    let prod = *mj * *al;
                    if j + l < d {
                        res[j + l] += prod;
                    } else {
                        res[j + l - d] -= prod;
                    }
                }
            }
        }
        res
    }

    #[test]
    fn test_limb_decomposition_is_little_endian() {
        let v = [Fr::new(0x0403_0201), Fr::new(0x0807_0605)];
        let bytes: Vec<u32> = Limbs::new(&v, 1).collect();
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let halves: Vec<u32> = Limbs::new(&v, 2).collect();
        assert_eq!(halves, vec![0x0201, 0x0403, 0x0605, 0x0807]);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(RingSis::new(0, 4, 12, 8).is_err());
        assert!(RingSis::new(0, 4, 24, 8).is_err());
        assert!(RingSis::new(0, 4, 32, 8).is_err());
        assert!(RingSis::new(0, 4, 16, 0).is_err());
        let key = RingSis::new(0, 4, 16, 9).unwrap();
        // 9 elements × 2 limbs over polynomials of degree 16
        assert_eq!(key.nb_polynomials(), 2);
    }

    #[test]
    fn test_oversized_parameters_are_rejected() {
        for log_degree in [24u32, 63, 64, 200] {
            assert!(matches!(
                RingSis::new(0, log_degree, 16, 1),
                Err(VortexError::Configuration(_))
            ));
        }
        assert!(matches!(
            RingSis::new(0, 4, 8, usize::MAX),
            Err(VortexError::Configuration(_))
        ));
    }

    #[test]
    fn test_hash_matches_schoolbook_product() {
        for (log_degree, log_bound) in [(4u32, 16usize), (6, 16), (6, 8), (3, 8)] {
            let key = RingSis::new(5, log_degree, log_bound, 40).unwrap();
            let v = random_vec(37, log_degree as u64);
            let mut res = vec![Fr::ZERO; key.degree()];
            key.hash(&v, &mut res).unwrap();
            assert_eq!(res, schoolbook(&key, &v), "degree 2^{log_degree}");
        }
    }

    #[test]
    fn test_fft64_kernel_matches_generic_transform() {
        let key = RingSis::new(1, 6, 16, 32).unwrap();
        let tw = key.kernel64.as_ref().unwrap();
        let original = random_vec(64, 9);
        let mut fast = original.clone();
        let mut slow = original;
        fft64(&mut fast, tw);
        key.domain.fft(&mut slow, Decimation::Dif, true).unwrap();
        assert_eq!(fast, slow);
    }

    #[test]
    fn test_deterministic_in_seed() {
        let k1 = RingSis::new(42, 5, 16, 64).unwrap();
        let k2 = RingSis::new(42, 5, 16, 64).unwrap();
        let k3 = RingSis::new(43, 5, 16, 64).unwrap();
        let v = random_vec(64, 3);
        let mut h1 = vec![Fr::ZERO; 32];
        let mut h2 = vec![Fr::ZERO; 32];
        let mut h3 = vec![Fr::ZERO; 32];
        k1.hash(&v, &mut h1).unwrap();
        k2.hash(&v, &mut h2).unwrap();
        k3.hash(&v, &mut h3).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_zero_input_hashes_to_zero() {
        let key = RingSis::new(7, 9, 16, 128).unwrap();
        let mut res = vec![Fr::ONE; 512];
        key.hash(&vec![Fr::ZERO; 128], &mut res).unwrap();
        assert!(res.iter().all(Fr::is_zero));
        let mut res = vec![Fr::ONE; 512];
        key.hash(&[], &mut res).unwrap();
        assert!(res.iter().all(Fr::is_zero));
    }

    #[test]
    fn test_shape_and_range_errors() {
        let key = RingSis::new(7, 4, 16, 8).unwrap();
        let mut short = vec![Fr::ZERO; 8];
        assert!(matches!(
            key.hash(&[Fr::ONE], &mut short),
            Err(VortexError::Shape { .. })
        ));
        let mut res = vec![Fr::ZERO; 16];
        assert!(matches!(
            key.hash(&vec![Fr::ONE; 9], &mut res),
            Err(VortexError::Range { .. })
        ));
    }

    #[test]
    fn test_hash_is_linear_in_limbs() {
        // small values are their own single limb
        let key = RingSis::new(3, 4, 16, 16).unwrap();
        let a: Vec<Fr> = (0..16).map(|i| Fr::new(i * 7 + 1)).collect();
        let b: Vec<Fr> = (0..16).map(|i| Fr::new(i * 3 + 2)).collect();
        let sum: Vec<Fr> = a.iter().zip(&b).map(|(x, y)| *x + *y).collect();
        let (mut ha, mut hb, mut hs) = (vec![Fr::ZERO; 16], vec![Fr::ZERO; 16], vec![Fr::ZERO; 16]);
        key.hash(&a, &mut ha).unwrap();
        key.hash(&b, &mut hb).unwrap();
        key.hash(&sum, &mut hs).unwrap();
        let expected: Vec<Fr> = ha.iter().zip(&hb).map(|(x, y)| *x + *y).collect();
        assert_eq!(hs, expected);
    }
}
