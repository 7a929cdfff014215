//! Poseidon2 permutation over KoalaBear and the hash constructions built on it.
//!
//! The permutation is instantiated for widths 16 and 24 with an `x³` S-box.
//! Round keys are derived deterministically from a seed string by iterating
//! Keccak-256.  On top of the width-16 permutation this module provides:
//!
//! * [`Poseidon2::compress`], a 2-to-1 compression of digests with
//!   feed-forward of the right input;
//! * [`MdHasher`], a Merkle–Damgård sponge absorbing field elements by blocks
//!   of eight;
//! * [`Poseidon2::compress_x16`], which hashes sixteen equal-length vectors
//!   in lockstep and yields the same digests as sixteen [`MdHasher`] runs.

use sha3::{Digest, Keccak256};

use crate::digest::{Hash, DIGEST_ELEMENTS};
use crate::error::{Result, VortexError};
use crate::field::Fr;

/// Number of full rounds of the permutation used by the commitment scheme.
pub const NB_FULL_ROUNDS: usize = 6;

/// Number of partial rounds of the permutation used by the commitment scheme.
pub const NB_PARTIAL_ROUNDS: usize = 21;

/// Number of lanes processed together by [`Poseidon2::compress_x16`].
pub const LANES: usize = 16;

/// Degree of the S-box.
const SBOX_DEGREE: usize = 3;

/// Diagonal of the internal matrix as `(numerator, k)` pairs meaning `num / 2^k`.
const DIAG16: [(i64, u32); 16] = [
    (-2, 0),
    (1, 0),
    (2, 0),
    (1, 1),
    (3, 0),
    (4, 0),
    (-1, 1),
    (-3, 0),
    (-4, 0),
    (1, 8),
    (1, 3),
    (1, 24),
    (-1, 8),
    (-1, 3),
    (-1, 4),
    (-1, 24),
];

const DIAG24: [(i64, u32); 24] = [
    (-2, 0),
    (1, 0),
    (2, 0),
    (1, 1),
    (3, 0),
    (4, 0),
    (-1, 1),
    (-3, 0),
    (-4, 0),
    (1, 8),
    (1, 2),
    (1, 3),
    (1, 4),
    (1, 7),
    (1, 9),
    (1, 24),
    (-1, 8),
    (-1, 2),
    (-1, 3),
    (-1, 4),
    (-1, 5),
    (-1, 6),
    (-1, 7),
    (-1, 24),
];

/// Round counts and round keys of a Poseidon2 instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
    /// State width.
    pub width: usize,
    /// Number of full rounds (even).
    pub nb_full_rounds: usize,
    /// Number of partial rounds.
    pub nb_partial_rounds: usize,
    /// One key vector per round; partial rounds only key the first lane.
    pub round_keys: Vec<Vec<Fr>>,
}

impl Parameters {
    /// Builds parameters whose round keys are derived from the canonical
    /// description string of the instance.
    pub fn new(width: usize, nb_full_rounds: usize, nb_partial_rounds: usize) -> Result<Self> {
        let seed = format!(
            "Poseidon2-koalabear[t={width},rF={nb_full_rounds},rP={nb_partial_rounds},d={SBOX_DEGREE}]"
        );
        Self::with_seed(width, nb_full_rounds, nb_partial_rounds, &seed)
    }

    /// Builds parameters whose round keys are derived from `seed`.
    pub fn with_seed(
        width: usize,
        nb_full_rounds: usize,
        nb_partial_rounds: usize,
        seed: &str,
    ) -> Result<Self> {
        if width != 16 && width != 24 {
            return Err(VortexError::Configuration(format!(
                "poseidon2 width must be 16 or 24, got {width}"
            )));
        }
        if nb_full_rounds % 2 != 0 {
            return Err(VortexError::Configuration(format!(
                "number of full rounds must be even, got {nb_full_rounds}"
            )));
        }

        // keys are successive iterates of keccak256 over the hashed seed
        let mut rnd = [0u8; 32];
        rnd.copy_from_slice(&Keccak256::digest(seed.as_bytes()));
        let mut next = || {
            let h = Keccak256::digest(rnd);
            rnd.copy_from_slice(&h);
            Fr::from_bytes_be_reduce(&rnd)
        };

        let half = nb_full_rounds / 2;
        let mut round_keys = Vec::with_capacity(nb_full_rounds + nb_partial_rounds);
        for _ in 0..half {
            round_keys.push((0..width).map(|_| next()).collect());
        }
        for _ in 0..nb_partial_rounds {
            round_keys.push(vec![next()]);
        }
        for _ in 0..half {
            round_keys.push((0..width).map(|_| next()).collect());
        }

        Ok(Self {
            width,
            nb_full_rounds,
            nb_partial_rounds,
            round_keys,
        })
    }
}

/// The Poseidon2 permutation of width `WIDTH`.
#[derive(Clone, Debug)]
pub struct Poseidon2<const WIDTH: usize> {
    params: Parameters,
    diag: [Fr; WIDTH],
}

impl<const WIDTH: usize> Poseidon2<WIDTH> {
    /// Instantiates the permutation with keys derived from the default seed.
    pub fn new(nb_full_rounds: usize, nb_partial_rounds: usize) -> Result<Self> {
        Self::from_parameters(Parameters::new(WIDTH, nb_full_rounds, nb_partial_rounds)?)
    }

    /// Instantiates the permutation from explicit parameters.
    pub fn from_parameters(params: Parameters) -> Result<Self> {
        if params.width != WIDTH {
            return Err(VortexError::Configuration(format!(
                "parameters of width {} used for a width-{WIDTH} permutation",
                params.width
            )));
        }
        let table: &[(i64, u32)] = match WIDTH {
            16 => &DIAG16,
            24 => &DIAG24,
            _ => {
                return Err(VortexError::Configuration(format!(
                    "unsupported poseidon2 width {WIDTH}"
                )))
            }
        };
        let mut diag = [Fr::ZERO; WIDTH];
        for (d, &(num, k)) in diag.iter_mut().zip(table) {
            *d = Fr::from_i64(num).mul_2exp_neg_n(k);
        }
        Ok(Self { params, diag })
    }

    /// Returns the parameters of the instance.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Applies the permutation in place.
    pub fn permute(&self, state: &mut [Fr; WIDTH]) {
        let half = self.params.nb_full_rounds / 2;
        let partial_end = half + self.params.nb_partial_rounds;

        matmul_external(state);
        for round in 0..half {
            self.add_round_key(round, state);
            state.iter_mut().for_each(sbox);
            matmul_external(state);
        }
        for round in half..partial_end {
            self.add_round_key(round, state);
            sbox(&mut state[0]);
            self.matmul_internal(state);
        }
        for round in partial_end..partial_end + half {
            self.add_round_key(round, state);
            state.iter_mut().for_each(sbox);
            matmul_external(state);
        }
    }

    fn add_round_key(&self, round: usize, state: &mut [Fr; WIDTH]) {
        for (s, k) in state.iter_mut().zip(&self.params.round_keys[round]) {
            *s += *k;
        }
    }

    /// `M_I = 1 + diag(D)`: every lane becomes `sum + d_i·x_i`.
    fn matmul_internal(&self, state: &mut [Fr; WIDTH]) {
        let sum: Fr = state.iter().copied().sum();
        for (s, d) in state.iter_mut().zip(&self.diag) {
            *s = sum + *d * *s;
        }
    }
}

#[inline]
fn sbox(x: &mut Fr) {
    *x = x.square() * *x;
}

/// Multiplies each chunk of four lanes by
/// ```text
/// (2 3 1 1)
/// (1 2 3 1)
/// (1 1 2 3)
/// (3 1 1 2)
/// ```
fn matmul_m4(s: &mut [Fr]) {
    for c in s.chunks_exact_mut(4) {
        let t01 = c[0] + c[1];
        let t23 = c[2] + c[3];
        let t0123 = t01 + t23;
        let t01123 = t0123 + c[1];
        let t01233 = t0123 + c[3];
        // x3 and x1 first, they read x0 and x2
        c[3] = c[0].double() + t01233;
        c[1] = c[2].double() + t01123;
        c[0] = t01 + t01123;
        c[2] = t23 + t01233;
    }
}

/// Multiplies the state by `circ(2·M4, M4, ..., M4)`.
fn matmul_external(state: &mut [Fr]) {
    matmul_m4(state);
    let mut sums = [Fr::ZERO; 4];
    for c in state.chunks_exact(4) {
        for (acc, x) in sums.iter_mut().zip(c) {
            *acc += *x;
        }
    }
    for c in state.chunks_exact_mut(4) {
        for (x, acc) in c.iter_mut().zip(&sums) {
            *x += *acc;
        }
    }
}

impl Poseidon2<16> {
    /// The width-16 instance used for Merkle compression.
    pub fn compression() -> Result<Self> {
        Self::new(NB_FULL_ROUNDS, NB_PARTIAL_ROUNDS)
    }

    /// Compresses two digests into one.
    ///
    /// The state is `left ‖ right`; the output is the right half of the
    /// permuted state plus `right`.
    pub fn compress(&self, left: &Hash, right: &Hash) -> Hash {
        let mut state = [Fr::ZERO; 16];
        state[..DIGEST_ELEMENTS].copy_from_slice(&left.0);
        state[DIGEST_ELEMENTS..].copy_from_slice(&right.0);
        self.permute(&mut state);
        let mut out = Hash::ZERO;
        for i in 0..DIGEST_ELEMENTS {
            out.0[i] = state[DIGEST_ELEMENTS + i] + right.0[i];
        }
        out
    }

    /// Merkle–Damgård hash of a sequence of elements.
    pub fn hash_elements(&self, elements: &[Fr]) -> Hash {
        let mut hasher = MdHasher::new(self);
        hasher.write_elements(elements);
        hasher.sum()
    }

    /// Hashes sixteen vectors of `key_size` elements stored back to back in
    /// `input`, writing one digest per vector into `out`.
    ///
    /// The sixteen sponges advance in lockstep, block by block, and the
    /// result equals [`Poseidon2::hash_elements`] applied to each vector.
    pub fn compress_x16(&self, input: &[Fr], key_size: usize, out: &mut [Hash]) -> Result<()> {
        if out.len() != LANES {
            return Err(VortexError::shape("compress_x16 output", LANES, out.len()));
        }
        if input.len() != LANES * key_size {
            return Err(VortexError::shape(
                "compress_x16 input",
                LANES * key_size,
                input.len(),
            ));
        }

        let mut states = [Hash::ZERO; LANES];
        let full_blocks = key_size / DIGEST_ELEMENTS;
        let rest = key_size % DIGEST_ELEMENTS;
        for block in 0..full_blocks {
            let offset = block * DIGEST_ELEMENTS;
            for (lane, state) in states.iter_mut().enumerate() {
                let start = lane * key_size + offset;
                let mut b = Hash::ZERO;
                b.0.copy_from_slice(&input[start..start + DIGEST_ELEMENTS]);
                *state = self.compress(state, &b);
            }
        }
        if rest != 0 {
            let offset = full_blocks * DIGEST_ELEMENTS;
            for (lane, state) in states.iter_mut().enumerate() {
                let start = lane * key_size + offset;
                let mut b = Hash::ZERO;
                b.0[DIGEST_ELEMENTS - rest..].copy_from_slice(&input[start..start + rest]);
                *state = self.compress(state, &b);
            }
        }
        out.copy_from_slice(&states);
        Ok(())
    }
}

/// Merkle–Damgård sponge over the width-16 compression.
///
/// The IV is the zero digest; every full block of eight elements is
/// compressed into the state, and a trailing partial block is left-padded
/// with zeros.
#[derive(Debug)]
pub struct MdHasher<'a> {
    perm: &'a Poseidon2<16>,
    state: Hash,
    buffer: [Fr; DIGEST_ELEMENTS],
    position: usize,
}

impl<'a> MdHasher<'a> {
    /// Creates a sponge in its initial state.
    pub fn new(perm: &'a Poseidon2<16>) -> Self {
        Self {
            perm,
            state: Hash::ZERO,
            buffer: [Fr::ZERO; DIGEST_ELEMENTS],
            position: 0,
        }
    }

    /// Resets the sponge to the zero IV.
    pub fn reset(&mut self) {
        self.state = Hash::ZERO;
        self.position = 0;
    }

    /// Absorbs elements.
    pub fn write_elements(&mut self, elements: &[Fr]) {
        for &e in elements {
            self.buffer[self.position] = e;
            self.position += 1;
            if self.position == DIGEST_ELEMENTS {
                self.state = self.perm.compress(&self.state, &Hash(self.buffer));
                self.position = 0;
            }
        }
    }

    /// Finalises the pending block and returns the digest.
    pub fn sum(&mut self) -> Hash {
        if self.position != 0 {
            let mut block = Hash::ZERO;
            block.0[DIGEST_ELEMENTS - self.position..]
                .copy_from_slice(&self.buffer[..self.position]);
            self.state = self.perm.compress(&self.state, &block);
            self.position = 0;
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_elements(n: usize, seed: u64) -> Vec<Fr> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| Fr::random(&mut rng)).collect()
    }

    #[test]
    fn test_round_key_layout() {
        let params = Parameters::new(16, NB_FULL_ROUNDS, NB_PARTIAL_ROUNDS).unwrap();
        assert_eq!(params.round_keys.len(), 27);
        assert_eq!(params.round_keys[0].len(), 16);
        assert_eq!(params.round_keys[3].len(), 1);
        assert_eq!(params.round_keys[26].len(), 16);
        let again = Parameters::new(16, NB_FULL_ROUNDS, NB_PARTIAL_ROUNDS).unwrap();
        assert_eq!(params, again);
        let other = Parameters::with_seed(16, 6, 21, "other").unwrap();
        assert_ne!(params.round_keys, other.round_keys);
    }

    #[test]
    fn test_rejects_unsupported_shapes() {
        assert!(Parameters::new(12, 6, 21).is_err());
        assert!(Parameters::new(16, 5, 21).is_err());
        let p24 = Parameters::new(24, 6, 21).unwrap();
        assert!(Poseidon2::<16>::from_parameters(p24).is_err());
    }

    #[test]
    fn test_internal_diagonal_values() {
        let perm = Poseidon2::<16>::compression().unwrap();
        assert_eq!(perm.diag[0], -Fr::new(2));
        assert_eq!(perm.diag[3] * Fr::new(2), Fr::ONE);
        assert_eq!(perm.diag[15] * Fr::new(1 << 24), -Fr::ONE);
    }

    #[test]
    fn test_permutation_is_deterministic_and_mixing() {
        let perm = Poseidon2::<24>::new(NB_FULL_ROUNDS, NB_PARTIAL_ROUNDS).unwrap();
        let mut a = [Fr::ZERO; 24];
        let mut b = [Fr::ZERO; 24];
        perm.permute(&mut a);
        perm.permute(&mut b);
        assert_eq!(a, b);
        let mut c = [Fr::ZERO; 24];
        c[23] = Fr::ONE;
        perm.permute(&mut c);
        assert!(a.iter().zip(&c).all(|(x, y)| x != y));
    }

    #[test]
    fn test_compress_feeds_forward_right_input() {
        let perm = Poseidon2::<16>::compression().unwrap();
        let left = Hash::ZERO;
        let mut right = Hash::ZERO;
        right.0[0] = Fr::new(5);
        let mut state = [Fr::ZERO; 16];
        state[8] = Fr::new(5);
        perm.permute(&mut state);
        let out = perm.compress(&left, &right);
        assert_eq!(out.0[0], state[8] + Fr::new(5));
        assert_eq!(out.0[7], state[15]);
        assert_ne!(perm.compress(&left, &right), perm.compress(&right, &left));
    }

    #[test]
    fn test_md_hasher_left_pads_last_block() {
        let perm = Poseidon2::<16>::compression().unwrap();
        let data = random_elements(11, 1);
        let mut padded = Hash::ZERO;
        padded.0[5..].copy_from_slice(&data[8..]);
        let first = perm.compress(&Hash::ZERO, &Hash(data[..8].try_into().unwrap()));
        let expected = perm.compress(&first, &padded);
        assert_eq!(perm.hash_elements(&data), expected);

        let mut hasher = MdHasher::new(&perm);
        hasher.write_elements(&data[..3]);
        hasher.write_elements(&data[3..]);
        assert_eq!(hasher.sum(), expected);
        hasher.reset();
        assert_eq!(hasher.sum(), Hash::ZERO);
    }

    #[test]
    fn test_compress_x16_matches_md_hasher() {
        let perm = Poseidon2::<16>::compression().unwrap();
        for key_size in [8usize, 12, 64] {
            let input = random_elements(LANES * key_size, key_size as u64);
            let mut out = [Hash::ZERO; LANES];
            perm.compress_x16(&input, key_size, &mut out).unwrap();
            for (lane, digest) in out.iter().enumerate() {
                let column = &input[lane * key_size..(lane + 1) * key_size];
                assert_eq!(*digest, perm.hash_elements(column));
            }
        }
    }

    #[test]
    fn test_compress_x16_shape_errors() {
        let perm = Poseidon2::<16>::compression().unwrap();
        let mut out = [Hash::ZERO; 4];
        assert!(perm.compress_x16(&[Fr::ZERO; 128], 8, &mut out).is_err());
        let mut out = [Hash::ZERO; LANES];
        assert!(perm.compress_x16(&[Fr::ZERO; 100], 8, &mut out).is_err());
    }
}
