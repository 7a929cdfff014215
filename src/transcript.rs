//! Fiat–Shamir transcript for running the protocol non-interactively.
//!
//! The prover and the verifier feed the same messages (commitment roots,
//! claimed values, the linear combination) into a [`Transcript`] and draw
//! the verifier's challenges from it: the combination coefficient `α`, the
//! evaluation point and the indices of the opened columns.

use crate::digest::Hash;
use crate::extension::E4;
use crate::field::{Fr, MODULUS};
use crate::prng::derive_many_below;

/// Prover or verifier view of the messages exchanged so far.
#[derive(Debug, Clone)]
pub struct Transcript {
    domain_tag: &'static [u8],
    absorbed: Vec<u64>,
    squeezes: u64,
}

impl Transcript {
    /// Empty transcript; `domain_tag` separates unrelated protocols.
    pub fn new(domain_tag: &'static [u8]) -> Self {
        Self {
            domain_tag,
            absorbed: Vec::new(),
            squeezes: 0,
        }
    }

    /// Appends a raw word.
    pub fn append(&mut self, value: u64) {
        self.absorbed.push(value);
    }

    /// Appends a base field element.
    pub fn append_fr(&mut self, value: &Fr) {
        self.absorbed.push(value.as_canonical_u32() as u64);
    }

    /// Appends an extension element, coordinate by coordinate.
    pub fn append_e4(&mut self, value: &E4) {
        for c in value.coords() {
            self.append_fr(&c);
        }
    }

    /// Appends a slice of extension elements, prefixed by its length.
    pub fn append_e4_slice(&mut self, values: &[E4]) {
        self.append(values.len() as u64);
        for v in values {
            self.append_e4(v);
        }
    }

    /// Appends a digest.
    pub fn append_hash(&mut self, value: &Hash) {
        for e in value.elements() {
            self.append_fr(e);
        }
    }

    /// Returns the recorded words.
    pub fn snapshot(&self) -> &[u64] {
        &self.absorbed
    }

    /// Draws `count` integers in `[0, bound)` and absorbs them, so that the
    /// next challenge depends on this one.
    fn draw(&mut self, bound: u64, count: usize) -> Vec<u64> {
        let mut seed = Vec::with_capacity(self.absorbed.len() + 2);
        seed.push(self.squeezes);
        seed.push(bound);
        seed.extend_from_slice(&self.absorbed);
        self.squeezes += 1;

        let out = derive_many_below(bound, self.domain_tag, &seed, count);
        self.absorbed.extend_from_slice(&out);
        out
    }

    /// Draws a base field challenge.
    pub fn challenge_fr(&mut self) -> Fr {
        Fr::new(self.draw(MODULUS as u64, 1)[0])
    }

    /// Draws an extension field challenge.
    pub fn challenge_e4(&mut self) -> E4 {
        let c = self.draw(MODULUS as u64, 4);
        E4::from_coords([Fr::new(c[0]), Fr::new(c[1]), Fr::new(c[2]), Fr::new(c[3])])
    }

    /// Draws `count` column indices in `[0, bound)`.
    pub fn challenge_indices(&mut self, count: usize, bound: usize) -> Vec<usize> {
        self.draw(bound as u64, count)
            .into_iter()
            .map(|i| i as usize)
            .collect()
    }
}
