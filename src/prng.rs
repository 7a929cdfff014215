//! Deterministic randomness for challenge derivation.
//!
//! [`ChallengePrng`] expands a 32-byte key into a stream of BLAKE2b-256
//! blocks, block `i` being `H(domain ‖ key ‖ i)`.  It implements
//! [`rand::RngCore`], so field elements can be sampled from it directly, and
//! [`ChallengePrng::next_below`] draws bounded integers without modulo bias.

use blake2::digest::{consts::U32, Digest};
use rand::RngCore;

type Blake2b256 = blake2::Blake2b<U32>;

const STREAM_DOMAIN: &[u8] = b"VORTEX_PRNG";
const SEED_DOMAIN: &[u8] = b"VORTEX_CHALLENGE";
const BLOCK_BYTES: usize = 32;

/// Counter-mode BLAKE2b-256 stream.
#[derive(Debug, Clone)]
pub struct ChallengePrng {
    key: [u8; BLOCK_BYTES],
    next_block: u64,
    block: [u8; BLOCK_BYTES],
    cursor: usize,
}

impl ChallengePrng {
    /// Stream keyed by a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(STREAM_DOMAIN);
        hasher.update(seed.to_le_bytes());
        let mut key = [0u8; BLOCK_BYTES];
        key.copy_from_slice(&hasher.finalize());
        Self::from_key(key)
    }

    /// Stream keyed by raw bytes.
    pub fn from_key(key: [u8; BLOCK_BYTES]) -> Self {
        Self {
            key,
            next_block: 0,
            block: [0u8; BLOCK_BYTES],
            cursor: BLOCK_BYTES,
        }
    }

    /// Stream keyed by a domain tag and a sequence of transcript words.
    ///
    /// Both inputs are length-prefixed, so distinct `(tag, words)` pairs never
    /// produce the same key encoding.
    pub fn from_transcript(domain_tag: &[u8], words: &[u64]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(SEED_DOMAIN);
        hasher.update((domain_tag.len() as u64).to_le_bytes());
        hasher.update(domain_tag);
        hasher.update((words.len() as u64).to_le_bytes());
        for w in words {
            hasher.update(w.to_le_bytes());
        }
        let mut key = [0u8; BLOCK_BYTES];
        key.copy_from_slice(&hasher.finalize());
        Self::from_key(key)
    }

    fn squeeze(&mut self) {
        let mut hasher = Blake2b256::new();
        hasher.update(STREAM_DOMAIN);
        hasher.update(self.key);
        hasher.update(self.next_block.to_le_bytes());
        self.block.copy_from_slice(&hasher.finalize());
        self.next_block = self.next_block.wrapping_add(1);
        self.cursor = 0;
    }

    /// Uniform integer in `[0, bound)`. Bounds of 0 and 1 both yield 0.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        if bound <= 1 {
            return 0;
        }
        // accept only below the largest multiple of bound
        let reject_from = u64::MAX - u64::MAX % bound;
        loop {
            let v = self.next_u64();
            if v < reject_from {
                return v % bound;
            }
        }
    }
}

impl RngCore for ChallengePrng {
    fn next_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        self.fill_bytes(&mut b);
        u32::from_le_bytes(b)
    }

    fn next_u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        self.fill_bytes(&mut b);
        u64::from_le_bytes(b)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut written = 0;
        while written < dest.len() {
            if self.cursor == BLOCK_BYTES {
                self.squeeze();
            }
            let n = (BLOCK_BYTES - self.cursor).min(dest.len() - written);
            dest[written..written + n].copy_from_slice(&self.block[self.cursor..self.cursor + n]);
            self.cursor += n;
            written += n;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Derives `count` integers in `[0, bound)` from a domain tag and transcript
/// words.
pub fn derive_many_below(bound: u64, domain_tag: &[u8], transcript: &[u64], count: usize) -> Vec<u64> {
    let mut prng = ChallengePrng::from_transcript(domain_tag, transcript);
    (0..count).map(|_| prng.next_below(bound)).collect()
}
