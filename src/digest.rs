//! Digests and byte-oriented hash functions.
//!
//! A [`Hash`] is eight field elements (32 bytes once serialised).  It is the
//! node type of the Merkle tree and the output of the Poseidon2 compression.
//! Byte-oriented hashes implementing [`ByteHasher`] can replace Poseidon2 for
//! the Merkle tree or Ring-SIS for the column hashing.

use std::fmt;

use blake2::digest::consts::U32;
use blake2::Blake2b;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Result, VortexError};
use crate::field::{Fr, BYTES};

/// Number of field elements in a digest.
pub const DIGEST_ELEMENTS: usize = 8;

/// Size of a serialised digest in bytes.
pub const DIGEST_BYTES: usize = DIGEST_ELEMENTS * BYTES;

/// An eight-element digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hash(pub [Fr; DIGEST_ELEMENTS]);

impl Hash {
    /// The all-zero digest used to pad Merkle trees.
    pub const ZERO: Hash = Hash([Fr::ZERO; DIGEST_ELEMENTS]);

    /// Returns the digest elements.
    pub fn elements(&self) -> &[Fr; DIGEST_ELEMENTS] {
        &self.0
    }

    /// Serialises the digest as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; DIGEST_BYTES] {
        let mut out = [0u8; DIGEST_BYTES];
        for (chunk, e) in out.chunks_exact_mut(BYTES).zip(self.0.iter()) {
            chunk.copy_from_slice(&e.to_bytes_be());
        }
        out
    }

    /// Parses 32 big-endian bytes, rejecting non-canonical elements.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DIGEST_BYTES {
            return Err(VortexError::Decode(format!(
                "digest must be {DIGEST_BYTES} bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = Hash::ZERO;
        for (i, chunk) in bytes.chunks_exact(BYTES).enumerate() {
            let mut word = [0u8; BYTES];
            word.copy_from_slice(chunk);
            out.0[i] = Fr::from_bytes_be(word).ok_or_else(|| {
                VortexError::Decode(format!("digest element {i} is not canonical"))
            })?;
        }
        Ok(out)
    }

    /// Interprets 32 arbitrary bytes as eight big-endian words reduced modulo `p`.
    ///
    /// This is how the output of a byte-oriented hash becomes a digest.
    pub fn from_bytes_reduced(bytes: &[u8; DIGEST_BYTES]) -> Self {
        let mut out = Hash::ZERO;
        for (i, chunk) in bytes.chunks_exact(BYTES).enumerate() {
            out.0[i] = Fr::from_bytes_be_reduce(chunk);
        }
        out
    }

    /// Returns the lowercase hex encoding of [`Hash::to_bytes`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses a hex string produced by [`Hash::to_hex`].
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input.trim())
            .map_err(|err| VortexError::Decode(format!("invalid digest hex: {err}")))?;
        Hash::from_bytes(&bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A hash function with a 32-byte output.
pub trait ByteHasher: Send + Sync + fmt::Debug {
    /// Hashes `data` in one shot.
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_BYTES];

    /// Hashes `data` and maps the output to a [`Hash`].
    fn digest_elements(&self, data: &[u8]) -> Hash {
        Hash::from_bytes_reduced(&self.digest(data))
    }
}

/// SHA-256.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl ByteHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_BYTES] {
        let mut out = [0u8; DIGEST_BYTES];
        out.copy_from_slice(&Sha256::digest(data));
        out
    }
}

type Blake2b256 = Blake2b<U32>;

/// BLAKE2b with a 256-bit output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake2bHasher;

impl ByteHasher for Blake2bHasher {
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_BYTES] {
        let mut out = [0u8; DIGEST_BYTES];
        out.copy_from_slice(&Blake2b256::digest(data));
        out
    }
}

/// Serialises a sequence of elements as concatenated big-endian words.
pub(crate) fn elements_to_bytes(elements: &[Fr]) -> Vec<u8> {
    let mut out = Vec::with_capacity(elements.len() * BYTES);
    for e in elements {
        out.extend_from_slice(&e.to_bytes_be());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Hash {
        let mut h = Hash::ZERO;
        for (i, e) in h.0.iter_mut().enumerate() {
            *e = Fr::new(1_000_003 * (i as u64 + 1));
        }
        h
    }

    #[test]
    fn test_bytes_and_hex_roundtrip() {
        let h = sample();
        assert_eq!(Hash::from_bytes(&h.to_bytes()).unwrap(), h);
        assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(h.to_hex().len(), 64);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            Hash::from_bytes(&[0u8; 31]),
            Err(VortexError::Decode(_))
        ));
        assert!(Hash::from_bytes(&[0xffu8; 32]).is_err());
        assert!(Hash::from_hex("zz").is_err());
    }

    #[test]
    fn test_reduced_bytes_never_fail() {
        let h = Hash::from_bytes_reduced(&[0xff; 32]);
        // 0xffffffff mod p
        assert_eq!(h.0[0].as_canonical_u32(), 0xffff_ffff % crate::field::MODULUS);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let h = sample();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_byte_hashers_differ_and_are_deterministic() {
        let sha = Sha256Hasher.digest(b"vortex");
        let blake = Blake2bHasher.digest(b"vortex");
        assert_ne!(sha, blake);
        assert_eq!(sha, Sha256Hasher.digest(b"vortex"));
        assert_eq!(
            Blake2bHasher.digest_elements(b"vortex"),
            Hash::from_bytes_reduced(&blake)
        );
    }

    #[test]
    fn test_elements_to_bytes() {
        let bytes = elements_to_bytes(&[Fr::new(1), Fr::new(0x0a0b0c0d)]);
        assert_eq!(bytes, vec![0, 0, 0, 1, 0x0a, 0x0b, 0x0c, 0x0d]);
    }
}
