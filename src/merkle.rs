//! Merkle tree over column digests.
//!
//! Nodes are combined with the Poseidon2 compression by default, or with any
//! [`ByteHasher`] applied to the concatenated 32-byte encodings.  Leaves are
//! padded with zero digests up to the next power of two.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::digest::{ByteHasher, Hash, DIGEST_BYTES};
use crate::error::{Result, VortexError};
use crate::parallel::parallel_for;
use crate::poseidon2::Poseidon2;

/// Levels at least this wide are hashed in parallel.
const PARALLEL_LEVEL_WIDTH: usize = 512;

/// Nodes computed per parallel task.
const NODES_PER_TASK: usize = 64;

/// Two-to-one node compression.
#[derive(Clone)]
pub enum NodeHasher {
    /// Poseidon2 width-16 compression.
    Poseidon2(Arc<Poseidon2<16>>),
    /// `H(left ‖ right)` for a 32-byte hash, reduced into eight elements.
    Bytes(Arc<dyn ByteHasher>),
}

impl NodeHasher {
    /// Combines two children into their parent.
    pub fn compress(&self, left: &Hash, right: &Hash) -> Hash {
        match self {
            NodeHasher::Poseidon2(perm) => perm.compress(left, right),
            NodeHasher::Bytes(h) => {
                let mut buf = [0u8; 2 * DIGEST_BYTES];
                buf[..DIGEST_BYTES].copy_from_slice(&left.to_bytes());
                buf[DIGEST_BYTES..].copy_from_slice(&right.to_bytes());
                h.digest_elements(&buf)
            }
        }
    }
}

impl fmt::Debug for NodeHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeHasher::Poseidon2(_) => f.write_str("NodeHasher::Poseidon2"),
            NodeHasher::Bytes(h) => write!(f, "NodeHasher::Bytes({h:?})"),
        }
    }
}

/// A complete binary Merkle tree.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// `levels[0]` holds the root, the last level the padded leaves.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Builds the tree over `leaves`.
    pub fn build(leaves: &[Hash], hasher: &NodeHasher) -> Result<Self> {
        if leaves.is_empty() {
            return Err(VortexError::shape("merkle leaves", 1, 0));
        }
        let width = leaves.len().next_power_of_two();
        let depth = width.trailing_zeros() as usize;

        let mut padded = leaves.to_vec();
        padded.resize(width, Hash::ZERO);

        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(padded);
        while levels[levels.len() - 1].len() > 1 {
            let below = &levels[levels.len() - 1];
            let mut level = vec![Hash::ZERO; below.len() / 2];
            let combine = |offset: usize, chunk: &mut [Hash]| {
                for (k, node) in chunk.iter_mut().enumerate() {
                    let pos = offset + k;
                    *node = hasher.compress(&below[2 * pos], &below[2 * pos + 1]);
                }
            };
            if level.len() >= PARALLEL_LEVEL_WIDTH {
                parallel_for(&mut level, NODES_PER_TASK, |i, chunk| {
                    combine(i * NODES_PER_TASK, chunk);
                    Ok(())
                })?;
            } else {
                combine(0, level.as_mut_slice());
            }
            levels.push(level);
        }
        levels.reverse();
        Ok(Self { levels })
    }

    /// Root of the tree.
    pub fn root(&self) -> Hash {
        self.levels[0][0]
    }

    /// Depth of the tree; it has `2^depth` leaves.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Leaves, padding included.
    pub fn leaves(&self) -> &[Hash] {
        &self.levels[self.depth()]
    }

    /// Returns the sibling path of leaf `index`, from the leaf up.
    pub fn open(&self, index: usize) -> Result<MerkleProof> {
        let bound = 1usize << self.depth();
        if index >= bound {
            return Err(VortexError::range("merkle leaf", index, bound));
        }
        let mut pos = index;
        let mut path = Vec::with_capacity(self.depth());
        for level in self.levels[1..].iter().rev() {
            path.push(level[pos ^ 1]);
            pos >>= 1;
        }
        Ok(MerkleProof(path))
    }
}

/// Sibling digests from the leaf level up to just below the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerkleProof(pub Vec<Hash>);

impl MerkleProof {
    /// Number of levels covered by the proof.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the proof of a single-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks that `leaf` sits at `index` in the tree committed to by `root`.
    pub fn verify(&self, index: usize, leaf: &Hash, root: &Hash, hasher: &NodeHasher) -> Result<()> {
        if self.0.len() < usize::BITS as usize && index >> self.0.len() != 0 {
            return Err(VortexError::InvalidProof(format!(
                "leaf index {index} does not fit a tree of depth {}",
                self.0.len()
            )));
        }
        let mut pos = index;
        let mut current = *leaf;
        for sibling in &self.0 {
            current = if pos & 1 == 0 {
                hasher.compress(&current, sibling)
            } else {
                hasher.compress(sibling, &current)
            };
            pos >>= 1;
        }
        if current != *root {
            return Err(VortexError::InvalidProof(format!(
                "merkle path of leaf {index} does not lead to the root"
            )));
        }
        Ok(())
    }

    /// Serialises the proof as a JSON array of hex digests.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| VortexError::Decode(err.to_string()))
    }

    /// Parses a proof emitted by [`MerkleProof::to_json_string`].
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|err| VortexError::Decode(format!("invalid proof JSON: {err}")))
    }
}
