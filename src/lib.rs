#![deny(missing_docs)]

//! # vortex_pcs
//!
//! **Vortex** is a commitment scheme for matrices of KoalaBear field
//! elements, read row by row as polynomials in Lagrange form.  It combines a
//! Reed–Solomon code, a lattice-based (Ring-SIS) column hash, a Poseidon2
//! sponge and a Merkle tree:
//!
//! 1. [`commit`] encodes every row, hashes every column of the encoded
//!    matrix and commits to the column hashes with a Merkle tree.
//! 2. Given a challenge `α`, [`ProverState::open_lin_comb`] publishes the
//!    random combination `Σ α^i·row_i` of the encoded rows.
//! 3. [`ProverState::open_columns`] reveals the columns the verifier asked
//!    for, together with their Merkle paths.
//! 4. [`Params::verify`] checks the combination against the claimed
//!    evaluations, checks that it is a codeword and spot-checks it against
//!    the opened columns.
//!
//! The field ([`Fr`]), its degree-4 extension ([`E4`]), the NTT, Poseidon2
//! and the Ring-SIS hash are implemented in this crate.  The
//! [`Transcript`] derives the verifier's challenges when the protocol is run
//! non-interactively.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use vortex_pcs::{commit, eval_lagrange, Fr, Params, RingSis, Transcript, VerifierInput};
//!
//! let key = Arc::new(RingSis::new(0, 9, 16, 4).unwrap());
//! let params = Arc::new(Params::new(16, 4, Some(key), 2, 4).unwrap());
//! let matrix: Vec<Vec<Fr>> = (0..4)
//!     .map(|i| (0..16).map(|j| Fr::new(i * 16 + j)).collect())
//!     .collect();
//!
//! let mut state = commit(&params, &matrix).unwrap();
//! let root = state.get_commitment();
//!
//! let mut transcript = Transcript::new(b"doc");
//! transcript.append_hash(&root);
//! let x = transcript.challenge_e4();
//! let claims: Vec<_> = matrix.iter().map(|r| eval_lagrange(r, &x).unwrap()).collect();
//! transcript.append_e4_slice(&claims);
//! let alpha = transcript.challenge_e4();
//!
//! state.open_lin_comb(alpha).unwrap();
//! let columns = transcript.challenge_indices(4, params.size_codeword());
//! let proof = state.open_columns(&columns).unwrap();
//!
//! params
//!     .verify(&VerifierInput {
//!         root,
//!         claimed_values: &claims,
//!         evaluation_point: x,
//!         alpha,
//!         selected_columns: &columns,
//!         proof: &proof,
//!     })
//!     .unwrap();
//! ```

pub mod digest;
pub mod error;
pub mod extension;
pub mod fft;
pub mod field;
pub mod merkle;
pub mod parallel;
pub mod params;
pub mod poly;
pub mod poseidon2;
pub mod prng;
pub mod prover;
mod reedsolomon;
pub mod scalar;
pub mod sis;
pub mod transcript;
pub mod verifier;

pub use digest::{Blake2bHasher, ByteHasher, Hash, Sha256Hasher};
pub use error::{Result, VortexError};
pub use extension::{E2, E4};
pub use fft::{bit_reverse, Decimation, Domain};
pub use field::Fr;
pub use merkle::{MerkleProof, MerkleTree, NodeHasher};
pub use params::{Config, Params};
pub use poly::{batch_eval_lagrange, eval_horner, eval_lagrange};
pub use poseidon2::{MdHasher, Poseidon2};
pub use prng::ChallengePrng;
pub use prover::{commit, Proof, ProverState};
pub use scalar::RingScalar;
pub use sis::RingSis;
pub use transcript::Transcript;
pub use verifier::VerifierInput;
