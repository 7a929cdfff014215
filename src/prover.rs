//! Commitment and opening.
//!
//! [`commit`] Reed–Solomon encodes every row, hashes every column of the
//! encoded matrix (Ring-SIS by default), turns each column digest into a
//! Merkle leaf and commits to the leaves with a Merkle tree.  The resulting
//! [`ProverState`] then answers the two opening queries of the protocol: the
//! random linear combination of the rows, and a set of columns with their
//! Merkle paths.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::digest::{elements_to_bytes, Hash, DIGEST_ELEMENTS};
use crate::error::{Result, VortexError};
use crate::extension::E4;
use crate::field::Fr;
use crate::merkle::{MerkleProof, MerkleTree};
use crate::parallel::{parallel_for, parallel_for_init};
use crate::params::Params;
use crate::poseidon2::LANES;
use crate::scalar::RingScalar;

/// Ring degree the commitment requires from its Ring-SIS key.
pub const SIS_DEGREE: usize = 512;

/// Columns hashed together; the codeword size must be a multiple of it.
pub const COLUMN_BLOCK: usize = LANES;

/// Columns of the linear combination computed per parallel task.
const LIN_COMB_COLUMNS_PER_TASK: usize = 64;

/// Opening proof for a set of columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// `Σ_row α^row · encoded_row`, one entry per codeword position.
    pub u_alpha: Vec<E4>,
    /// Opened columns of the encoded matrix, in query order.
    pub opened_columns: Vec<Vec<Fr>>,
    /// Merkle path of each opened column.
    pub merkle_proofs: Vec<MerkleProof>,
}

impl Proof {
    /// Serialises the proof as JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| VortexError::Decode(err.to_string()))
    }

    /// Parses a proof emitted by [`Proof::to_json_string`].
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|err| VortexError::Decode(format!("invalid proof JSON: {err}")))
    }
}

/// Everything the prover keeps between the commitment and the openings.
#[derive(Debug)]
pub struct ProverState {
    params: Arc<Params>,
    nb_rows: usize,
    /// Row-major, `nb_rows × size_codeword`.
    encoded_matrix: Vec<Fr>,
    /// Column digests back to back.
    hashed_columns: Vec<Fr>,
    merkle_tree: MerkleTree,
    u_alpha: Option<Vec<E4>>,
}

/// Commits to `matrix`, given row by row.
pub fn commit(params: &Arc<Params>, matrix: &[Vec<Fr>]) -> Result<ProverState> {
    let size_codeword = params.size_codeword();
    let span = info_span!("commit", rows = matrix.len(), columns = params.nb_columns);
    let _enter = span.enter();

    check_commit_preconditions(params)?;
    if matrix.len() > params.max_nb_rows {
        return Err(VortexError::range(
            "matrix rows",
            matrix.len(),
            params.max_nb_rows + 1,
        ));
    }
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != params.nb_columns {
            return Err(VortexError::shape(
                format!("row {i}"),
                params.nb_columns,
                row.len(),
            ));
        }
    }

    let start = Instant::now();
    let mut encoded_matrix = vec![Fr::ZERO; matrix.len() * size_codeword];
    parallel_for(&mut encoded_matrix, size_codeword, |i, codeword| {
        params.encode_reed_solomon(&matrix[i], codeword)
    })?;
    debug!(elapsed = ?start.elapsed(), "encoded rows");

    let start = Instant::now();
    let hashed_columns = transversal_hash(params, &encoded_matrix, matrix.len())?;
    debug!(elapsed = ?start.elapsed(), "hashed columns");

    let start = Instant::now();
    let leaves = compute_leaves(params, &hashed_columns)?;
    let merkle_tree = MerkleTree::build(&leaves, &params.node_hasher())?;
    debug!(elapsed = ?start.elapsed(), depth = merkle_tree.depth(), "built merkle tree");

    info!(root = %merkle_tree.root(), "committed matrix");
    Ok(ProverState {
        params: Arc::clone(params),
        nb_rows: matrix.len(),
        encoded_matrix,
        hashed_columns,
        merkle_tree,
        u_alpha: None,
    })
}

fn check_commit_preconditions(params: &Params) -> Result<()> {
    if params.size_codeword() % COLUMN_BLOCK != 0 {
        return Err(VortexError::Configuration(format!(
            "codeword size {} is not a multiple of {COLUMN_BLOCK}",
            params.size_codeword()
        )));
    }
    if params.config.column_hasher().is_none() {
        match &params.key {
            None => {
                return Err(VortexError::Configuration(
                    "columns are hashed with ring-SIS but no key was provided".into(),
                ))
            }
            Some(key) if key.degree() != SIS_DEGREE => {
                return Err(VortexError::Configuration(format!(
                    "ring-SIS degree must be {SIS_DEGREE}, got {}",
                    key.degree()
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Length of a column digest: the SIS degree, or eight elements for an
/// alternate column hasher.
pub(crate) fn column_digest_len(params: &Params) -> usize {
    match (&params.config.column_hasher(), &params.key) {
        (None, Some(key)) => key.degree(),
        _ => DIGEST_ELEMENTS,
    }
}

/// Hashes one column into `out`, which holds [`column_digest_len`] elements.
pub(crate) fn hash_column(params: &Params, column: &[Fr], out: &mut [Fr]) -> Result<()> {
    match (params.config.column_hasher(), &params.key) {
        (Some(h), _) => {
            let digest = h.digest_elements(&elements_to_bytes(column));
            if out.len() != DIGEST_ELEMENTS {
                return Err(VortexError::shape("column digest", DIGEST_ELEMENTS, out.len()));
            }
            out.copy_from_slice(digest.elements());
            Ok(())
        }
        (None, Some(key)) => key.hash(column, out),
        (None, None) => Err(VortexError::Configuration(
            "no column hasher configured".into(),
        )),
    }
}

/// Maps a column digest to its Merkle leaf.
pub(crate) fn leaf_of_digest(params: &Params, digest: &[Fr]) -> Hash {
    match params.config.merkle_hasher() {
        Some(h) => h.digest_elements(&elements_to_bytes(digest)),
        None => params.poseidon.hash_elements(digest),
    }
}

/// Column hash followed by the leaf mapping, as the verifier recomputes it.
pub(crate) fn column_leaf(params: &Params, column: &[Fr]) -> Result<Hash> {
    let mut digest = vec![Fr::ZERO; column_digest_len(params)];
    hash_column(params, column, &mut digest)?;
    Ok(leaf_of_digest(params, &digest))
}

/// Hashes the columns of the encoded matrix, sixteen at a time so that the
/// transposition reads whole cache lines of every row.
fn transversal_hash(params: &Params, encoded: &[Fr], nb_rows: usize) -> Result<Vec<Fr>> {
    let size_codeword = params.size_codeword();
    let digest_len = column_digest_len(params);
    let mut hashed = vec![Fr::ZERO; size_codeword * digest_len];
    parallel_for_init(
        &mut hashed,
        COLUMN_BLOCK * digest_len,
        || vec![Fr::ZERO; COLUMN_BLOCK * nb_rows],
        |transposed, block, out| {
            let first = block * COLUMN_BLOCK;
            for row in 0..nb_rows {
                let src = &encoded[row * size_codeword + first..][..COLUMN_BLOCK];
                for (j, x) in src.iter().enumerate() {
                    transposed[j * nb_rows + row] = *x;
                }
            }
            for (j, digest) in out.chunks_exact_mut(digest_len).enumerate() {
                hash_column(params, &transposed[j * nb_rows..(j + 1) * nb_rows], digest)?;
            }
            Ok(())
        },
    )?;
    Ok(hashed)
}

/// Turns the column digests into Merkle leaves.
fn compute_leaves(params: &Params, hashed_columns: &[Fr]) -> Result<Vec<Hash>> {
    let digest_len = column_digest_len(params);
    let mut leaves = vec![Hash::ZERO; params.size_codeword()];
    let block_len = COLUMN_BLOCK * digest_len;
    match params.config.merkle_hasher() {
        None => parallel_for(&mut leaves, COLUMN_BLOCK, |block, out| {
            let digests = &hashed_columns[block * block_len..(block + 1) * block_len];
            params.poseidon.compress_x16(digests, digest_len, out)
        })?,
        Some(_) => parallel_for(&mut leaves, COLUMN_BLOCK, |block, out| {
            let digests = &hashed_columns[block * block_len..(block + 1) * block_len];
            for (leaf, digest) in out.iter_mut().zip(digests.chunks_exact(digest_len)) {
                *leaf = leaf_of_digest(params, digest);
            }
            Ok(())
        })?,
    }
    Ok(leaves)
}

impl ProverState {
    /// The commitment: root of the Merkle tree.
    pub fn get_commitment(&self) -> Hash {
        self.merkle_tree.root()
    }

    /// Parameters the state was built with.
    pub fn params(&self) -> &Arc<Params> {
        &self.params
    }

    /// Number of committed rows.
    pub fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    /// Encoded matrix, row-major.
    pub fn encoded_matrix(&self) -> &[Fr] {
        &self.encoded_matrix
    }

    /// Column digests back to back.
    pub fn hashed_columns(&self) -> &[Fr] {
        &self.hashed_columns
    }

    /// Merkle tree over the column leaves.
    pub fn merkle_tree(&self) -> &MerkleTree {
        &self.merkle_tree
    }

    /// Linear combination computed by [`ProverState::open_lin_comb`].
    pub fn u_alpha(&self) -> Option<&[E4]> {
        self.u_alpha.as_deref()
    }

    /// Computes `u_alpha = Σ_row α^row · encoded_row`.
    ///
    /// Every coefficient is multiplied by a precomputed power of `α`, which
    /// costs base-by-extension products only, instead of the extension
    /// products a Horner evaluation would need.
    pub fn open_lin_comb(&mut self, alpha: E4) -> Result<()> {
        let size_codeword = self.params.size_codeword();
        let start = Instant::now();
        let mut powers = Vec::with_capacity(self.nb_rows);
        let mut acc = E4::ONE;
        for _ in 0..self.nb_rows {
            powers.push(acc);
            acc *= alpha;
        }

        let encoded = &self.encoded_matrix;
        let mut u_alpha = vec![E4::ZERO; size_codeword];
        parallel_for(&mut u_alpha, LIN_COMB_COLUMNS_PER_TASK, |task, chunk| {
            let first = task * LIN_COMB_COLUMNS_PER_TASK;
            for (row, power) in powers.iter().enumerate() {
                let src = &encoded[row * size_codeword + first..][..chunk.len()];
                for (u, x) in chunk.iter_mut().zip(src) {
                    *u += x.scale_ext(power);
                }
            }
            Ok(())
        })?;
        debug!(elapsed = ?start.elapsed(), "opened linear combination");

        self.u_alpha = Some(u_alpha);
        Ok(())
    }

    /// Opens the selected columns of the encoded matrix.
    ///
    /// Requires [`ProverState::open_lin_comb`] to have been called.
    pub fn open_columns(&self, selected_columns: &[usize]) -> Result<Proof> {
        let u_alpha = self.u_alpha.as_ref().ok_or(VortexError::MissingLinComb)?;
        let size_codeword = self.params.size_codeword();

        let mut opened_columns = Vec::with_capacity(selected_columns.len());
        let mut merkle_proofs = Vec::with_capacity(selected_columns.len());
        for &col in selected_columns {
            if col >= size_codeword {
                return Err(VortexError::range("opened column", col, size_codeword));
            }
            opened_columns.push(self.column(col));
            merkle_proofs.push(self.merkle_tree.open(col)?);
        }
        debug!(nb_columns = selected_columns.len(), "opened columns");

        Ok(Proof {
            u_alpha: u_alpha.clone(),
            opened_columns,
            merkle_proofs,
        })
    }

    fn column(&self, col: usize) -> Vec<Fr> {
        let size_codeword = self.params.size_codeword();
        (0..self.nb_rows)
            .map(|row| self.encoded_matrix[row * size_codeword + col])
            .collect()
    }
}
