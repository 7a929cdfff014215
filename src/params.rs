//! Public parameters of the commitment scheme.

use std::sync::Arc;

use tracing::debug;

use crate::digest::ByteHasher;
use crate::error::{Result, VortexError};
use crate::fft::{bit_reverse, Domain};
use crate::field::Fr;
use crate::merkle::NodeHasher;
use crate::poseidon2::Poseidon2;
use crate::sis::RingSis;

/// Reed–Solomon inverse rates the scheme supports.
pub const SUPPORTED_INV_RATES: [usize; 3] = [2, 4, 8];

/// Optional replacements for the default hash functions.
///
/// By default the columns of the encoded matrix are hashed with Ring-SIS and
/// the Merkle tree uses the Poseidon2 compression.
#[derive(Clone, Debug, Default)]
pub struct Config {
    merkle_hasher: Option<Arc<dyn ByteHasher>>,
    column_hasher: Option<Arc<dyn ByteHasher>>,
}

impl Config {
    /// Builds the Merkle tree, leaves included, with `hasher`.
    pub fn with_merkle_hasher(mut self, hasher: Arc<dyn ByteHasher>) -> Self {
        self.merkle_hasher = Some(hasher);
        self
    }

    /// Hashes the columns with `hasher` instead of Ring-SIS.
    pub fn with_column_hasher(mut self, hasher: Arc<dyn ByteHasher>) -> Self {
        self.column_hasher = Some(hasher);
        self
    }

    /// Alternate Merkle hasher, if any.
    pub fn merkle_hasher(&self) -> Option<&Arc<dyn ByteHasher>> {
        self.merkle_hasher.as_ref()
    }

    /// Alternate column hasher, if any.
    pub fn column_hasher(&self) -> Option<&Arc<dyn ByteHasher>> {
        self.column_hasher.as_ref()
    }
}

/// Immutable parameters shared by the prover and the verifier.
#[derive(Clone, Debug)]
pub struct Params {
    pub(crate) key: Option<Arc<RingSis>>,
    pub(crate) reed_solomon_inv_rate: usize,
    pub(crate) nb_columns: usize,
    pub(crate) max_nb_rows: usize,
    pub(crate) num_selected_columns: usize,
    /// Size `nb_columns`, shifted by a primitive `nb_columns·ρ`-th root.
    pub(crate) small_domain: Domain,
    /// Size `nb_columns·ρ`.
    pub(crate) big_domain: Domain,
    pub(crate) coset_table_bit_reversed: Vec<Fr>,
    pub(crate) poseidon: Arc<Poseidon2<16>>,
    pub(crate) config: Config,
}

impl Params {
    /// Builds parameters with the default hashers.
    pub fn new(
        nb_columns: usize,
        max_nb_rows: usize,
        key: Option<Arc<RingSis>>,
        reed_solomon_inv_rate: usize,
        num_selected_columns: usize,
    ) -> Result<Self> {
        Self::with_config(
            nb_columns,
            max_nb_rows,
            key,
            reed_solomon_inv_rate,
            num_selected_columns,
            Config::default(),
        )
    }

    /// Builds parameters with explicit hasher options.
    pub fn with_config(
        nb_columns: usize,
        max_nb_rows: usize,
        key: Option<Arc<RingSis>>,
        reed_solomon_inv_rate: usize,
        num_selected_columns: usize,
        config: Config,
    ) -> Result<Self> {
        if nb_columns == 0 || !nb_columns.is_power_of_two() {
            return Err(VortexError::Configuration(format!(
                "number of columns must be a power of two, got {nb_columns}"
            )));
        }
        if !SUPPORTED_INV_RATES.contains(&reed_solomon_inv_rate) {
            return Err(VortexError::Configuration(format!(
                "reed-solomon inverse rate must be 2, 4 or 8, got {reed_solomon_inv_rate}"
            )));
        }
        if max_nb_rows == 0 {
            return Err(VortexError::Configuration(
                "the matrix must allow at least one row".into(),
            ));
        }
        let size_codeword = nb_columns
            .checked_mul(reed_solomon_inv_rate)
            .ok_or_else(|| {
                VortexError::Configuration(format!(
                    "codeword size {nb_columns} x {reed_solomon_inv_rate} overflows"
                ))
            })?;
        if num_selected_columns > size_codeword {
            return Err(VortexError::Configuration(format!(
                "cannot open {num_selected_columns} columns out of {size_codeword}"
            )));
        }
        if let Some(key) = &key {
            if key.max_nb_elements_to_hash() < max_nb_rows {
                return Err(VortexError::Configuration(format!(
                    "ring-SIS key hashes at most {} elements but columns hold up to {max_nb_rows}",
                    key.max_nb_elements_to_hash()
                )));
            }
        }

        let shift = Fr::root_of_unity(size_codeword as u64).ok_or_else(|| {
            VortexError::Configuration(format!(
                "codeword size {size_codeword} exceeds the two-adicity of the field"
            ))
        })?;
        let small_domain = Domain::with_shift(nb_columns, shift)?;
        let big_domain = Domain::new(size_codeword)?;
        let mut coset_table_bit_reversed = small_domain.coset_table();
        bit_reverse(&mut coset_table_bit_reversed);

        debug!(
            nb_columns,
            max_nb_rows,
            reed_solomon_inv_rate,
            num_selected_columns,
            "built vortex parameters"
        );

        Ok(Self {
            key,
            reed_solomon_inv_rate,
            nb_columns,
            max_nb_rows,
            num_selected_columns,
            small_domain,
            big_domain,
            coset_table_bit_reversed,
            poseidon: Arc::new(Poseidon2::compression()?),
            config,
        })
    }

    /// Number of columns after encoding, `nb_columns·ρ`.
    pub fn size_codeword(&self) -> usize {
        self.nb_columns * self.reed_solomon_inv_rate
    }

    /// Number of columns of the committed matrix.
    pub fn nb_columns(&self) -> usize {
        self.nb_columns
    }

    /// Maximum number of rows of the committed matrix.
    pub fn max_nb_rows(&self) -> usize {
        self.max_nb_rows
    }

    /// Inverse rate `ρ` of the Reed–Solomon code.
    pub fn reed_solomon_inv_rate(&self) -> usize {
        self.reed_solomon_inv_rate
    }

    /// Number of columns the verifier samples.
    pub fn num_selected_columns(&self) -> usize {
        self.num_selected_columns
    }

    /// Ring-SIS key, when columns are hashed with SIS.
    pub fn key(&self) -> Option<&Arc<RingSis>> {
        self.key.as_ref()
    }

    /// Hasher options.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Domain of the non-encoded rows.
    pub fn small_domain(&self) -> &Domain {
        &self.small_domain
    }

    /// Domain of the codewords.
    pub fn big_domain(&self) -> &Domain {
        &self.big_domain
    }

    /// Poseidon2 instance used for leaves and Merkle nodes.
    pub fn poseidon(&self) -> &Arc<Poseidon2<16>> {
        &self.poseidon
    }

    /// Compression used for the internal Merkle nodes.
    pub fn node_hasher(&self) -> NodeHasher {
        match &self.config.merkle_hasher {
            Some(h) => NodeHasher::Bytes(Arc::clone(h)),
            None => NodeHasher::Poseidon2(Arc::clone(&self.poseidon)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Sha256Hasher;

    #[test]
    fn test_validation() {
        assert!(Params::new(4, 4, None, 2, 2).is_ok());
        assert!(matches!(
            Params::new(6, 4, None, 2, 2),
            Err(VortexError::Configuration(_))
        ));
        assert!(Params::new(0, 4, None, 2, 2).is_err());
        assert!(Params::new(4, 4, None, 3, 2).is_err());
        assert!(Params::new(4, 4, None, 16, 2).is_err());
        assert!(Params::new(4, 0, None, 2, 2).is_err());
        assert!(Params::new(4, 4, None, 2, 9).is_err());
        assert!(Params::new(1 << 23, 4, None, 4, 2).is_err());
    }

    #[test]
    fn test_codeword_size_overflow() {
        for inv_rate in [2, 4, 8] {
            assert!(matches!(
                Params::new(usize::MAX / 4 + 1, 4, None, inv_rate, 2),
                Err(VortexError::Configuration(_))
            ));
        }
        assert!(matches!(
            Params::new(usize::MAX / 2 + 1, 4, None, 2, 2),
            Err(VortexError::Configuration(_))
        ));
    }

    #[test]
    fn test_sis_capacity_must_cover_rows() {
        let key = Arc::new(RingSis::new(0, 4, 16, 8).unwrap());
        assert!(Params::new(8, 8, Some(Arc::clone(&key)), 2, 2).is_ok());
        assert!(Params::new(8, 9, Some(key), 2, 2).is_err());
    }

    #[test]
    fn test_domains_and_coset_table() {
        let params = Params::new(8, 4, None, 4, 2).unwrap();
        assert_eq!(params.size_codeword(), 32);
        assert_eq!(params.small_domain().cardinality(), 8);
        assert_eq!(params.big_domain().cardinality(), 32);
        let shift = params.small_domain().shift();
        assert_eq!(shift.pow(32), Fr::ONE);
        assert_ne!(shift.pow(16), Fr::ONE);
        // bit-reversed position 1 holds shift^4
        assert_eq!(params.coset_table_bit_reversed[1], shift.pow(4));
    }

    #[test]
    fn test_node_hasher_follows_config() {
        let params = Params::new(4, 4, None, 2, 2).unwrap();
        assert!(matches!(params.node_hasher(), NodeHasher::Poseidon2(_)));
        let config = Config::default().with_merkle_hasher(Arc::new(Sha256Hasher));
        let params = Params::with_config(4, 4, None, 2, 2, config).unwrap();
        assert!(matches!(params.node_hasher(), NodeHasher::Bytes(_)));
        assert!(params.config().column_hasher().is_none());
    }
}
