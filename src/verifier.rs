//! Verification of a Vortex opening.

use tracing::{debug, warn};

use crate::digest::Hash;
use crate::error::{Result, VortexError};
use crate::extension::E4;
use crate::params::Params;
use crate::poly::{eval_horner, eval_lagrange};
use crate::prover::{column_leaf, Proof};

/// Everything the verifier needs to check an opening.
#[derive(Debug, Clone, Copy)]
pub struct VerifierInput<'a> {
    /// Merkle root returned by the commitment.
    pub root: Hash,
    /// Claimed evaluations at `evaluation_point`, one per committed row.
    pub claimed_values: &'a [E4],
    /// Point at which the rows are claimed to evaluate to `claimed_values`.
    pub evaluation_point: E4,
    /// Coefficient of the random linear combination.
    pub alpha: E4,
    /// Columns opened by the prover.
    pub selected_columns: &'a [usize],
    /// The opening itself.
    pub proof: &'a Proof,
}

impl Params {
    /// Checks an opening proof.
    ///
    /// Returns `Ok(())` when the linear combination is consistent with the
    /// claims, is a codeword, and agrees with every opened column, each of
    /// which must hash to a leaf under the committed root.
    pub fn verify(&self, input: &VerifierInput<'_>) -> Result<()> {
        let res = self.verify_inner(input);
        if let Err(err) = &res {
            warn!(%err, "vortex verification failed");
        }
        res
    }

    fn verify_inner(&self, input: &VerifierInput<'_>) -> Result<()> {
        let proof = input.proof;
        let size_codeword = self.size_codeword();
        if proof.u_alpha.len() != size_codeword {
            return Err(VortexError::shape(
                "u_alpha",
                size_codeword,
                proof.u_alpha.len(),
            ));
        }
        if input.selected_columns.len() != self.num_selected_columns {
            return Err(VortexError::shape(
                "selected columns",
                self.num_selected_columns,
                input.selected_columns.len(),
            ));
        }
        if proof.opened_columns.len() != input.selected_columns.len() {
            return Err(VortexError::shape(
                "opened columns",
                input.selected_columns.len(),
                proof.opened_columns.len(),
            ));
        }
        if proof.merkle_proofs.len() != input.selected_columns.len() {
            return Err(VortexError::shape(
                "merkle proofs",
                input.selected_columns.len(),
                proof.merkle_proofs.len(),
            ));
        }

        // u_alpha is the encoding of Σ α^row·row, so its interpolant
        // evaluates to Σ α^row·y_row at the evaluation point
        let lhs = eval_lagrange(&proof.u_alpha, &input.evaluation_point)?;
        let rhs = eval_horner(input.claimed_values, &input.alpha);
        if lhs != rhs {
            return Err(VortexError::InvalidProof(
                "linear combination does not match the claimed values".into(),
            ));
        }

        self.is_codeword(&proof.u_alpha)?;
        debug!("linear combination is a consistent codeword");

        let hasher = self.node_hasher();
        for (k, ((&col, column), path)) in input
            .selected_columns
            .iter()
            .zip(&proof.opened_columns)
            .zip(&proof.merkle_proofs)
            .enumerate()
        {
            if col >= size_codeword {
                return Err(VortexError::range("selected column", col, size_codeword));
            }
            if column.len() != input.claimed_values.len() {
                return Err(VortexError::shape(
                    format!("opened column {k}"),
                    input.claimed_values.len(),
                    column.len(),
                ));
            }
            let leaf = column_leaf(self, column)?;
            path.verify(col, &leaf, &input.root, &hasher)?;

            if proof.u_alpha[col] != eval_horner(column, &input.alpha) {
                return Err(VortexError::InvalidProof(format!(
                    "column {col} is inconsistent with the linear combination"
                )));
            }
        }
        debug!(
            nb_columns = input.selected_columns.len(),
            "opened columns verified"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Blake2bHasher, Sha256Hasher};
    use crate::field::Fr;
    use crate::params::Config;
    use crate::prover::{commit, ProverState};
    use crate::scalar::RingScalar;
    use crate::sis::RingSis;
    use crate::transcript::Transcript;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    struct Opening {
        params: Arc<Params>,
        root: Hash,
        claims: Vec<E4>,
        x: E4,
        alpha: E4,
        columns: Vec<usize>,
        proof: Proof,
    }

    impl Opening {
        fn input(&self) -> VerifierInput<'_> {
            VerifierInput {
                root: self.root,
                claimed_values: &self.claims,
                evaluation_point: self.x,
                alpha: self.alpha,
                selected_columns: &self.columns,
                proof: &self.proof,
            }
        }
    }

    fn random_matrix(rows: usize, cols: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<Fr>> {
        (0..rows)
            .map(|_| (0..cols).map(|_| Fr::random(rng)).collect())
            .collect()
    }

    fn run(params: Arc<Params>, matrix: Vec<Vec<Fr>>, seed: u64) -> Opening {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut state: ProverState = commit(&params, &matrix).unwrap();
        let root = state.get_commitment();
        let x = E4::random(&mut rng);
        let claims: Vec<E4> = matrix
            .iter()
            .map(|row| eval_lagrange(row, &x).unwrap())
            .collect();
        let alpha = E4::random(&mut rng);
        state.open_lin_comb(alpha).unwrap();
        let columns: Vec<usize> = (0..params.num_selected_columns())
            .map(|i| (i * 7 + seed as usize) % params.size_codeword())
            .collect();
        let proof = state.open_columns(&columns).unwrap();
        Opening {
            params,
            root,
            claims,
            x,
            alpha,
            columns,
            proof,
        }
    }

    fn sis_params(cols: usize, rows: usize, rate: usize, open: usize) -> Arc<Params> {
        let key = Arc::new(RingSis::new(5, 9, 16, rows).unwrap());
        Arc::new(Params::new(cols, rows, Some(key), rate, open).unwrap())
    }

    #[test]
    fn test_honest_opening_verifies() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for rate in [2usize, 4, 8] {
            let params = sis_params(16, 6, rate, 4);
            let matrix = random_matrix(6, 16, &mut rng);
            let opening = run(params, matrix, rate as u64);
            opening.params.verify(&opening.input()).unwrap();
        }
    }

    #[test]
    fn test_all_zero_matrix_verifies() {
        let params = sis_params(16, 4, 2, 3);
        let opening = run(params, vec![vec![Fr::ZERO; 16]; 4], 2);
        assert!(opening.claims.iter().all(E4::is_zero));
        opening.params.verify(&opening.input()).unwrap();
    }

    #[test]
    fn test_alternate_hashers_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = Config::default()
            .with_column_hasher(Arc::new(Blake2bHasher))
            .with_merkle_hasher(Arc::new(Sha256Hasher));
        let params = Arc::new(Params::with_config(8, 5, None, 4, 6, config).unwrap());
        let matrix = random_matrix(5, 8, &mut rng);
        let opening = run(params, matrix, 4);
        opening.params.verify(&opening.input()).unwrap();
    }

    #[test]
    fn test_wrong_claim_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut opening = run(sis_params(16, 3, 2, 2), random_matrix(3, 16, &mut rng), 5);
        opening.claims[1] += E4::ONE;
        assert!(matches!(
            opening.params.verify(&opening.input()),
            Err(VortexError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_tampered_linear_combination_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let opening = run(sis_params(16, 3, 2, 2), random_matrix(3, 16, &mut rng), 6);

        // adding a codeword keeps membership but breaks the claimed values
        let mut tampered = opening.proof.clone();
        let noise = opening.params.encode(&[Fr::ONE; 16]).unwrap();
        for (u, n) in tampered.u_alpha.iter_mut().zip(&noise) {
            *u += n.lift();
        }
        let input = VerifierInput {
            proof: &tampered,
            ..opening.input()
        };
        assert!(opening.params.verify(&input).is_err());

        // a single-entry change is caught by the codeword test or the
        // column consistency check
        let mut tampered = opening.proof.clone();
        tampered.u_alpha[opening.columns[0]] += E4::ONE;
        let input = VerifierInput {
            proof: &tampered,
            ..opening.input()
        };
        assert!(opening.params.verify(&input).is_err());
    }

    #[test]
    fn test_tampered_column_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let opening = run(sis_params(16, 4, 2, 3), random_matrix(4, 16, &mut rng), 7);
        let mut tampered = opening.proof.clone();
        tampered.opened_columns[1][2] += Fr::ONE;
        let input = VerifierInput {
            proof: &tampered,
            ..opening.input()
        };
        assert!(matches!(
            opening.params.verify(&input),
            Err(VortexError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let opening = run(sis_params(16, 2, 2, 2), random_matrix(2, 16, &mut rng), 8);
        let mut root = opening.root;
        root.0[0] += Fr::ONE;
        let input = VerifierInput {
            root,
            ..opening.input()
        };
        assert!(matches!(
            opening.params.verify(&input),
            Err(VortexError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_shape_and_range_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let opening = run(sis_params(16, 3, 2, 2), random_matrix(3, 16, &mut rng), 9);

        let mut short = opening.proof.clone();
        short.u_alpha.pop();
        let input = VerifierInput {
            proof: &short,
            ..opening.input()
        };
        assert!(matches!(
            opening.params.verify(&input),
            Err(VortexError::Shape { .. })
        ));

        let mut missing = opening.proof.clone();
        missing.merkle_proofs.pop();
        let input = VerifierInput {
            proof: &missing,
            ..opening.input()
        };
        assert!(matches!(
            opening.params.verify(&input),
            Err(VortexError::Shape { .. })
        ));

        let one_column = [opening.columns[0]];
        let input = VerifierInput {
            selected_columns: &one_column,
            ..opening.input()
        };
        assert!(matches!(
            opening.params.verify(&input),
            Err(VortexError::Shape { .. })
        ));

        let out_of_range = [opening.columns[0], 32];
        let input = VerifierInput {
            selected_columns: &out_of_range,
            ..opening.input()
        };
        assert!(matches!(
            opening.params.verify(&input),
            Err(VortexError::Range { .. })
        ));
    }

    #[test]
    fn test_non_interactive_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let params = sis_params(32, 4, 2, 8);
        let matrix = random_matrix(4, 32, &mut rng);
        let mut state = commit(&params, &matrix).unwrap();

        let mut prover = Transcript::new(b"vortex-test");
        prover.append_hash(&state.get_commitment());
        let x = prover.challenge_e4();
        let claims: Vec<E4> = matrix
            .iter()
            .map(|row| eval_lagrange(row, &x).unwrap())
            .collect();
        prover.append_e4_slice(&claims);
        let alpha = prover.challenge_e4();
        state.open_lin_comb(alpha).unwrap();
        prover.append_e4_slice(state.u_alpha().unwrap());
        let columns = prover.challenge_indices(8, params.size_codeword());
        let proof = state.open_columns(&columns).unwrap();

        let mut verifier = Transcript::new(b"vortex-test");
        verifier.append_hash(&state.get_commitment());
        assert_eq!(verifier.challenge_e4(), x);
        verifier.append_e4_slice(&claims);
        assert_eq!(verifier.challenge_e4(), alpha);
        verifier.append_e4_slice(&proof.u_alpha);
        assert_eq!(verifier.challenge_indices(8, params.size_codeword()), columns);

        params
            .verify(&VerifierInput {
                root: state.get_commitment(),
                claimed_values: &claims,
                evaluation_point: x,
                alpha,
                selected_columns: &columns,
                proof: &proof,
            })
            .unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_honest_openings_verify(
            log_cols in 2u32..6,
            rows in 0usize..5,
            rate in prop::sample::select(vec![2usize, 4, 8]),
            alpha in prop::array::uniform4(any::<u64>()),
            x_coords in prop::array::uniform4(any::<u64>()),
            x_on_domain in prop::option::of(any::<u64>()),
            picks in prop::collection::vec(any::<prop::sample::Index>(), 1..6),
            seed in any::<u64>(),
        ) {
            let cols = 1usize << log_cols;
            let key = Arc::new(RingSis::new(seed, 9, 16, rows.max(1)).unwrap());
            let params = Params::new(cols, rows.max(1), Some(key), rate, picks.len()).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let matrix = random_matrix(rows, cols, &mut rng);

            let x = match x_on_domain {
                Some(k) => E4::from_base(Fr::root_of_unity(cols as u64).unwrap().pow(k)),
                None => E4::from_coords(x_coords.map(Fr::new)),
            };
            let alpha = E4::from_coords(alpha.map(Fr::new));
            let columns: Vec<usize> = picks
                .iter()
                .map(|p| p.index(params.size_codeword()))
                .collect();

            let mut state = commit(&Arc::new(params), &matrix).unwrap();
            let claims: Vec<E4> = matrix
                .iter()
                .map(|row| eval_lagrange(row, &x).unwrap())
                .collect();
            state.open_lin_comb(alpha).unwrap();
            let proof = state.open_columns(&columns).unwrap();
            let input = VerifierInput {
                root: state.get_commitment(),
                claimed_values: &claims,
                evaluation_point: x,
                alpha,
                selected_columns: &columns,
                proof: &proof,
            };
            prop_assert!(state.params().verify(&input).is_ok());
        }

        #[test]
        fn prop_flipping_any_opened_entry_is_rejected(row in 0usize..3, which in 0usize..2, delta in 1u64..1000) {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let config = Config::default().with_column_hasher(Arc::new(Sha256Hasher));
            let params = Arc::new(Params::with_config(8, 3, None, 2, 2, config).unwrap());
            let opening = run(params, random_matrix(3, 8, &mut rng), 11);
            let mut tampered = opening.proof.clone();
            tampered.opened_columns[which][row] += Fr::new(delta);
            let input = VerifierInput { proof: &tampered, ..opening.input() };
            prop_assert!(opening.params.verify(&input).is_err());
        }
    }
}
