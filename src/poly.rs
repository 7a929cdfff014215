//! Univariate polynomial evaluation at extension-field points.
//!
//! Polynomials are given either by coefficients (Horner evaluation) or by
//! their values on the subgroup `⟨ω⟩` of size `n` (Lagrange evaluation).
//! With `on_coset` the values are taken on `g·⟨ω⟩` for the multiplicative
//! generator `g`.

use crate::error::{Result, VortexError};
use crate::extension::E4;
use crate::field::Fr;
use crate::parallel::parallel_for;
use crate::scalar::RingScalar;

/// Polynomials evaluated per parallel task in [`batch_eval_lagrange`].
const POLYS_PER_TASK: usize = 4;

/// Evaluates `Σ poly[i]·x^i`.
pub fn eval_horner<T: RingScalar>(poly: &[T], x: &E4) -> E4 {
    poly.iter()
        .rev()
        .fold(E4::ZERO, |acc, c| acc * *x + c.lift())
}

/// Returns `(L_i(x))_{i<n}` for the Lagrange basis of the size-`n` subgroup.
///
/// When `x` is itself a point of the domain the basis is the indicator vector
/// of that point.
pub fn lagrange_basis_at(n: usize, x: &E4, on_coset: bool) -> Result<Vec<E4>> {
    if n == 0 || !n.is_power_of_two() {
        return Err(VortexError::shape(
            "lagrange domain",
            n.next_power_of_two().max(1),
            n,
        ));
    }
    let generator = Fr::root_of_unity(n as u64)
        .ok_or_else(|| VortexError::range("lagrange domain size", n, 1 << Fr::TWO_ADICITY))?;
    let generator_inv = generator.inverse().unwrap_or(Fr::ONE);
    let mut x = *x;
    if on_coset {
        x = x.mul_by_base(Fr::GENERATOR.inverse().unwrap_or(Fr::ONE));
    }
    if let Some(x) = base_value(&x) {
        return Ok(base_lagrange_basis(n, x, generator_inv));
    }

    // (x^n - 1) / n
    let mut numerator = x.pow(n as u64) - E4::ONE;
    numerator = numerator.mul_by_base(Fr::new(n as u64).inverse().unwrap_or(Fr::ONE));
    // x lies outside the domain here, so x^n != 1
    let numerator_inv = numerator.inverse().unwrap_or(E4::ZERO);

    // x/ω^i - 1
    let mut res = Vec::with_capacity(n);
    let mut cur = x;
    for i in 0..n {
        let d = cur - E4::ONE;
        if d.is_zero() {
            let mut basis = vec![E4::ZERO; n];
            basis[i] = E4::ONE;
            return Ok(basis);
        }
        res.push(d * numerator_inv);
        cur = cur.mul_by_base(generator_inv);
    }
    Ok(E4::batch_inverse(&res))
}

fn base_value(x: &E4) -> Option<Fr> {
    let [c0, rest @ ..] = x.coords();
    rest.iter().all(Fr::is_zero).then_some(c0)
}

/// Same basis for a point of the base field, inverted in `Fr`.
fn base_lagrange_basis(n: usize, x: Fr, generator_inv: Fr) -> Vec<E4> {
    let n_inv = Fr::new(n as u64).inverse().unwrap_or(Fr::ONE);
    let numerator_inv = ((x.pow(n as u64) - Fr::ONE) * n_inv)
        .inverse()
        .unwrap_or(Fr::ZERO);

    let mut res = Vec::with_capacity(n);
    let mut cur = x;
    for i in 0..n {
        let d = cur - Fr::ONE;
        if d.is_zero() {
            let mut basis = vec![E4::ZERO; n];
            basis[i] = E4::ONE;
            return basis;
        }
        res.push(d * numerator_inv);
        cur *= generator_inv;
    }
    Fr::batch_inverse(&res).into_iter().map(E4::from_base).collect()
}

/// Evaluates at `x` the polynomial whose values on the subgroup are `poly`.
pub fn eval_lagrange<T: RingScalar>(poly: &[T], x: &E4) -> Result<E4> {
    let basis = lagrange_basis_at(poly.len(), x, false)?;
    Ok(inner_product(poly, &basis))
}

/// Evaluates several polynomials of the same size at one point, sharing the
/// Lagrange basis computation.
pub fn batch_eval_lagrange<T: RingScalar>(
    polys: &[Vec<T>],
    x: &E4,
    on_coset: bool,
) -> Result<Vec<E4>> {
    let Some(first) = polys.first() else {
        return Ok(Vec::new());
    };
    let n = first.len();
    for (i, p) in polys.iter().enumerate() {
        if p.len() != n {
            return Err(VortexError::shape(format!("polynomial {i}"), n, p.len()));
        }
    }
    let basis = lagrange_basis_at(n, x, on_coset)?;

    let mut results = vec![E4::ZERO; polys.len()];
    parallel_for(&mut results, POLYS_PER_TASK, |chunk_id, chunk| {
        let offset = chunk_id * POLYS_PER_TASK;
        for (k, r) in chunk.iter_mut().enumerate() {
            *r = inner_product(&polys[offset + k], &basis);
        }
        Ok(())
    })?;
    Ok(results)
}

fn inner_product<T: RingScalar>(poly: &[T], basis: &[E4]) -> E4 {
    poly.iter()
        .zip(basis)
        .fold(E4::ZERO, |acc, (p, b)| acc + p.scale_ext(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::{bit_reverse, Decimation, Domain};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_base(n: usize, seed: u64) -> Vec<Fr> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| Fr::random(&mut rng)).collect()
    }

    fn values_of(coeffs: &[Fr], coset: bool) -> Vec<Fr> {
        let domain = Domain::new(coeffs.len()).unwrap();
        let mut evals = coeffs.to_vec();
        domain.fft(&mut evals, Decimation::Dif, coset).unwrap();
        bit_reverse(&mut evals);
        evals
    }

    #[test]
    fn test_lagrange_matches_horner() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let coeffs = random_base(32, 1);
        let evals = values_of(&coeffs, false);
        let x = E4::random(&mut rng);
        assert_eq!(eval_lagrange(&evals, &x).unwrap(), eval_horner(&coeffs, &x));
    }

    #[test]
    fn test_lagrange_on_coset() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let coeffs = random_base(16, 2);
        let evals = values_of(&coeffs, true);
        let x = E4::random(&mut rng);
        let res = batch_eval_lagrange(&[evals], &x, true).unwrap();
        assert_eq!(res[0], eval_horner(&coeffs, &x));
    }

    #[test]
    fn test_domain_point_yields_stored_value() {
        let evals = random_base(8, 3);
        let w = Fr::root_of_unity(8).unwrap();
        for i in 0..8 {
            let x = E4::from_base(w.pow(i as u64));
            assert_eq!(eval_lagrange(&evals, &x).unwrap(), evals[i].lift());
        }
    }

    #[test]
    fn test_base_field_point_matches_horner() {
        let coeffs = random_base(16, 7);
        let x = E4::from_base(Fr::new(123_456));
        assert_eq!(
            eval_lagrange(&values_of(&coeffs, false), &x).unwrap(),
            eval_horner(&coeffs, &x)
        );
        let on_coset = batch_eval_lagrange(&[values_of(&coeffs, true)], &x, true).unwrap();
        assert_eq!(on_coset[0], eval_horner(&coeffs, &x));
        let basis = lagrange_basis_at(16, &x, false).unwrap();
        let sum = basis.iter().fold(E4::ZERO, |acc, b| acc + *b);
        assert_eq!(sum, E4::ONE);
    }

    #[test]
    fn test_batch_agrees_with_single() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let x = E4::random(&mut rng);
        let polys: Vec<Vec<E4>> = (0..9)
            .map(|_| (0..16).map(|_| E4::random(&mut rng)).collect())
            .collect();
        let batch = batch_eval_lagrange(&polys, &x, false).unwrap();
        for (p, b) in polys.iter().zip(&batch) {
            assert_eq!(eval_lagrange(p, &x).unwrap(), *b);
        }
        assert!(batch_eval_lagrange::<Fr>(&[], &x, false).unwrap().is_empty());
    }

    #[test]
    fn test_size_errors() {
        let x = E4::ONE;
        assert!(matches!(
            eval_lagrange(&random_base(12, 4), &x),
            Err(VortexError::Shape { .. })
        ));
        let polys = vec![random_base(8, 5), random_base(4, 6)];
        assert!(matches!(
            batch_eval_lagrange(&polys, &x, false),
            Err(VortexError::Shape { .. })
        ));
        assert!(eval_lagrange::<Fr>(&[], &x).is_err());
    }

    #[test]
    fn test_horner_on_extension_coefficients() {
        let x = E4::from_base(Fr::new(2));
        let poly = [E4::ONE, E4::from_base(Fr::new(3)), E4::from_base(Fr::new(5))];
        // 1 + 3·2 + 5·4
        assert_eq!(eval_horner(&poly, &x), E4::from_base(Fr::new(27)));
    }
}
