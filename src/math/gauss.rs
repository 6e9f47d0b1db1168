//! Gaussian elimination with partial pivoting.
//!
//! The systems solved here are tiny (degree ≤ 4 in practice), so a direct dense
//! elimination on an owned copy of the matrix is all we need.

use nalgebra::DVector;

use crate::error::FitError;
use crate::math::NormalEquations;

/// Absolute pivot magnitude below which the system is treated as singular.
///
/// This is a fixed literal, not scaled by the matrix norm; inputs with very
/// large or very small magnitudes should be normalised by the caller.
pub const SINGULAR_PIVOT_THRESHOLD: f64 = 1e-12;

/// Solve `matrix · c = rhs`, consuming the system as the working buffer.
pub fn solve(system: NormalEquations) -> Result<DVector<f64>, FitError> {
    let NormalEquations {
        mut matrix,
        mut rhs,
    } = system;
    let n = rhs.len();

    for k in 0..n {
        // Largest |entry| in column k at or below the diagonal. On ties the
        // earliest row wins.
        let mut pivot_row = k;
        let mut pivot_abs = matrix[(k, k)].abs();
        for r in (k + 1)..n {
            let v = matrix[(r, k)].abs();
            if v > pivot_abs {
                pivot_row = r;
                pivot_abs = v;
            }
        }

        if pivot_row != k {
            matrix.swap_rows(k, pivot_row);
            rhs.swap_rows(k, pivot_row);
        }

        let pivot = matrix[(k, k)];
        if !pivot.is_finite() || pivot.abs() < SINGULAR_PIVOT_THRESHOLD {
            return Err(FitError::SingularSystem { column: k, pivot });
        }

        for r in (k + 1)..n {
            let factor = matrix[(r, k)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in k..n {
                let above = matrix[(k, c)];
                matrix[(r, c)] -= factor * above;
            }
            let above = rhs[k];
            rhs[r] -= factor * above;
        }
    }

    let mut coefficients = DVector::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut acc = rhs[i];
        for j in (i + 1)..n {
            acc -= matrix[(i, j)] * coefficients[j];
        }
        coefficients[i] = acc / matrix[(i, i)];
    }

    // Overflowed power sums can survive the pivot checks and still leave
    // non-finite values behind.
    if let Some(index) = coefficients.iter().position(|c| !c.is_finite()) {
        return Err(FitError::NonFiniteSolution { index });
    }

    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn system(rows: usize, a: &[f64], b: &[f64]) -> NormalEquations {
        NormalEquations {
            matrix: DMatrix::from_row_slice(rows, rows, a),
            rhs: DVector::from_row_slice(b),
        }
    }

    #[test]
    fn solves_small_system() {
        // 2x + y = 5, x + 3y = 10  ->  x = 1, y = 3
        let c = solve(system(2, &[2.0, 1.0, 1.0, 3.0], &[5.0, 10.0])).unwrap();
        assert!((c[0] - 1.0).abs() < 1e-12);
        assert!((c[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn pivots_past_zero_diagonal() {
        // Without row exchange the first pivot would be 0.
        let c = solve(system(2, &[0.0, 1.0, 1.0, 0.0], &[4.0, 7.0])).unwrap();
        assert!((c[0] - 7.0).abs() < 1e-12);
        assert!((c[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn reports_singular_column() {
        // Second row is twice the first.
        let err = solve(system(2, &[1.0, 2.0, 2.0, 4.0], &[1.0, 2.0])).unwrap_err();
        match err {
            FitError::SingularSystem { column, pivot } => {
                assert_eq!(column, 1);
                assert!(pivot.abs() < SINGULAR_PIVOT_THRESHOLD);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nan_pivot_is_singular_not_propagated() {
        let err = solve(system(1, &[f64::NAN], &[1.0])).unwrap_err();
        assert!(matches!(err, FitError::SingularSystem { column: 0, .. }));
    }

    #[test]
    fn infinite_pivot_is_singular() {
        let err = solve(system(2, &[f64::INFINITY, 1.0, 1.0, 1.0], &[1.0, 2.0])).unwrap_err();
        assert!(matches!(err, FitError::SingularSystem { column: 0, .. }));
    }

    #[test]
    fn overflowing_solution_is_rejected() {
        let err = solve(system(1, &[1e-11], &[f64::MAX])).unwrap_err();
        assert_eq!(err, FitError::NonFiniteSolution { index: 0 });
    }

    #[test]
    fn threshold_is_absolute() {
        // A perfectly conditioned but tiny system is still rejected.
        let err = solve(system(1, &[1e-13], &[1e-13])).unwrap_err();
        assert!(matches!(err, FitError::SingularSystem { column: 0, .. }));
    }
}
