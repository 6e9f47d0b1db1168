//! Least-squares normal equations for a polynomial model.
//!
//! For samples `(x_i, y_i)` and degree `D` we minimise
//!
//! ```text
//! Σ_i (y_i - Σ_j c_j x_i^j)^2
//! ```
//!
//! whose stationary point solves `A c = b` with
//!
//! ```text
//! A[r][c] = Σ_i x_i^(r+c)
//! b[r]    = Σ_i x_i^r · y_i
//! ```
//!
//! `A` is symmetric (a Hankel matrix), so only the `2D + 1` power sums are computed.

use nalgebra::{DMatrix, DVector};

use crate::domain::FitPoint;

/// Square system `matrix · c = rhs` of size `degree + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations {
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl NormalEquations {
    /// Assemble the system for the given points and degree.
    pub fn assemble(points: &[FitPoint], degree: usize) -> Self {
        let size = degree + 1;

        // power_sums[k] = Σ x^k for k in 0..=2D
        let mut power_sums = vec![0.0; 2 * degree + 1];
        let mut rhs = DVector::<f64>::zeros(size);

        for p in points {
            let mut xk = 1.0;
            for (k, sum) in power_sums.iter_mut().enumerate() {
                *sum += xk;
                if k < size {
                    rhs[k] += xk * p.y;
                }
                xk *= p.x;
            }
        }

        let matrix = DMatrix::from_fn(size, size, |r, c| power_sums[r + c]);
        Self { matrix, rhs }
    }

    pub fn size(&self) -> usize {
        self.rhs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(xy: &[(f64, f64)]) -> Vec<FitPoint> {
        xy.iter().map(|&(x, y)| FitPoint { x, y }).collect()
    }

    #[test]
    fn assembles_power_sums() {
        // x = [0, 1, 2], y = [1, 3, 7]
        let eq = NormalEquations::assemble(&points(&[(0.0, 1.0), (1.0, 3.0), (2.0, 7.0)]), 2);
        assert_eq!(eq.size(), 3);

        let expected = [
            [3.0, 3.0, 5.0],
            [3.0, 5.0, 9.0],
            [5.0, 9.0, 17.0],
        ];
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(eq.matrix[(r, c)], expected[r][c], "entry ({r}, {c})");
            }
        }
        // b = [Σy, Σxy, Σx²y] = [11, 17, 31]
        assert_eq!(eq.rhs.as_slice(), &[11.0, 17.0, 31.0]);
    }

    #[test]
    fn matrix_is_symmetric() {
        let pts: Vec<FitPoint> = (0..24)
            .map(|i| FitPoint {
                x: i as f64,
                y: (i as f64).sin(),
            })
            .collect();
        let eq = NormalEquations::assemble(&pts, 4);
        assert_eq!(eq.matrix, eq.matrix.transpose());
    }

    #[test]
    fn degree_zero_is_count_and_sum() {
        let eq = NormalEquations::assemble(&points(&[(3.0, 2.0), (5.0, 4.0)]), 0);
        assert_eq!(eq.matrix[(0, 0)], 2.0);
        assert_eq!(eq.rhs[0], 6.0);
    }
}
