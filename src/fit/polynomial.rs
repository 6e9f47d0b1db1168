//! Least-squares polynomial fit.
//!
//! Given observations `(x_i, y_i)` and a degree `D`, we:
//! - build the normal equations (`math::NormalEquations`)
//! - solve them by Gaussian elimination with partial pivoting (`math::solve`)
//! - expose evaluation, residuals and fit quality on the resulting curve
//!
//! The direct normal-equations approach is adequate for the small degrees used
//! for profile characterisation; it is not meant for high-degree interpolation.

use crate::domain::{CoefficientVector, FitPoint};
use crate::error::FitError;
use crate::fit::FitInput;
use crate::math::{NormalEquations, solve};

/// Evaluate `Σ c_i x^i` (Horner's scheme). Defined for any x.
pub fn evaluate(coefficients: &CoefficientVector, x: f64) -> f64 {
    coefficients
        .as_slice()
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * x + c)
}

/// A fitted polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCurve {
    coefficients: CoefficientVector,
}

impl FittedCurve {
    pub fn new(coefficients: CoefficientVector) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &CoefficientVector {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.degree().unwrap_or(0)
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        evaluate(&self.coefficients, x)
    }

    /// Observed vs fitted value at each point.
    pub fn residuals(&self, points: &[FitPoint]) -> Vec<Residual> {
        points
            .iter()
            .map(|p| {
                let y_fit = self.evaluate(p.x);
                Residual {
                    x: p.x,
                    y_obs: p.y,
                    y_fit,
                    residual: p.y - y_fit,
                }
            })
            .collect()
    }

    pub fn quality(&self, points: &[FitPoint]) -> FitQuality {
        FitQuality::from_residuals(&self.residuals(points))
    }
}

/// Per-point fit result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub x: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub max_abs_residual: f64,
    /// Coefficient of determination; `None` when the observations are constant.
    pub r_squared: Option<f64>,
    pub n: usize,
}

impl FitQuality {
    pub fn from_residuals(residuals: &[Residual]) -> Self {
        let n = residuals.len();
        let sse: f64 = residuals.iter().map(|r| r.residual * r.residual).sum();
        let max_abs_residual = residuals
            .iter()
            .map(|r| r.residual.abs())
            .fold(0.0, f64::max);

        let rmse = if n > 0 { (sse / n as f64).sqrt() } else { 0.0 };

        let r_squared = if n > 0 {
            let mean = residuals.iter().map(|r| r.y_obs).sum::<f64>() / n as f64;
            let sst: f64 = residuals.iter().map(|r| (r.y_obs - mean).powi(2)).sum();
            (sst > 0.0).then(|| 1.0 - sse / sst)
        } else {
            None
        };

        Self {
            sse,
            rmse,
            max_abs_residual,
            r_squared,
            n,
        }
    }
}

/// Fit a polynomial of the given degree by least squares.
///
/// Fails with [`FitError::SingularSystem`] when the data cannot determine
/// `degree + 1` coefficients, either structurally (fewer distinct x values than
/// coefficients) or numerically (a pivot below `SINGULAR_PIVOT_THRESHOLD`).
/// Power sums that overflow end in [`FitError::SingularSystem`] or
/// [`FitError::NonFiniteSolution`]; no non-finite coefficient is returned.
pub fn fit_polynomial(input: &FitInput, degree: usize) -> Result<FittedCurve, FitError> {
    if let Some(index) = input
        .points()
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite()))
    {
        return Err(FitError::NonFiniteInput { index });
    }

    // A Vandermonde system with k distinct abscissae has rank min(k, D + 1);
    // elimination would run out of pivots at column k.
    let distinct = input.distinct_x();
    if distinct < degree + 1 {
        return Err(FitError::SingularSystem {
            column: distinct,
            pivot: 0.0,
        });
    }

    let system = NormalEquations::assemble(input.points(), degree);
    let solution = solve(system)?;

    Ok(FittedCurve::new(CoefficientVector::new(
        solution.iter().copied().collect(),
    )))
}
