//! Reporting utilities: per-sample residual rows and formatted terminal output.

use crate::domain::SampleSet;
use crate::error::{AppError, EXIT_FIT};
use crate::fit::FittedCurve;

pub mod format;

pub use format::*;

/// One acquired sample next to the fitted profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualRow {
    pub index: usize,
    pub raw: i32,
    pub scaled: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Compute fitted values and residuals for each sample position.
pub fn residual_rows(samples: &SampleSet, curve: &FittedCurve) -> Result<Vec<ResidualRow>, AppError> {
    let mut out = Vec::with_capacity(samples.len());
    for (index, s) in samples.samples().iter().enumerate() {
        let fitted = curve.evaluate(index as f64);
        if !fitted.is_finite() {
            return Err(AppError::new(
                EXIT_FIT,
                format!("Non-finite fitted value at sample {index}."),
            ));
        }
        out.push(ResidualRow {
            index,
            raw: s.raw,
            scaled: s.scaled,
            fitted,
            residual: s.scaled - fitted,
        });
    }
    Ok(out)
}
