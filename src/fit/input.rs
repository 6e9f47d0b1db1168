//! Conversion of acquired samples into fit observations.

use crate::domain::{FitPoint, SampleSet};

/// Observations handed to the fitter.
///
/// Built from a [`SampleSet`] the x values are the sample positions `0..N`
/// and y is the scaled reading. Arbitrary points can be supplied directly.
#[derive(Debug, Clone, PartialEq)]
pub struct FitInput {
    points: Vec<FitPoint>,
}

impl FitInput {
    pub fn from_samples(set: &SampleSet) -> Self {
        let points = set
            .samples()
            .iter()
            .enumerate()
            .map(|(i, s)| FitPoint {
                x: i as f64,
                y: s.scaled,
            })
            .collect();
        Self { points }
    }

    pub fn from_points(points: Vec<FitPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[FitPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of distinct x values, which bounds the rank of the normal equations.
    pub fn distinct_x(&self) -> usize {
        let mut xs: Vec<f64> = self.points.iter().map(|p| p.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        xs.dedup();
        xs.len()
    }
}
