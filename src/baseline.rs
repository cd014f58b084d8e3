//! Piecewise-constant (exponential) baseline hazard specification.
//!
//! Each hazard component carries an ordered split-point sequence partitioning
//! the time axis and one log-hazard height per interval. These are fixed
//! inputs produced by an upstream posterior sampler; they are never
//! re-estimated here.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("split-point sequence must contain at least two values, got {0}")]
    TooFewSplits(usize),
    #[error("split-point sequence must start at 0, got {0}")]
    NonZeroOrigin(f64),
    #[error("split points must be strictly increasing: {prev} >= {next} at index {index}")]
    UnorderedSplits { index: usize, prev: f64, next: f64 },
    #[error("expected {expected} log-hazard heights for {expected} intervals, got {found}")]
    HeightLengthMismatch { expected: usize, found: usize },
    #[error("non-finite value in baseline specification: {0}")]
    NonFinite(f64),
}

/// Baseline hazard for one component: constant within each interval of the
/// split-point partition, changing value only at split points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineHazard {
    split_points: Array1<f64>,
    log_heights: Array1<f64>,
}

impl BaselineHazard {
    /// Validates and stores a split-point sequence of length J+2 (starting at
    /// 0) and the J+1 log-hazard heights for the intervals it defines.
    pub fn new(split_points: Array1<f64>, log_heights: Array1<f64>) -> Result<Self, BaselineError> {
        if split_points.len() < 2 {
            return Err(BaselineError::TooFewSplits(split_points.len()));
        }
        for &value in split_points.iter().chain(log_heights.iter()) {
            if !value.is_finite() {
                return Err(BaselineError::NonFinite(value));
            }
        }
        if split_points[0] != 0.0 {
            return Err(BaselineError::NonZeroOrigin(split_points[0]));
        }
        for index in 1..split_points.len() {
            let (prev, next) = (split_points[index - 1], split_points[index]);
            if prev >= next {
                return Err(BaselineError::UnorderedSplits { index, prev, next });
            }
        }
        let expected = split_points.len() - 1;
        if log_heights.len() != expected {
            return Err(BaselineError::HeightLengthMismatch {
                expected,
                found: log_heights.len(),
            });
        }
        Ok(Self {
            split_points,
            log_heights,
        })
    }

    /// Number of constant-hazard intervals.
    #[inline]
    pub fn intervals(&self) -> usize {
        self.log_heights.len()
    }

    #[inline]
    pub fn log_heights(&self) -> ArrayView1<'_, f64> {
        self.log_heights.view()
    }

    /// Exposure of a subject followed to `time` within interval `j`, clipped
    /// to [0, interval length]: max(0, min(time, upper_j) - lower_j).
    #[inline]
    pub fn exposure(&self, time: f64, j: usize) -> f64 {
        let lower = self.split_points[j];
        let upper = self.split_points[j + 1];
        (time.min(upper) - lower).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn spec() -> BaselineHazard {
        BaselineHazard::new(array![0.0, 1.0, 2.5], array![-0.5, 0.2]).unwrap()
    }

    #[test]
    fn exposure_clips_to_interval() {
        let b = spec();
        // Subject censored inside the first interval.
        assert_abs_diff_eq!(b.exposure(0.4, 0), 0.4);
        assert_abs_diff_eq!(b.exposure(0.4, 1), 0.0);
        // Subject followed past the end of both intervals.
        assert_abs_diff_eq!(b.exposure(3.0, 0), 1.0);
        assert_abs_diff_eq!(b.exposure(3.0, 1), 1.5);
        // Partial exposure in the second interval.
        assert_abs_diff_eq!(b.exposure(1.7, 1), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn rejects_unordered_splits() {
        let err = BaselineHazard::new(array![0.0, 2.0, 1.0], array![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, BaselineError::UnorderedSplits { index: 2, .. }));
    }

    #[test]
    fn rejects_nonzero_origin_and_bad_height_count() {
        assert!(matches!(
            BaselineHazard::new(array![0.5, 1.0], array![0.0]),
            Err(BaselineError::NonZeroOrigin(_))
        ));
        assert!(matches!(
            BaselineHazard::new(array![0.0, 1.0, 2.0], array![0.0]),
            Err(BaselineError::HeightLengthMismatch {
                expected: 2,
                found: 1
            })
        ));
    }
}
