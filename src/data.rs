//! Input bundle for the grid search and boundary validation.
//!
//! All validation happens once, before any sampling begins; a failure here is
//! non-recoverable for the whole call. Per-cell numerical failures during the
//! grid search are handled separately in the controller.

use crate::baseline::BaselineHazard;
use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no subjects provided")]
    Empty,
    #[error("column '{column}' has {found} rows but {expected} were expected")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("non-finite value in column '{column}' at row {row}: {value}")]
    NonFiniteValue {
        column: &'static str,
        row: usize,
        value: f64,
    },
    #[error("indicator column '{column}' at row {row} must be 0 or 1, got {value}")]
    InvalidIndicator {
        column: &'static str,
        row: usize,
        value: u8,
    },
    #[error("terminal time precedes non-terminal event time at row {row}: {y2} < {y1}")]
    TimeOrdering { row: usize, y1: f64, y2: f64 },
    #[error("frailty at row {row} must be non-negative, got {value}")]
    NegativeFrailty { row: usize, value: f64 },
    #[error(
        "inclusion-probability vector for hazard {hazard} has length {found} but {expected} selectable covariates exist"
    )]
    ProbLengthMismatch {
        hazard: usize,
        expected: usize,
        found: usize,
    },
    #[error("inclusion probability for hazard {hazard} at index {index} is outside [0, 1]: {value}")]
    ProbOutOfRange {
        hazard: usize,
        index: usize,
        value: f64,
    },
    #[error("always-included column count {inc} exceeds covariate matrix width {width}")]
    TooManyAlwaysIncluded { inc: usize, width: usize },
    #[error("chain length B must be at least 2, got {0}")]
    ChainTooShort(usize),
    #[error("sparsity hyperparameter c must be positive and finite, got {0}")]
    InvalidSparsity(f64),
}

/// Per-subject observations, immutable for the duration of a run.
///
/// `y1`/`delta1` are the non-terminal event (or censoring) time and indicator,
/// `y2`/`delta2` the terminal ones. `frailty` holds the fixed posterior-mean
/// per-subject multiplicative effects from the upstream sampler.
#[derive(Debug, Clone)]
pub struct SubjectData {
    pub y1: Array1<f64>,
    pub delta1: Array1<u8>,
    pub y2: Array1<f64>,
    pub delta2: Array1<u8>,
    pub frailty: Array1<f64>,
    pub covariates: Array2<f64>,
}

impl SubjectData {
    pub fn n(&self) -> usize {
        self.y1.len()
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let n = self.n();
        if n == 0 {
            return Err(DataError::Empty);
        }
        check_len("y2", n, self.y2.len())?;
        check_len("delta1", n, self.delta1.len())?;
        check_len("delta2", n, self.delta2.len())?;
        check_len("frailty", n, self.frailty.len())?;
        check_len("covariates", n, self.covariates.nrows())?;
        check_finite("y1", self.y1.view())?;
        check_finite("y2", self.y2.view())?;
        check_finite("frailty", self.frailty.view())?;
        check_indicator("delta1", &self.delta1)?;
        check_indicator("delta2", &self.delta2)?;
        for row in 0..n {
            let value = self.frailty[row];
            if value < 0.0 {
                return Err(DataError::NegativeFrailty { row, value });
            }
            // Gap times for the post-non-terminal hazard must be non-negative.
            if self.delta1[row] == 1 && self.y2[row] < self.y1[row] {
                return Err(DataError::TimeOrdering {
                    row,
                    y1: self.y1[row],
                    y2: self.y2[row],
                });
            }
        }
        for ((row, _), &value) in self.covariates.indexed_iter() {
            if !value.is_finite() {
                return Err(DataError::NonFiniteValue {
                    column: "covariates",
                    row,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Marginal posterior inclusion probabilities, one vector per hazard, each of
/// length equal to the number of selectable (non-always-included) covariates.
#[derive(Debug, Clone)]
pub struct InclusionProbs {
    pub hazard1: Array1<f64>,
    pub hazard2: Array1<f64>,
    pub hazard3: Array1<f64>,
}

impl InclusionProbs {
    pub fn by_hazard(&self, k: usize) -> ArrayView1<'_, f64> {
        match k {
            0 => self.hazard1.view(),
            1 => self.hazard2.view(),
            _ => self.hazard3.view(),
        }
    }

    fn validate(&self, n_selectable: usize) -> Result<(), DataError> {
        for hazard in 0..3 {
            let probs = self.by_hazard(hazard);
            if probs.len() != n_selectable {
                return Err(DataError::ProbLengthMismatch {
                    hazard: hazard + 1,
                    expected: n_selectable,
                    found: probs.len(),
                });
            }
            for (index, &value) in probs.iter().enumerate() {
                if !(0.0..=1.0).contains(&value) {
                    return Err(DataError::ProbOutOfRange {
                        hazard: hazard + 1,
                        index,
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Everything the grid search consumes, validated once at the boundary.
///
/// The trailing `always_included` columns of the covariate matrix are part of
/// every selected subset and are excluded from thresholding.
#[derive(Debug, Clone)]
pub struct DicInputs {
    pub subjects: SubjectData,
    pub probs: InclusionProbs,
    pub baselines: [BaselineHazard; 3],
    pub always_included: usize,
}

impl DicInputs {
    /// Number of covariates eligible for threshold selection.
    pub fn n_selectable(&self) -> usize {
        self.subjects.covariates.ncols() - self.always_included
    }

    pub fn validate(&self) -> Result<(), DataError> {
        self.subjects.validate()?;
        let width = self.subjects.covariates.ncols();
        if self.always_included > width {
            return Err(DataError::TooManyAlwaysIncluded {
                inc: self.always_included,
                width,
            });
        }
        self.probs.validate(self.n_selectable())
    }
}

fn check_len(column: &'static str, expected: usize, found: usize) -> Result<(), DataError> {
    if found != expected {
        return Err(DataError::LengthMismatch {
            column,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_finite(column: &'static str, values: ArrayView1<'_, f64>) -> Result<(), DataError> {
    for (row, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(DataError::NonFiniteValue { column, row, value });
        }
    }
    Ok(())
}

fn check_indicator(column: &'static str, values: &Array1<u8>) -> Result<(), DataError> {
    for (row, &value) in values.iter().enumerate() {
        if value > 1 {
            return Err(DataError::InvalidIndicator { column, row, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn baseline() -> BaselineHazard {
        BaselineHazard::new(array![0.0, 1.0, 3.0], array![-0.3, -0.1]).unwrap()
    }

    fn inputs() -> DicInputs {
        DicInputs {
            subjects: SubjectData {
                y1: array![0.5, 1.2],
                delta1: array![1, 0],
                y2: array![1.0, 1.2],
                delta2: array![1, 0],
                frailty: array![1.0, 0.8],
                covariates: array![[0.1, 0.2, 1.0], [0.3, -0.4, 1.0]],
            },
            probs: InclusionProbs {
                hazard1: array![0.4, 0.6],
                hazard2: array![0.1, 0.9],
                hazard3: array![0.5, 0.5],
            },
            baselines: [baseline(), baseline(), baseline()],
            always_included: 1,
        }
    }

    #[test]
    fn valid_inputs_pass() {
        assert!(inputs().validate().is_ok());
    }

    #[test]
    fn rejects_probability_length_mismatch() {
        let mut bad = inputs();
        bad.probs.hazard2 = array![0.5];
        assert!(matches!(
            bad.validate(),
            Err(DataError::ProbLengthMismatch { hazard: 2, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let mut bad = inputs();
        bad.probs.hazard3 = array![1.5, 0.2];
        assert!(matches!(
            bad.validate(),
            Err(DataError::ProbOutOfRange {
                hazard: 3,
                index: 0,
                ..
            })
        ));
    }

    #[test]
    fn rejects_gap_time_ordering_violation() {
        let mut bad = inputs();
        bad.subjects.y2[0] = 0.2;
        assert!(matches!(
            bad.validate(),
            Err(DataError::TimeOrdering { row: 0, .. })
        ));
    }

    #[test]
    fn rejects_bad_indicator_and_width() {
        let mut bad = inputs();
        bad.subjects.delta1[1] = 2;
        assert!(matches!(
            bad.validate(),
            Err(DataError::InvalidIndicator { .. })
        ));

        let mut bad = inputs();
        bad.always_included = 4;
        assert!(matches!(
            bad.validate(),
            Err(DataError::TooManyAlwaysIncluded { inc: 4, width: 3 })
        ));
    }
}
