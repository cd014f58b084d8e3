//! Risk-set extraction and the shared hazard log-likelihood evaluator.
//!
//! One parameterized evaluator serves all three hazard components; the
//! component-specific risk set, exposure timescale, and event indicator are
//! resolved once per run by [`HazardData::extract`].
//!
//! The log partial likelihood for one component is
//!
//! ```text
//! log L(β) = Σ_i δ_i·η_i − Σ_j Σ_i w_i · Δ_ij · exp(h_j) · exp(η_i)
//! ```
//!
//! where η = Xβ, w_i is the subject's frailty, Δ_ij its exposure within
//! baseline interval j, and h_j the interval's log hazard.

use crate::baseline::BaselineHazard;
use crate::data::SubjectData;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// The three hazard components of the semi-competing-risks model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hazard {
    /// Non-terminal event; every subject is at risk.
    NonTerminal,
    /// Terminal event without a prior non-terminal event.
    TerminalOnly,
    /// Terminal event after the non-terminal event, on the gap timescale.
    TerminalAfterNonTerminal,
}

impl Hazard {
    pub const ALL: [Hazard; 3] = [
        Hazard::NonTerminal,
        Hazard::TerminalOnly,
        Hazard::TerminalAfterNonTerminal,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Hazard::NonTerminal => 0,
            Hazard::TerminalOnly => 1,
            Hazard::TerminalAfterNonTerminal => 2,
        }
    }
}

/// One hazard's view of the subject data: exposure times, event indicators,
/// and frailties restricted to the subjects at risk, plus the original row
/// indices for design-matrix extraction.
#[derive(Debug, Clone)]
pub struct HazardData {
    rows: Vec<usize>,
    time: Array1<f64>,
    event: Array1<f64>,
    frailty: Array1<f64>,
}

impl HazardData {
    /// Builds the risk-set view for `hazard`.
    ///
    /// Hazard 2 uses the filtered risk set (subjects with no non-terminal
    /// event, exposure time `y2`): on that set the indicator
    /// `delta2·(1−delta1)` reduces to `delta2`.
    pub fn extract(subjects: &SubjectData, hazard: Hazard) -> Self {
        let n = subjects.n();
        let mut rows = Vec::with_capacity(n);
        let mut time = Vec::with_capacity(n);
        let mut event = Vec::with_capacity(n);
        for i in 0..n {
            match hazard {
                Hazard::NonTerminal => {
                    rows.push(i);
                    time.push(subjects.y1[i]);
                    event.push(f64::from(subjects.delta1[i]));
                }
                Hazard::TerminalOnly => {
                    if subjects.delta1[i] == 0 {
                        rows.push(i);
                        time.push(subjects.y2[i]);
                        event.push(f64::from(subjects.delta2[i]));
                    }
                }
                Hazard::TerminalAfterNonTerminal => {
                    if subjects.delta1[i] == 1 {
                        rows.push(i);
                        time.push(subjects.y2[i] - subjects.y1[i]);
                        event.push(f64::from(subjects.delta2[i]));
                    }
                }
            }
        }
        let frailty = rows.iter().map(|&i| subjects.frailty[i]).collect();
        Self {
            rows,
            time: Array1::from_vec(time),
            event: Array1::from_vec(event),
            frailty: Array1::from_vec(frailty),
        }
    }

    /// Number of subjects at risk for this hazard.
    #[inline]
    pub fn n(&self) -> usize {
        self.rows.len()
    }

    /// Gathers the selected covariate columns restricted to this risk set.
    pub fn design_matrix(&self, covariates: ArrayView2<'_, f64>, columns: &[usize]) -> Array2<f64> {
        let mut x = Array2::zeros((self.rows.len(), columns.len()));
        for (r, &i) in self.rows.iter().enumerate() {
            for (c, &j) in columns.iter().enumerate() {
                x[(r, c)] = covariates[(i, j)];
            }
        }
        x
    }
}

/// Log partial likelihood of one hazard component at linear predictor `eta`.
///
/// Callers with no regression term pass a zero `eta`, which leaves only the
/// baseline-and-frailty term.
pub fn hazard_log_likelihood(
    data: &HazardData,
    baseline: &BaselineHazard,
    eta: ArrayView1<'_, f64>,
) -> f64 {
    debug_assert_eq!(eta.len(), data.n());
    let mut ll = 0.0;
    for i in 0..data.n() {
        ll += data.event[i] * eta[i];
    }
    for j in 0..baseline.intervals() {
        let rate = baseline.log_heights()[j].exp();
        for i in 0..data.n() {
            let exposure = baseline.exposure(data.time[i], j);
            if exposure > 0.0 {
                ll -= data.frailty[i] * exposure * rate * eta[i].exp();
            }
        }
    }
    ll
}
