//! Grid-search controller: drives the threshold grid, the skip policy, the
//! per-cell sampler, and assembles the DIC surface.
//!
//! The controller owns three small pieces of local state (the previously
//! evaluated subset per axis) that drive the skip policy, plus a memo cache
//! keyed by the induced subset triple: a cell's DIC depends only on the three
//! covariate subsets it induces, never on the threshold values themselves, so
//! a triple seen before is answered from the cache without re-sampling.

use crate::data::{DataError, DicInputs};
use crate::dic::{burn_in_start, dic_from_trace};
use crate::likelihood::{Hazard, HazardData, hazard_log_likelihood};
use crate::proposal::SubsetPrior;
use crate::sampler::{CellModel, HazardContext, SamplerConfig, run_cell_sampler};
use crate::select::select_columns;
use ndarray::{Array1, Array2, s};
use ndarray_linalg::error::LinalgError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("input validation failed: {0}")]
    Data(#[from] DataError),
    #[error("threshold axis {axis} must be non-empty and strictly ascending")]
    BadThresholds { axis: usize },
}

/// Outcome of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellOutcome {
    /// DIC for the cell's induced covariate subsets.
    Value(f64),
    /// Skipped by the skip policy: the induced subsets match the previously
    /// evaluated cell along the moving axis, so its DIC applies here too.
    Skipped,
    /// Prior-covariance construction failed (singular XᵀX) for one of the
    /// cell's subsets.
    Failed,
}

/// One τ1 slice of the surface: wholly skipped, or a (τ2 × τ3) grid of
/// per-cell outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DicSlice {
    Skipped,
    Cells(Array2<CellOutcome>),
}

/// Threshold axes for the grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdGrid {
    pub tau1: Vec<f64>,
    pub tau2: Vec<f64>,
    pub tau3: Vec<f64>,
}

impl Default for ThresholdGrid {
    /// 0.05 to 0.90 in steps of 0.05, 18 values per axis.
    fn default() -> Self {
        let axis: Vec<f64> = (1..=18).map(|i| f64::from(i) * 0.05).collect();
        Self {
            tau1: axis.clone(),
            tau2: axis.clone(),
            tau3: axis,
        }
    }
}

impl ThresholdGrid {
    fn validate(&self) -> Result<(), GridError> {
        for (axis, values) in [(1, &self.tau1), (2, &self.tau2), (3, &self.tau3)] {
            let ascending = values.windows(2).all(|w| w[0] < w[1]);
            if values.is_empty() || !ascending {
                return Err(GridError::BadThresholds { axis });
            }
        }
        Ok(())
    }
}

/// How the controller decides that a subset is unchanged from the previously
/// evaluated one along an axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipPolicy {
    /// Legacy behavior: compare cardinality only. Two different subsets of
    /// equal size are treated as unchanged, which can skip a genuinely
    /// different model; kept as the default for compatibility.
    #[default]
    Cardinality,
    /// Compare the actual index sets.
    ExactSubset,
}

impl SkipPolicy {
    fn unchanged(self, previous: &[usize], next: &[usize]) -> bool {
        match self {
            SkipPolicy::Cardinality => previous.len() == next.len(),
            SkipPolicy::ExactSubset => previous == next,
        }
    }
}

/// Controller options.
#[derive(Debug, Clone, Default)]
pub struct GridOptions {
    pub thresholds: ThresholdGrid,
    pub sampler: SamplerConfig,
    pub skip_policy: SkipPolicy,
    /// Cooperative cancellation, checked between cells. When raised, the
    /// search stops after the current cell and the surface is marked
    /// interrupted with trailing τ1 slices absent.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// DIC surface over the threshold grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicSurface {
    /// One entry per τ1 value, in axis order.
    pub slices: Vec<DicSlice>,
    /// (g, h, l) indices of cells whose prior covariance was singular.
    pub failed: Vec<(usize, usize, usize)>,
    /// True when a cancellation request stopped the search early.
    pub interrupted: bool,
}

/// Runs the full three-axis threshold grid search and returns the DIC
/// surface.
///
/// Boundary validation failures abort the whole call; a singular design
/// matrix inside one cell is recorded as [`CellOutcome::Failed`] and the rest
/// of the grid completes.
pub fn run_dic_grid(inputs: &DicInputs, options: &GridOptions) -> Result<DicSurface, GridError> {
    inputs.validate()?;
    options.thresholds.validate()?;
    let config = &options.sampler;
    if config.iterations < 2 {
        return Err(DataError::ChainTooShort(config.iterations).into());
    }
    if !config.sparsity.is_finite() || config.sparsity <= 0.0 {
        return Err(DataError::InvalidSparsity(config.sparsity).into());
    }

    let contexts: [HazardContext; 3] = Hazard::ALL.map(|h| HazardContext {
        data: HazardData::extract(&inputs.subjects, h),
        baseline: inputs.baselines[h.index()].clone(),
    });
    let inc = inputs.always_included;
    let policy = options.skip_policy;
    let thresholds = &options.thresholds;

    let mut surface = DicSurface {
        slices: Vec::with_capacity(thresholds.tau1.len()),
        failed: Vec::new(),
        interrupted: false,
    };
    let mut cache: HashMap<[Vec<usize>; 3], f64> = HashMap::new();

    let mut prev1: Option<Vec<usize>> = None;
    'outer: for (g, &tau1) in thresholds.tau1.iter().enumerate() {
        if cancelled(options) {
            surface.interrupted = true;
            break;
        }
        let subset1 = select_columns(inputs.probs.by_hazard(0), tau1, inc);
        if prev1.as_deref().is_some_and(|p| policy.unchanged(p, &subset1)) {
            log::info!(
                "DIC slice {}/{} (tau1 = {:.2}) skipped: hazard-1 subset unchanged",
                g + 1,
                thresholds.tau1.len(),
                tau1
            );
            surface.slices.push(DicSlice::Skipped);
            prev1 = Some(subset1);
            continue;
        }

        let mut cells = Array2::from_elem(
            (thresholds.tau2.len(), thresholds.tau3.len()),
            CellOutcome::Skipped,
        );
        let mut prev2: Option<Vec<usize>> = None;
        for (h, &tau2) in thresholds.tau2.iter().enumerate() {
            let subset2 = select_columns(inputs.probs.by_hazard(1), tau2, inc);
            if prev2.as_deref().is_some_and(|p| policy.unchanged(p, &subset2)) {
                prev2 = Some(subset2);
                continue;
            }

            let mut prev3: Option<Vec<usize>> = None;
            for (l, &tau3) in thresholds.tau3.iter().enumerate() {
                if cancelled(options) {
                    surface.interrupted = true;
                    break 'outer;
                }
                let subset3 = select_columns(inputs.probs.by_hazard(2), tau3, inc);
                if prev3.as_deref().is_some_and(|p| policy.unchanged(p, &subset3)) {
                    prev3 = Some(subset3);
                    continue;
                }

                let key = [subset1.clone(), subset2.clone(), subset3.clone()];
                let outcome = if let Some(&dic) = cache.get(&key) {
                    CellOutcome::Value(dic)
                } else {
                    match evaluate_cell(inputs, &contexts, &key, config, (g, h, l)) {
                        Ok(dic) => {
                            cache.insert(key, dic);
                            CellOutcome::Value(dic)
                        }
                        Err(error) => {
                            log::warn!(
                                "cell ({g}, {h}, {l}) failed: singular design cross-product: {error}"
                            );
                            surface.failed.push((g, h, l));
                            CellOutcome::Failed
                        }
                    }
                };
                cells[(h, l)] = outcome;
                prev3 = Some(subset3);
            }
            prev2 = Some(subset2);
        }

        log::info!(
            "DIC slice {}/{} (tau1 = {:.2}) complete",
            g + 1,
            thresholds.tau1.len(),
            tau1
        );
        surface.slices.push(DicSlice::Cells(cells));
        prev1 = Some(subset1);
    }

    Ok(surface)
}

/// Evaluates one non-skipped cell: builds each present hazard's design matrix
/// and prior, runs the sampler on the cell's private RNG stream, and computes
/// the DIC.
fn evaluate_cell(
    inputs: &DicInputs,
    contexts: &[HazardContext; 3],
    subsets: &[Vec<usize>; 3],
    config: &SamplerConfig,
    cell: (usize, usize, usize),
) -> Result<f64, LinalgError> {
    let covariates = inputs.subjects.covariates.view();
    let mut models: [Option<CellModel>; 3] = [None, None, None];
    for k in 0..3 {
        // An empty subset is a valid "no regression term" case, not an error.
        if subsets[k].is_empty() {
            continue;
        }
        let design = contexts[k].data.design_matrix(covariates, &subsets[k]);
        let prior = SubsetPrior::from_design(design.view(), config.sparsity)?;
        models[k] = Some(CellModel { design, prior });
    }

    let mut rng = StdRng::seed_from_u64(cell_seed(config.seed, cell));
    let out = run_cell_sampler(contexts, &models, config, &mut rng);

    let mut plugin_loglik = 0.0;
    for k in 0..3 {
        let ctx = &contexts[k];
        let eta = match (&models[k], &out.chains[k]) {
            (Some(model), Some(chain)) => model.design.dot(&chain.posterior_mean()),
            _ => Array1::zeros(ctx.data.n()),
        };
        plugin_loglik += hazard_log_likelihood(&ctx.data, &ctx.baseline, eta.view());
    }

    let start = burn_in_start(config.iterations);
    Ok(dic_from_trace(out.trace.slice(s![start..]), plugin_loglik).dic)
}

fn cancelled(options: &GridOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Splitmix64 finalizer over the packed cell index: gives each cell a private
/// RNG stream whose draws are independent of evaluation order.
fn cell_seed(base: u64, (g, h, l): (usize, usize, usize)) -> u64 {
    let mut z = base
        .wrapping_add((g as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((h as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9))
        .wrapping_add((l as u64 + 1).wrapping_mul(0x94D0_49BB_1331_11EB));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
