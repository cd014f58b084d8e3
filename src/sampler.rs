//! Metropolis-within-Gibbs coefficient sampler for one grid cell.
//!
//! For each hazard with a non-empty subset the sampler runs a systematic-scan
//! sweep: iteration b copies the previous coefficient vector forward, then
//! updates one coordinate at a time against the partially updated vector. The
//! proposal is the prior's own conditional (an independence sampler, not a
//! random walk), so the acceptance ratio carries both proposal densities:
//!
//! ```text
//! α = logLik(new) − logLik(old) + log φ(new | proposal) − log φ(old | proposal)
//! ```
//!
//! This reproduces the legacy sampler exactly, including its sign convention
//! for the proposal correction. After all three hazards are updated the
//! summed joint log likelihood is recorded into the chain-level trace. No
//! early termination, no adaptive step sizing.

use crate::baseline::BaselineHazard;
use crate::likelihood::{HazardData, hazard_log_likelihood};
use crate::proposal::{SubsetPrior, normal_ln_pdf};
use ndarray::{Array1, Array2, Axis, s};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Chain-length and prior hyperparameters for the per-cell sampler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Metropolis-within-Gibbs iterations B (must be ≥ 2).
    pub iterations: usize,
    /// Sparsity hyperparameter c scaling the prior covariance.
    pub sparsity: f64,
    /// Base RNG seed; every grid cell derives a private stream from it.
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            sparsity: 1.0,
            seed: 0,
        }
    }
}

/// Fixed per-run context for one hazard component.
#[derive(Debug, Clone)]
pub struct HazardContext {
    pub data: HazardData,
    pub baseline: BaselineHazard,
}

/// Design matrix and prior for one hazard's selected subset within a cell.
#[derive(Debug, Clone)]
pub struct CellModel {
    pub design: Array2<f64>,
    pub prior: SubsetPrior,
}

/// B draws of a coefficient vector plus the parallel acceptance indicators.
#[derive(Debug, Clone)]
pub struct CoefficientChain {
    pub draws: Array2<f64>,
    pub accepted: Array2<u8>,
}

impl CoefficientChain {
    fn zeros(iterations: usize, p: usize) -> Self {
        Self {
            draws: Array2::zeros((iterations, p)),
            accepted: Array2::zeros((iterations, p)),
        }
    }

    /// Componentwise mean over the post-burn-in half of the chain
    /// (one-based iterations ⌈B/2⌉..B).
    pub fn posterior_mean(&self) -> Array1<f64> {
        let start = crate::dic::burn_in_start(self.draws.nrows());
        self.draws
            .slice(s![start.., ..])
            .mean_axis(Axis(0))
            .unwrap()
    }
}

/// Output of one grid cell's sampler run: per-hazard chains (absent for empty
/// subsets) and the joint log-likelihood trace, one entry per iteration.
#[derive(Debug)]
pub struct CellChains {
    pub chains: [Option<CoefficientChain>; 3],
    pub trace: Array1<f64>,
}

/// Runs the three-hazard sweep for `config.iterations` iterations.
///
/// Coefficients start at zero; hazards whose entry in `models` is `None`
/// contribute their fixed baseline-only likelihood to every trace entry.
pub fn run_cell_sampler(
    contexts: &[HazardContext; 3],
    models: &[Option<CellModel>; 3],
    config: &SamplerConfig,
    rng: &mut impl Rng,
) -> CellChains {
    let b = config.iterations;
    let mut chains: [Option<CoefficientChain>; 3] = std::array::from_fn(|k| {
        models[k]
            .as_ref()
            .map(|m| CoefficientChain::zeros(b, m.prior.dim()))
    });
    let mut betas: [Array1<f64>; 3] = std::array::from_fn(|k| {
        Array1::zeros(models[k].as_ref().map_or(0, |m| m.prior.dim()))
    });

    // Log likelihood per hazard at the current state. At β = 0 the linear
    // predictor vanishes, so this doubles as the baseline-only value that
    // hazards without a regression term keep for the whole run.
    let mut loglik: [f64; 3] = std::array::from_fn(|k| {
        let ctx = &contexts[k];
        let eta = Array1::zeros(ctx.data.n());
        hazard_log_likelihood(&ctx.data, &ctx.baseline, eta.view())
    });

    let mut trace = Array1::zeros(b);
    trace[0] = loglik.iter().sum();

    for iter in 1..b {
        for k in 0..3 {
            let (Some(model), Some(chain)) = (models[k].as_ref(), chains[k].as_mut()) else {
                continue;
            };
            let ctx = &contexts[k];
            for m in 0..model.prior.dim() {
                let (mean, sd) = model.prior.conditional(m, &betas[k]);
                let step: f64 = rng.sample(StandardNormal);
                let candidate = mean + sd * step;
                let previous = betas[k][m];

                betas[k][m] = candidate;
                let eta = model.design.dot(&betas[k]);
                let candidate_ll = hazard_log_likelihood(&ctx.data, &ctx.baseline, eta.view());

                let alpha = candidate_ll - loglik[k] + normal_ln_pdf(candidate, mean, sd)
                    - normal_ln_pdf(previous, mean, sd);
                if rng.r#gen::<f64>().ln() <= alpha {
                    loglik[k] = candidate_ll;
                    chain.accepted[(iter, m)] = 1;
                } else {
                    betas[k][m] = previous;
                }
            }
            chain.draws.row_mut(iter).assign(&betas[k]);
        }
        trace[iter] = loglik.iter().sum();
    }

    CellChains { chains, trace }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SubjectData;
    use crate::likelihood::Hazard;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn contexts() -> [HazardContext; 3] {
        let subjects = SubjectData {
            y1: array![0.4, 1.1, 0.9, 1.6],
            delta1: array![1, 0, 1, 0],
            y2: array![0.9, 1.1, 2.0, 1.6],
            delta2: array![1, 0, 1, 0],
            frailty: array![1.0, 0.7, 1.3, 1.0],
            covariates: array![[0.5, 1.0], [-0.2, 1.0], [0.9, 1.0], [0.1, 1.0]],
        };
        let baseline =
            BaselineHazard::new(array![0.0, 1.0, 3.0], array![-0.4, -0.1]).unwrap();
        Hazard::ALL.map(|h| HazardContext {
            data: HazardData::extract(&subjects, h),
            baseline: baseline.clone(),
        })
    }

    fn models(contexts: &[HazardContext; 3]) -> [Option<CellModel>; 3] {
        let covariates = array![[0.5, 1.0], [-0.2, 1.0], [0.9, 1.0], [0.1, 1.0]];
        std::array::from_fn(|k| {
            let design = contexts[k].data.design_matrix(covariates.view(), &[0, 1]);
            let prior = SubsetPrior::from_design(design.view(), 0.5).ok()?;
            Some(CellModel { design, prior })
        })
    }

    #[test]
    fn chain_starts_at_zero_and_has_requested_shape() {
        let ctx = contexts();
        let models = models(&ctx);
        let config = SamplerConfig {
            iterations: 6,
            sparsity: 0.5,
            seed: 7,
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        let out = run_cell_sampler(&ctx, &models, &config, &mut rng);

        assert_eq!(out.trace.len(), 6);
        for chain in out.chains.iter().flatten() {
            assert_eq!(chain.draws.nrows(), 6);
            assert_eq!(chain.draws.ncols(), 2);
            // Iteration 1 is the all-zero initial state with no updates.
            assert!(chain.draws.row(0).iter().all(|&v| v == 0.0));
            assert!(chain.accepted.row(0).iter().all(|&a| a == 0));
        }
    }

    #[test]
    fn identical_seeds_give_identical_chains() {
        let ctx = contexts();
        let models = models(&ctx);
        let config = SamplerConfig {
            iterations: 8,
            sparsity: 0.5,
            seed: 42,
        };
        let mut rng_a = StdRng::seed_from_u64(config.seed);
        let mut rng_b = StdRng::seed_from_u64(config.seed);
        let a = run_cell_sampler(&ctx, &models, &config, &mut rng_a);
        let b = run_cell_sampler(&ctx, &models, &config, &mut rng_b);
        assert_eq!(a.trace, b.trace);
        for k in 0..3 {
            let (Some(ca), Some(cb)) = (&a.chains[k], &b.chains[k]) else {
                panic!("chain missing for hazard {k}");
            };
            assert_eq!(ca.draws, cb.draws);
            assert_eq!(ca.accepted, cb.accepted);
        }
    }

    #[test]
    fn absent_models_keep_trace_at_baseline_value() {
        let ctx = contexts();
        let models: [Option<CellModel>; 3] = [None, None, None];
        let config = SamplerConfig {
            iterations: 5,
            sparsity: 0.5,
            seed: 1,
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        let out = run_cell_sampler(&ctx, &models, &config, &mut rng);

        let first = out.trace[0];
        for &value in out.trace.iter() {
            assert_abs_diff_eq!(value, first);
        }
        assert!(out.chains.iter().all(|c| c.is_none()));
    }

    #[test]
    fn posterior_mean_uses_later_half_of_chain() {
        let mut chain = CoefficientChain::zeros(4, 1);
        chain.draws[(0, 0)] = 100.0;
        chain.draws[(1, 0)] = 1.0;
        chain.draws[(2, 0)] = 2.0;
        chain.draws[(3, 0)] = 3.0;
        // Burn-in keeps one-based iterations 2..4, i.e. rows 1, 2, 3.
        assert_abs_diff_eq!(chain.posterior_mean()[0], 2.0);
    }
}
