//! Fixed Gaussian prior per covariate subset and the full-conditional
//! Metropolis proposal derived from it.
//!
//! The prior covariance is Σ = c·(XᵀX)⁻¹, built once per subset from the
//! subset's risk-set design matrix and the sparsity hyperparameter c. The
//! componentwise proposal for coordinate m is the Gaussian conditional of m
//! given the current values of the other coordinates:
//!
//! ```text
//! mean_m = Σ_{m,−m} Σ_{−m,−m}⁻¹ θ_{−m}
//! var_m  = Σ_{mm} − Σ_{m,−m} Σ_{−m,−m}⁻¹ Σ_{−m,m}
//! ```
//!
//! The weight vectors Σ_{−m,−m}⁻¹ Σ_{−m,m} and the conditional standard
//! deviations are precomputed here so each Metropolis step is a dot product.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_linalg::error::LinalgError;
use ndarray_linalg::{Inverse, Solve};

/// Prior covariance for one selected subset, with per-coordinate conditional
/// proposal parameters.
#[derive(Debug, Clone)]
pub struct SubsetPrior {
    sigma: Array2<f64>,
    /// w_m = Σ_{−m,−m}⁻¹ Σ_{−m,m} per coordinate; empty when p == 1.
    cond_weights: Vec<Array1<f64>>,
    cond_sd: Vec<f64>,
}

impl SubsetPrior {
    /// Builds Σ = c·(XᵀX)⁻¹ from the subset's design matrix.
    ///
    /// Fails when XᵀX is singular (collinear or duplicate selected columns,
    /// or more columns than risk-set rows); the caller isolates the failure
    /// to the grid cell that produced it.
    pub fn from_design(design: ArrayView2<'_, f64>, sparsity: f64) -> Result<Self, LinalgError> {
        let xtx = design.t().dot(&design);
        let sigma = xtx.inv()? * sparsity;
        let p = sigma.nrows();
        if p == 1 {
            let sd = sigma[(0, 0)].sqrt();
            return Ok(Self {
                sigma,
                cond_weights: Vec::new(),
                cond_sd: vec![sd],
            });
        }
        let mut cond_weights = Vec::with_capacity(p);
        let mut cond_sd = Vec::with_capacity(p);
        for m in 0..p {
            let others: Vec<usize> = (0..p).filter(|&j| j != m).collect();
            let sub = sigma.select(Axis(0), &others).select(Axis(1), &others);
            let cross = sigma.select(Axis(0), &others).column(m).to_owned();
            let weights = sub.solve(&cross)?;
            let variance = sigma[(m, m)] - cross.dot(&weights);
            cond_weights.push(weights);
            cond_sd.push(variance.max(0.0).sqrt());
        }
        Ok(Self {
            sigma,
            cond_weights,
            cond_sd,
        })
    }

    /// Subset cardinality p.
    #[inline]
    pub fn dim(&self) -> usize {
        self.sigma.nrows()
    }

    /// Proposal mean and standard deviation for coordinate `m` given the
    /// current coefficient vector. With p == 1 the proposal is the marginal
    /// N(0, Σ₁₁).
    pub fn conditional(&self, m: usize, theta: &Array1<f64>) -> (f64, f64) {
        let p = self.dim();
        if p == 1 {
            return (0.0, self.cond_sd[0]);
        }
        let weights = &self.cond_weights[m];
        let mut mean = 0.0;
        let mut k = 0;
        for j in 0..p {
            if j == m {
                continue;
            }
            mean += weights[k] * theta[j];
            k += 1;
        }
        (mean, self.cond_sd[m])
    }
}

/// Log density of N(mean, sd) at `x`.
#[inline]
pub fn normal_ln_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    -0.5 * z * z - sd.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn single_coefficient_uses_marginal() {
        // X is a single column with XᵀX = 1 + 4 = 5.
        let design = array![[1.0], [2.0]];
        let prior = SubsetPrior::from_design(design.view(), 2.0).unwrap();
        assert_eq!(prior.dim(), 1);
        let (mean, sd) = prior.conditional(0, &array![3.7]);
        assert_abs_diff_eq!(mean, 0.0);
        assert_abs_diff_eq!(sd, (2.0 / 5.0f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn conditional_matches_closed_form_for_two_coefficients() {
        // XᵀX = [[1, 1], [1, 2]], so Σ = c·[[2, −1], [−1, 1]] with c = 1.
        let design = array![[1.0, 1.0], [0.0, 1.0]];
        let prior = SubsetPrior::from_design(design.view(), 1.0).unwrap();
        assert_eq!(prior.dim(), 2);

        // Coordinate 0 given θ1 = t: mean = (Σ01/Σ11)·t = −t, var = 2 − 1 = 1.
        let theta = array![0.0, 0.4];
        let (mean, sd) = prior.conditional(0, &theta);
        assert_abs_diff_eq!(mean, -0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(sd, 1.0, epsilon = 1e-12);

        // Coordinate 1 given θ0 = t: mean = (Σ10/Σ00)·t = −t/2, var = 1 − 1/2.
        let theta = array![0.6, 0.0];
        let (mean, sd) = prior.conditional(1, &theta);
        assert_abs_diff_eq!(mean, -0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(sd, 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn duplicate_columns_are_singular() {
        let design = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(SubsetPrior::from_design(design.view(), 1.0).is_err());
    }

    #[test]
    fn normal_ln_pdf_matches_direct_evaluation() {
        let (x, mean, sd) = (0.3f64, -0.2, 1.7);
        let density = (-0.5 * ((x - mean) / sd) * ((x - mean) / sd)).exp()
            / (sd * (2.0 * std::f64::consts::PI).sqrt());
        assert_abs_diff_eq!(normal_ln_pdf(x, mean, sd), density.ln(), epsilon = 1e-12);
    }
}
