//! Deviance Information Criterion from a post-burn-in likelihood trace.
//!
//! With D(β) = −2·log L(β), the statistic is DIC = D(β̄) + 2·pD where
//! pD = mean(D) − D(β̄) is the effective-parameter penalty. In log-likelihood
//! terms, with A the plug-in joint log likelihood at the posterior-mean
//! coefficients:
//!
//! ```text
//! pD  = −2·mean(trace) + 2·A
//! DIC = −2·A + 2·pD
//! ```

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// DIC summary for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DicSummary {
    /// Joint log likelihood at the posterior-mean coefficients (A).
    pub plugin_loglik: f64,
    /// Effective number of parameters pD.
    pub effective_params: f64,
    pub dic: f64,
}

/// First zero-based chain row inside the burn-in window, i.e. one-based
/// iteration ⌈B/2⌉ of a length-B chain.
#[inline]
pub fn burn_in_start(b: usize) -> usize {
    b.div_ceil(2) - 1
}

/// Computes the DIC from the post-burn-in slice of the joint log-likelihood
/// trace and the plug-in log likelihood A = Σ_k log L_k(mean β_k).
pub fn dic_from_trace(burned_trace: ArrayView1<'_, f64>, plugin_loglik: f64) -> DicSummary {
    let mean_loglik = burned_trace.mean().unwrap_or(f64::NAN);
    let effective_params = -2.0 * mean_loglik + 2.0 * plugin_loglik;
    let dic = -2.0 * plugin_loglik + 2.0 * effective_params;
    DicSummary {
        plugin_loglik,
        effective_params,
        dic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn burn_in_keeps_later_half() {
        assert_eq!(burn_in_start(2), 0);
        assert_eq!(burn_in_start(4), 1);
        assert_eq!(burn_in_start(5), 2);
        assert_eq!(burn_in_start(100), 49);
    }

    #[test]
    fn constant_trace_has_zero_penalty() {
        let trace = array![-12.5, -12.5, -12.5];
        let summary = dic_from_trace(trace.view(), -12.5);
        assert_abs_diff_eq!(summary.effective_params, 0.0);
        assert_abs_diff_eq!(summary.dic, 25.0);
    }

    #[test]
    fn penalty_reflects_gap_between_mean_and_plugin() {
        // mean(trace) = -11, A = -10: pD = 22 - 20 = 2, DIC = 20 + 4 = 24.
        let trace = array![-10.0, -12.0];
        let summary = dic_from_trace(trace.view(), -10.0);
        assert_abs_diff_eq!(summary.effective_params, 2.0);
        assert_abs_diff_eq!(summary.dic, 24.0);
    }
}
