//! Covariate-subset selection from marginal inclusion probabilities.

use ndarray::ArrayView1;

/// Returns the ordered column indices `{i : probs[i] > tau}` followed by the
/// `always_included` trailing columns, ascending with no duplicates.
///
/// The always-included columns sit after the selectable block in the full
/// covariate matrix, so appending their range preserves ascending order. Pure
/// function; called once per hazard per grid cell.
pub fn select_columns(probs: ArrayView1<'_, f64>, tau: f64, always_included: usize) -> Vec<usize> {
    let q = probs.len();
    let mut columns: Vec<usize> = (0..q).filter(|&i| probs[i] > tau).collect();
    columns.extend(q..q + always_included);
    columns
}
