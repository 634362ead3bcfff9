//! Reconciliation of hierarchical forecasts.
//!
//! Hierarchical data follows a structural constraint: $y = S \cdot b$, where
//! $b$ are the leaf series and $S$ is the summing matrix (the leaf columns of
//! the aggregation matrix).
//!
//! Forecasting every series independently breaks that constraint. Reconciliation
//! adjusts base forecasts $\hat{y}$ to $\tilde{y} = S \cdot G \cdot \hat{y}$,
//! which is coherent by construction.

use crate::error::{Error, Result};
use faer::prelude::*;
use faer::{Mat, MatRef};
use ndarray::{Array3, ArrayView3};
use tracing::debug;

/// A structural summing matrix for a hierarchy.
///
/// For a hierarchy with $m$ total series and $n$ leaves, $S$ is an
/// $m \times n$ binary matrix where $S_{ij} = 1$ if leaf $j$ is summed into
/// series $i$. The last $n$ rows are the leaves themselves.
#[derive(Debug, Clone)]
pub struct SummingMatrix {
    inner: Mat<f64>,
}

impl SummingMatrix {
    /// Create a new summing matrix from a faer matrix.
    pub fn new(inner: Mat<f64>) -> Self {
        Self { inner }
    }

    /// Number of total series (rows).
    pub fn m(&self) -> usize {
        self.inner.nrows()
    }

    /// Number of leaves (columns).
    pub fn n(&self) -> usize {
        self.inner.ncols()
    }

    /// Get the matrix reference.
    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.inner.as_ref()
    }

    /// Number of leaves summed into each series.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.m())
            .map(|i| (0..self.n()).map(|j| self.inner[(i, j)]).sum())
            .collect()
    }

    /// Summing matrix of a single total over `n_leaves` leaves.
    pub fn single_total(n_leaves: usize) -> Self {
        Self {
            inner: Mat::from_fn(n_leaves + 1, n_leaves, |i, j| {
                if i == 0 || i == j + 1 {
                    1.0
                } else {
                    0.0
                }
            }),
        }
    }
}

/// Reconciliation strategies.
#[derive(Debug, Clone)]
pub enum ReconciliationMethod {
    /// Keep the leaf forecasts and sum them up: $G = [0 \; I]$.
    BottomUp,
    /// Ordinary Least Squares: $G = (S^T S)^{-1} S^T$
    Ols,
    /// Weighted Least Squares: $G = (S^T W^{-1} S)^{-1} S^T W^{-1}$
    Wls {
        /// Diagonal weights (m-dimensional).
        weights: Vec<f64>,
    },
    /// WLS with each series weighted by its number of leaves.
    StructuralScaling,
    /// Minimum Trace (MinT): $G = (S^T \Sigma^{-1} S)^{-1} S^T \Sigma^{-1}$
    MinT {
        /// Full covariance matrix (m x m).
        covariance: Mat<f64>,
    },
}

/// Reconcile base forecasts $\hat{y}$ (`m x k`) using the structural matrix $S$.
///
/// Returns $\tilde{y} = S \cdot G \cdot \hat{y}$.
pub fn reconcile(
    s: &SummingMatrix,
    base_forecasts: &Mat<f64>,
    method: &ReconciliationMethod,
) -> Result<Mat<f64>> {
    let s_mat = s.as_ref();
    let m = s.m();
    let n = s.n();

    if base_forecasts.nrows() != m {
        return Err(Error::ShapeMismatch {
            expected: format!("{} rows", m),
            actual: format!("{} rows", base_forecasts.nrows()),
        });
    }

    let b = match method {
        ReconciliationMethod::BottomUp => {
            Mat::from_fn(n, base_forecasts.ncols(), |i, j| base_forecasts[(m - n + i, j)])
        }
        ReconciliationMethod::Ols => normal_solve(s_mat, s_mat, base_forecasts.as_ref()),
        ReconciliationMethod::Wls { weights } => weighted(s_mat, base_forecasts, weights)?,
        ReconciliationMethod::StructuralScaling => {
            weighted(s_mat, base_forecasts, &s.row_sums())?
        }
        ReconciliationMethod::MinT { covariance } => {
            if covariance.nrows() != m || covariance.ncols() != m {
                return Err(Error::ShapeMismatch {
                    expected: format!("{}x{} covariance", m, m),
                    actual: format!("{}x{} covariance", covariance.nrows(), covariance.ncols()),
                });
            }

            let lu = covariance.full_piv_lu();
            let sigmainv_s = lu.solve(s_mat);
            let sigmainv_y = lu.solve(base_forecasts);
            normal_solve(s_mat, sigmainv_s.as_ref(), sigmainv_y.as_ref())
        }
    };

    for j in 0..b.ncols() {
        for i in 0..b.nrows() {
            if !b[(i, j)].is_finite() {
                return Err(Error::InversionFailed);
            }
        }
    }

    Ok(s_mat * b)
}

fn weighted(s_mat: MatRef<'_, f64>, y_hat: &Mat<f64>, weights: &[f64]) -> Result<Mat<f64>> {
    let (m, n) = (s_mat.nrows(), s_mat.ncols());
    if weights.len() != m {
        return Err(Error::ShapeMismatch {
            expected: format!("{} weights", m),
            actual: format!("{} weights", weights.len()),
        });
    }
    if weights.iter().any(|&w| w <= 0.0) {
        return Err(Error::InvalidParameter {
            name: "weights",
            message: "must be positive",
        });
    }

    let winv_s = Mat::from_fn(m, n, |i, j| s_mat[(i, j)] / weights[i]);
    let winv_y = Mat::from_fn(m, y_hat.ncols(), |i, k| y_hat[(i, k)] / weights[i]);
    Ok(normal_solve(s_mat, winv_s.as_ref(), winv_y.as_ref()))
}

/// Leaf estimate `b` from `(Sᵀ X) b = Sᵀ Y`, where `X` and `Y` are `S` and the
/// base forecasts premultiplied by the inverse error weighting.
fn normal_solve(s_mat: MatRef<'_, f64>, x: MatRef<'_, f64>, y: MatRef<'_, f64>) -> Mat<f64> {
    let st = s_mat.transpose();
    let lhs = &st * x;
    let rhs = &st * y;
    lhs.full_piv_lu().solve(&rhs)
}

/// Reconcile a `[batch, horizon, m]` forecast, one batch entry at a time.
///
/// The channel axis must list series in the same order as the rows of `s`.
pub fn reconcile_forecast(
    s: &SummingMatrix,
    forecast: ArrayView3<'_, f64>,
    method: &ReconciliationMethod,
) -> Result<Array3<f64>> {
    let (batch, horizon, channels) = forecast.dim();
    if channels != s.m() {
        return Err(Error::ChannelCountMismatch {
            expected: s.m(),
            found: channels,
        });
    }
    debug!(batch, horizon, series = channels, ?method, "reconciling forecast");

    let mut out = Array3::<f64>::zeros((batch, horizon, channels));
    for b in 0..batch {
        let y_hat = Mat::from_fn(channels, horizon, |i, t| forecast[[b, t, i]]);
        let y_tilde = reconcile(s, &y_hat, method)?;
        for t in 0..horizon {
            for i in 0..channels {
                out[[b, t, i]] = y_tilde[(i, t)];
            }
        }
    }
    Ok(out)
}
