//! Trend-seasonal linear forecaster.
//!
//! ```text
//! x ──► decompose ──► seasonal ──► Projection(seasonal) ──┐
//!               └──► trend    ──► Projection(trend)    ──┴─► +  ──► forecast
//! ```

use super::config::LinearConfig;
use super::projection::Projection;
use super::Forecaster;
use crate::decomposition::SeriesDecomposition;
use crate::error::Result;
use ndarray::{Array3, ArrayView3};
use tracing::debug;

/// Decomposition-linear forecaster: one projection for the moving-average
/// trend and one for the residual.
#[derive(Debug, Clone)]
pub struct TrendSeasonalLinear {
    config: LinearConfig,
    decomposition: SeriesDecomposition,
    seasonal: Projection,
    trend: Projection,
}

impl TrendSeasonalLinear {
    /// Create a forecaster with randomly initialized weights.
    pub fn new(config: LinearConfig) -> Result<Self> {
        config.validate()?;
        let decomposition = SeriesDecomposition::new(config.kernel_size)?;

        let mut rng = config.rng();
        let seasonal = Projection::random(&config, &mut rng);
        let trend = Projection::random(&config, &mut rng);

        debug!(
            seq_len = config.seq_len,
            pred_len = config.pred_len,
            channels = config.channels,
            individual = config.individual,
            kernel_size = config.kernel_size,
            "initialized trend-seasonal forecaster"
        );

        Ok(Self {
            config,
            decomposition,
            seasonal,
            trend,
        })
    }

    /// Create a forecaster from explicit projections.
    pub fn with_projections(
        config: LinearConfig,
        seasonal: Projection,
        trend: Projection,
    ) -> Result<Self> {
        config.validate()?;
        seasonal.check_config(&config)?;
        trend.check_config(&config)?;
        Ok(Self {
            decomposition: SeriesDecomposition::new(config.kernel_size)?,
            config,
            seasonal,
            trend,
        })
    }

    /// Projection applied to the seasonal component.
    pub fn seasonal(&self) -> &Projection {
        &self.seasonal
    }

    /// Projection applied to the trend component.
    pub fn trend(&self) -> &Projection {
        &self.trend
    }

    /// The decomposition used before projecting.
    pub fn decomposition(&self) -> &SeriesDecomposition {
        &self.decomposition
    }

    /// Same as [`Forecaster::forecast`], through the explicit-iteration projection path.
    pub fn forecast_iterative(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        self.seasonal.check_input(&x)?;
        let (seasonal, trend) = self.decomposition.decompose(x)?;
        let out = self.seasonal.apply_iterative(seasonal.view())?
            + self.trend.apply_iterative(trend.view())?;
        Ok(out)
    }
}

impl Forecaster for TrendSeasonalLinear {
    fn forecast(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        self.seasonal.check_input(&x)?;
        let (seasonal, trend) = self.decomposition.decompose(x)?;
        let out = self.seasonal.apply(seasonal.view())? + self.trend.apply(trend.view())?;
        Ok(out)
    }

    fn config(&self) -> &LinearConfig {
        &self.config
    }
}
