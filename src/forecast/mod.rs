//! Linear forecasters over `[batch, time, channel]` windows.
//!
//! Two variants share one projection layer:
//!
//! | Forecaster | Preprocessing | Projections |
//! |------------|---------------|-------------|
//! | [`TrendSeasonalLinear`] | moving-average decomposition | seasonal + trend |
//! | [`ShiftNormalizedLinear`] | subtract last observation | one |
//!
//! Each projection is either *individual* (one `[seq_len, pred_len * dim_out]`
//! matrix per channel, stored as a single 3-axis tensor) or *shared* (one
//! affine map for every channel). See [`Projection`].
//!
//! # Output Layout
//!
//! Forecasts have shape `[batch, pred_len * dim_out, channel]`. When
//! `dim_out > 1`, step `p` and output dimension `d` sit at index
//! `p * dim_out + d`; [`split_output_dims`] unfolds this into
//! `[batch, pred_len, dim_out, channel]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use hails::forecast::{Forecaster, LinearConfig, TrendSeasonalLinear};
//!
//! let model = TrendSeasonalLinear::new(LinearConfig::new(96, 24, 7).with_seed(42))?;
//! let forecast = model.forecast(window.view())?; // [batch, 24, 7]
//! ```

mod config;
mod projection;
mod shift_normalized;
mod trend_seasonal;

pub use config::LinearConfig;
pub use projection::Projection;
pub use shift_normalized::ShiftNormalizedLinear;
pub use trend_seasonal::TrendSeasonalLinear;

use crate::error::{Error, Result};
use ndarray::{Array3, Array4, ArrayView3};

/// Trait for window-to-horizon forecasters.
pub trait Forecaster {
    /// Forecast `[batch, seq_len, channel]` into `[batch, pred_len * dim_out, channel]`.
    fn forecast(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>>;

    /// Configuration the model was built with.
    fn config(&self) -> &LinearConfig;

    /// Number of forecast steps.
    fn horizon(&self) -> usize {
        self.config().pred_len
    }
}

/// Unfold `[batch, pred_len * dim_out, channel]` into `[batch, pred_len, dim_out, channel]`.
pub fn split_output_dims(forecast: Array3<f64>, dim_out: usize) -> Result<Array4<f64>> {
    let (batch, width, channels) = forecast.dim();
    if dim_out == 0 || width % dim_out != 0 {
        return Err(Error::InvalidParameter {
            name: "dim_out",
            message: "must divide the forecast width",
        });
    }
    let shape = (batch, width / dim_out, dim_out, channels);
    Ok(forecast
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(shape)?)
}
