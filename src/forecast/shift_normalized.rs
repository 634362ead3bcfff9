//! Shift-normalized linear forecaster.
//!
//! The last observed value of each `(batch, channel)` series is subtracted
//! before projecting and added back to every forecast step afterwards:
//!
//! ```text
//! last     = x[:, -1, :]
//! forecast = Projection(x - last) + last
//! ```
//!
//! This assumes a series is roughly a constant offset plus a pattern the
//! projection can learn. Forecasts are therefore anchored at the last
//! observation; a level shift inside the window is carried forward as-is.

use super::config::LinearConfig;
use super::projection::Projection;
use super::Forecaster;
use crate::error::{Error, Result};
use ndarray::{s, Array3, ArrayView3, Axis};
use tracing::debug;

/// Linear forecaster on last-value-shifted windows.
#[derive(Debug, Clone)]
pub struct ShiftNormalizedLinear {
    config: LinearConfig,
    linear: Projection,
}

impl ShiftNormalizedLinear {
    /// Create a forecaster with randomly initialized weights.
    pub fn new(config: LinearConfig) -> Result<Self> {
        config.validate()?;
        let linear = Projection::random(&config, &mut config.rng());
        debug!(
            seq_len = config.seq_len,
            pred_len = config.pred_len,
            channels = config.channels,
            individual = config.individual,
            "initialized shift-normalized forecaster"
        );
        Ok(Self { config, linear })
    }

    /// Create a forecaster from an explicit projection.
    pub fn with_projection(config: LinearConfig, linear: Projection) -> Result<Self> {
        config.validate()?;
        linear.check_config(&config)?;
        Ok(Self { config, linear })
    }

    /// The projection applied to the shifted window.
    pub fn projection(&self) -> &Projection {
        &self.linear
    }

    /// Same as [`Forecaster::forecast`], through the explicit-iteration projection path.
    pub fn forecast_iterative(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        self.shifted(x, |shifted| self.linear.apply_iterative(shifted))
    }

    fn shifted<F>(&self, x: ArrayView3<'_, f64>, project: F) -> Result<Array3<f64>>
    where
        F: FnOnce(ArrayView3<'_, f64>) -> Result<Array3<f64>>,
    {
        self.linear.check_input(&x)?;
        let time = x.len_of(Axis(1));
        if time == 0 {
            return Err(Error::EmptyInput);
        }

        // [batch, 1, channel], broadcast along time.
        let last = x.slice(s![.., time - 1..time, ..]);
        let shifted = &x - &last;
        let mut out = project(shifted.view())?;
        out += &last;
        Ok(out)
    }
}

impl Forecaster for ShiftNormalizedLinear {
    fn forecast(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        self.shifted(x, |shifted| self.linear.apply(shifted))
    }

    fn config(&self) -> &LinearConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array1, Array2};
    use proptest::prelude::*;

    #[test]
    fn test_zero_input_gives_zero_output() -> Result<()> {
        let model = ShiftNormalizedLinear::new(LinearConfig::new(3, 2, 2).with_seed(13))?;
        let out = model.forecast(Array3::<f64>::zeros((2, 3, 2)).view())?;
        assert!(out.iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_constant_series_forecasts_its_level() -> Result<()> {
        // Shifted window is all zeros, so any weights return the last value.
        let model = ShiftNormalizedLinear::new(LinearConfig::new(8, 4, 3).with_seed(2))?;
        let x = Array::from_shape_fn((2, 8, 3), |(b, _, c)| 10.0 * b as f64 + c as f64);
        let out = model.forecast(x.view())?;
        for ((b, _, c), v) in out.indexed_iter() {
            assert!((v - (10.0 * b as f64 + c as f64)).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_last_value_is_added_back() -> Result<()> {
        // Zero weights: forecast is the last observation on every step.
        let config = LinearConfig::new(4, 3, 2);
        let model = ShiftNormalizedLinear::with_projection(
            config,
            Projection::individual_from(Array3::<f64>::zeros((2, 4, 3))),
        )?;
        let x = Array::from_shape_vec((1, 4, 2), vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0, 4.0, 9.0])?;
        let out = model.forecast(x.view())?;
        for p in 0..3 {
            assert_eq!(out[[0, p, 0]], 4.0);
            assert_eq!(out[[0, p, 1]], 9.0);
        }
        Ok(())
    }

    #[test]
    fn test_shared_weights() -> Result<()> {
        // Copy the first shifted step: forecast = x[0] - x[-1] + x[-1] = x[0].
        let mut weight = Array2::<f64>::zeros((3, 1));
        weight[[0, 0]] = 1.0;
        let config = LinearConfig::new(3, 1, 1).with_individual(false);
        let model = ShiftNormalizedLinear::with_projection(
            config,
            Projection::shared_from(weight, Array1::zeros(1))?,
        )?;
        let x = Array::from_shape_vec((1, 3, 2), vec![1.0, -4.0, 2.0, 0.0, 5.0, 3.0])?;
        let out = model.forecast(x.view())?;
        assert!((out[[0, 0, 0]] - 1.0).abs() < 1e-12);
        assert!((out[[0, 0, 1]] + 4.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_empty_history() -> Result<()> {
        let model = ShiftNormalizedLinear::new(LinearConfig::new(0, 2, 1).with_seed(0))?;
        assert_eq!(
            model.forecast(Array3::<f64>::zeros((1, 0, 1)).view()),
            Err(Error::EmptyInput)
        );
        Ok(())
    }

    #[test]
    fn test_channel_mismatch() -> Result<()> {
        let model = ShiftNormalizedLinear::new(LinearConfig::new(4, 2, 3).with_seed(0))?;
        assert_eq!(
            model.forecast_iterative(Array3::<f64>::zeros((1, 4, 2)).view()),
            Err(Error::ChannelCountMismatch { expected: 3, found: 2 })
        );
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn batched_and_iterative_paths_agree(
            batch in 1usize..4,
            seq_len in 1usize..24,
            pred_len in 1usize..8,
            channels in 1usize..5,
            seed in any::<u64>(),
        ) {
            let config = LinearConfig::new(seq_len, pred_len, channels).with_seed(seed);
            let model = ShiftNormalizedLinear::new(config).unwrap();
            let x = Array::from_shape_fn((batch, seq_len, channels), |(b, t, c)| {
                ((b * 31 + t * 7 + c * 3) as f64 * 0.37).sin() * 100.0
            });

            let fast = model.forecast(x.view()).unwrap();
            let slow = model.forecast_iterative(x.view()).unwrap();
            prop_assert_eq!(fast.dim(), (batch, pred_len, channels));
            for (a, b) in fast.iter().zip(slow.iter()) {
                prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
            }
        }
    }
}
