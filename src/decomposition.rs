//! Moving-average trend extraction and additive series decomposition.
//!
//! A window `x` of shape `[batch, time, channel]` is split into
//!
//! ```text
//! trend    = moving_average(x)        (centered, edge-replicated)
//! seasonal = x - trend
//! ```
//!
//! so that `seasonal + trend == x` holds elementwise.
//!
//! # Edge Handling
//!
//! Before averaging, each series is padded with `(k - 1) / 2` copies of its
//! first value on the left and of its last value on the right:
//!
//! ```text
//! k = 5:   x0 x0 | x0 x1 x2 ... xn | xn xn
//! ```
//!
//! A stride-1 window of width `k` over the padded series then yields exactly
//! `time` outputs.

use crate::error::{Error, Result};
use ndarray::{s, Array3, ArrayView3};

/// Kernel size used by the trend-seasonal forecaster when none is configured.
pub const DEFAULT_KERNEL_SIZE: usize = 25;

/// Centered moving average with edge replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverage {
    kernel_size: usize,
}

impl MovingAverage {
    /// Create a smoother with the given window width.
    ///
    /// The width must be odd so that the two pads restore the input
    /// length exactly.
    pub fn new(kernel_size: usize) -> Result<Self> {
        if kernel_size == 0 || kernel_size % 2 == 0 {
            return Err(Error::InvalidKernelSize { kernel_size });
        }
        Ok(Self { kernel_size })
    }

    /// Window width.
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Number of replicated steps added at each end.
    pub fn half_width(&self) -> usize {
        (self.kernel_size - 1) / 2
    }

    /// Smooth every `(batch, channel)` series along the time axis.
    ///
    /// Output shape equals input shape.
    pub fn smooth(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        let (batch, time, channels) = x.dim();
        if time == 0 {
            return Err(Error::EmptyInput);
        }

        let half = self.half_width();
        let k = self.kernel_size as f64;
        let mut trend = Array3::<f64>::zeros((batch, time, channels));

        for b in 0..batch {
            for c in 0..channels {
                let series = x.slice(s![b, .., c]);
                // Index into the virtual padded series.
                let padded = |i: usize| series[i.saturating_sub(half).min(time - 1)];
                for t in 0..time {
                    let window: f64 = (t..t + self.kernel_size).map(padded).sum();
                    trend[[b, t, c]] = window / k;
                }
            }
        }

        Ok(trend)
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_KERNEL_SIZE,
        }
    }
}

/// Additive decomposition into seasonal and trend parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeriesDecomposition {
    moving_avg: MovingAverage,
}

impl SeriesDecomposition {
    /// Create a decomposition with the given moving-average width.
    pub fn new(kernel_size: usize) -> Result<Self> {
        Ok(Self {
            moving_avg: MovingAverage::new(kernel_size)?,
        })
    }

    /// The underlying smoother.
    pub fn moving_average(&self) -> &MovingAverage {
        &self.moving_avg
    }

    /// Split `x` into `(seasonal, trend)`.
    pub fn decompose(&self, x: ArrayView3<'_, f64>) -> Result<(Array3<f64>, Array3<f64>)> {
        let trend = self.moving_avg.smooth(x)?;
        let seasonal = &x - &trend;
        Ok((seasonal, trend))
    }
}
