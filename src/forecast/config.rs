//! Configuration shared by the linear forecasters.

use crate::decomposition::DEFAULT_KERNEL_SIZE;
use crate::error::{Error, Result};
use rand::prelude::*;

/// Shape and initialization settings for a linear forecaster.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearConfig {
    /// History length fed to the model.
    pub seq_len: usize,
    /// Forecast horizon.
    pub pred_len: usize,
    /// Number of series in the channel axis.
    pub channels: usize,
    /// One projection per channel instead of one shared map.
    pub individual: bool,
    /// Output dimensions per forecast step.
    pub dim_out: usize,
    /// Moving-average width (trend-seasonal variant only).
    pub kernel_size: usize,
    /// Random seed for weight initialization.
    pub seed: Option<u64>,
}

impl LinearConfig {
    /// Create a configuration with per-channel weights and one output dimension.
    pub fn new(seq_len: usize, pred_len: usize, channels: usize) -> Self {
        Self {
            seq_len,
            pred_len,
            channels,
            individual: true,
            dim_out: 1,
            kernel_size: DEFAULT_KERNEL_SIZE,
            seed: None,
        }
    }

    /// Choose between per-channel and shared weights.
    pub fn with_individual(mut self, individual: bool) -> Self {
        self.individual = individual;
        self
    }

    /// Set output dimensions per forecast step.
    pub fn with_dim_out(mut self, dim_out: usize) -> Self {
        self.dim_out = dim_out;
        self
    }

    /// Set the moving-average width.
    pub fn with_kernel_size(mut self, kernel_size: usize) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Width of the projected axis: `pred_len * dim_out`.
    pub fn out_len(&self) -> usize {
        self.pred_len * self.dim_out
    }

    /// Fan-in scale `1 / sqrt(seq_len)`, or 0 for an empty history.
    pub fn init_bound(&self) -> f64 {
        if self.seq_len > 0 {
            1.0 / (self.seq_len as f64).sqrt()
        } else {
            0.0
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.pred_len == 0 {
            return Err(Error::InvalidParameter {
                name: "pred_len",
                message: "must be > 0",
            });
        }
        if self.dim_out == 0 {
            return Err(Error::InvalidParameter {
                name: "dim_out",
                message: "must be > 0",
            });
        }
        Ok(())
    }

    pub(crate) fn rng(&self) -> Box<dyn RngCore> {
        match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinearConfig::new(96, 24, 7);
        assert!(config.individual);
        assert_eq!(config.dim_out, 1);
        assert_eq!(config.kernel_size, 25);
        assert_eq!(config.out_len(), 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_len_folds_dim_out() {
        let config = LinearConfig::new(8, 3, 1).with_dim_out(4);
        assert_eq!(config.out_len(), 12);
    }

    #[test]
    fn test_zero_history_bound() {
        assert_eq!(LinearConfig::new(0, 2, 1).init_bound(), 0.0);
        assert!((LinearConfig::new(4, 2, 1).init_bound() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_empty_horizon() {
        assert!(LinearConfig::new(4, 0, 1).validate().is_err());
        assert!(LinearConfig::new(4, 1, 1).with_dim_out(0).validate().is_err());
    }
}
