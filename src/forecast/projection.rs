//! Time-axis linear projections.
//!
//! A projection maps `[batch, seq_len, channel]` to `[batch, out_len, channel]`
//! by contracting the time axis:
//!
//! ```text
//! individual:  out[b, p, c] = Σₗ x[b, l, c] · W[c, l, p]
//! shared:      out[b, p, c] = Σₗ x[b, l, c] · W[l, p] + bias[p]
//! ```
//!
//! Individual weights live in one contiguous `[channels, seq_len, out_len]`
//! tensor, so the channel count is fixed when the projection is built.

use super::config::LinearConfig;
use crate::error::{Error, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView3, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Weights of a time-axis projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// One `[seq_len, out_len]` matrix per channel, no bias.
    Individual {
        /// Weight tensor `[channels, seq_len, out_len]`.
        weights: Array3<f64>,
    },
    /// One affine map applied to every channel.
    Shared {
        /// Weight matrix `[seq_len, out_len]`.
        weight: Array2<f64>,
        /// Bias `[out_len]`.
        bias: Array1<f64>,
    },
}

impl Projection {
    /// Randomly initialized projection for `config`.
    ///
    /// Individual weights are standard normal draws scaled by
    /// `1/sqrt(seq_len)`; shared weight and bias are uniform in
    /// `[-1/sqrt(seq_len), 1/sqrt(seq_len)]`.
    pub fn random<R: Rng + ?Sized>(config: &LinearConfig, rng: &mut R) -> Self {
        let bound = config.init_bound();
        let (seq_len, out_len) = (config.seq_len, config.out_len());

        if config.individual {
            let weights = Array3::from_shape_simple_fn((config.channels, seq_len, out_len), || {
                rng.sample::<f64, _>(StandardNormal) * bound
            });
            Self::Individual { weights }
        } else {
            let mut uniform = || {
                if bound > 0.0 {
                    rng.random_range(-bound..bound)
                } else {
                    0.0
                }
            };
            let weight = Array2::from_shape_simple_fn((seq_len, out_len), &mut uniform);
            let bias = Array1::from_shape_simple_fn(out_len, &mut uniform);
            Self::Shared { weight, bias }
        }
    }

    /// Projection whose every output step is the mean of the history.
    pub fn averaging(config: &LinearConfig) -> Self {
        let w = if config.seq_len > 0 {
            1.0 / config.seq_len as f64
        } else {
            0.0
        };
        let (seq_len, out_len) = (config.seq_len, config.out_len());
        if config.individual {
            Self::Individual {
                weights: Array3::from_elem((config.channels, seq_len, out_len), w),
            }
        } else {
            Self::Shared {
                weight: Array2::from_elem((seq_len, out_len), w),
                bias: Array1::zeros(out_len),
            }
        }
    }

    /// Wrap an explicit `[channels, seq_len, out_len]` tensor.
    pub fn individual_from(weights: Array3<f64>) -> Self {
        Self::Individual { weights }
    }

    /// Wrap an explicit shared affine map.
    pub fn shared_from(weight: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        if bias.len() != weight.ncols() {
            return Err(Error::DimensionMismatch {
                expected: weight.ncols(),
                found: bias.len(),
            });
        }
        Ok(Self::Shared { weight, bias })
    }

    /// Whether each channel has its own weights.
    pub fn is_individual(&self) -> bool {
        matches!(self, Self::Individual { .. })
    }

    /// Channel count the weights are bound to (`None` when shared).
    pub fn channels(&self) -> Option<usize> {
        match self {
            Self::Individual { weights } => Some(weights.len_of(Axis(0))),
            Self::Shared { .. } => None,
        }
    }

    /// Input history length.
    pub fn seq_len(&self) -> usize {
        match self {
            Self::Individual { weights } => weights.len_of(Axis(1)),
            Self::Shared { weight, .. } => weight.nrows(),
        }
    }

    /// Projected width.
    pub fn out_len(&self) -> usize {
        match self {
            Self::Individual { weights } => weights.len_of(Axis(2)),
            Self::Shared { weight, .. } => weight.ncols(),
        }
    }

    /// Check that this projection was built for `config`.
    pub(crate) fn check_config(&self, config: &LinearConfig) -> Result<()> {
        if self.is_individual() != config.individual {
            return Err(Error::ShapeMismatch {
                expected: weight_kind(config.individual).to_string(),
                actual: weight_kind(self.is_individual()).to_string(),
            });
        }
        if let Some(channels) = self.channels() {
            if channels != config.channels {
                return Err(Error::ChannelCountMismatch {
                    expected: config.channels,
                    found: channels,
                });
            }
        }
        if self.seq_len() != config.seq_len || self.out_len() != config.out_len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{}x{} projection", config.seq_len, config.out_len()),
                actual: format!("{}x{} projection", self.seq_len(), self.out_len()),
            });
        }
        Ok(())
    }

    /// Check that a `[batch, time, channel]` window fits these weights.
    pub fn check_input(&self, x: &ArrayView3<'_, f64>) -> Result<()> {
        let (_, time, channels) = x.dim();
        if let Some(expected) = self.channels() {
            if expected != channels {
                return Err(Error::ChannelCountMismatch {
                    expected,
                    found: channels,
                });
            }
        }
        if time != self.seq_len() {
            return Err(Error::DimensionMismatch {
                expected: self.seq_len(),
                found: time,
            });
        }
        Ok(())
    }

    /// Project a window, one matrix product per channel over the whole batch.
    pub fn apply(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        self.check_input(&x)?;
        let (batch, _, channels) = x.dim();

        let projected = match self {
            Self::Individual { weights } => per_channel(channels, |c| {
                x.slice(s![.., .., c]).dot(&weights.index_axis(Axis(0), c))
            }),
            Self::Shared { weight, bias } => per_channel(channels, |c| {
                let mut out = x.slice(s![.., .., c]).dot(weight);
                out += bias;
                out
            }),
        };

        let mut out = Array3::<f64>::zeros((batch, self.out_len(), channels));
        for (c, block) in projected.iter().enumerate() {
            out.slice_mut(s![.., .., c]).assign(block);
        }
        Ok(out)
    }

    /// Project a window by explicit iteration over batch, channel and step.
    ///
    /// Slower reference path; must agree with [`Projection::apply`].
    pub fn apply_iterative(&self, x: ArrayView3<'_, f64>) -> Result<Array3<f64>> {
        self.check_input(&x)?;
        let (batch, seq_len, channels) = x.dim();
        let out_len = self.out_len();
        let mut out = Array3::<f64>::zeros((batch, out_len, channels));

        for b in 0..batch {
            for c in 0..channels {
                for p in 0..out_len {
                    let mut acc = match self {
                        Self::Individual { .. } => 0.0,
                        Self::Shared { bias, .. } => bias[p],
                    };
                    for l in 0..seq_len {
                        let w = match self {
                            Self::Individual { weights } => weights[[c, l, p]],
                            Self::Shared { weight, .. } => weight[[l, p]],
                        };
                        acc += x[[b, l, c]] * w;
                    }
                    out[[b, p, c]] = acc;
                }
            }
        }
        Ok(out)
    }
}

fn weight_kind(individual: bool) -> &'static str {
    if individual {
        "individual weights"
    } else {
        "shared weights"
    }
}

#[cfg(not(feature = "parallel"))]
fn per_channel<F>(channels: usize, f: F) -> Vec<Array2<f64>>
where
    F: Fn(usize) -> Array2<f64>,
{
    (0..channels).map(f).collect()
}

// Results are collected in channel order, so output is identical to the serial path.
#[cfg(feature = "parallel")]
fn per_channel<F>(channels: usize, f: F) -> Vec<Array2<f64>>
where
    F: Fn(usize) -> Array2<f64> + Sync + Send,
{
    (0..channels).into_par_iter().map(f).collect()
}
