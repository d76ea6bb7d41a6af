//! Configuration types for convolution runs and the circle demo.

use serde::{Deserialize, Serialize};

use crate::compute::{ConvolveError, Kernel};

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_normalize() -> bool {
    true
}

/// Top-level convolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvolutionConfig {
    /// Execution backend.
    pub strategy: StrategyConfig,
    /// Filter kernel.
    pub kernel: KernelConfig,
    /// Stretch the output's [min, max] range onto 0..=255 before saving.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

impl Default for ConvolutionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::Threaded {
                threads: default_threads(),
            },
            kernel: KernelConfig::VerticalEdge,
            normalize: true,
        }
    }
}

/// Which execution strategy runs the convolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StrategyConfig {
    /// Plain nested loop on the calling thread.
    Sequential,
    /// Row-partitioned fork-join on a worker pool.
    Threaded {
        /// Worker thread count.
        #[serde(default = "default_threads")]
        threads: usize,
    },
    /// One GPU invocation per output cell.
    Gpu,
}

/// Filter kernel selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KernelConfig {
    /// 1×1 pass-through.
    Identity,
    /// 3×3 `[1, 0, -1]` column-difference edge detector.
    VerticalEdge,
    /// 3×3 `[1, 2, 1]` Gaussian blur normalized by 16.
    GaussianBlur,
    /// Arbitrary odd-sized kernel.
    Custom {
        /// Kernel diameter (must be odd).
        size: usize,
        /// Row-major weights, `size * size` values.
        weights: Vec<f32>,
    },
}

impl ConvolutionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let StrategyConfig::Threaded { threads: 0 } = self.strategy {
            return Err(ConfigError::InvalidThreadCount);
        }
        Kernel::from_config(&self.kernel)?;
        Ok(())
    }
}

/// Parameters of the Taylor-series circle demo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleConfig {
    /// Number of evenly spaced samples around the circle.
    pub points: usize,
    /// Radius in pixels.
    pub radius: f64,
    /// Center in pixel coordinates (x, y).
    pub center: (f64, f64),
    /// Canvas width in pixels.
    pub width: usize,
    /// Canvas height in pixels.
    pub height: usize,
    /// Number of Taylor-series terms for sin/cos.
    pub terms: usize,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            points: 1000,
            radius: 200.0,
            center: (300.0, 300.0),
            width: 600,
            height: 600,
            terms: 10,
        }
    }
}

impl CircleConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points == 0 {
            return Err(ConfigError::InvalidCircle("point count must be non-zero"));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::InvalidCircle("radius must be positive"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidCircle("canvas must be non-empty"));
        }
        if self.terms == 0 {
            return Err(ConfigError::InvalidCircle("Taylor term count must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Thread count must be non-zero")]
    InvalidThreadCount,
    #[error("Invalid circle configuration: {0}")]
    InvalidCircle(&'static str),
    #[error("Invalid kernel configuration: {0}")]
    Kernel(#[from] ConvolveError),
}
