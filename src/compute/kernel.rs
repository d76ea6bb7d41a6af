//! Filter kernels for 2D convolution.
//!
//! A kernel is an odd-sized square of `f32` weights. It is built once,
//! before a run, and only ever borrowed by the convolution strategies.

use crate::schema::KernelConfig;

use super::ConvolveError;

/// Immutable K×K weight table, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    data: Vec<f32>,
    size: usize,
}

impl Kernel {
    /// Create a kernel from row-major weights.
    ///
    /// Fails with [`ConvolveError::InvalidKernel`] if `size` is zero or even,
    /// or if `weights` does not hold exactly `size * size` values.
    pub fn new(size: usize, weights: Vec<f32>) -> Result<Self, ConvolveError> {
        if size == 0 || size % 2 == 0 {
            return Err(ConvolveError::InvalidKernel {
                size,
                reason: "size must be odd and at least 1",
            });
        }
        if weights.len() != size * size {
            return Err(ConvolveError::InvalidKernel {
                size,
                reason: "weight count must equal size squared",
            });
        }
        Ok(Self {
            data: weights,
            size,
        })
    }

    /// 1×1 kernel with weight 1.0.
    pub fn identity() -> Self {
        Self {
            data: vec![1.0],
            size: 1,
        }
    }

    /// 3×3 vertical edge detector (horizontal gradient).
    pub fn vertical_edge() -> Self {
        #[rustfmt::skip]
        let data = vec![
            1.0, 0.0, -1.0,
            1.0, 0.0, -1.0,
            1.0, 0.0, -1.0,
        ];
        Self { data, size: 3 }
    }

    /// 3×3 Gaussian blur, weights 1-2-1 / 2-4-2 / 1-2-1 over 16.
    ///
    /// All weights are powers of two, so every strategy sums them exactly.
    pub fn gaussian_blur() -> Self {
        #[rustfmt::skip]
        let data = vec![
            1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
            2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0,
            1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
        ];
        Self { data, size: 3 }
    }

    /// Build a kernel from configuration.
    pub fn from_config(config: &KernelConfig) -> Result<Self, ConvolveError> {
        match config {
            KernelConfig::Identity => Ok(Self::identity()),
            KernelConfig::VerticalEdge => Ok(Self::vertical_edge()),
            KernelConfig::GaussianBlur => Ok(Self::gaussian_blur()),
            KernelConfig::Custom { size, weights } => Self::new(*size, weights.clone()),
        }
    }

    /// Kernel size (diameter).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Half-width, `(K - 1) / 2`.
    #[inline]
    pub fn pad(&self) -> usize {
        self.size / 2
    }

    /// Get weight at kernel column `kx`, row `ky`.
    #[inline]
    pub fn get(&self, kx: usize, ky: usize) -> f32 {
        self.data[ky * self.size + kx]
    }

    /// Row-major weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.data
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }
}
