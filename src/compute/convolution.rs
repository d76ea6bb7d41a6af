//! Direct 2D convolution with skipped out-of-bounds taps.
//!
//! For output cell (x, y) and a K×K kernel with half-width `pad`:
//!
//! ```text
//! out(x, y) = Σ_ky Σ_kx [in bounds] * in(x + kx - pad, y + ky - pad) * k(kx, ky)
//! ```
//!
//! Taps that fall outside the grid are left out of the sum entirely. This
//! is neither clamping nor wrapping, and border cells simply sum fewer
//! terms.
//!
//! # Complexity
//!
//! O(W * H * K^2). Output cells have no data dependencies on each other,
//! which is what lets [`super::ThreadedStrategy`] and the GPU backend split
//! the work without synchronization.

use super::gpu::GpuError;
use super::{Grid, Kernel, Sample};

/// Errors raised by grid/kernel construction and by the execution strategies.
#[derive(Debug, thiserror::Error)]
pub enum ConvolveError {
    #[error("Invalid kernel of size {size}: {reason}")]
    InvalidKernel { size: usize, reason: &'static str },

    #[error("Grid dimensions {width}x{height} are zero or overflow the address space")]
    InvalidGrid { width: usize, height: usize },

    #[error("Grid {width}x{height} needs {expected} samples, got {len}")]
    GridLength {
        width: usize,
        height: usize,
        expected: usize,
        len: usize,
    },

    #[error("Thread pool needs at least one worker")]
    InvalidThreadCount,

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Compute a single output cell.
///
/// The kernel window is clipped to the grid before the loop, so the tap
/// order is always row-major over the in-bounds part of the kernel.
#[inline]
pub fn convolve_cell<T: Sample>(input: &Grid<T>, kernel: &Kernel, x: usize, y: usize) -> f32 {
    let k_size = kernel.size();
    let pad = kernel.pad();
    let width = input.width();
    let height = input.height();

    // Kernel rows/columns whose taps land inside the grid.
    let ky_start = pad.saturating_sub(y);
    let ky_end = k_size.min(height + pad - y);
    let kx_start = pad.saturating_sub(x);
    let kx_end = k_size.min(width + pad - x);

    let mut sum = 0.0f32;
    for ky in ky_start..ky_end {
        let src_row = input.row(y + ky - pad);
        for kx in kx_start..kx_end {
            sum += src_row[x + kx - pad].to_f32() * kernel.get(kx, ky);
        }
    }
    sum
}

/// Convolve row `y` of `input` into `out_row`.
#[inline]
pub fn convolve_row_into<T: Sample>(
    input: &Grid<T>,
    kernel: &Kernel,
    y: usize,
    out_row: &mut [f32],
) {
    debug_assert_eq!(out_row.len(), input.width());
    for (x, out) in out_row.iter_mut().enumerate() {
        *out = convolve_cell(input, kernel, x, y);
    }
}

/// Sequential reference convolution.
///
/// Returns a freshly allocated grid with the same shape as `input`. The
/// result is not normalized or clamped.
pub fn convolve<T: Sample>(input: &Grid<T>, kernel: &Kernel) -> Grid<f32> {
    let width = input.width();
    let mut data = vec![0.0f32; input.len()];

    for (y, out_row) in data.chunks_mut(width).enumerate() {
        convolve_row_into(input, kernel, y, out_row);
    }

    Grid::with_shape_of(input, data)
}
