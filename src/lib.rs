//! gridconv - Boundary-safe 2D convolution.
//!
//! Applies a small odd-sized filter kernel to a single-channel grid and
//! returns a same-size grid. Taps that fall outside the grid are skipped
//! rather than clamped, wrapped or zero-padded.
//!
//! # Architecture
//!
//! - `schema`: Configuration types (strategy, kernel, circle demo)
//! - `compute`: Grids, kernels, the convolution engine and its execution
//!   strategies (sequential, rayon thread pool, wgpu compute shader)
//! - `raster`: Image loading/saving around [`compute::Grid`]
//!
//! # Example
//!
//! ```rust,no_run
//! use gridconv::{
//!     compute::{ConvolutionStrategy, Grid, Kernel, Strategy, to_display},
//!     schema::StrategyConfig,
//! };
//!
//! let input = Grid::from_fn(64, 64, |x, _| if x < 32 { 0u8 } else { 255 }).unwrap();
//! let kernel = Kernel::vertical_edge();
//!
//! let strategy = Strategy::from_config(&StrategyConfig::Threaded { threads: 4 }).unwrap();
//! let edges = strategy.convolve(&input, &kernel).unwrap();
//!
//! let display = to_display(&edges, true);
//! println!("Edge response range: {:?}", edges.value_range());
//! # let _ = display;
//! ```

pub mod compute;
pub mod raster;
pub mod schema;

// Re-export commonly used types
pub use compute::{ConvolutionStrategy, ConvolveError, Grid, Kernel, Strategy, convolve};
pub use schema::{ConvolutionConfig, KernelConfig, StrategyConfig};
