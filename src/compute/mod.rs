//! Compute module - Convolution engine, post-processing and demo kernels.

mod convolution;
mod grid;
mod kernel;
mod normalize;
mod strategy;
mod taylor;

pub mod gpu;

pub use convolution::*;
pub use grid::*;
pub use kernel::*;
pub use normalize::*;
pub use strategy::*;
pub use taylor::*;
