//! Schema module - Configuration types for convolution runs and demos.

mod config;

pub use config::*;
