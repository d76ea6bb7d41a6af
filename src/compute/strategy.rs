//! Execution strategies for the convolution engine.
//!
//! Every backend computes the same per-cell sum as [`convolve`]; they only
//! differ in how output cells are scheduled. The set of backends is closed,
//! so selection from configuration goes through the [`Strategy`] enum.

use rayon::prelude::*;

use crate::schema::StrategyConfig;

use super::gpu::GpuConvolver;
use super::{ConvolveError, Grid, Kernel, Sample, convolve, convolve_row_into};

/// A way of scheduling the per-cell work of a convolution.
pub trait ConvolutionStrategy {
    /// Short human-readable backend name.
    fn name(&self) -> &'static str;

    /// Convolve `input` with `kernel`, returning a new grid of the same shape.
    fn convolve<T: Sample>(
        &self,
        input: &Grid<T>,
        kernel: &Kernel,
    ) -> Result<Grid<f32>, ConvolveError>;
}

/// Single-threaded row-by-row loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialStrategy;

impl ConvolutionStrategy for SequentialStrategy {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn convolve<T: Sample>(
        &self,
        input: &Grid<T>,
        kernel: &Kernel,
    ) -> Result<Grid<f32>, ConvolveError> {
        Ok(convolve(input, kernel))
    }
}

/// Fork-join over output rows on a dedicated rayon pool.
///
/// Each task owns one row of the output buffer (`par_chunks_mut`), so
/// writes never overlap and no lock is taken.
pub struct ThreadedStrategy {
    pool: rayon::ThreadPool,
}

impl ThreadedStrategy {
    /// Build a pool with `threads` workers.
    ///
    /// Zero is rejected; rayon would read it as "default pool size".
    pub fn new(threads: usize) -> Result<Self, ConvolveError> {
        if threads == 0 {
            return Err(ConvolveError::InvalidThreadCount);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gridconv-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    /// Number of worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ConvolutionStrategy for ThreadedStrategy {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn convolve<T: Sample>(
        &self,
        input: &Grid<T>,
        kernel: &Kernel,
    ) -> Result<Grid<f32>, ConvolveError> {
        let width = input.width();
        let mut data = vec![0.0f32; input.len()];

        log::debug!(
            "threaded convolution: {}x{} grid, {} workers",
            width,
            input.height(),
            self.threads()
        );

        self.pool.install(|| {
            data.par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, out_row)| convolve_row_into(input, kernel, y, out_row));
        });

        Ok(Grid::with_shape_of(input, data))
    }
}

/// Strategy selected at runtime from [`StrategyConfig`].
pub enum Strategy {
    Sequential(SequentialStrategy),
    Threaded(ThreadedStrategy),
    Gpu(Box<GpuConvolver>),
}

impl Strategy {
    /// Build the configured backend.
    ///
    /// The GPU backend blocks on adapter/device acquisition and shader
    /// compilation; any failure there is returned as [`ConvolveError::Gpu`].
    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConvolveError> {
        let strategy = match config {
            StrategyConfig::Sequential => Self::Sequential(SequentialStrategy),
            StrategyConfig::Threaded { threads } => {
                Self::Threaded(ThreadedStrategy::new(*threads)?)
            }
            StrategyConfig::Gpu => {
                let gpu = pollster::block_on(GpuConvolver::new())?;
                Self::Gpu(Box::new(gpu))
            }
        };
        log::debug!("selected {} strategy", strategy.name());
        Ok(strategy)
    }
}

impl ConvolutionStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Self::Sequential(s) => s.name(),
            Self::Threaded(s) => s.name(),
            Self::Gpu(s) => s.name(),
        }
    }

    fn convolve<T: Sample>(
        &self,
        input: &Grid<T>,
        kernel: &Kernel,
    ) -> Result<Grid<f32>, ConvolveError> {
        match self {
            Self::Sequential(s) => s.convolve(input, kernel),
            Self::Threaded(s) => s.convolve(input, kernel),
            Self::Gpu(s) => s.convolve(input, kernel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{ProptestConfig, any, prop_assert_eq, proptest};

    fn noise(width: usize, height: usize, seed: u32) -> Grid<u8> {
        Grid::from_fn(width, height, |x, y| {
            let h = (x as u32)
                .wrapping_mul(73_856_093)
                ^ (y as u32).wrapping_mul(19_349_663)
                ^ seed.wrapping_mul(83_492_791);
            (h % 256) as u8
        })
        .unwrap()
    }

    #[test]
    fn test_threaded_matches_sequential() {
        let input = noise(37, 23, 1);
        let threaded = ThreadedStrategy::new(4).unwrap();

        for kernel in [
            Kernel::vertical_edge(),
            Kernel::gaussian_blur(),
            Kernel::identity(),
        ] {
            let seq = SequentialStrategy.convolve(&input, &kernel).unwrap();
            let par = threaded.convolve(&input, &kernel).unwrap();
            assert_eq!(seq, par);
        }
    }

    #[test]
    fn test_threaded_single_row_and_column() {
        let threaded = ThreadedStrategy::new(3).unwrap();
        let kernel = Kernel::gaussian_blur();

        for (w, h) in [(1, 1), (1, 9), (9, 1)] {
            let input = noise(w, h, 7);
            let out = threaded.convolve(&input, &kernel).unwrap();
            assert!(out.same_shape(&input));
            assert_eq!(out, convolve(&input, &kernel));
        }
    }

    #[test]
    fn test_thread_count() {
        let threaded = ThreadedStrategy::new(2).unwrap();
        assert_eq!(threaded.threads(), 2);
        assert_eq!(threaded.name(), "threaded");
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            ThreadedStrategy::new(0),
            Err(ConvolveError::InvalidThreadCount)
        ));
        assert!(matches!(
            Strategy::from_config(&StrategyConfig::Threaded { threads: 0 }),
            Err(ConvolveError::InvalidThreadCount)
        ));
    }

    #[test]
    fn test_from_config_cpu_backends() {
        let seq = Strategy::from_config(&StrategyConfig::Sequential).unwrap();
        assert_eq!(seq.name(), "sequential");

        let par = Strategy::from_config(&StrategyConfig::Threaded { threads: 2 }).unwrap();
        assert_eq!(par.name(), "threaded");

        let input = noise(8, 8, 3);
        let kernel = Kernel::vertical_edge();
        assert_eq!(
            seq.convolve(&input, &kernel).unwrap(),
            par.convolve(&input, &kernel).unwrap()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_shape_preserved(
            width in 1usize..24,
            height in 1usize..24,
            half in 0usize..4,
            seed in any::<u32>(),
        ) {
            let size = half * 2 + 1;
            let kernel = Kernel::new(size, vec![0.5; size * size]).unwrap();
            let input = noise(width, height, seed);
            let out = SequentialStrategy.convolve(&input, &kernel).unwrap();
            prop_assert_eq!(out.width(), width);
            prop_assert_eq!(out.height(), height);
        }

        #[test]
        fn prop_threaded_equivalent(
            width in 1usize..32,
            height in 1usize..32,
            seed in any::<u32>(),
            weights in proptest::collection::vec(-4i8..=4, 9),
        ) {
            // Small integer weights keep every partial sum exact in f32.
            let kernel = Kernel::new(3, weights.iter().map(|&w| w as f32).collect()).unwrap();
            let input = noise(width, height, seed);
            let threaded = ThreadedStrategy::new(3).unwrap();
            prop_assert_eq!(
                SequentialStrategy.convolve(&input, &kernel).unwrap(),
                threaded.convolve(&input, &kernel).unwrap()
            );
        }
    }
}
