//! Sample grids - single-channel 2D rasters consumed and produced by convolution.

use super::ConvolveError;

/// A numeric sample that can be fed into the convolution accumulator.
///
/// Implemented for 8-bit intensities (decoded images) and `f32`
/// (convolution output, synthetic inputs).
pub trait Sample: Copy + Send + Sync + 'static {
    /// Widen to the accumulator type.
    fn to_f32(self) -> f32;
}

impl Sample for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

/// Number of cells in a `width` x `height` grid.
///
/// Zero or overflowing dimensions are rejected.
fn cell_count(width: usize, height: usize) -> Result<usize, ConvolveError> {
    match width.checked_mul(height) {
        Some(cells) if cells > 0 => Ok(cells),
        _ => Err(ConvolveError::InvalidGrid { width, height }),
    }
}

/// Row-major W×H grid of samples.
///
/// Dimensions are validated on construction, so every `Grid` in existence
/// is non-empty and its buffer length equals `width * height`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Sample> Grid<T> {
    /// Wrap an existing row-major buffer.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, ConvolveError> {
        let cells = cell_count(width, height)?;
        if data.len() != cells {
            return Err(ConvolveError::GridLength {
                width,
                height,
                expected: cells,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Wrap `data` using the dimensions of an already validated grid.
    pub(crate) fn with_shape_of<U>(like: &Grid<U>, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), like.width * like.height);
        Self {
            data,
            width: like.width,
            height: like.height,
        }
    }

    /// Create a grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Result<Self, ConvolveError> {
        let cells = cell_count(width, height)?;
        Self::from_vec(width, height, vec![value; cells])
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Result<Self, ConvolveError> {
        let mut data = Vec::with_capacity(cell_count(width, height)?);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::from_vec(width, height, data)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed grid.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get sample at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    /// Set sample at column `x`, row `y`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    /// Borrow row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Raw row-major samples.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// True if `other` has the same width and height.
    #[inline]
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Widen every sample to `f32`.
    pub fn to_f32(&self) -> Grid<f32> {
        Grid {
            data: self.data.iter().map(|&v| v.to_f32()).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Minimum and maximum sample values as `f32`.
    pub fn value_range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                let v = v.to_f32();
                (lo.min(v), hi.max(v))
            })
    }

    /// Sum of all samples as `f32`.
    pub fn sum(&self) -> f32 {
        self.data.iter().map(|&v| v.to_f32()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(matches!(
            Grid::<u8>::from_vec(0, 3, vec![]),
            Err(ConvolveError::InvalidGrid {
                width: 0,
                height: 3
            })
        ));
        assert!(matches!(
            Grid::<f32>::filled(4, 0, 1.0),
            Err(ConvolveError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn test_rejects_overflowing_dimensions() {
        assert!(matches!(
            Grid::<u8>::from_vec(usize::MAX, 2, vec![]),
            Err(ConvolveError::InvalidGrid { height: 2, .. })
        ));
        assert!(matches!(
            Grid::<u8>::filled(usize::MAX / 2 + 1, 4, 0),
            Err(ConvolveError::InvalidGrid { .. })
        ));
        assert!(matches!(
            Grid::<f32>::from_fn(usize::MAX, usize::MAX, |_, _| 0.0),
            Err(ConvolveError::InvalidGrid { .. })
        ));

        let err = Grid::<u8>::from_vec(usize::MAX, 3, vec![]).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = Grid::from_vec(2, 2, vec![1u8, 2, 3]);
        assert!(matches!(
            result,
            Err(ConvolveError::GridLength {
                expected: 4,
                len: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_row_major_indexing() {
        let grid = Grid::from_fn(3, 2, |x, y| (y * 10 + x) as u8).unwrap();
        assert_eq!(grid.get(2, 1), 12);
        assert_eq!(grid.row(1), &[10, 11, 12]);
        assert_eq!(grid.as_slice().len(), 6);
    }

    #[test]
    fn test_value_range_and_sum() {
        let grid = Grid::from_vec(2, 2, vec![-1.5f32, 0.0, 2.0, 3.5]).unwrap();
        assert_eq!(grid.value_range(), (-1.5, 3.5));
        assert_eq!(grid.sum(), 4.0);
    }

    #[test]
    fn test_to_f32_preserves_shape() {
        let grid = Grid::filled(5, 3, 200u8).unwrap();
        let widened = grid.to_f32();
        assert!(widened.same_shape(&grid));
        assert!(widened.as_slice().iter().all(|&v| v == 200.0));
    }
}
