//! Display post-processing for convolution output.
//!
//! Convolution results are unbounded floats. Turning them into an 8-bit
//! image is an explicit, separate step: optionally stretch the observed
//! range onto [0, 255], then round and saturate.

use super::Grid;

/// Linearly map the grid's [min, max] range onto [lo, hi].
///
/// A constant grid has no range to stretch and maps to `lo` everywhere.
pub fn normalize_min_max(grid: &Grid<f32>, lo: f32, hi: f32) -> Grid<f32> {
    let (min, max) = grid.value_range();
    let span = max - min;
    let scale = if span > 0.0 { (hi - lo) / span } else { 0.0 };

    let data = grid
        .as_slice()
        .iter()
        .map(|&v| (v - min) * scale + lo)
        .collect();
    Grid::with_shape_of(grid, data)
}

/// Round to the nearest integer and saturate to 0..=255.
///
/// NaN maps to 0.
pub fn quantize_u8(grid: &Grid<f32>) -> Grid<u8> {
    let data = grid
        .as_slice()
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    Grid::with_shape_of(grid, data)
}

/// Prepare a convolution result for an 8-bit image writer.
///
/// With `stretch` the full output range is mapped onto 0..=255 first
/// (negative edge responses become dark, positive ones bright); without it
/// values are only rounded and saturated.
pub fn to_display(grid: &Grid<f32>, stretch: bool) -> Grid<u8> {
    if stretch {
        quantize_u8(&normalize_min_max(grid, 0.0, 255.0))
    } else {
        quantize_u8(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stretches_range() {
        let grid = Grid::from_vec(4, 1, vec![-30.0, 0.0, 10.0, 30.0]).unwrap();
        let out = normalize_min_max(&grid, 0.0, 255.0);
        assert_eq!(out.get(0, 0), 0.0);
        assert_eq!(out.get(3, 0), 255.0);
        assert!((out.get(1, 0) - 127.5).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_constant_grid() {
        let grid = Grid::filled(3, 3, 42.0f32).unwrap();
        let out = normalize_min_max(&grid, 0.0, 255.0);
        assert!(out.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_quantize_saturates_and_rounds() {
        let grid = Grid::from_vec(5, 1, vec![-12.0, 0.4, 127.6, 255.0, 900.0]).unwrap();
        let out = quantize_u8(&grid);
        assert_eq!(out.as_slice(), &[0, 0, 128, 255, 255]);
    }

    #[test]
    fn test_quantize_nan() {
        let grid = Grid::from_vec(1, 1, vec![f32::NAN]).unwrap();
        assert_eq!(quantize_u8(&grid).get(0, 0), 0);
    }

    #[test]
    fn test_to_display_shape() {
        let grid = Grid::from_fn(7, 3, |x, y| x as f32 - y as f32).unwrap();
        let stretched = to_display(&grid, true);
        assert!(stretched.same_shape(&grid));
        assert_eq!(stretched.value_range(), (0.0, 255.0));
    }
}
