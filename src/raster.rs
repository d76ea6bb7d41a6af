//! Raster I/O - image loader and writer around [`Grid`].
//!
//! Decoding converts any supported image to 8-bit luma. Encoding picks the
//! file format from the output path's extension.

use std::path::Path;

use image::GrayImage;

use crate::compute::{CirclePoint, ConvolveError, Grid};

/// Errors from loading or saving raster files.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decoded image is not a valid grid: {0}")]
    Grid(#[from] ConvolveError),

    #[error("Grid {width}x{height} is too large to encode")]
    TooLarge { width: usize, height: usize },
}

/// Decode an image file into a single-channel intensity grid.
pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<Grid<u8>, RasterError> {
    let path = path.as_ref();
    let gray = image::open(path)?.to_luma8();
    let (w, h) = gray.dimensions();
    log::debug!("loaded {} ({}x{})", path.display(), w, h);
    Ok(Grid::from_vec(w as usize, h as usize, gray.into_raw())?)
}

/// Encode an 8-bit grid to an image file.
pub fn save_grayscale<P: AsRef<Path>>(grid: &Grid<u8>, path: P) -> Result<(), RasterError> {
    let too_large = || RasterError::TooLarge {
        width: grid.width(),
        height: grid.height(),
    };
    let w = u32::try_from(grid.width()).map_err(|_| too_large())?;
    let h = u32::try_from(grid.height()).map_err(|_| too_large())?;

    let img = GrayImage::from_raw(w, h, grid.as_slice().to_vec()).ok_or_else(too_large)?;
    img.save(path.as_ref())?;
    log::debug!("saved {}", path.as_ref().display());
    Ok(())
}

/// Plot points as white pixels on a black canvas.
///
/// Coordinates are truncated toward zero; points that land outside the
/// canvas are dropped. Returns the canvas and the number of points plotted.
pub fn rasterize_points(
    points: &[CirclePoint],
    width: usize,
    height: usize,
) -> Result<(Grid<u8>, usize), ConvolveError> {
    let mut canvas = Grid::filled(width, height, 0u8)?;
    let mut plotted = 0;

    for p in points {
        let (x, y) = (p.x.trunc(), p.y.trunc());
        if x >= 0.0 && y >= 0.0 && (x as usize) < width && (y as usize) < height {
            canvas.set(x as usize, y as usize, 255);
            plotted += 1;
        }
    }

    Ok((canvas, plotted))
}
