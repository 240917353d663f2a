use std::path::Path;

use bevy_math::Vec2;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boundary colour of the stock track.
pub const DEFAULT_BOUNDARY_COLOR: BoundaryColor = BoundaryColor([2, 105, 31]);

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to decode track image {path}: {source}")]
    Image {
        path: String,
        source: image::ImageError,
    },
    #[error("track image {path} is empty")]
    EmptyImage { path: String },
}

/// Exact RGB triple marking impassable pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryColor(pub [u8; 3]);

impl Default for BoundaryColor {
    fn default() -> Self {
        DEFAULT_BOUNDARY_COLOR
    }
}

/// Immutable raster the cars drive on.
///
/// Pixels outside the image, negative coordinates included, count as
/// boundary so every ray and probe terminates.
#[derive(Debug, Clone)]
pub struct TrackSurface {
    pixels: RgbImage,
    boundary: BoundaryColor,
}

impl TrackSurface {
    pub fn new(pixels: RgbImage, boundary: BoundaryColor) -> Self {
        Self { pixels, boundary }
    }

    /// Decode an image file. Alpha is dropped; only RGB takes part in the boundary test.
    pub fn load(path: &Path, boundary: BoundaryColor) -> Result<Self, TrackError> {
        let image = image::open(path).map_err(|source| TrackError::Image {
            path: path.display().to_string(),
            source,
        })?;
        let pixels = image.to_rgb8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(TrackError::EmptyImage {
                path: path.display().to_string(),
            });
        }
        Ok(Self::new(pixels, boundary))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn boundary_color(&self) -> BoundaryColor {
        self.boundary
    }

    /// True iff the pixel at `(x, y)` is exactly the boundary colour, or lies off the image.
    pub fn boundary_at(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return true;
        }
        self.pixels.get_pixel(x as u32, y as u32).0 == self.boundary.0
    }

    /// Boundary test for a continuous point; each coordinate is floored to its pixel.
    pub fn boundary_at_point(&self, point: Vec2) -> bool {
        if !point.is_finite() {
            return true;
        }
        self.boundary_at(point.x.floor() as i64, point.y.floor() as i64)
    }
}
