//! Region cropping: cuts the configured name area out of a page image.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DocumentError;

/// Rectangle in page pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropArea {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropArea {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width and height must both be positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Intersect with a `width x height` image.
    ///
    /// Returns `(left, top, width, height)` of the overlap, or `None` when the
    /// rectangle is empty or lies entirely outside the image.
    pub fn clip_to(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        if !self.is_valid() {
            return None;
        }
        let left = self.x.max(0);
        let top = self.y.max(0);
        let right = (self.x + i64::from(self.width)).min(i64::from(image_width));
        let bottom = (self.y + i64::from(self.height)).min(i64::from(image_height));

        if right <= left || bottom <= top {
            return None;
        }
        // All four values are within [0, u32::MAX] after clamping to the image.
        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Crop `area` out of `image`.
///
/// Never fails: a rectangle that overhangs the page is clipped to the page,
/// and one with no overlap at all leaves the page untouched. Both cases log
/// a warning.
pub fn crop_region(image: &DynamicImage, area: &CropArea) -> DynamicImage {
    let (image_width, image_height) = (image.width(), image.height());

    let Some((left, top, width, height)) = area.clip_to(image_width, image_height) else {
        warn!(
            x = area.x,
            y = area.y,
            width = area.width,
            height = area.height,
            image_width,
            image_height,
            "Crop area does not overlap the page, using full page"
        );
        return image.clone();
    };

    if i64::from(left) != area.x
        || i64::from(top) != area.y
        || width != area.width
        || height != area.height
    {
        warn!(
            requested = ?area,
            clipped = ?(left, top, width, height),
            image_width,
            image_height,
            "Crop area exceeds page bounds, clipping"
        );
    }

    debug!(left, top, width, height, "Cropping page region");
    image.crop_imm(left, top, width, height)
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, DocumentError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| DocumentError::Encode(e.to_string()))?;
    Ok(buf)
}
