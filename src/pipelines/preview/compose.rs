// SPDX-License-Identifier: GPL-3.0-only

//! Side-by-side canvas composition

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::errors::VisualizationError;

/// Concatenate equal-height images left to right
pub fn compose_horizontal(images: &[&RgbImage]) -> Result<RgbImage, VisualizationError> {
    let first = images.first().ok_or(VisualizationError::NoImages)?;
    let height = first.height();
    if let Some((index, img)) = images
        .iter()
        .enumerate()
        .find(|(_, img)| img.height() != height)
    {
        return Err(VisualizationError::HeightMismatch {
            expected: height,
            found: img.height(),
            index,
        });
    }

    let width = images.iter().map(|img| img.width()).sum();
    let mut canvas = RgbImage::new(width, height);
    let mut x = 0i64;
    for img in images {
        imageops::replace(&mut canvas, *img, x, 0);
        x += img.width() as i64;
    }
    Ok(canvas)
}

/// Resize a display panel to `width` x `height` unless it already fits
pub fn fit_panel(image: RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        imageops::resize(&image, width, height, FilterType::Nearest)
    }
}
