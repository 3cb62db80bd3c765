// SPDX-License-Identifier: GPL-3.0-only

//! Panel labels drawn with an 8x8 bitmap font

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::constants::preview::{LABEL_ORIGIN, LABEL_SCALE};

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const SHADOW_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const GLYPH_SIZE: u32 = 8;

/// Copy of `image` with `text` drawn near the top-left corner
pub fn label(image: &RgbImage, text: &str) -> RgbImage {
    let mut out = image.clone();
    let (x, y) = LABEL_ORIGIN;
    // Shadow first so the text stays readable on bright panels
    draw_text(&mut out, text, x + 1, y + 1, LABEL_SCALE, SHADOW_COLOR);
    draw_text(&mut out, text, x, y, LABEL_SCALE, TEXT_COLOR);
    out
}

/// Draw `text` with its top-left corner at (`x`, `y`)
pub fn draw_text(canvas: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let advance = GLYPH_SIZE * scale;
    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + i as u32 * advance;
        if origin_x >= canvas.width() {
            break;
        }
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                // Least significant bit is the leftmost pixel
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as u32 * scale;
                draw_filled_rect_mut(
                    canvas,
                    Rect::at(px as i32, py as i32).of_size(scale, scale),
                    color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_leaves_input_untouched() {
        let image = RgbImage::from_pixel(120, 40, Rgb([10, 20, 30]));
        let labeled = label(&image, "Aligned RGB");
        assert!(image.pixels().all(|p| p.0 == [10, 20, 30]));
        assert_ne!(labeled, image);
        assert!(labeled.pixels().any(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_label_clips_to_small_images() {
        let image = RgbImage::new(12, 12);
        let labeled = label(&image, "Original Depth");
        assert_eq!(labeled.dimensions(), (12, 12));
    }

    #[test]
    fn test_empty_label_is_a_copy() {
        let image = RgbImage::from_pixel(30, 30, Rgb([1, 2, 3]));
        assert_eq!(label(&image, ""), image);
    }
}
