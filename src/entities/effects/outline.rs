//! Outline (stroke) effect.
//!
//! Classic stamp trick: the image is stamped eight times at `thickness`
//! offsets in the compass directions, the union silhouette is recolored to
//! the stroke color, and the original is drawn back on top. Output keeps
//! the input pixel size, so the stroke only shows where the subject leaves
//! room inside its own bounds.

use image::{Rgba, RgbaImage};

use crate::entities::layer::{decode_data_url, encode_png_data_url};
use crate::error::Result;

/// Stroke width the editor applies when the user does not pick one.
pub const DEFAULT_THICKNESS: u32 = 10;

/// Stroke color the editor applies when the user does not pick one.
pub const DEFAULT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Offsets of the eight silhouette stamps, scaled by thickness.
const OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Draw a stroke of `color` behind the opaque parts of `src`.
pub fn apply(src: &RgbaImage, color: Rgba<u8>, thickness: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let t = thickness as i64;
    let color_a = color[3] as f32 / 255.0;

    let mut out = RgbaImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            // Union alpha of the shifted stamps. Compositing the stamps
            // over each other collapses to 1 - prod(1 - a_i) regardless of
            // stamp order.
            let mut keep = 1.0f32;
            for (dx, dy) in OFFSETS {
                let sx = x as i64 - dx * t;
                let sy = y as i64 - dy * t;
                if sx >= 0 && sy >= 0 && (sx as u32) < w && (sy as u32) < h {
                    let a = src.get_pixel(sx as u32, sy as u32)[3] as f32 / 255.0;
                    keep *= 1.0 - a;
                }
            }
            let stroke_a = (1.0 - keep) * color_a;

            // Original over the recolored silhouette
            let top = src.get_pixel(x, y).0;
            let ta = top[3] as f32 / 255.0;
            let out_a = ta + stroke_a * (1.0 - ta);
            let px = if out_a > 0.0 {
                let blend = |tc: u8, bc: u8| -> u8 {
                    let c = (tc as f32 / 255.0) * ta
                        + (bc as f32 / 255.0) * stroke_a * (1.0 - ta);
                    (c / out_a * 255.0).round().clamp(0.0, 255.0) as u8
                };
                [
                    blend(top[0], color[0]),
                    blend(top[1], color[1]),
                    blend(top[2], color[2]),
                    (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
                ]
            } else {
                [0, 0, 0, 0]
            };
            out.put_pixel(x, y, Rgba(px));
        }
    }
    out
}

/// Apply the stroke to an encoded content payload.
pub fn outlined_content(content: &str, color: Rgba<u8>, thickness: u32) -> Result<String> {
    let src = decode_data_url(content)?;
    encode_png_data_url(&apply(&src, color, thickness))
}
