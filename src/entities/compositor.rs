//! Deterministic CPU flatten of sticker layers.
//!
//! Reproduces the interactive mapping exactly: each layer's crop window is
//! stretched to its display box, clipped to it, rotated about the box
//! center and alpha-composited in paint order onto a transparent canvas of
//! the design area, rasterized at [`SUPERSAMPLE`]x.
//!
//! Rendering walks destination pixels and inverse-maps each supersample
//! point back into source space (un-rotate, clip to box, crop-window
//! mapping), point-sampling the source there. Antialiasing comes from the
//! supersample grid; an unrotated, unscaled, uncropped layer therefore
//! reproduces its source as exact 2x2 pixel blocks. Rows are processed in
//! parallel with rayon.
//!
//! Must be called with committed geometry only, never a mid-drag working
//! copy.

use glam::DVec2;
use image::RgbaImage;
use rayon::prelude::*;

use super::layer::{encode_png, Layer, DESIGN_SIZE};
use super::sticker::Sticker;
use crate::error::Result;

/// Supersampling factor applied to the design area on export.
pub const SUPERSAMPLE: u32 = 2;

/// Side of the rendered canvas in physical pixels.
pub const OUTPUT_SIZE: u32 = DESIGN_SIZE as u32 * SUPERSAMPLE;

/// Layer prepared for sampling: decoded source plus inverse-mapping terms.
struct Placed {
    src: RgbaImage,
    src_w: f64,
    src_h: f64,
    center: DVec2,
    half: DVec2,
    sin: f64,
    cos: f64,
    width: f64,
    height: f64,
    crop_origin: DVec2,
    /// Source pixels per box pixel on each axis.
    crop_scale: DVec2,
}

impl Placed {
    fn new(layer: &Layer) -> Result<Self> {
        let src = layer.decode_content()?;
        let (cx, cy) = layer.center();
        let theta = layer.rotation.to_radians();
        Ok(Self {
            src_w: src.width() as f64,
            src_h: src.height() as f64,
            src,
            center: DVec2::new(cx, cy),
            half: DVec2::new(layer.width / 2.0, layer.height / 2.0),
            sin: theta.sin(),
            cos: theta.cos(),
            width: layer.width,
            height: layer.height,
            crop_origin: DVec2::new(layer.cropped_left, layer.cropped_top),
            crop_scale: DVec2::new(
                layer.cropped_width / layer.width,
                layer.cropped_height / layer.height,
            ),
        })
    }

    /// Sample the layer at a canvas-space point.
    ///
    /// Returns None outside the clipped display box or outside the source.
    #[inline]
    fn sample(&self, p: DVec2) -> Option<[f32; 4]> {
        // Undo the clockwise rotation about the box center, then shift into
        // box coordinates (origin at the box top-left)
        let d = p - self.center;
        let bx = d.x * self.cos + d.y * self.sin + self.half.x;
        let by = -d.x * self.sin + d.y * self.cos + self.half.y;
        if bx < 0.0 || by < 0.0 || bx >= self.width || by >= self.height {
            return None;
        }
        // Box coordinates to source pixels through the crop window
        let sx = bx * self.crop_scale.x + self.crop_origin.x;
        let sy = by * self.crop_scale.y + self.crop_origin.y;
        if sx < 0.0 || sy < 0.0 || sx >= self.src_w || sy >= self.src_h {
            return None;
        }
        let px = self.src.get_pixel(sx as u32, sy as u32).0;
        Some([
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ])
    }
}

/// Flatten layers, bottom to top, onto the supersampled design canvas.
pub fn render_layers(layers: &[Layer]) -> Result<RgbaImage> {
    let placed = layers.iter().map(Placed::new).collect::<Result<Vec<_>>>()?;

    let dst_w = OUTPUT_SIZE as usize;
    let inv_s = 1.0 / SUPERSAMPLE as f64;
    let mut out = RgbaImage::new(OUTPUT_SIZE, OUTPUT_SIZE);

    out.par_chunks_mut(dst_w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..dst_w {
                let p = DVec2::new((x as f64 + 0.5) * inv_s, (y as f64 + 0.5) * inv_s);

                // Premultiplied accumulation, bottom to top
                let mut acc = [0.0f32; 4];
                for layer in &placed {
                    if let Some(c) = layer.sample(p) {
                        let a = c[3];
                        let inv = 1.0 - a;
                        acc[0] = c[0] * a + acc[0] * inv;
                        acc[1] = c[1] * a + acc[1] * inv;
                        acc[2] = c[2] * a + acc[2] * inv;
                        acc[3] = a + acc[3] * inv;
                    }
                }

                if acc[3] > 0.0 {
                    // PNG wants straight alpha
                    let idx = x * 4;
                    row[idx] = (acc[0] / acc[3] * 255.0).round().clamp(0.0, 255.0) as u8;
                    row[idx + 1] = (acc[1] / acc[3] * 255.0).round().clamp(0.0, 255.0) as u8;
                    row[idx + 2] = (acc[2] / acc[3] * 255.0).round().clamp(0.0, 255.0) as u8;
                    row[idx + 3] = (acc[3] * 255.0).round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    Ok(out)
}

/// Render a sticker's committed layers to the design canvas.
pub fn render_sticker(sticker: &Sticker) -> Result<RgbaImage> {
    log::debug!(
        "Rendering sticker {} ({} layers)",
        sticker.id,
        sticker.layers.len()
    );
    render_layers(&sticker.layers)
}

/// Render a sticker and encode the result as PNG bytes.
pub fn render_sticker_png(sticker: &Sticker) -> Result<Vec<u8>> {
    let img = render_sticker(sticker)?;
    encode_png(&img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::layer::encode_png_data_url;
    use image::Rgba;

    fn layer_for(src: &RgbaImage) -> Layer {
        Layer::new(
            encode_png_data_url(src).unwrap(),
            src.width() as f64,
            src.height() as f64,
        )
    }

    #[test]
    fn test_identity_layer_reproduces_source_in_blocks() {
        // 8x4 source at intrinsic display size, full crop, no rotation:
        // every source pixel must come out as an exact 2x2 block.
        let mut src = RgbaImage::new(8, 4);
        for (x, y, p) in src.enumerate_pixels_mut() {
            let alpha = if x == 1 { 128 } else { 255 };
            *p = Rgba([(x * 30) as u8, (y * 60) as u8, 100, alpha]);
        }
        let layer = layer_for(&src);
        assert_eq!(layer.width, 8.0);
        assert_eq!(layer.height, 4.0);

        let out = render_layers(&[layer]).unwrap();
        assert_eq!(out.dimensions(), (OUTPUT_SIZE, OUTPUT_SIZE));
        for y in 0..4u32 {
            for x in 0..8u32 {
                let want = src.get_pixel(x, y).0;
                for (ox, oy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    assert_eq!(
                        out.get_pixel(2 * x + ox, 2 * y + oy).0,
                        want,
                        "source pixel ({},{})",
                        x,
                        y
                    );
                }
            }
        }
        // Everything outside the layer stays transparent
        assert_eq!(out.get_pixel(16, 0).0, [0, 0, 0, 0]);
        assert_eq!(out.get_pixel(0, 8).0, [0, 0, 0, 0]);
        assert_eq!(out.get_pixel(999, 999).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_rotation_180_flips_content() {
        let mut src = RgbaImage::new(4, 2);
        for (x, y, p) in src.enumerate_pixels_mut() {
            *p = Rgba([(x * 50 + 10) as u8, (y * 100 + 20) as u8, 0, 255]);
        }
        let mut layer = layer_for(&src);
        layer.rotation = 180.0;

        let out = render_layers(&[layer]).unwrap();
        for y in 0..2u32 {
            for x in 0..4u32 {
                let want = src.get_pixel(3 - x, 1 - y).0;
                assert_eq!(out.get_pixel(2 * x, 2 * y).0, want, "block ({},{})", x, y);
            }
        }
    }

    #[test]
    fn test_crop_window_selects_source_region() {
        // 4x4 source split into colored quadrants; crop to the bottom-right
        let mut src = RgbaImage::new(4, 4);
        for (x, y, p) in src.enumerate_pixels_mut() {
            let c = match (x < 2, y < 2) {
                (true, true) => [255, 0, 0, 255],
                (false, true) => [0, 255, 0, 255],
                (true, false) => [0, 0, 255, 255],
                (false, false) => [255, 255, 0, 255],
            };
            *p = Rgba(c);
        }
        let mut layer = layer_for(&src);
        layer.width = 2.0;
        layer.height = 2.0;
        layer.cropped_left = 2.0;
        layer.cropped_top = 2.0;
        layer.cropped_width = 2.0;
        layer.cropped_height = 2.0;

        let out = render_layers(&[layer]).unwrap();
        for y in 0..4u32 {
            for x in 0..4u32 {
                assert_eq!(out.get_pixel(x, y).0, [255, 255, 0, 255]);
            }
        }
        assert_eq!(out.get_pixel(4, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_crop_stretch_matches_display_scale() {
        // 2x2 source shown at 4x4: each source pixel covers 2x2 logical
        // (4x4 physical) area, the background-size stretch
        let mut src = RgbaImage::new(2, 2);
        src.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        src.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        src.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let mut layer = layer_for(&src);
        layer.width = 4.0;
        layer.height = 4.0;

        let out = render_layers(&[layer]).unwrap();
        for y in 0..4u32 {
            for x in 0..4u32 {
                assert_eq!(out.get_pixel(x, y).0, [255, 0, 0, 255]);
            }
        }
        assert_eq!(out.get_pixel(4, 0).0, [0, 255, 0, 255]);
        assert_eq!(out.get_pixel(0, 4).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(7, 7).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_alpha_over_blend() {
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let blue = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128]));
        let bottom = layer_for(&red);
        let top = layer_for(&blue);

        let out = render_layers(&[bottom, top]).unwrap();
        assert_eq!(out.get_pixel(2, 2).0, [127, 0, 128, 255]);
    }

    #[test]
    fn test_paint_order_later_layer_wins() {
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let green = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
        let out = render_layers(&[layer_for(&red), layer_for(&green)]).unwrap();
        assert_eq!(out.get_pixel(1, 1).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_empty_sticker_renders_transparent_canvas() {
        let sticker = Sticker::new();
        let out = render_sticker(&sticker).unwrap();
        assert_eq!(out.dimensions(), (OUTPUT_SIZE, OUTPUT_SIZE));
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_bad_content_fails_decode() {
        let mut layer = Layer::new("data:,".to_string(), 4.0, 4.0);
        layer.content = "garbage".to_string();
        assert!(render_layers(&[layer]).is_err());
    }

    #[test]
    fn test_png_export_round_trip() {
        let mut sticker = Sticker::new();
        let src = RgbaImage::from_pixel(4, 4, Rgba([9, 8, 7, 255]));
        sticker.push_layer(layer_for(&src));

        let png = render_sticker_png(&sticker).unwrap();
        let back = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (OUTPUT_SIZE, OUTPUT_SIZE));
        assert_eq!(back.get_pixel(0, 0).0, [9, 8, 7, 255]);
    }
}
