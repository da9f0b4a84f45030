//! Layer: one image plus its on-canvas geometry.
//!
//! # Coordinate systems
//!
//! A layer carries two rectangles in two spaces:
//!
//! - **Display box** (canvas space, CSS-style pixels, y-down): `top`, `left`,
//!   `width`, `height`, plus `rotation` in degrees clockwise about the box
//!   center. This is where the layer sits on the 500x500 design area.
//! - **Crop window** (source space, intrinsic pixels of the decoded image):
//!   `cropped_top/left/width/height` select which part of the source is
//!   shown inside the display box.
//!
//! The visible content is the crop window stretched to fill the display box.
//! Uncropping therefore *reveals* more source without moving what is already
//! visible; the derived `max_width()`/`max_height()` are the display size
//! the box would have if the crop window covered the whole source at the
//! current stretch factor.
//!
//! `content` is a `data:` URL string (base64 raster payload), decoded lazily
//! through [`decode_data_url`]. Geometry changes never touch `content`;
//! effects replace `content` without touching geometry.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StickerError};

/// Side of the square design area layers are composed on, in CSS pixels.
pub const DESIGN_SIZE: f64 = 500.0;

/// Single image layer of a sticker.
///
/// Serialized field names follow the stored record format: camelCase with
/// the intrinsic source dimensions as `_width`/`_height`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique ID for this layer, stable across edits.
    pub id: Uuid,

    /// Raster payload as a `data:image/...;base64,` URL.
    pub content: String,

    /// Display box width in canvas pixels.
    pub width: f64,
    /// Display box height in canvas pixels.
    pub height: f64,
    /// Display box top edge (canvas y, down-positive).
    pub top: f64,
    /// Display box left edge (canvas x).
    pub left: f64,
    /// Rotation in degrees, clockwise, about the display box center.
    pub rotation: f64,

    /// Intrinsic pixel width of the decoded source image.
    #[serde(rename = "_width")]
    pub intrinsic_width: f64,
    /// Intrinsic pixel height of the decoded source image.
    #[serde(rename = "_height")]
    pub intrinsic_height: f64,

    /// Crop window top edge in source pixels.
    pub cropped_top: f64,
    /// Crop window left edge in source pixels.
    pub cropped_left: f64,
    /// Crop window width in source pixels.
    pub cropped_width: f64,
    /// Crop window height in source pixels.
    pub cropped_height: f64,
}

impl Layer {
    /// Create a layer from an already-encoded content string and known
    /// intrinsic dimensions.
    ///
    /// Display size fits the source into the design area preserving aspect
    /// ratio (never upscaling), positioned at the canvas origin, unrotated,
    /// with the crop window covering the full source.
    pub fn new(content: String, intrinsic_width: f64, intrinsic_height: f64) -> Self {
        let ratio = intrinsic_width / intrinsic_height;
        let max_width = DESIGN_SIZE.min(intrinsic_width);
        let max_height = DESIGN_SIZE.min(intrinsic_height);
        let (width, height) = if ratio > 1.0 {
            (max_width, max_width / ratio)
        } else {
            (max_height * ratio, max_height)
        };

        Self {
            id: Uuid::new_v4(),
            content,
            width,
            height,
            top: 0.0,
            left: 0.0,
            rotation: 0.0,
            intrinsic_width,
            intrinsic_height,
            cropped_top: 0.0,
            cropped_left: 0.0,
            cropped_width: intrinsic_width,
            cropped_height: intrinsic_height,
        }
    }

    /// Create a layer by probing the content string for its dimensions.
    ///
    /// Fails with [`StickerError::Decode`] if the payload cannot be decoded;
    /// no partially-initialized layer is produced.
    pub fn from_content(content: String) -> Result<Self> {
        let img = decode_data_url(&content)?;
        Ok(Self::new(content, img.width() as f64, img.height() as f64))
    }

    /// Horizontal stretch factor from source pixels to canvas pixels.
    pub fn scale_x(&self) -> f64 {
        self.intrinsic_width / self.cropped_width
    }

    /// Vertical stretch factor from source pixels to canvas pixels.
    pub fn scale_y(&self) -> f64 {
        self.intrinsic_height / self.cropped_height
    }

    /// Display width the box would have with the crop fully opened.
    pub fn max_width(&self) -> f64 {
        self.scale_x() * self.width
    }

    /// Display height the box would have with the crop fully opened.
    pub fn max_height(&self) -> f64 {
        self.scale_y() * self.height
    }

    /// Center of the display box (the rotation pivot).
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Decode the content payload to an RGBA raster.
    pub fn decode_content(&self) -> Result<RgbaImage> {
        decode_data_url(&self.content)
    }

    /// Replace the content payload with a new raster, PNG-encoded.
    ///
    /// Geometry fields are left untouched: the crop window keeps addressing
    /// the replaced content, which must have the same intrinsic size.
    pub fn replace_content(&mut self, img: &RgbaImage) -> Result<()> {
        self.content = encode_png_data_url(img)?;
        Ok(())
    }

    /// Merge a partial geometry patch into this layer.
    pub fn apply(&mut self, patch: &LayerPatch) {
        if let Some(v) = patch.top {
            self.top = v;
        }
        if let Some(v) = patch.left {
            self.left = v;
        }
        if let Some(v) = patch.width {
            self.width = v;
        }
        if let Some(v) = patch.height {
            self.height = v;
        }
        if let Some(v) = patch.rotation {
            self.rotation = v;
        }
        if let Some(v) = patch.cropped_top {
            self.cropped_top = v;
        }
        if let Some(v) = patch.cropped_left {
            self.cropped_left = v;
        }
        if let Some(v) = patch.cropped_width {
            self.cropped_width = v;
        }
        if let Some(v) = patch.cropped_height {
            self.cropped_height = v;
        }
    }
}

/// Partial update to layer geometry.
///
/// Transform operations return only the fields they change; unset fields
/// keep their current values when merged via [`Layer::apply`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayerPatch {
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub cropped_top: Option<f64>,
    pub cropped_left: Option<f64>,
    pub cropped_width: Option<f64>,
    pub cropped_height: Option<f64>,
}

impl LayerPatch {
    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Decode a `data:` URL string to an RGBA raster.
///
/// Accepts any format the `image` crate can sniff from the payload bytes;
/// the declared MIME type is not trusted.
pub fn decode_data_url(content: &str) -> Result<RgbaImage> {
    let rest = content
        .strip_prefix("data:")
        .ok_or_else(|| StickerError::Decode("not a data URL".to_string()))?;
    let (_mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| StickerError::Decode("missing base64 payload".to_string()))?;
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| StickerError::Decode(format!("base64: {}", e)))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| StickerError::Decode(format!("image: {}", e)))?;
    Ok(img.to_rgba8())
}

/// Encode an RGBA raster to a PNG `data:` URL string.
pub fn encode_png_data_url(img: &RgbaImage) -> Result<String> {
    let bytes = encode_png(img)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(&bytes)))
}

/// Encode an RGBA raster to raw PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )?;
    Ok(bytes)
}
