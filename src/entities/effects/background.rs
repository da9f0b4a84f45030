//! Background removal through a pluggable segmentation collaborator.
//!
//! The engine does not ship a segmentation model; callers supply one
//! behind [`BackgroundRemover`]. Every failure path keeps the original
//! content and logs at warn level, so a broken or declining backend never
//! damages a layer and never surfaces an error to the user.

use image::RgbaImage;
use log::{debug, warn};

use crate::entities::layer::{decode_data_url, encode_png_data_url, Layer};
use crate::error::Result;

/// Segmentation collaborator that cuts the subject out of an image.
pub trait BackgroundRemover: Send + Sync {
    /// Return the subject on a transparent background, at the same pixel
    /// size as the input. `Ok(None)` means the backend declined (nothing
    /// it considers removable).
    fn remove(&self, img: &RgbaImage) -> Result<Option<RgbaImage>>;
}

/// Run `remover` against an encoded content payload.
///
/// Returns the replacement payload, or `None` when the original should be
/// kept: undecodable content, backend decline or error, a result with the
/// wrong pixel size, or an encode failure.
pub fn removed_content(content: &str, remover: &dyn BackgroundRemover) -> Option<String> {
    let src = match decode_data_url(content) {
        Ok(img) => img,
        Err(e) => {
            warn!("Background removal skipped, content does not decode: {}", e);
            return None;
        }
    };

    let cut = match remover.remove(&src) {
        Ok(Some(img)) => img,
        Ok(None) => {
            debug!("Background removal declined by backend");
            return None;
        }
        Err(e) => {
            warn!("Background removal failed: {}", e);
            return None;
        }
    };

    // The crop window keeps addressing the replaced content, so the
    // intrinsic size must not move
    if cut.dimensions() != src.dimensions() {
        let (cw, ch) = cut.dimensions();
        let (sw, sh) = src.dimensions();
        warn!(
            "Background removal returned {}x{} for a {}x{} source, keeping original",
            cw, ch, sw, sh
        );
        return None;
    }

    match encode_png_data_url(&cut) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Background removal result failed to encode: {}", e);
            None
        }
    }
}

/// Replace a layer's content with the remover's output.
///
/// Geometry is untouched. Returns true if the content changed.
pub fn remove_layer_background(layer: &mut Layer, remover: &dyn BackgroundRemover) -> bool {
    match removed_content(&layer.content, remover) {
        Some(content) => {
            layer.content = content;
            true
        }
        None => false,
    }
}
