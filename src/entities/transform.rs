//! Pure drag-to-geometry math for layer editing.
//!
//! Every operation takes the current [`Layer`] plus the pointer delta of one
//! drag step and returns a partial [`LayerPatch`]. Callers merge the patch
//! and feed the next step the updated layer; deltas are raw per-step screen
//! pixels, never cumulative.
//!
//! # Conventions
//!
//! - Canvas space is y-down; positive `dy` moves content down.
//! - `rotation` is degrees clockwise about the display box center.
//! - Corner handles are sign-normalized so that dragging outward grows the
//!   box no matter which corner is grabbed: `tl`/`bl` flip `dx`, `tl`/`tr`
//!   flip `dy`.
//! - The corner diagonally opposite the grabbed handle is the anchor; its
//!   screen position does not move during `resize` and `crop_resize`.

use super::layer::{Layer, LayerPatch};

/// One of the four corner handles of a display box or crop frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// All corners, for handle iteration.
    pub fn all() -> &'static [Corner] {
        &[
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomLeft,
            Corner::BottomRight,
        ]
    }

    /// Short name for log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::TopLeft => "tl",
            Corner::TopRight => "tr",
            Corner::BottomLeft => "bl",
            Corner::BottomRight => "br",
        }
    }

    /// Corners on the right edge keep `left` anchored.
    #[inline]
    pub fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }

    /// Corners on the bottom edge keep `top` anchored.
    #[inline]
    pub fn is_bottom(self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::BottomRight)
    }

    /// Sign-normalize a horizontal delta: outward drag is positive growth.
    #[inline]
    fn grow_dx(self, dx: f64) -> f64 {
        if self.is_right() { dx } else { -dx }
    }

    /// Sign-normalize a vertical delta: outward drag is positive growth.
    #[inline]
    fn grow_dy(self, dy: f64) -> f64 {
        if self.is_bottom() { dy } else { -dy }
    }
}

impl std::fmt::Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Move the display box by one drag step.
///
/// Sequential translations compose by summing deltas.
pub fn translate(layer: &Layer, dx: f64, dy: f64) -> LayerPatch {
    LayerPatch {
        top: Some(layer.top + dy),
        left: Some(layer.left + dx),
        ..Default::default()
    }
}

/// Set the absolute rotation from the pointer position.
///
/// The angle is measured from the display box center to the pointer; the
/// +90 offset puts angle zero at "pointer directly above the center", which
/// is where the rotate handle sits. Each call produces an absolute angle,
/// not an increment.
pub fn rotate(layer: &Layer, pointer_x: f64, pointer_y: f64) -> LayerPatch {
    let (cx, cy) = layer.center();
    let rotation = (pointer_y - cy).atan2(pointer_x - cx).to_degrees() + 90.0;
    LayerPatch {
        rotation: Some(rotation),
        ..Default::default()
    }
}

/// Resize the display box from a corner handle, preserving aspect ratio.
///
/// The dominant axis of the normalized delta drives the new size; the other
/// dimension follows from the current `width/height` ratio. `top`/`left`
/// are recomputed so the opposite corner stays put.
pub fn resize(layer: &Layer, dx: f64, dy: f64, corner: Corner) -> LayerPatch {
    let dx = corner.grow_dx(dx);
    let dy = corner.grow_dy(dy);
    let ratio = layer.width / layer.height;
    let (width, height) = if dx.abs() > dy.abs() {
        let width = layer.width + dx;
        (width, width / ratio)
    } else {
        let height = layer.height + dy;
        (height * ratio, height)
    };
    LayerPatch {
        top: Some(anchored_top(layer, height, corner)),
        left: Some(anchored_left(layer, width, corner)),
        width: Some(width),
        height: Some(height),
        ..Default::default()
    }
}

/// Resize the crop window from a corner handle.
///
/// Shrinking hides source pixels; growing reveals them again, up to the
/// source boundary nearest the grabbed corner (the opposite crop edge is
/// anchored, so the window may never extend past the source on the handle
/// side). Display size and crop size stay proportional: the stretch factor
/// from source to canvas is unchanged.
///
/// The screen delta is mapped into the layer's local frame so handle
/// directions track the rotated box. The mapping is kept exactly as the
/// editor has always behaved, including the `dx1*sin` term in the `dy` row;
/// see `test_crop_resize_rotated_mapping_is_pinned` before changing it.
pub fn crop_resize(layer: &Layer, dx: f64, dy: f64, corner: Corner) -> LayerPatch {
    let dx1 = corner.grow_dx(dx);
    let dy1 = corner.grow_dy(dy);
    let theta = layer.rotation.to_radians();
    let (sin, cos) = theta.sin_cos();
    let dx = dx1 * cos + dy1 * sin;
    let dy = dy1 * cos + dx1 * sin;

    let max_width = layer.max_width();
    let max_height = layer.max_height();

    // Source pixels available between the anchored crop edge and the source
    // boundary on the handle side. Growth past this would move the window
    // outside the source.
    let avail_w = if corner.is_right() {
        layer.intrinsic_width - layer.cropped_left
    } else {
        layer.cropped_left + layer.cropped_width
    };
    let avail_h = if corner.is_bottom() {
        layer.intrinsic_height - layer.cropped_top
    } else {
        layer.cropped_top + layer.cropped_height
    };
    let width_cap = avail_w / layer.intrinsic_width * max_width;
    let height_cap = avail_h / layer.intrinsic_height * max_height;

    let width = (layer.width + dx).max(1.0).min(width_cap);
    let height = (layer.height + dy).max(1.0).min(height_cap);
    let cropped_width = width / max_width * layer.intrinsic_width;
    let cropped_height = height / max_height * layer.intrinsic_height;

    let cropped_top = if corner.is_bottom() {
        layer.cropped_top
    } else {
        layer.cropped_top - cropped_height + layer.cropped_height
    };
    let cropped_left = if corner.is_right() {
        layer.cropped_left
    } else {
        layer.cropped_left - cropped_width + layer.cropped_width
    };

    LayerPatch {
        top: Some(anchored_top(layer, height, corner)),
        left: Some(anchored_left(layer, width, corner)),
        width: Some(width),
        height: Some(height),
        cropped_top: Some(cropped_top),
        cropped_left: Some(cropped_left),
        cropped_width: Some(cropped_width),
        cropped_height: Some(cropped_height),
        ..Default::default()
    }
}

/// Pan the crop window without changing display size.
///
/// The window slides over the source, clamped to the source bounds. The
/// display box follows the pointer but is clamped so the visible window
/// never leaves the layer's full projected rectangle, whose top-left
/// (the uncropped corner) is derived from the current crop offset.
pub fn crop_pan(layer: &Layer, dx: f64, dy: f64) -> LayerPatch {
    let max_width = layer.max_width();
    let max_height = layer.max_height();

    let cropped_left = (layer.cropped_left + dx / max_width * layer.intrinsic_width)
        .min(layer.intrinsic_width - layer.cropped_width)
        .max(0.0);
    let cropped_top = (layer.cropped_top + dy / max_height * layer.intrinsic_height)
        .min(layer.intrinsic_height - layer.cropped_height)
        .max(0.0);

    let corner_top = layer.top - layer.cropped_top / layer.cropped_height * layer.height;
    let corner_left = layer.left - layer.cropped_left / layer.cropped_width * layer.width;

    let top = (layer.top + dy)
        .min(corner_top + max_height - layer.height)
        .max(corner_top);
    let left = (layer.left + dx)
        .min(corner_left + max_width - layer.width)
        .max(corner_left);

    LayerPatch {
        top: Some(top),
        left: Some(left),
        cropped_top: Some(cropped_top),
        cropped_left: Some(cropped_left),
        ..Default::default()
    }
}

/// New `top` keeping the anchor row fixed for the given corner.
#[inline]
fn anchored_top(layer: &Layer, new_height: f64, corner: Corner) -> f64 {
    if corner.is_bottom() {
        layer.top
    } else {
        layer.top - new_height + layer.height
    }
}

/// New `left` keeping the anchor column fixed for the given corner.
#[inline]
fn anchored_left(layer: &Layer, new_width: f64, corner: Corner) -> f64 {
    if corner.is_right() {
        layer.left
    } else {
        layer.left - new_width + layer.width
    }
}
