//! Entities module - the document model and the code that renders it
//!
//! A [`Pack`] owns an ordered list of sticker ids, a [`Sticker`] owns an
//! ordered stack of [`Layer`]s, and each layer carries raster content plus
//! placement geometry. The transform, effects and compositor modules operate
//! on these types and know nothing about storage or sessions.

pub mod compositor;
pub mod effects;
pub mod layer;
pub mod pack;
pub mod sticker;
pub mod transform;

pub use layer::{Layer, LayerPatch};
pub use pack::Pack;
pub use sticker::Sticker;
pub use transform::Corner;
