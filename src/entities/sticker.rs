//! Sticker: an ordered stack of layers plus an emoji tag.
//!
//! Layer order is paint order; later layers draw on top. The emoji is the
//! messenger-facing tag exported next to the rendered image.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::layer::Layer;

/// Emoji assigned to freshly created stickers.
pub const DEFAULT_EMOJI: &str = "\u{1FAE5}";

/// One sticker: layers in paint order plus its emoji tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    pub id: Uuid,
    pub layers: Vec<Layer>,
    pub emoji: String,
}

impl Sticker {
    /// Create an empty sticker with the default emoji.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            layers: Vec::new(),
            emoji: DEFAULT_EMOJI.to_string(),
        }
    }

    /// Append a layer on top of the stack.
    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Remove a layer by id. Returns the removed layer, or None if absent.
    pub fn remove_layer(&mut self, id: Uuid) -> Option<Layer> {
        let idx = self.layers.iter().position(|l| l.id == id)?;
        Some(self.layers.remove(idx))
    }

    /// Find a layer by id.
    pub fn layer(&self, id: Uuid) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Find a layer by id, mutable.
    pub fn layer_mut(&mut self, id: Uuid) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }
}

impl Default for Sticker {
    fn default() -> Self {
        Self::new()
    }
}
