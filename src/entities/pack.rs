//! Pack: a publishable collection of stickers.
//!
//! The pack record stores sticker membership as an ordered id list with set
//! semantics: an id is added at most once, insertion order is preserved.
//! Sticker records themselves live in the store, keyed by id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pack metadata plus ordered sticker membership.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
    pub sticker_ids: Vec<Uuid>,
}

impl Pack {
    /// Create an empty pack with blank metadata.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            author: String::new(),
            tags: Vec::new(),
            sticker_ids: Vec::new(),
        }
    }

    /// Add sticker ids, skipping those already present.
    pub fn add_stickers(&mut self, ids: &[Uuid]) {
        for &id in ids {
            if !self.sticker_ids.contains(&id) {
                self.sticker_ids.push(id);
            }
        }
    }

    /// Remove a sticker id from the membership list.
    /// Returns true if it was present.
    pub fn remove_sticker(&mut self, id: Uuid) -> bool {
        let before = self.sticker_ids.len();
        self.sticker_ids.retain(|&v| v != id);
        self.sticker_ids.len() != before
    }

    /// Stem used for export filenames: title, or the id when untitled.
    pub fn file_stem(&self) -> String {
        if self.title.is_empty() {
            self.id.to_string()
        } else {
            self.title.clone()
        }
    }
}

impl Default for Pack {
    fn default() -> Self {
        Self::new()
    }
}
