//! Pack and sticker export.
//!
//! The compositor produces PNG bytes; this module assembles them into a
//! bundle through a [`BundleSink`]. The container format stays external
//! (a ZIP collaborator implements the same trait); [`DirSink`] writes the
//! bundle as plain files for the CLI.
//!
//! Bundle layout: `meta.json` describing the pack plus one
//! `stickers/<stickerId>.png` per sticker.

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::entities::compositor;
use crate::entities::sticker::Sticker;
use crate::error::Result;
use crate::store::Store;

/// Receives the files of an export bundle.
///
/// Paths are relative, forward-slash separated.
pub trait BundleSink {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Sink writing bundle entries as plain files under a root directory.
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl BundleSink for DirSink {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes)?;
        Ok(())
    }
}

/// One sticker line of `meta.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StickerEntry {
    /// File name inside the bundle's `stickers/` directory.
    pub file: String,
    pub emoji: String,
}

/// Shape of the bundle's `meta.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMeta {
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
    pub stickers: Vec<StickerEntry>,
    pub sticker_ids: Vec<Uuid>,
    pub emojis: IndexMap<Uuid, String>,
}

/// Render a sticker and hand it to the sink as `<id>.png`.
///
/// Returns the file name used.
pub fn export_sticker(sticker: &Sticker, sink: &mut dyn BundleSink) -> Result<String> {
    let png = compositor::render_sticker_png(sticker)?;
    let name = format!("{}.png", sticker.id);
    sink.add_file(&name, &png)?;
    Ok(name)
}

/// Assemble a pack bundle: `meta.json` plus one PNG per sticker.
///
/// Every sticker the pack lists must exist in the store and render; a
/// missing record or a failed render fails the export before anything
/// reaches the sink, so an error never leaves a partial bundle behind.
pub fn export_pack(store: &dyn Store, pack_id: Uuid, sink: &mut dyn BundleSink) -> Result<PackMeta> {
    let pack = store.require_pack(pack_id)?;
    let stickers = pack
        .sticker_ids
        .iter()
        .map(|&id| store.require_sticker(id))
        .collect::<Result<Vec<_>>>()?;
    let pngs = stickers
        .iter()
        .map(compositor::render_sticker_png)
        .collect::<Result<Vec<_>>>()?;

    let mut entries = Vec::with_capacity(stickers.len());
    let mut emojis = IndexMap::with_capacity(stickers.len());
    for sticker in &stickers {
        entries.push(StickerEntry {
            file: format!("{}.png", sticker.id),
            emoji: sticker.emoji.clone(),
        });
        emojis.insert(sticker.id, sticker.emoji.clone());
    }
    let meta = PackMeta {
        title: pack.title.clone(),
        author: pack.author.clone(),
        tags: pack.tags.clone(),
        stickers: entries,
        sticker_ids: pack.sticker_ids.clone(),
        emojis,
    };
    sink.add_file("meta.json", serde_json::to_string_pretty(&meta)?.as_bytes())?;

    for (sticker, png) in stickers.iter().zip(&pngs) {
        sink.add_file(&format!("stickers/{}.png", sticker.id), png)?;
    }

    info!(
        "Exported pack '{}' ({} stickers)",
        pack.file_stem(),
        stickers.len()
    );
    Ok(meta)
}
