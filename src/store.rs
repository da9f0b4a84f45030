//! Persistence seam for packs and stickers.
//!
//! The engine talks to a key-value collaborator through [`Store`]: records
//! keyed by id, `get` returning `None` for missing keys, `delete`
//! idempotent. [`MemoryStore`] backs sessions and tests; [`JsonStore`]
//! keeps everything in one pretty-printed JSON file so the CLI can operate
//! headlessly, persisting on every mutation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::entities::pack::Pack;
use crate::entities::sticker::Sticker;
use crate::error::{Result, StickerError};

/// Key-value persistence for packs and stickers.
pub trait Store: Send {
    fn get_pack(&self, id: Uuid) -> Result<Option<Pack>>;
    fn put_pack(&mut self, pack: &Pack) -> Result<()>;
    fn delete_pack(&mut self, id: Uuid) -> Result<()>;
    /// All packs in insertion order.
    fn list_packs(&self) -> Result<Vec<Pack>>;

    fn get_sticker(&self, id: Uuid) -> Result<Option<Sticker>>;
    fn put_sticker(&mut self, sticker: &Sticker) -> Result<()>;
    fn delete_sticker(&mut self, id: Uuid) -> Result<()>;
    /// All stickers in insertion order.
    fn list_stickers(&self) -> Result<Vec<Sticker>>;

    /// Like [`Store::get_pack`] but missing ids are an error.
    fn require_pack(&self, id: Uuid) -> Result<Pack> {
        self.get_pack(id)?.ok_or(StickerError::PackNotFound(id))
    }

    /// Like [`Store::get_sticker`] but missing ids are an error.
    fn require_sticker(&self, id: Uuid) -> Result<Sticker> {
        self.get_sticker(id)?
            .ok_or(StickerError::StickerNotFound(id))
    }
}

/// Remove a sticker from a pack and delete its record.
///
/// The sticker record is deleted even when the pack did not list it, so a
/// half-removed sticker from an earlier interrupted call cannot linger.
pub fn remove_sticker(store: &mut dyn Store, pack_id: Uuid, sticker_id: Uuid) -> Result<()> {
    let mut pack = store.require_pack(pack_id)?;
    if pack.remove_sticker(sticker_id) {
        store.put_pack(&pack)?;
    }
    store.delete_sticker(sticker_id)
}

/// In-memory store, insertion-ordered.
#[derive(Default)]
pub struct MemoryStore {
    packs: IndexMap<Uuid, Pack>,
    stickers: IndexMap<Uuid, Sticker>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_pack(&self, id: Uuid) -> Result<Option<Pack>> {
        Ok(self.packs.get(&id).cloned())
    }

    fn put_pack(&mut self, pack: &Pack) -> Result<()> {
        self.packs.insert(pack.id, pack.clone());
        Ok(())
    }

    fn delete_pack(&mut self, id: Uuid) -> Result<()> {
        self.packs.shift_remove(&id);
        Ok(())
    }

    fn list_packs(&self) -> Result<Vec<Pack>> {
        Ok(self.packs.values().cloned().collect())
    }

    fn get_sticker(&self, id: Uuid) -> Result<Option<Sticker>> {
        Ok(self.stickers.get(&id).cloned())
    }

    fn put_sticker(&mut self, sticker: &Sticker) -> Result<()> {
        self.stickers.insert(sticker.id, sticker.clone());
        Ok(())
    }

    fn delete_sticker(&mut self, id: Uuid) -> Result<()> {
        self.stickers.shift_remove(&id);
        Ok(())
    }

    fn list_stickers(&self) -> Result<Vec<Sticker>> {
        Ok(self.stickers.values().cloned().collect())
    }
}

/// On-disk record shape of a [`JsonStore`] file.
#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    packs: Vec<Pack>,
    stickers: Vec<Sticker>,
}

/// Single-file JSON store.
///
/// The whole store is loaded at open and rewritten on every mutation, so
/// each `put` is a durable checkpoint.
pub struct JsonStore {
    path: PathBuf,
    packs: IndexMap<Uuid, Pack>,
    stickers: IndexMap<Uuid, Sticker>,
}

impl JsonStore {
    /// Open a store file, creating an empty store if the file is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                packs: IndexMap::new(),
                stickers: IndexMap::new(),
            });
        }
        let file = Self::from_json(&path)?;
        Ok(Self {
            path,
            packs: file.packs.into_iter().map(|p| (p.id, p)).collect(),
            stickers: file.stickers.into_iter().map(|s| (s.id, s)).collect(),
        })
    }

    /// Path the store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn from_json(path: &Path) -> Result<StoreFile> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn to_json(&self) -> Result<()> {
        let file = StoreFile {
            packs: self.packs.values().cloned().collect(),
            stickers: self.stickers.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn get_pack(&self, id: Uuid) -> Result<Option<Pack>> {
        Ok(self.packs.get(&id).cloned())
    }

    fn put_pack(&mut self, pack: &Pack) -> Result<()> {
        self.packs.insert(pack.id, pack.clone());
        self.to_json()
    }

    fn delete_pack(&mut self, id: Uuid) -> Result<()> {
        if self.packs.shift_remove(&id).is_some() {
            self.to_json()?;
        }
        Ok(())
    }

    fn list_packs(&self) -> Result<Vec<Pack>> {
        Ok(self.packs.values().cloned().collect())
    }

    fn get_sticker(&self, id: Uuid) -> Result<Option<Sticker>> {
        Ok(self.stickers.get(&id).cloned())
    }

    fn put_sticker(&mut self, sticker: &Sticker) -> Result<()> {
        self.stickers.insert(sticker.id, sticker.clone());
        self.to_json()
    }

    fn delete_sticker(&mut self, id: Uuid) -> Result<()> {
        if self.stickers.shift_remove(&id).is_some() {
            self.to_json()?;
        }
        Ok(())
    }

    fn list_stickers(&self) -> Result<Vec<Sticker>> {
        Ok(self.stickers.values().cloned().collect())
    }
}
