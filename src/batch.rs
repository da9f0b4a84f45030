//! Pack-wide background removal.
//!
//! Walks every sticker of a pack and strips the background from each of
//! its layers, strictly sequentially: one sticker at a time, one layer at
//! a time. Each sticker is persisted right after its last layer, so an
//! interrupted run loses at most the sticker in progress. A processing
//! flag makes a second start a no-op while a run is active.

use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::entities::effects::background::{remove_layer_background, BackgroundRemover};
use crate::error::Result;
use crate::store::Store;

/// Per-sticker progress report, emitted after the checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based position in the pack.
    pub index: usize,
    pub total: usize,
    pub sticker_id: Uuid,
    /// Layers whose content changed on this sticker.
    pub layers_changed: usize,
}

/// What a batch run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// False when another run already held the processing flag.
    pub started: bool,
    pub stickers_done: usize,
    pub layers_changed: usize,
}

/// Clears the processing flag on every exit path, including panics.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sequential background removal over a pack.
///
/// Share one instance between the UI and the thread running the batch;
/// the flag is what makes the second button press a no-op.
#[derive(Default)]
pub struct BatchRemover {
    processing: AtomicBool,
}

impl BatchRemover {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a run is active.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Run the batch, reporting per-sticker progress to `progress`.
    ///
    /// Stickers listed by the pack but missing from the store are skipped
    /// with a warning. A persistence failure stops the run and propagates;
    /// checkpoints already written survive and the flag returns to idle.
    pub fn run_with_progress<F>(
        &self,
        store: &mut dyn Store,
        pack_id: Uuid,
        remover: &dyn BackgroundRemover,
        mut progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(BatchProgress),
    {
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Batch background removal already running, ignoring start");
            return Ok(BatchReport::default());
        }
        let _guard = FlagGuard(&self.processing);

        let pack = store.require_pack(pack_id)?;
        let total = pack.sticker_ids.len();
        info!(
            "Batch background removal over pack {} ({} stickers)",
            pack_id, total
        );

        let mut report = BatchReport {
            started: true,
            ..Default::default()
        };
        for (i, &sticker_id) in pack.sticker_ids.iter().enumerate() {
            let Some(mut sticker) = store.get_sticker(sticker_id)? else {
                warn!("Pack lists missing sticker {}, skipping", sticker_id);
                continue;
            };

            let mut layers_changed = 0;
            for layer in &mut sticker.layers {
                if remove_layer_background(layer, remover) {
                    layers_changed += 1;
                }
            }

            // Checkpoint: later failures must not lose this sticker
            store.put_sticker(&sticker)?;
            report.stickers_done += 1;
            report.layers_changed += layers_changed;
            info!(
                "Sticker {}/{} done ({} layers changed)",
                i + 1,
                total,
                layers_changed
            );
            progress(BatchProgress {
                index: i + 1,
                total,
                sticker_id,
                layers_changed,
            });
        }

        Ok(report)
    }

    /// [`BatchRemover::run_with_progress`] without an observer.
    pub fn run(
        &self,
        store: &mut dyn Store,
        pack_id: Uuid,
        remover: &dyn BackgroundRemover,
    ) -> Result<BatchReport> {
        self.run_with_progress(store, pack_id, remover, |_| {})
    }
}
