//! Content effects for layers.
//!
//! Effects rewrite a layer's `content` payload and never touch geometry:
//! the crop window keeps addressing the replaced image, which always has
//! the intrinsic size of the original.
//!
//! Two effects exist:
//! - [`outline`]: pure stroke behind the subject, self-contained.
//! - [`background`]: background removal through a pluggable segmentation
//!   collaborator, degrading to the original content on any failure.
//!
//! # Async shape
//!
//! Effects run on the worker pool. Each launched effect hands back an
//! [`EffectTask`] carrying the target layer id and a completion receiver;
//! the session polls its outstanding handles and applies replacement
//! content on the main thread. The set of layers with an effect in flight
//! is exactly the set of outstanding handles, and dropping a handle
//! discards the eventual result without touching the layer.

pub mod background;
pub mod outline;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use image::Rgba;
use log::warn;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::layer::Layer;
use crate::workers::Workers;

pub use background::{remove_layer_background, BackgroundRemover};

/// Result of a finished effect job.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectOutcome {
    /// The effect produced a replacement content payload.
    Replaced(String),
    /// The effect declined or failed; the layer keeps its content.
    Unchanged,
}

/// Handle for one effect running on the worker pool.
pub struct EffectTask {
    layer_id: Uuid,
    rx: Receiver<EffectOutcome>,
}

impl EffectTask {
    /// Layer the effect will rewrite.
    pub fn layer_id(&self) -> Uuid {
        self.layer_id
    }

    /// Non-blocking completion check.
    ///
    /// Returns the outcome once the job has finished. A job lost to a
    /// worker panic reports [`EffectOutcome::Unchanged`], so the in-flight
    /// marker always clears.
    pub fn try_complete(&self) -> Option<EffectOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(EffectOutcome::Unchanged),
        }
    }
}

/// Launch background removal for a layer.
pub fn spawn_background_removal(
    workers: &Workers,
    layer: &Layer,
    remover: Arc<dyn BackgroundRemover>,
) -> EffectTask {
    let content = layer.content.clone();
    let (tx, rx) = bounded(1);
    workers.execute(move || {
        let outcome = match background::removed_content(&content, remover.as_ref()) {
            Some(url) => EffectOutcome::Replaced(url),
            None => EffectOutcome::Unchanged,
        };
        let _ = tx.send(outcome);
    });
    EffectTask {
        layer_id: layer.id,
        rx,
    }
}

/// Launch the outline effect for a layer.
pub fn spawn_outline(
    workers: &Workers,
    layer: &Layer,
    color: Rgba<u8>,
    thickness: u32,
) -> EffectTask {
    let content = layer.content.clone();
    let (tx, rx) = bounded(1);
    workers.execute(move || {
        let outcome = match outline::outlined_content(&content, color, thickness) {
            Ok(url) => EffectOutcome::Replaced(url),
            Err(e) => {
                warn!("Outline effect failed: {}", e);
                EffectOutcome::Unchanged
            }
        };
        let _ = tx.send(outcome);
    });
    EffectTask {
        layer_id: layer.id,
        rx,
    }
}
