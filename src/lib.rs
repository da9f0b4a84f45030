//! STICKERLAB - Sticker composition engine library
//!
//! Re-exports all modules for use by binary targets.

// Engine (document model, rendering, editing)
pub mod batch;
pub mod entities;
pub mod session;
pub mod workers;

// App modules
pub mod cli;
pub mod error;
pub mod export;
pub mod store;

// Re-export commonly used types
pub use entities::{Layer, Pack, Sticker};
pub use error::{Result, StickerError};
pub use session::EditorSession;
pub use store::{JsonStore, MemoryStore, Store};
