//! Engine-wide error types.
//!
//! Geometry never fails: out-of-range drags are clamped inside the transform
//! functions. Errors come from asset decoding, persistence and export.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the sticker engine.
#[derive(Error, Debug)]
pub enum StickerError {
    /// Image payload could not be decoded (bad data URL, unsupported format).
    /// Layer creation fails as a whole: no partially-initialized layer exists.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Raster could not be encoded for storage or export.
    #[error("Encode error: {0}")]
    Encode(#[from] image::ImageError),

    /// Persistence backend rejected the operation. In-memory state stays
    /// valid; the caller decides whether to retry.
    #[error("Store error: {0}")]
    Store(String),

    /// A background-removal collaborator reported a failure. Callers degrade
    /// to the original layer content instead of surfacing this to the user.
    #[error("Effect error: {0}")]
    Effect(String),

    /// The requested sticker does not exist in the store.
    #[error("Sticker not found: {0}")]
    StickerNotFound(Uuid),

    /// The requested pack does not exist in the store.
    #[error("Pack not found: {0}")]
    PackNotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StickerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let id = Uuid::nil();
        let err = StickerError::StickerNotFound(id);
        assert!(err.to_string().contains("Sticker not found"));

        let err = StickerError::Decode("not a data URL".to_string());
        assert_eq!(err.to_string(), "Decode error: not a data URL");
    }
}
