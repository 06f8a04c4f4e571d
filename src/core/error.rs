use std::path::PathBuf;
use thiserror::Error;

use crate::playback::pool::MAX_SLOTS;

#[derive(Debug, Error)]
pub enum ShuffleError {
    #[error("media folder not found or not a directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("video count {0} is outside 1..={max}", max = MAX_SLOTS)]
    InvalidCount(usize),

    #[error("slot {slot} is outside the active grid of {count}")]
    InvalidSlot { slot: usize, count: usize },

    #[error("no catalog entry at index {0}")]
    UnknownMedia(usize),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failures raised by a player backend. Load and playback failures are
/// isolated to one slot; `RuntimeUnavailable` is the only fatal one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("media runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("failed to load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("failed to start decoder: {0}")]
    Spawn(String),

    #[error("playback worker for slot {0} is gone")]
    Disconnected(usize),
}

/// Non-fatal: the catalog holds fewer files than the grid has slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("only {available} playable file(s) for {requested} slot(s)")]
pub struct InsufficientMedia {
    pub requested: usize,
    pub available: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ShuffleError::InvalidCount(12);
        assert_eq!(err.to_string(), "video count 12 is outside 1..=9");

        let err = ShuffleError::InvalidSlot { slot: 4, count: 2 };
        assert_eq!(err.to_string(), "slot 4 is outside the active grid of 2");

        let warning = InsufficientMedia { requested: 4, available: 1 };
        assert_eq!(warning.to_string(), "only 1 playable file(s) for 4 slot(s)");
    }

    #[test]
    fn test_backend_error_converts() {
        let err: ShuffleError = BackendError::Spawn("no such file".to_string()).into();
        assert!(matches!(err, ShuffleError::Backend(BackendError::Spawn(_))));
    }
}
