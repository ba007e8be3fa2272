//! Error taxonomy for the store and the sync protocol.
//!
//! Nothing here is fatal to a running session: store outages degrade to
//! local-only mode, rejected saves leave the file dirty for a manual
//! retry, and parse failures reject the edit while retaining prior state.
//! Conflicts are deliberately not errors - they are reported through
//! `PollOutcome` and never resolved destructively.

use crate::svg::SvgError;
use thiserror::Error;

/// Failures of the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend absent or unreachable; the session falls back to
    /// local-only mode.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Content lacks a drawing marker, or the file name is unsafe.
    #[error("invalid SVG content or filename")]
    InvalidContent,

    /// Name or content missing from a save request.
    #[error("missing file name or content")]
    MissingData,

    #[error("store io error")]
    Io(#[from] std::io::Error),
}

/// Failures of session-level operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Markup(#[from] SvgError),

    #[error("unknown file `{0}`")]
    UnknownFile(String),

    #[error("role `{0}` is not in the palette")]
    UnknownRole(String),

    #[error("shape index {0} out of range")]
    UnknownShape(usize),
}
