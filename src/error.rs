//! Central error types for the overlay host.
//!
//! Only GPU initialization errors ever reach the caller as a failed start.
//! Everything else is logged by the worker and retried, so most variants here
//! carry enough context (operation name, runtime error code) to make a log
//! line useful on its own. All errors implement `Serialize` for host IPC.

use serde::Serialize;
use thiserror::Error;

use crate::overlay::OverlayAnchor;

/// Main error type for overlay operations.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Direct3D device or texture creation/upload failed
    #[error("GPU error: {0}")]
    Gpu(String),

    /// The VR runtime could not be initialized (not installed, not running)
    #[error("VR runtime init failed with code {code}")]
    RuntimeInit { code: i32 },

    /// A compositor call returned an error code
    #[error("{op} failed with overlay error {code}")]
    Compositor { op: &'static str, code: i32 },

    /// The device an overlay is attached to is not currently tracked
    #[error("Anchor device unavailable: {0:?}")]
    AnchorUnavailable(OverlayAnchor),

    /// The current platform has no native backend
    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// Worker thread could not be spawned or died unexpectedly
    #[error("Worker error: {0}")]
    Worker(String),

    /// Companion application could not be resolved or spawned
    #[error("Launch error: {0}")]
    Launch(String),

    /// File system error (config, logs)
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl OverlayError {
    /// Shorthand for a failed compositor call.
    pub fn compositor(op: &'static str, code: impl Into<i64>) -> Self {
        let code = code.into();
        OverlayError::Compositor {
            op,
            code: i32::try_from(code).unwrap_or(i32::MAX),
        }
    }
}

/// Serialize as the error message string, so a host binding can hand it
/// straight to the calling application.
impl Serialize for OverlayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context lazily (only evaluated on error), converting the error to
    /// OverlayError::Other.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> OverlayResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> OverlayResult<T> {
        self.map_err(|e| OverlayError::Other(format!("{}: {}", f(), e)))
    }
}

/// Type alias for Results using OverlayError.
pub type OverlayResult<T> = Result<T, OverlayError>;
