// Error kinds for capture sessions and the host platform behind them

use crate::platform::Capability;
use crate::session::SessionState;

/// Result alias used throughout the crate
pub type CaptureResult<T> = Result<T, CaptureError>;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// One or more runtime capabilities were not granted
    #[error("capabilities not granted: {0:?}")]
    CapabilityDenied(Vec<Capability>),

    /// The user declined (or cancelled) the screen capture consent flow
    #[error("screen capture consent denied")]
    ConsentDenied,

    #[error("encoder setup failed: {0}")]
    EncoderSetupFailed(String),

    /// The projection or its virtual display could not be created
    #[error("screen capture failed: {0}")]
    CaptureFailed(String),

    /// A resource refused to release during teardown
    #[error("release failed: {0}")]
    ReleaseFailed(String),

    #[error("invalid recording geometry {width}x{height}")]
    InvalidGeometry { width: i64, height: i64 },

    #[error("cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
