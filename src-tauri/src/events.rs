use crate::controller::{Notice, ViewModel};
use screen_capture::SessionState;
use serde::Serialize;
use tauri::{AppHandle, Emitter};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

/// Emit recording status to frontend
pub fn emit_status(app: &AppHandle, state: SessionState) -> Result<(), String> {
    app.emit("recording-status", state)
        .map_err(|e| format!("Failed to emit status: {}", e))
}

/// Emit the re-rendered view
pub fn emit_view(app: &AppHandle, view: &ViewModel) -> Result<(), String> {
    app.emit("view-changed", view)
        .map_err(|e| format!("Failed to emit view-changed: {}", e))
}

/// Emit a transient notice (toast)
pub fn emit_notice(app: &AppHandle, notice: &Notice) -> Result<(), String> {
    app.emit("recording-notice", notice)
        .map_err(|e| format!("Failed to emit recording-notice: {}", e))
}

/// Emit error event to frontend
pub fn emit_error(app: &AppHandle, code: &str, message: &str) -> Result<(), String> {
    app.emit(
        "recording-error",
        ErrorEvent {
            code: code.to_string(),
            message: message.to_string(),
        },
    )
    .map_err(|e| format!("Failed to emit error: {}", e))
}
