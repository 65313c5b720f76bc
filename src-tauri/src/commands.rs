use crate::controller::{NoticeKind, UiEffect, UiEvent, ViewModel};
use crate::events;
use crate::state::AppState;
use log::{info, warn};
use screen_capture::{ConsentResult, RatioMode, SideBarColor};
use tauri::{AppHandle, Manager, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_opener::OpenerExt;

/// Run one event through the controller, publish the new view and carry out the effects
///
/// The controller lock is only held while the event is applied. A stopped
/// recording finalizes without it, so option changes and `get_view` stay
/// responsive, and effects may dispatch again from another thread.
pub fn dispatch(app: &AppHandle, event: UiEvent) -> ViewModel {
    let update = app.state::<AppState>().dispatch(event, |saving| publish(app, saving));
    publish(app, &update.view);

    for effect in update.effects {
        run_effect(app, effect);
    }
    update.view
}

fn publish(app: &AppHandle, view: &ViewModel) {
    if let Err(e) = events::emit_view(app, view) {
        warn!("⚠️  {}", e);
    }
    if let Err(e) = events::emit_status(app, view.state) {
        warn!("⚠️  {}", e);
    }
}

fn run_effect(app: &AppHandle, effect: UiEffect) {
    match effect {
        UiEffect::Notify(notice) => {
            if let Err(e) = events::emit_notice(app, &notice) {
                warn!("⚠️  {}", e);
            }
            if notice.kind == NoticeKind::Error {
                let _ = events::emit_error(app, "RECORDING_ERROR", &notice.message);
            }
        }
        UiEffect::RequestPermissions => {
            let app = app.clone();
            std::thread::spawn(move || {
                let granted = app.state::<AppState>().controller().request_capabilities();
                info!("🔒 Capability request answered: granted={}", granted);
                dispatch(&app, UiEvent::PermissionsResult(granted));
            });
        }
        UiEffect::RequestConsent => request_consent(app),
    }
}

/// Ask the user before mirroring the screen; the answer arrives asynchronously
fn request_consent(app: &AppHandle) {
    let handle = app.clone();
    app.dialog()
        .message("Ratio Recorder will capture everything shown on your screen until you stop the recording.")
        .title("Start screen capture?")
        .kind(MessageDialogKind::Warning)
        .buttons(MessageDialogButtons::OkCancelCustom("Start now".to_string(), "Cancel".to_string()))
        .show(move |confirmed| {
            let result = if confirmed {
                ConsentResult::granted()
            } else {
                ConsentResult::cancelled()
            };
            // Starting spawns the grabber and encoder, keep that off the dialog callback
            std::thread::spawn(move || {
                dispatch(&handle, UiEvent::ConsentResult(result));
            });
        });
}

#[tauri::command]
pub fn get_view(state: State<'_, AppState>) -> Result<ViewModel, String> {
    Ok(state.controller().view())
}

#[tauri::command]
pub fn select_ratio(app: AppHandle, ratio: RatioMode) -> Result<ViewModel, String> {
    Ok(dispatch(&app, UiEvent::SelectRatio(ratio)))
}

#[tauri::command]
pub fn set_side_bars(app: AppHandle, enabled: bool) -> Result<ViewModel, String> {
    Ok(dispatch(&app, UiEvent::SetSideBars(enabled)))
}

#[tauri::command]
pub fn select_side_bar_color(app: AppHandle, color: SideBarColor) -> Result<ViewModel, String> {
    Ok(dispatch(&app, UiEvent::SelectSideBarColor(color)))
}

/// Start/stop button
#[tauri::command]
pub async fn toggle_recording(app: AppHandle) -> Result<ViewModel, String> {
    tokio::task::spawn_blocking(move || dispatch(&app, UiEvent::RecordPressed))
        .await
        .map_err(|e| format!("Recording task failed: {}", e))
}

/// Stopping waits for the encoder to finalize the file
#[tauri::command]
pub async fn stop_recording(app: AppHandle) -> Result<ViewModel, String> {
    tokio::task::spawn_blocking(move || dispatch(&app, UiEvent::StopRequested))
        .await
        .map_err(|e| format!("Stop task failed: {}", e))
}

#[tauri::command]
pub fn open_output_folder(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    let folder = &state.config.output_folder;
    std::fs::create_dir_all(folder).map_err(|e| format!("Failed to create output folder: {}", e))?;

    info!("📂 Opening {:?}", folder);
    app.opener()
        .open_path(folder.to_string_lossy(), None::<&str>)
        .map_err(|e| format!("Failed to open folder: {}", e))
}
