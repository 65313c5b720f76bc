// Global start/stop hotkey

use crate::commands;
use crate::controller::UiEvent;
use log::info;
use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};

/// Cmd+Shift+R on macOS, Ctrl+Shift+R elsewhere
pub const TOGGLE_SHORTCUT: &str = "CmdOrCtrl+Shift+R";

/// Register the toggle shortcut; it behaves exactly like the record button
pub fn setup_global_shortcut(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let shortcut: Shortcut = TOGGLE_SHORTCUT.parse()?;

    app.global_shortcut().on_shortcut(shortcut, |app, _shortcut, event| {
        if !matches!(event.state, ShortcutState::Pressed) {
            return;
        }

        info!("⌨️  {} pressed", TOGGLE_SHORTCUT);
        let app = app.clone();
        std::thread::spawn(move || {
            commands::dispatch(&app, UiEvent::RecordPressed);
        });
    })?;

    info!("✅ Global shortcut {} registered", TOGGLE_SHORTCUT);
    Ok(())
}
