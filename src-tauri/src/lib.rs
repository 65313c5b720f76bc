pub mod config;
pub mod controller;
pub mod logging;
pub mod state;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod events;
#[cfg(feature = "desktop")]
mod hotkey;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use config::AppConfig;
    use log::{info, warn};
    use state::AppState;
    use tauri::{Manager, WindowEvent};

    let config = AppConfig::from_env();
    logging::init(config.log_level);
    info!("🚀 Ratio Recorder starting");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::get_view,
            commands::select_ratio,
            commands::set_side_bars,
            commands::select_side_bar_color,
            commands::toggle_recording,
            commands::stop_recording,
            commands::open_output_folder,
        ])
        .setup(move |app| {
            let screen = config.resolve_screen(detect_screen(app.handle()));
            app.manage(AppState::new(config, screen));

            if let Err(e) = hotkey::setup_global_shortcut(app.handle()) {
                // The buttons still work without it
                warn!("⚠️  Failed to register global shortcut: {}", e);
            }
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                info!("🛑 Window destroyed, stopping any capture");
                if let Some(state) = window.try_state::<AppState>() {
                    state.controller().shutdown();
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

/// Native size of the primary monitor, in physical pixels
#[cfg(feature = "desktop")]
fn detect_screen(app: &tauri::AppHandle) -> Option<screen_capture::ScreenMetrics> {
    use log::{info, warn};

    match app.primary_monitor() {
        Ok(Some(monitor)) => {
            let size = monitor.size();
            let screen = config::screen_from_monitor(size.width, size.height, monitor.scale_factor());
            info!("🖥️  Primary monitor: {}x{} (scale {})", size.width, size.height, monitor.scale_factor());
            screen
        }
        Ok(None) => {
            warn!("⚠️  No primary monitor reported");
            None
        }
        Err(e) => {
            warn!("⚠️  Failed to query primary monitor: {}", e);
            None
        }
    }
}
