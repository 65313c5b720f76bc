use crate::config::AppConfig;
use crate::controller::{Controller, Dispatch, UiEvent, UiUpdate, ViewModel};
use log::{info, warn};
use screen_capture::ffmpeg::{self, Ffmpeg, GrabInput};
use screen_capture::{CaptureSession, Host, ScreenMetrics};
use std::sync::{Mutex, MutexGuard};

/// Application state shared by commands, hotkey and window handlers
pub struct AppState {
    pub config: AppConfig,
    controller: Mutex<Controller>,
}

impl AppState {
    /// State backed by the ffmpeg desktop host, recording `screen`
    pub fn new(config: AppConfig, screen: ScreenMetrics) -> Self {
        let ffmpeg = Ffmpeg::new(config.ffmpeg_path.clone());
        if let Err(e) = ffmpeg.check() {
            // Recording will fail with a notice; the picker still works
            warn!("⚠️  {}", e);
        }

        let mut input = GrabInput::platform_default();
        if let Some(source) = &config.capture_input {
            input = input.with_source(source.clone());
        }

        let host = ffmpeg::desktop_host(ffmpeg, screen, input, config.output_folder.clone());
        Self::with_host(config, screen, host)
    }

    pub fn with_host(config: AppConfig, screen: ScreenMetrics, host: Host) -> Self {
        info!(
            "📁 Recordings go to {:?}, screen {}x{} @ {}dpi",
            config.output_folder, screen.width, screen.height, screen.density
        );
        let session = CaptureSession::new(screen, config.output_folder.clone(), host);
        Self {
            controller: Mutex::new(Controller::new(session)),
            config,
        }
    }

    pub fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Dispatch an event without holding the controller while a recording finalizes
    ///
    /// `on_saving` sees the intermediate view once a stop has begun.
    pub fn dispatch(&self, event: UiEvent, on_saving: impl FnOnce(&ViewModel)) -> UiUpdate {
        let step = self.controller().begin_dispatch(event);
        match step {
            Dispatch::Done(update) => update,
            Dispatch::Stopping { view, teardown } => {
                on_saving(&view);
                let report = teardown.run();
                self.controller().finish_stop(report)
            }
        }
    }
}
