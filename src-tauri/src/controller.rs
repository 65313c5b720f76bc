// UI controller
//
// Widget callbacks are turned into `UiEvent`s and dispatched here instead of
// mutating state inline. The controller owns the selected options and the
// capture session, and answers every event with a fresh view plus the side
// effects the shell has to carry out (consent prompt, permission request,
// transient notices).

use log::{debug, info, warn};
use screen_capture::{
    CaptureError, CaptureSession, ConsentResult, Geometry, PendingStop, RatioMode, RecordingOptions, ScreenMetrics,
    SessionState, SideBarColor, StopReport,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SelectRatio(RatioMode),
    SetSideBars(bool),
    SelectSideBarColor(SideBarColor),
    /// The start/stop button (or hotkey)
    RecordPressed,
    /// Explicit stop, e.g. the window is closing
    StopRequested,
    PermissionsResult(bool),
    ConsentResult(ConsentResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Info,
    Error,
}

/// Short transient message for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

pub const NOTICE_CAPABILITIES_REQUIRED: &str = "Capabilities required to record the screen";
pub const NOTICE_CAPTURE_CANCELLED: &str = "Screen capture cancelled";

/// Work the shell performs on behalf of the controller
#[derive(Debug, Clone, PartialEq)]
pub enum UiEffect {
    /// Ask the host for capabilities, answer with `PermissionsResult`
    RequestPermissions,
    /// Run the consent flow, answer with `ConsentResult`
    RequestConsent,
    Notify(Notice),
}

/// Everything the frontend renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub screen: ScreenMetrics,
    pub options: RecordingOptions,
    /// Side bar toggle and color only apply to 9:16
    pub side_bar_controls_enabled: bool,
    pub projected: Option<Geometry>,
    pub info_text: String,
    pub state: SessionState,
    pub recording: bool,
    pub status_label: String,
    pub button_label: String,
    pub last_recording: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiUpdate {
    pub view: ViewModel,
    pub effects: Vec<UiEffect>,
}

/// First half of a dispatch
pub enum Dispatch {
    Done(UiUpdate),
    /// A recording was stopped; run `teardown` (without holding the
    /// controller) and hand its report to `Controller::finish_stop`
    Stopping { view: ViewModel, teardown: PendingStop },
}

pub struct Controller {
    options: RecordingOptions,
    session: CaptureSession,
    last_recording: Option<PathBuf>,
}

impl Controller {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            options: RecordingOptions::default(),
            session,
            last_recording: None,
        }
    }

    pub fn options(&self) -> RecordingOptions {
        self.options
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    /// Ask the host permission system for the recording capabilities
    pub fn request_capabilities(&self) -> bool {
        self.session.request_capabilities()
    }

    pub fn view(&self) -> ViewModel {
        let screen = self.session.screen();
        let state = self.session.state();
        let (status_label, button_label) = match state {
            SessionState::Idle => ("Ready to record", "Start recording"),
            SessionState::AwaitingConsent => ("Waiting for screen capture permission...", "Start recording"),
            SessionState::Capturing => ("Recording...", "Stop recording"),
            SessionState::Stopping => ("Saving...", "Stop recording"),
        };

        ViewModel {
            screen,
            options: self.options,
            side_bar_controls_enabled: self.options.ratio == RatioMode::Tall9x16,
            projected: Geometry::compute(screen, &self.options).ok(),
            info_text: describe(screen, &self.options),
            state,
            recording: state == SessionState::Capturing,
            status_label: status_label.to_string(),
            button_label: button_label.to_string(),
            last_recording: self.last_recording.clone(),
        }
    }

    /// Handle an event to completion, including any stop teardown
    pub fn dispatch(&mut self, event: UiEvent) -> UiUpdate {
        match self.begin_dispatch(event) {
            Dispatch::Done(update) => update,
            Dispatch::Stopping { teardown, .. } => {
                let report = teardown.run();
                self.finish_stop(report)
            }
        }
    }

    /// Handle an event, but leave a stop's teardown to the caller
    pub fn begin_dispatch(&mut self, event: UiEvent) -> Dispatch {
        debug!("🖱️  {:?} while {:?}", event, self.session.state());

        let effects = match event {
            UiEvent::SelectRatio(ratio) => {
                self.options.ratio = ratio;
                Vec::new()
            }
            UiEvent::SetSideBars(enabled) => {
                self.options.side_bars_enabled = enabled;
                Vec::new()
            }
            UiEvent::SelectSideBarColor(color) => {
                self.options.side_bar_color = color;
                Vec::new()
            }
            UiEvent::RecordPressed => match self.session.state() {
                SessionState::Idle => {
                    if self.session.missing_capabilities().is_empty() {
                        self.begin()
                    } else {
                        vec![UiEffect::RequestPermissions]
                    }
                }
                SessionState::Capturing => return self.begin_stop(),
                SessionState::AwaitingConsent | SessionState::Stopping => Vec::new(),
            },
            UiEvent::StopRequested => return self.begin_stop(),
            UiEvent::PermissionsResult(true) => self.begin(),
            UiEvent::PermissionsResult(false) => {
                vec![UiEffect::Notify(Notice::error(NOTICE_CAPABILITIES_REQUIRED))]
            }
            UiEvent::ConsentResult(result) => self.on_consent(result),
        };

        Dispatch::Done(UiUpdate {
            view: self.view(),
            effects,
        })
    }

    /// Complete a stop started by `begin_dispatch`
    pub fn finish_stop(&mut self, report: StopReport) -> UiUpdate {
        self.session.finish_stop(&report);

        let mut effects = Vec::new();
        if let Some(path) = report.output_path {
            info!("💾 Recording finished after {:.1}s: {:?}", report.duration.as_secs_f32(), path);
            effects.push(UiEffect::Notify(Notice::info(format!("Video saved to {}", path.display()))));
            self.last_recording = Some(path);
        }

        UiUpdate {
            view: self.view(),
            effects,
        }
    }

    /// Stop whatever is running, used on application teardown
    pub fn shutdown(&mut self) {
        if self.session.state() != SessionState::Idle {
            self.dispatch(UiEvent::StopRequested);
        }
    }

    fn begin(&mut self) -> Vec<UiEffect> {
        match self.session.request_start(self.options) {
            Ok(()) => vec![UiEffect::RequestConsent],
            Err(CaptureError::CapabilityDenied(missing)) => {
                warn!("🔒 Cannot start, missing {:?}", missing);
                vec![UiEffect::Notify(Notice::error(NOTICE_CAPABILITIES_REQUIRED))]
            }
            Err(e) => {
                warn!("⚠️  Start ignored: {}", e);
                Vec::new()
            }
        }
    }

    fn on_consent(&mut self, result: ConsentResult) -> Vec<UiEffect> {
        match self.session.on_consent(result) {
            Ok(started) => {
                let geometry = started.geometry;
                vec![UiEffect::Notify(Notice::info(format!(
                    "Recording {}x{}",
                    geometry.recording_width, geometry.recording_height
                )))]
            }
            Err(CaptureError::ConsentDenied) => {
                vec![UiEffect::Notify(Notice::info(NOTICE_CAPTURE_CANCELLED))]
            }
            Err(e @ CaptureError::InvalidState { .. }) => {
                warn!("⚠️  Stale consent result: {}", e);
                Vec::new()
            }
            Err(e) => vec![UiEffect::Notify(Notice::error(format!("Could not start recording: {}", e)))],
        }
    }

    fn begin_stop(&mut self) -> Dispatch {
        match self.session.begin_stop() {
            Some(teardown) => Dispatch::Stopping {
                view: self.view(),
                teardown,
            },
            None => Dispatch::Done(UiUpdate {
                view: self.view(),
                effects: Vec::new(),
            }),
        }
    }
}

/// Informational text about the screen and the projected recording
pub fn describe(screen: ScreenMetrics, options: &RecordingOptions) -> String {
    let mut info = String::new();
    info.push_str("Screen info:\n");
    info.push_str(&format!("Dimensions: {}x{}\n", screen.width, screen.height));
    info.push_str(&format!("Ratio: {}\n\n", screen.ratio_label()));

    let geometry = match Geometry::compute(screen, options) {
        Ok(geometry) => geometry,
        Err(e) => {
            info.push_str(&format!("Recording resolution: unavailable ({})", e));
            return info;
        }
    };

    info.push_str(&format!(
        "Recording resolution: {}x{}\n",
        geometry.recording_width, geometry.recording_height
    ));

    match options.ratio {
        RatioMode::Tall9x16 if options.side_bars_enabled => {
            info.push_str(&format!("Side bar width: {}px per side\n", geometry.side_bar_width_px));
            if geometry.crops_content() {
                let mirror = geometry.mirror_viewport();
                info.push_str(&format!(
                    "Warning: the screen is taller than 9:16, so no side bars fit. The screen is scaled down to {}x{} with black bands above and below",
                    mirror.width, mirror.height
                ));
            } else {
                info.push_str(&format!(
                    "Result after trimming the bars: {}x{} (ideal for vertical video)",
                    screen.width, screen.height
                ));
            }
        }
        RatioMode::Tall9x16 => {
            info.push_str("Warning: video editors may add black bars to this recording");
        }
        RatioMode::Wide16x9 => {
            info.push_str("Ideal for YouTube and landscape platforms");
        }
        RatioMode::Square1x1 => {
            info.push_str("Ideal for square posts");
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use screen_capture::testing::FakePlatform;
    use screen_capture::Capability;

    fn controller(platform: &FakePlatform, width: u32, height: u32) -> Controller {
        let session = CaptureSession::new(
            ScreenMetrics::new(width, height, 420),
            platform.output_dir(),
            platform.host(),
        );
        Controller::new(session)
    }

    fn notices(update: &UiUpdate) -> Vec<String> {
        update
            .effects
            .iter()
            .filter_map(|effect| match effect {
                UiEffect::Notify(notice) => Some(notice.message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_option_events_update_view() {
        let platform = FakePlatform::new();
        let mut controller = controller(&platform, 1080, 1800);

        let update = controller.dispatch(UiEvent::SetSideBars(true));
        assert!(update.effects.is_empty());
        assert_eq!(update.view.projected.map(|g| (g.recording_width, g.recording_height)), Some((1200, 1920)));
        assert!(update.view.info_text.contains("Side bar width: 60px per side"));

        let update = controller.dispatch(UiEvent::SelectRatio(RatioMode::Square1x1));
        assert!(!update.view.side_bar_controls_enabled);
        assert!(update.view.info_text.contains("Recording resolution: 1080x1080"));

        controller.dispatch(UiEvent::SelectSideBarColor(SideBarColor::Gray));
        assert_eq!(controller.options().side_bar_color, SideBarColor::Gray);
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_full_recording_round() {
        let platform = FakePlatform::new();
        let mut controller = controller(&platform, 1080, 1920);

        let update = controller.dispatch(UiEvent::RecordPressed);
        assert_eq!(update.effects, vec![UiEffect::RequestConsent]);
        assert_eq!(update.view.state, SessionState::AwaitingConsent);

        // A second press while the prompt is open does nothing
        assert!(controller.dispatch(UiEvent::RecordPressed).effects.is_empty());

        let update = controller.dispatch(UiEvent::ConsentResult(ConsentResult::granted()));
        assert!(update.view.recording);
        assert_eq!(update.view.button_label, "Stop recording");
        assert_eq!(notices(&update), vec!["Recording 1080x1920"]);

        let update = controller.dispatch(UiEvent::RecordPressed);
        assert!(!update.view.recording);
        assert_eq!(update.view.button_label, "Start recording");
        let saved = update.view.last_recording.clone().unwrap();
        assert_eq!(notices(&update), vec![format!("Video saved to {}", saved.display())]);
    }

    #[test]
    fn test_missing_capabilities_requested_first() {
        let platform = FakePlatform::new().deny(Capability::RecordAudio).grant_on_request();
        let mut controller = controller(&platform, 1080, 1920);

        let update = controller.dispatch(UiEvent::RecordPressed);
        assert_eq!(update.effects, vec![UiEffect::RequestPermissions]);
        assert_eq!(update.view.state, SessionState::Idle);

        let granted = controller.request_capabilities();
        assert!(granted);
        let update = controller.dispatch(UiEvent::PermissionsResult(granted));
        assert_eq!(update.effects, vec![UiEffect::RequestConsent]);
    }

    #[test]
    fn test_denied_capabilities_notify() {
        let platform = FakePlatform::new().deny(Capability::WriteStorage);
        let mut controller = controller(&platform, 1080, 1920);

        assert!(!controller.request_capabilities());
        let update = controller.dispatch(UiEvent::PermissionsResult(false));
        assert_eq!(notices(&update), vec![NOTICE_CAPABILITIES_REQUIRED]);
        assert_eq!(update.view.state, SessionState::Idle);

        // Even a forged "granted" answer cannot get past the session's own check
        let update = controller.dispatch(UiEvent::PermissionsResult(true));
        assert_eq!(notices(&update), vec![NOTICE_CAPABILITIES_REQUIRED]);
        assert_eq!(update.view.state, SessionState::Idle);
    }

    #[test]
    fn test_consent_cancelled_notifies_and_idles() {
        let platform = FakePlatform::new();
        let mut controller = controller(&platform, 1080, 1920);

        controller.dispatch(UiEvent::RecordPressed);
        let update = controller.dispatch(UiEvent::ConsentResult(ConsentResult::cancelled()));
        assert_eq!(notices(&update), vec![NOTICE_CAPTURE_CANCELLED]);
        assert_eq!(update.view.state, SessionState::Idle);
        assert!(update.view.last_recording.is_none());
    }

    #[test]
    fn test_setup_failure_is_reported_not_fatal() {
        let platform = FakePlatform::new().fail_on("encoder.start");
        let mut controller = controller(&platform, 1080, 1920);

        controller.dispatch(UiEvent::RecordPressed);
        let update = controller.dispatch(UiEvent::ConsentResult(ConsentResult::granted()));
        let messages = notices(&update);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Could not start recording"));
        assert_eq!(update.view.state, SessionState::Idle);
    }

    #[test]
    fn test_shutdown_stops_recording() {
        let platform = FakePlatform::new().fail_on("display.release");
        let mut controller = controller(&platform, 1080, 1920);

        controller.dispatch(UiEvent::RecordPressed);
        controller.dispatch(UiEvent::ConsentResult(ConsentResult::granted()));
        controller.shutdown();
        assert_eq!(controller.session().state(), SessionState::Idle);
        assert!(platform.calls().contains(&"projection.stop".to_string()));
    }

    #[test]
    fn test_stop_teardown_runs_outside_the_controller() {
        let platform = FakePlatform::new();
        let mut controller = controller(&platform, 1080, 1920);
        controller.dispatch(UiEvent::RecordPressed);
        controller.dispatch(UiEvent::ConsentResult(ConsentResult::granted()));
        platform.clear_calls();

        let Dispatch::Stopping { view, teardown } = controller.begin_dispatch(UiEvent::StopRequested) else {
            panic!("stopping a recording must hand back its teardown");
        };
        assert_eq!(view.state, SessionState::Stopping);
        assert_eq!(view.status_label, "Saving...");
        assert!(platform.calls().is_empty());

        // The controller keeps answering while the file is finalized
        let update = controller.dispatch(UiEvent::SelectRatio(RatioMode::Wide16x9));
        assert_eq!(update.view.state, SessionState::Stopping);
        assert!(controller.dispatch(UiEvent::RecordPressed).effects.is_empty());

        let update = controller.finish_stop(teardown.run());
        assert_eq!(update.view.state, SessionState::Idle);
        assert_eq!(platform.calls().len(), 4);
        let saved = update.view.last_recording.clone().unwrap();
        assert_eq!(notices(&update), vec![format!("Video saved to {}", saved.display())]);
    }

    #[test]
    fn test_describe_negative_side_bars() {
        let options = RecordingOptions {
            ratio: RatioMode::Tall9x16,
            side_bars_enabled: true,
            side_bar_color: SideBarColor::Black,
        };
        let text = describe(ScreenMetrics::new(1080, 2400, 420), &options);
        assert!(text.contains("Dimensions: 1080x2400"));
        assert!(text.contains("Ratio: 20.0:9"));
        assert!(text.contains("Recording resolution: 600x1920"));
        assert!(text.contains("Side bar width: -240px per side"));
        assert!(text.contains("scaled down to 600x1333 with black bands above and below"));
        assert!(!text.contains("cropped"));
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let platform = FakePlatform::new();
        let controller = controller(&platform, 1080, 1920);
        let json = serde_json::to_value(controller.view()).unwrap();
        assert_eq!(json["options"]["ratio"], "tall9x16");
        assert_eq!(json["options"]["sideBarColor"], "black");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["projected"]["recordingWidth"], 1080);
        assert_eq!(json["buttonLabel"], "Start recording");
    }
}
