// Capture session state machine
//
// Idle → AwaitingConsent → Capturing → Stopping → Idle
//
// One session records at a time. All transitions happen through `&mut self`,
// callers that share a session across threads wrap it in a Mutex.

use crate::encoder::{EncoderConfig, EncoderFactory, EncoderSink};
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::{Geometry, RecordingOptions, ScreenMetrics};
use crate::output;
use crate::platform::{
    Capability, CaptureProvider, ConsentResult, ConsentToken, DisplayFlags, DisplaySpec, PermissionGate, Projection,
    VirtualDisplay, REQUIRED_CAPABILITIES,
};
use chrono::Local;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    AwaitingConsent,
    Capturing,
    Stopping,
}

/// The host subsystems a session drives
pub struct Host {
    pub permissions: Box<dyn PermissionGate>,
    pub capture: Box<dyn CaptureProvider>,
    pub encoders: Box<dyn EncoderFactory>,
}

/// Returned once a recording is running
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingStarted {
    pub geometry: Geometry,
    pub output_path: PathBuf,
}

/// Outcome of a stop request; teardown failures are reported, never raised
#[derive(Debug, Default)]
pub struct StopReport {
    /// File written by the stopped recording, if one was running
    pub output_path: Option<PathBuf>,
    pub duration: Duration,
    pub release_failures: Vec<CaptureError>,
}

impl StopReport {
    pub fn was_recording(&self) -> bool {
        self.output_path.is_some()
    }
}

/// Handles owned by a session, released strictly in field order
#[derive(Default)]
struct Resources {
    encoder: Option<Box<dyn EncoderSink>>,
    encoder_started: bool,
    display: Option<Box<dyn VirtualDisplay>>,
    projection: Option<Box<dyn Projection>>,
}

impl Resources {
    /// encoder → virtual display → projection (consent token); never stops early
    fn teardown(&mut self) -> Vec<CaptureError> {
        let mut failures = Vec::new();

        if let Some(mut encoder) = self.encoder.take() {
            if self.encoder_started {
                if let Err(e) = encoder.stop() {
                    failures.push(release_failed("encoder stop", e));
                }
            }
            if let Err(e) = encoder.release() {
                failures.push(release_failed("encoder release", e));
            }
        }
        self.encoder_started = false;

        if let Some(mut display) = self.display.take() {
            if let Err(e) = display.release() {
                failures.push(release_failed("virtual display release", e));
            }
        }

        if let Some(mut projection) = self.projection.take() {
            if let Err(e) = projection.stop() {
                failures.push(release_failed("projection stop", e));
            }
        }

        failures
    }
}

/// Resources of a stopped recording, waiting to be released
pub struct PendingStop {
    output_path: PathBuf,
    started_at: Instant,
    resources: Resources,
}

impl PendingStop {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Release in teardown order; blocks while the encoder finalizes the file
    pub fn run(mut self) -> StopReport {
        let release_failures = self.resources.teardown();
        for failure in &release_failures {
            warn!("⚠️  {}", failure);
        }
        StopReport {
            output_path: Some(self.output_path),
            duration: self.started_at.elapsed(),
            release_failures,
        }
    }
}

struct ActiveCapture {
    geometry: Geometry,
    output_path: PathBuf,
    started_at: Instant,
    resources: Resources,
}

pub struct CaptureSession {
    screen: ScreenMetrics,
    output_dir: PathBuf,
    host: Host,
    state: SessionState,
    pending: Option<RecordingOptions>,
    active: Option<ActiveCapture>,
}

impl CaptureSession {
    pub fn new(screen: ScreenMetrics, output_dir: PathBuf, host: Host) -> Self {
        Self {
            screen,
            output_dir,
            host,
            state: SessionState::Idle,
            pending: None,
            active: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Capturing
    }

    pub fn screen(&self) -> ScreenMetrics {
        self.screen
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Geometry of the running recording
    pub fn geometry(&self) -> Option<&Geometry> {
        self.active.as_ref().map(|active| &active.geometry)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|active| active.output_path.as_path())
    }

    pub fn elapsed(&self) -> Duration {
        self.active
            .as_ref()
            .map(|active| active.started_at.elapsed())
            .unwrap_or_default()
    }

    pub fn missing_capabilities(&self) -> Vec<Capability> {
        self.host.permissions.missing(&REQUIRED_CAPABILITIES)
    }

    /// Ask the host for every capability a recording needs
    pub fn request_capabilities(&self) -> bool {
        self.host.permissions.request(&REQUIRED_CAPABILITIES)
    }

    /// Idle → AwaitingConsent, only with every capability granted
    pub fn request_start(&mut self, options: RecordingOptions) -> CaptureResult<()> {
        self.expect_state(SessionState::Idle, "start recording")?;

        let missing = self.missing_capabilities();
        if !missing.is_empty() {
            warn!("🔒 Missing capabilities {:?}, staying idle", missing);
            return Err(CaptureError::CapabilityDenied(missing));
        }

        info!("⏳ Awaiting screen capture consent ({:?})", options.ratio);
        self.pending = Some(options);
        self.state = SessionState::AwaitingConsent;
        Ok(())
    }

    /// AwaitingConsent → Capturing on an affirmative result, Idle otherwise
    pub fn on_consent(&mut self, result: ConsentResult) -> CaptureResult<RecordingStarted> {
        self.expect_state(SessionState::AwaitingConsent, "accept consent")?;
        let options = self.pending.take().unwrap_or_default();

        let Some(token) = result.into_token() else {
            info!("🚫 Screen capture consent denied");
            self.state = SessionState::Idle;
            return Err(CaptureError::ConsentDenied);
        };

        let mut resources = Resources::default();
        match self.begin_capture(&options, token, &mut resources) {
            Ok((geometry, output_path)) => {
                info!(
                    "▶️  Recording started with dimensions: {}x{} -> {:?}",
                    geometry.recording_width, geometry.recording_height, output_path
                );
                self.active = Some(ActiveCapture {
                    geometry,
                    output_path: output_path.clone(),
                    started_at: Instant::now(),
                    resources,
                });
                self.state = SessionState::Capturing;
                Ok(RecordingStarted { geometry, output_path })
            }
            Err(e) => {
                error!("❌ Failed to start recording: {}", e);
                for failure in resources.teardown() {
                    warn!("⚠️  {}", failure);
                }
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Release everything and return to Idle, whatever fails along the way
    pub fn stop(&mut self) -> StopReport {
        match self.begin_stop() {
            Some(pending) => {
                let report = pending.run();
                self.finish_stop(&report);
                report
            }
            None => StopReport::default(),
        }
    }

    /// Capturing → Stopping, handing the resources to the caller
    ///
    /// The returned teardown runs without access to the session, so a caller
    /// holding the session behind a lock can release it while the encoder
    /// finalizes. `finish_stop` completes the transition to Idle. Returns
    /// `None` when there is nothing to tear down, including while another
    /// teardown is still in flight.
    pub fn begin_stop(&mut self) -> Option<PendingStop> {
        match self.state {
            SessionState::Idle | SessionState::Stopping => None,
            SessionState::AwaitingConsent => {
                info!("↩️  Abandoning pending start request");
                self.pending = None;
                self.state = SessionState::Idle;
                None
            }
            SessionState::Capturing => {
                info!("⏹️  Stopping recording...");
                match self.active.take() {
                    Some(active) => {
                        self.state = SessionState::Stopping;
                        Some(PendingStop {
                            output_path: active.output_path,
                            started_at: active.started_at,
                            resources: active.resources,
                        })
                    }
                    None => {
                        self.state = SessionState::Idle;
                        None
                    }
                }
            }
        }
    }

    /// Stopping → Idle once the detached teardown has run
    pub fn finish_stop(&mut self, report: &StopReport) {
        if self.state != SessionState::Stopping {
            return;
        }

        self.state = SessionState::Idle;
        if report.release_failures.is_empty() {
            info!("✅ Recording stopped successfully");
        }
    }

    fn begin_capture(
        &self,
        options: &RecordingOptions,
        token: ConsentToken,
        resources: &mut Resources,
    ) -> CaptureResult<(Geometry, PathBuf)> {
        debug!("🎫 Opening projection for grant {}", token.grant_id());
        let projection = resources.projection.insert(self.host.capture.open_projection(token)?);

        let geometry = Geometry::compute(self.screen, options)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            CaptureError::EncoderSetupFailed(format!("cannot create {:?}: {}", self.output_dir, e))
        })?;
        let output_path = output::output_path_in(&self.output_dir, &Local::now());
        let config = EncoderConfig::for_geometry(&geometry, output_path.clone());

        let encoder = resources
            .encoder
            .insert(self.host.encoders.create().map_err(setup_failed)?);
        encoder.configure(&config).map_err(setup_failed)?;
        encoder.prepare().map_err(setup_failed)?;
        let surface = encoder.surface().map_err(setup_failed)?;

        let spec = DisplaySpec {
            width: geometry.recording_width,
            height: geometry.recording_height,
            density: self.screen.density,
            flags: DisplayFlags::AUTO_MIRROR,
            viewport: geometry.mirror_viewport(),
        };
        resources.display = Some(projection.create_virtual_display(spec, &surface)?);

        if options.paints_side_bars() {
            let rects = geometry.side_bar_rects();
            if rects.is_empty() {
                warn!(
                    "⚠️  Side bars enabled but width is {} px, nothing painted",
                    geometry.side_bar_width_px
                );
            }
            for rect in rects {
                debug!("🎨 Painting side bar {:?} {:?}", rect, options.side_bar_color);
                surface.fill_rect(rect, options.side_bar_color.rgba());
            }
        }

        encoder.start().map_err(setup_failed)?;
        resources.encoder_started = true;

        Ok((geometry, output_path))
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> CaptureResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.state != SessionState::Idle {
            self.stop();
        }
    }
}

fn setup_failed(e: CaptureError) -> CaptureError {
    match e {
        CaptureError::EncoderSetupFailed(_) => e,
        other => CaptureError::EncoderSetupFailed(other.to_string()),
    }
}

fn release_failed(stage: &str, e: CaptureError) -> CaptureError {
    match e {
        CaptureError::ReleaseFailed(message) => CaptureError::ReleaseFailed(format!("{}: {}", stage, message)),
        other => CaptureError::ReleaseFailed(format!("{}: {}", stage, other)),
    }
}
