// In-memory host platform for exercising sessions without a device
//
// Every fake shares one call log so tests can assert the exact order in which
// the session drives the host. Operations listed with `fail_on` return an
// error after being logged; operations listed with `delay_on` block for the
// given time first, with the shared state unlocked.

use crate::encoder::{EncoderConfig, EncoderFactory, EncoderSink};
use crate::error::{CaptureError, CaptureResult};
use crate::platform::{
    Capability, CaptureProvider, ConsentToken, DisplaySpec, PermissionGate, Projection, VirtualDisplay,
};
use crate::session::Host;
use crate::surface::Surface;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    calls: Vec<String>,
    denied: HashSet<Capability>,
    grant_on_request: bool,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    surfaces: Vec<Surface>,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    shared: Arc<Mutex<Shared>>,
}

impl FakePlatform {
    /// Every capability granted, nothing failing
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(self, capability: Capability) -> Self {
        self.lock().denied.insert(capability);
        self
    }

    /// Denied capabilities get granted once requested
    pub fn grant_on_request(self) -> Self {
        self.lock().grant_on_request = true;
        self
    }

    pub fn fail_on(self, operation: &str) -> Self {
        self.lock().failing.insert(operation.to_string());
        self
    }

    /// Make `operation` slow, e.g. an encoder that takes a while to finalize
    pub fn delay_on(self, operation: &str, delay: Duration) -> Self {
        self.lock().delays.insert(operation.to_string(), delay);
        self
    }

    pub fn host(&self) -> Host {
        Host {
            permissions: Box::new(FakePermissions(self.clone())),
            capture: Box::new(FakeCaptureProvider(self.clone())),
            encoders: Box::new(FakeEncoderFactory(self.clone())),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        std::env::temp_dir().join("screen-capture-fake-output")
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Surface of the most recently prepared encoder
    pub fn last_surface(&self) -> Option<Surface> {
        self.lock().surfaces.last().cloned()
    }

    fn record(&self, call: String) -> bool {
        let operation = call.split(' ').next().unwrap_or_default().to_string();
        let (failed, delay) = {
            let mut shared = self.lock();
            shared.calls.push(call);
            (shared.failing.contains(&operation), shared.delays.get(&operation).copied())
        };

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        failed
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct FakePermissions(FakePlatform);

impl PermissionGate for FakePermissions {
    fn is_granted(&self, capability: Capability) -> bool {
        !self.0.lock().denied.contains(&capability)
    }

    fn request(&self, capabilities: &[Capability]) -> bool {
        let mut shared = self.0.lock();
        if shared.grant_on_request {
            for capability in capabilities {
                shared.denied.remove(capability);
            }
        }
        capabilities.iter().all(|capability| !shared.denied.contains(capability))
    }
}

struct FakeCaptureProvider(FakePlatform);

impl CaptureProvider for FakeCaptureProvider {
    fn open_projection(&self, _token: ConsentToken) -> CaptureResult<Box<dyn Projection>> {
        if self.0.record("projection.open".to_string()) {
            return Err(CaptureError::CaptureFailed("injected projection failure".to_string()));
        }
        Ok(Box::new(FakeProjection(self.0.clone())))
    }
}

struct FakeProjection(FakePlatform);

impl Projection for FakeProjection {
    fn create_virtual_display(&mut self, spec: DisplaySpec, _surface: &Surface) -> CaptureResult<Box<dyn VirtualDisplay>> {
        let call = format!(
            "display.create {}x{} viewport {},{} {}x{}",
            spec.width, spec.height, spec.viewport.x, spec.viewport.y, spec.viewport.width, spec.viewport.height
        );
        if self.0.record(call) {
            return Err(CaptureError::CaptureFailed("injected display failure".to_string()));
        }
        Ok(Box::new(FakeDisplay(self.0.clone())))
    }

    fn stop(&mut self) -> CaptureResult<()> {
        release_result(self.0.record("projection.stop".to_string()))
    }
}

struct FakeDisplay(FakePlatform);

impl VirtualDisplay for FakeDisplay {
    fn release(&mut self) -> CaptureResult<()> {
        release_result(self.0.record("display.release".to_string()))
    }
}

struct FakeEncoderFactory(FakePlatform);

impl EncoderFactory for FakeEncoderFactory {
    fn create(&self) -> CaptureResult<Box<dyn EncoderSink>> {
        if self.0.record("encoder.create".to_string()) {
            return Err(CaptureError::EncoderSetupFailed("injected create failure".to_string()));
        }
        Ok(Box::new(FakeEncoder {
            platform: self.0.clone(),
            config: None,
            surface: None,
        }))
    }
}

struct FakeEncoder {
    platform: FakePlatform,
    config: Option<EncoderConfig>,
    surface: Option<Surface>,
}

impl EncoderSink for FakeEncoder {
    fn configure(&mut self, config: &EncoderConfig) -> CaptureResult<()> {
        let call = format!(
            "encoder.configure {}x{} {}bps {}fps",
            config.video_size.0, config.video_size.1, config.bitrate, config.frame_rate
        );
        if self.platform.record(call) {
            return Err(CaptureError::EncoderSetupFailed("injected configure failure".to_string()));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn prepare(&mut self) -> CaptureResult<()> {
        if self.platform.record("encoder.prepare".to_string()) {
            return Err(CaptureError::EncoderSetupFailed("injected prepare failure".to_string()));
        }
        let (width, height) = self
            .config
            .as_ref()
            .map(|config| config.video_size)
            .ok_or_else(|| CaptureError::EncoderSetupFailed("not configured".to_string()))?;
        let surface = Surface::new(width, height);
        self.platform.lock().surfaces.push(surface.clone());
        self.surface = Some(surface);
        Ok(())
    }

    fn surface(&self) -> CaptureResult<Surface> {
        self.surface
            .clone()
            .ok_or_else(|| CaptureError::EncoderSetupFailed("not prepared".to_string()))
    }

    fn start(&mut self) -> CaptureResult<()> {
        if self.platform.record("encoder.start".to_string()) {
            return Err(CaptureError::EncoderSetupFailed("injected start failure".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        release_result(self.platform.record("encoder.stop".to_string()))
    }

    fn release(&mut self) -> CaptureResult<()> {
        release_result(self.platform.record("encoder.release".to_string()))
    }
}

fn release_result(failed: bool) -> CaptureResult<()> {
    if failed {
        Err(CaptureError::ReleaseFailed("injected release failure".to_string()))
    } else {
        Ok(())
    }
}
