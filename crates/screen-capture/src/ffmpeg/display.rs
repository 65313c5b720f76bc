// Virtual display backed by an ffmpeg screen grabber

use super::Ffmpeg;
use crate::encoder::DEFAULT_FRAME_RATE;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::{Rect, ScreenMetrics};
use crate::platform::{CaptureProvider, ConsentToken, DisplayFlags, DisplaySpec, Projection, VirtualDisplay};
use crate::surface::Surface;
use image::{ImageBuffer, Rgba};
use log::{debug, info, warn};
use std::io::Read;
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

/// ffmpeg input device and the source it grabs from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabInput {
    pub format: String,
    pub source: String,
}

impl GrabInput {
    /// Whole-screen grabber for the current OS
    pub fn platform_default() -> Self {
        #[cfg(target_os = "macos")]
        {
            Self {
                format: "avfoundation".to_string(),
                source: "Capture screen 0:none".to_string(),
            }
        }

        #[cfg(target_os = "windows")]
        {
            Self {
                format: "gdigrab".to_string(),
                source: "desktop".to_string(),
            }
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            Self {
                format: "x11grab".to_string(),
                source: std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".to_string()),
            }
        }
    }

    /// Same device, different source (display name, screen index, ...)
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Arguments for a grabber that scales the screen into `viewport` and writes raw RGBA to stdout
pub fn grabber_args(input: &GrabInput, screen: &ScreenMetrics, viewport: Rect, frame_rate: u32) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];

    args.extend(["-f".into(), input.format.clone()]);
    if input.format == "x11grab" {
        args.extend(["-video_size".into(), format!("{}x{}", screen.width, screen.height)]);
    }
    args.extend([
        "-framerate".into(),
        frame_rate.to_string(),
        "-i".into(),
        input.source.clone(),
        "-vf".into(),
        format!("scale={}:{}", viewport.width, viewport.height),
        "-pix_fmt".into(),
        "rgba".into(),
        "-f".into(),
        "rawvideo".into(),
        "pipe:1".into(),
    ]);
    args
}

pub struct FfmpegCaptureProvider {
    ffmpeg: Ffmpeg,
    screen: ScreenMetrics,
    input: GrabInput,
}

impl FfmpegCaptureProvider {
    pub fn new(ffmpeg: Ffmpeg, screen: ScreenMetrics, input: GrabInput) -> Self {
        Self { ffmpeg, screen, input }
    }
}

impl CaptureProvider for FfmpegCaptureProvider {
    fn open_projection(&self, token: ConsentToken) -> CaptureResult<Box<dyn Projection>> {
        info!("📸 Projection opened for grant {}", token.grant_id());
        Ok(Box::new(FfmpegProjection {
            ffmpeg: self.ffmpeg.clone(),
            screen: self.screen,
            input: self.input.clone(),
            grant: token.grant_id(),
            active: Arc::new(AtomicBool::new(true)),
        }))
    }
}

/// Holds the consent grant; stopping it revokes every display it created
struct FfmpegProjection {
    ffmpeg: Ffmpeg,
    screen: ScreenMetrics,
    input: GrabInput,
    grant: Uuid,
    active: Arc<AtomicBool>,
}

impl Projection for FfmpegProjection {
    fn create_virtual_display(&mut self, spec: DisplaySpec, surface: &Surface) -> CaptureResult<Box<dyn VirtualDisplay>> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(CaptureError::CaptureFailed(format!("projection {} already stopped", self.grant)));
        }
        if !spec.flags.contains(DisplayFlags::AUTO_MIRROR) {
            return Err(CaptureError::CaptureFailed("only mirrored displays are supported".to_string()));
        }
        if spec.viewport.is_empty() {
            return Err(CaptureError::CaptureFailed(format!("empty viewport {:?}", spec.viewport)));
        }

        let args = grabber_args(&self.input, &self.screen, spec.viewport, DEFAULT_FRAME_RATE);
        debug!("🖥️  Spawning grabber: {:?} {:?}", self.ffmpeg.binary(), args);

        let mut child = self
            .ffmpeg
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::CaptureFailed(format!("failed to spawn grabber {:?}: {}", self.ffmpeg.binary(), e)))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CaptureError::CaptureFailed("grabber has no stdout".to_string()));
        };

        let running = Arc::new(AtomicBool::new(true));
        let reader = {
            let running = running.clone();
            let projection_active = self.active.clone();
            let surface = surface.clone();
            let viewport = spec.viewport;
            std::thread::spawn(move || mirror_frames(stdout, surface, viewport, running, projection_active))
        };

        info!(
            "🖥️  Virtual display {}x{} @ {}dpi mirroring into {:?}",
            spec.width, spec.height, spec.density, spec.viewport
        );

        Ok(Box::new(FfmpegVirtualDisplay {
            child,
            running,
            reader: Some(reader),
        }))
    }

    fn stop(&mut self) -> CaptureResult<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("🎫 Projection {} stopped, consent released", self.grant);
        }
        Ok(())
    }
}

/// Read whole frames from the grabber and present them until told to stop
fn mirror_frames(
    mut stdout: impl Read,
    surface: Surface,
    viewport: Rect,
    running: Arc<AtomicBool>,
    projection_active: Arc<AtomicBool>,
) -> u64 {
    let frame_size = viewport.width as usize * viewport.height as usize * 4;
    let mut buffer = vec![0u8; frame_size];
    let mut frames = 0u64;

    while running.load(Ordering::SeqCst) && projection_active.load(Ordering::SeqCst) {
        if let Err(e) = stdout.read_exact(&mut buffer) {
            if running.load(Ordering::SeqCst) {
                warn!("⚠️  Grabber stream ended after {} frames: {}", frames, e);
            }
            break;
        }

        match ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(viewport.width, viewport.height, buffer.as_slice()) {
            Some(frame) => {
                surface.present(&frame, viewport);
                frames += 1;
            }
            None => {
                warn!("⚠️  Dropping malformed frame");
            }
        }
    }

    frames
}

struct FfmpegVirtualDisplay {
    child: Child,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<u64>>,
}

impl VirtualDisplay for FfmpegVirtualDisplay {
    fn release(&mut self) -> CaptureResult<()> {
        self.running.store(false, Ordering::SeqCst);

        let killed = match self.child.try_wait() {
            Ok(Some(_)) => Ok(()),
            _ => self.child.kill(),
        };
        let waited = self.child.wait();

        if let Some(reader) = self.reader.take() {
            match reader.join() {
                Ok(frames) => info!("🖥️  Virtual display released after {} frames", frames),
                Err(_) => warn!("⚠️  Mirror thread panicked"),
            }
        }

        killed
            .and(waited.map(|_| ()))
            .map_err(|e| CaptureError::ReleaseFailed(format!("grabber did not exit: {}", e)))
    }
}
