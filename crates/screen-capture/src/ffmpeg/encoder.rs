// Encoder sink backed by an ffmpeg child process
//
// ffmpeg reads raw RGBA frames on stdin. A pump thread writes a snapshot of
// the surface once per frame interval, so the file keeps a constant frame
// rate even when the screen does not change.

use super::Ffmpeg;
use crate::encoder::{Container, EncoderConfig, EncoderFactory, EncoderSink, VideoCodec};
use crate::error::{CaptureError, CaptureResult};
use crate::surface::Surface;
use log::{debug, error, info, warn};
use std::io::Write;
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

fn codec_name(codec: VideoCodec) -> &'static str {
    match codec {
        VideoCodec::H264 => "libx264",
    }
}

fn container_name(container: Container) -> &'static str {
    match container {
        Container::Mp4 => "mp4",
    }
}

/// Frame size actually written to the file; yuv420p needs even dimensions
pub fn encoded_size((width, height): (u32, u32)) -> (u32, u32) {
    (width + width % 2, height + height % 2)
}

/// Arguments for an ffmpeg process encoding raw RGBA from stdin into `config.output_path`
pub fn encoder_args(config: &EncoderConfig) -> Vec<String> {
    let (width, height) = config.video_size;
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    args.extend([
        "-s".into(),
        format!("{}x{}", width, height),
        "-r".into(),
        config.frame_rate.to_string(),
        "-i".into(),
        "pipe:0".into(),
        // yuv420p needs even dimensions
        "-vf".into(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
        "-c:v".into(),
        codec_name(config.codec).into(),
        "-b:v".into(),
        config.bitrate.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-movflags".into(),
        "+faststart".into(),
        "-f".into(),
        container_name(config.container).into(),
    ]);
    args.push(config.output_path.to_string_lossy().into_owned());
    args
}

pub struct FfmpegEncoderFactory {
    ffmpeg: Ffmpeg,
}

impl FfmpegEncoderFactory {
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self { ffmpeg }
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn create(&self) -> CaptureResult<Box<dyn EncoderSink>> {
        Ok(Box::new(FfmpegEncoder::new(self.ffmpeg.clone())))
    }
}

struct Pump {
    running: Arc<AtomicBool>,
    handle: JoinHandle<std::io::Result<u64>>,
}

pub struct FfmpegEncoder {
    ffmpeg: Ffmpeg,
    config: Option<EncoderConfig>,
    surface: Option<Surface>,
    child: Option<Child>,
    pump: Option<Pump>,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self {
            ffmpeg,
            config: None,
            surface: None,
            child: None,
            pump: None,
        }
    }

    /// Stop the pump; dropping its stdin handle signals EOF to ffmpeg
    fn stop_pump(&mut self) -> CaptureResult<()> {
        let Some(pump) = self.pump.take() else {
            return Ok(());
        };

        pump.running.store(false, Ordering::SeqCst);
        match pump.handle.join() {
            Ok(Ok(frames)) => {
                info!("📊 Encoder received {} frames", frames);
                Ok(())
            }
            Ok(Err(e)) => Err(CaptureError::ReleaseFailed(format!("frame pump failed: {}", e))),
            Err(_) => Err(CaptureError::ReleaseFailed("frame pump panicked".to_string())),
        }
    }
}

impl EncoderSink for FfmpegEncoder {
    fn configure(&mut self, config: &EncoderConfig) -> CaptureResult<()> {
        if self.child.is_some() {
            return Err(CaptureError::EncoderSetupFailed("already prepared".to_string()));
        }

        let (width, height) = config.video_size;
        if width == 0 || height == 0 || config.frame_rate == 0 || config.bitrate == 0 {
            return Err(CaptureError::EncoderSetupFailed(format!("unusable encoder config {:?}", config)));
        }

        self.config = Some(config.clone());
        Ok(())
    }

    fn prepare(&mut self) -> CaptureResult<()> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| CaptureError::EncoderSetupFailed("prepare called before configure".to_string()))?;

        let args = encoder_args(config);
        let encoded = encoded_size(config.video_size);
        if encoded != config.video_size {
            info!(
                "📐 Padding {}x{} to {}x{} for yuv420p",
                config.video_size.0, config.video_size.1, encoded.0, encoded.1
            );
        }
        info!(
            "🎬 Spawning encoder: {}x{} @ {} fps, {} bps -> {:?}",
            config.video_size.0, config.video_size.1, config.frame_rate, config.bitrate, config.output_path
        );
        debug!("🎬 Encoder args: {:?}", args);

        let child = self
            .ffmpeg
            .command()
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CaptureError::EncoderSetupFailed(format!("failed to spawn ffmpeg at {:?}: {}", self.ffmpeg.binary(), e))
            })?;

        self.surface = Some(Surface::new(config.video_size.0, config.video_size.1));
        self.child = Some(child);
        Ok(())
    }

    fn surface(&self) -> CaptureResult<Surface> {
        self.surface
            .clone()
            .ok_or_else(|| CaptureError::EncoderSetupFailed("surface requested before prepare".to_string()))
    }

    fn start(&mut self) -> CaptureResult<()> {
        if self.pump.is_some() {
            return Err(CaptureError::EncoderSetupFailed("already started".to_string()));
        }

        let frame_rate = self.config.as_ref().map(|config| config.frame_rate).unwrap_or(1);
        let surface = self.surface()?;
        let stdin = self
            .child
            .as_mut()
            .and_then(|child| child.stdin.take())
            .ok_or_else(|| CaptureError::EncoderSetupFailed("encoder not prepared".to_string()))?;

        let running = Arc::new(AtomicBool::new(true));
        let handle = {
            let running = running.clone();
            std::thread::spawn(move || pump_frames(stdin, surface, frame_rate, running))
        };

        self.pump = Some(Pump { running, handle });
        info!("▶️  Encoder started");
        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        let pumped = self.stop_pump();

        let Some(mut child) = self.child.take() else {
            return pumped;
        };

        info!("🏁 Waiting for encoder to finalize...");
        let status = child
            .wait()
            .map_err(|e| CaptureError::ReleaseFailed(format!("failed to wait for ffmpeg: {}", e)))?;
        pumped?;

        if !status.success() {
            return Err(CaptureError::ReleaseFailed(format!("ffmpeg exited with {:?}", status.code())));
        }

        if let Some(config) = &self.config {
            let size = std::fs::metadata(&config.output_path).map(|m| m.len()).unwrap_or(0);
            info!("✅ Video saved to: {:?} ({} bytes)", config.output_path, size);
        }
        Ok(())
    }

    fn release(&mut self) -> CaptureResult<()> {
        if let Err(e) = self.stop_pump() {
            warn!("⚠️  {}", e);
        }

        if let Some(mut child) = self.child.take() {
            // Still here means stop was never called or failed early
            drop(child.stdin.take());
            if let Ok(None) = child.try_wait() {
                child
                    .kill()
                    .map_err(|e| CaptureError::ReleaseFailed(format!("failed to kill ffmpeg: {}", e)))?;
            }
            let _ = child.wait();
        }

        self.surface = None;
        Ok(())
    }
}

/// Write the surface to `sink` once per frame interval until stopped
fn pump_frames<W: Write>(
    mut sink: W,
    surface: Surface,
    frame_rate: u32,
    running: Arc<AtomicBool>,
) -> std::io::Result<u64> {
    let interval = Duration::from_secs(1) / frame_rate.max(1);
    let mut next_frame = Instant::now();
    let mut frames = 0u64;

    while running.load(Ordering::SeqCst) {
        if let Err(e) = sink.write_all(&surface.snapshot_raw()) {
            error!("❌ Failed to write frame to ffmpeg: {}", e);
            return Err(e);
        }
        frames += 1;

        if frames % (frame_rate as u64 * 10).max(1) == 0 {
            debug!("📊 Encoded {} frames", frames);
        }

        next_frame += interval;
        let now = Instant::now();
        if next_frame > now {
            std::thread::sleep(next_frame - now);
        } else {
            // Fell behind, do not try to catch up with a burst
            next_frame = now;
        }
    }

    sink.flush()?;
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use std::path::PathBuf;

    #[test]
    fn test_encoder_args() {
        let config = EncoderConfig {
            video_size: (600, 1920),
            output_path: PathBuf::from("/tmp/ScreenRecord_20240101_000000.mp4"),
            ..Default::default()
        };
        let args = encoder_args(&config);
        assert_eq!(
            args,
            vec![
                "-hide_banner", "-loglevel", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgba", "-s", "600x1920",
                "-r", "30", "-i", "pipe:0", "-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2", "-c:v", "libx264", "-b:v",
                "8000000", "-pix_fmt", "yuv420p", "-movflags", "+faststart", "-f", "mp4",
                "/tmp/ScreenRecord_20240101_000000.mp4",
            ]
        );
    }

    #[test]
    fn test_encoded_size_rounds_up_to_even() {
        assert_eq!(encoded_size((1080, 607)), (1080, 608));
        assert_eq!(encoded_size((601, 1920)), (602, 1920));
        assert_eq!(encoded_size((1080, 1920)), (1080, 1920));
    }

    #[test]
    fn test_pump_writes_whole_snapshots() {
        let surface = Surface::new(2, 1);
        surface.fill_rect(Rect::new(1, 0, 1, 1), [1, 2, 3, 4]);
        let running = Arc::new(AtomicBool::new(true));

        let stopper = {
            let running = running.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(150));
                running.store(false, Ordering::SeqCst);
            })
        };

        let mut sink = Vec::new();
        let frames = pump_frames(&mut sink, surface.clone(), 50, running).unwrap();
        stopper.join().unwrap();

        assert!(frames >= 2, "only {} frames in 150ms at 50fps", frames);
        // Paced, not a tight loop
        assert!(frames <= 20, "{} frames in 150ms at 50fps", frames);
        assert_eq!(sink.len() as u64, frames * 8);
        assert!(sink.chunks(8).all(|frame| frame == surface.snapshot_raw().as_slice()));
    }

    #[test]
    fn test_pump_stopped_before_start_writes_nothing() {
        let mut sink = Vec::new();
        let frames = pump_frames(&mut sink, Surface::new(2, 2), 30, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(frames, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_pump_reports_closed_pipe() {
        struct ClosedPipe;

        impl Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "ffmpeg exited"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let result = pump_frames(ClosedPipe, Surface::new(2, 2), 30, Arc::new(AtomicBool::new(true)));
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_lifecycle_order_is_enforced() {
        let mut encoder = FfmpegEncoder::new(Ffmpeg::default());
        assert!(matches!(encoder.prepare(), Err(CaptureError::EncoderSetupFailed(_))));
        assert!(encoder.surface().is_err());
        assert!(encoder.start().is_err());

        let bad = EncoderConfig {
            video_size: (0, 1080),
            ..Default::default()
        };
        assert!(encoder.configure(&bad).is_err());

        // Nothing was spawned, so teardown is a no-op
        assert!(encoder.stop().is_ok());
        assert!(encoder.release().is_ok());
    }

    #[test]
    fn test_missing_binary_fails_prepare() {
        let mut encoder = FfmpegEncoder::new(Ffmpeg::new("/nonexistent/ffmpeg-binary"));
        encoder.configure(&EncoderConfig::default()).unwrap();
        assert!(matches!(encoder.prepare(), Err(CaptureError::EncoderSetupFailed(_))));
        assert!(encoder.surface().is_err());
    }
}
