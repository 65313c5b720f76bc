// Desktop host platform built on an external ffmpeg binary
//
// - Virtual display: an ffmpeg grabber (x11grab / avfoundation / gdigrab)
//   streaming raw RGBA frames that get presented into the encoder surface
// - Encoder sink: an ffmpeg process reading raw RGBA frames on stdin and
//   writing H.264 into an MP4 container
// - Permissions: the output directory must be writable; desktop systems have
//   no runtime audio permission to ask for

mod display;
mod encoder;

pub use display::{grabber_args, FfmpegCaptureProvider, GrabInput};
pub use encoder::{encoded_size, encoder_args, FfmpegEncoder, FfmpegEncoderFactory};

use crate::error::{CaptureError, CaptureResult};
use crate::geometry::ScreenMetrics;
use crate::platform::{Capability, PermissionGate};
use crate::session::Host;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Handle to the ffmpeg executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Verify the binary runs
    pub fn check(&self) -> CaptureResult<()> {
        let status = Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                CaptureError::EncoderSetupFailed(format!("ffmpeg failed to execute at {:?}: {}", self.binary, e))
            })?;

        if !status.success() {
            return Err(CaptureError::EncoderSetupFailed(format!(
                "ffmpeg at {:?} exited with {:?}",
                self.binary,
                status.code()
            )));
        }

        info!("✅ FFmpeg check passed: {:?}", self.binary);
        Ok(())
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Capability checks for a desktop session
pub struct DesktopPermissions {
    output_dir: PathBuf,
}

impl DesktopPermissions {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn output_dir_writable(&self) -> bool {
        match std::fs::metadata(&self.output_dir) {
            Ok(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
            Err(_) => false,
        }
    }
}

impl PermissionGate for DesktopPermissions {
    fn is_granted(&self, capability: Capability) -> bool {
        match capability {
            Capability::RecordAudio => true,
            Capability::WriteStorage => self.output_dir_writable(),
        }
    }

    fn request(&self, capabilities: &[Capability]) -> bool {
        if capabilities.contains(&Capability::WriteStorage) && !self.output_dir_writable() {
            info!("📁 Creating output folder: {:?}", self.output_dir);
            if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
                warn!("⚠️  Failed to create output folder: {}", e);
            }
        }

        let missing = self.missing(capabilities);
        debug!("🔑 Capability request {:?}, missing {:?}", capabilities, missing);
        missing.is_empty()
    }
}

/// Everything a desktop session needs to record through ffmpeg
pub fn desktop_host(ffmpeg: Ffmpeg, screen: ScreenMetrics, input: GrabInput, output_dir: PathBuf) -> Host {
    Host {
        permissions: Box::new(DesktopPermissions::new(output_dir)),
        capture: Box::new(FfmpegCaptureProvider::new(ffmpeg.clone(), screen, input)),
        encoders: Box::new(FfmpegEncoderFactory::new(ffmpeg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_follow_output_dir() {
        let dir = std::env::temp_dir().join(format!("screen-capture-perm-{}", uuid::Uuid::new_v4()));
        let permissions = DesktopPermissions::new(dir.clone());

        assert!(permissions.is_granted(Capability::RecordAudio));
        assert!(!permissions.is_granted(Capability::WriteStorage));

        assert!(permissions.request(&[Capability::RecordAudio, Capability::WriteStorage]));
        assert!(permissions.is_granted(Capability::WriteStorage));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_binary_fails_check() {
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg-binary");
        assert!(matches!(ffmpeg.check(), Err(CaptureError::EncoderSetupFailed(_))));
    }
}
