// Encoder sink interface and its configuration

use crate::error::CaptureResult;
use crate::geometry::Geometry;
use crate::surface::Surface;
use std::path::PathBuf;

pub const DEFAULT_BITRATE: u32 = 8_000_000;
pub const DEFAULT_FRAME_RATE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
}

/// Configuration for an encoder sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Frame size (width, height)
    pub video_size: (u32, u32),

    /// Bits per second (default: 8 Mbps)
    pub bitrate: u32,

    /// Frames per second (default: 30)
    pub frame_rate: u32,

    pub codec: VideoCodec,
    pub container: Container,

    /// Output file path
    pub output_path: PathBuf,
}

impl EncoderConfig {
    pub fn for_geometry(geometry: &Geometry, output_path: PathBuf) -> Self {
        Self {
            video_size: (geometry.recording_width, geometry.recording_height),
            output_path,
            ..Default::default()
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_size: (1080, 1920),
            bitrate: DEFAULT_BITRATE,
            frame_rate: DEFAULT_FRAME_RATE,
            codec: VideoCodec::H264,
            container: Container::Mp4,
            output_path: PathBuf::from("recording.mp4"),
        }
    }
}

/// Hardware or software encoder writing frames from its surface to a file
///
/// Lifecycle: `configure` → `prepare` → `surface` → `start` → `stop` → `release`.
pub trait EncoderSink: Send {
    fn configure(&mut self, config: &EncoderConfig) -> CaptureResult<()>;

    fn prepare(&mut self) -> CaptureResult<()>;

    /// Input surface, available after `prepare`
    fn surface(&self) -> CaptureResult<Surface>;

    fn start(&mut self) -> CaptureResult<()>;

    fn stop(&mut self) -> CaptureResult<()>;

    fn release(&mut self) -> CaptureResult<()>;
}

/// Creates a fresh encoder sink for every session
pub trait EncoderFactory: Send {
    fn create(&self) -> CaptureResult<Box<dyn EncoderSink>>;
}
