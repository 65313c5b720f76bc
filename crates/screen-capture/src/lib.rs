// Aspect-ratio screen recording sessions
//! 
//! # screen-capture
//! 
//! Records the screen into an MP4 whose frame matches a chosen aspect ratio:
//! - 9:16 vertical, optionally padded with solid side bars
//! - 16:9 widescreen
//! - 1:1 square
//! 
//! The [`session::CaptureSession`] state machine drives the host through the
//! traits in [`platform`] and [`encoder`], so it runs against a real desktop
//! (the [`ffmpeg`] backend) or against in-memory fakes in tests.
//! 
//! ## Example
//! ```no_run
//! use screen_capture::ffmpeg::{desktop_host, Ffmpeg, GrabInput};
//! use screen_capture::{CaptureSession, ConsentResult, RatioMode, RecordingOptions, ScreenMetrics};
//! 
//! let screen = ScreenMetrics::new(1920, 1080, 96);
//! let output_dir = screen_capture::output::default_output_dir();
//! let host = desktop_host(Ffmpeg::default(), screen, GrabInput::platform_default(), output_dir.clone());
//! 
//! let mut session = CaptureSession::new(screen, output_dir, host);
//! session.request_start(RecordingOptions { ratio: RatioMode::Square1x1, ..Default::default() })?;
//! session.on_consent(ConsentResult::granted())?;
//! // ... record for some time ...
//! let report = session.stop();
//! println!("saved {:?}", report.output_path);
//! # Ok::<(), screen_capture::CaptureError>(())
//! ```

pub mod encoder;
pub mod error;
pub mod ffmpeg;
pub mod geometry;
pub mod output;
pub mod platform;
pub mod session;
pub mod surface;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use encoder::{EncoderConfig, EncoderFactory, EncoderSink};
pub use error::{CaptureError, CaptureResult};
pub use geometry::{Geometry, RatioMode, RecordingOptions, Rect, ScreenMetrics, SideBarColor};
pub use platform::{Capability, CaptureProvider, ConsentResult, ConsentToken, PermissionGate};
pub use session::{CaptureSession, Host, PendingStop, RecordingStarted, SessionState, StopReport};
pub use surface::Surface;
