// Basic screen recording example
//
// Records 5 seconds of the screen as a padded 9:16 video into the downloads folder.
// Needs `ffmpeg` on PATH. Screen size comes from the first argument (e.g. 1920x1080).

use screen_capture::ffmpeg::{desktop_host, Ffmpeg, GrabInput};
use screen_capture::{CaptureSession, ConsentResult, RatioMode, RecordingOptions, ScreenMetrics, SideBarColor};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = std::env::args()
        .nth(1)
        .and_then(|arg| {
            let (w, h) = arg.split_once('x')?;
            Some((w.parse().ok()?, h.parse().ok()?))
        })
        .unwrap_or((1920, 1080));

    let screen = ScreenMetrics::new(width, height, 96);
    let output_dir = screen_capture::output::default_output_dir();
    let ffmpeg = Ffmpeg::default();
    ffmpeg.check()?;

    let host = desktop_host(ffmpeg, screen, GrabInput::platform_default(), output_dir.clone());
    let mut session = CaptureSession::new(screen, output_dir, host);

    let options = RecordingOptions {
        ratio: RatioMode::Tall9x16,
        side_bars_enabled: true,
        side_bar_color: SideBarColor::Gray,
    };

    if !session.missing_capabilities().is_empty() && !session.request_capabilities() {
        return Err("capabilities required".into());
    }

    println!("🎬 Starting screen recording...");
    session.request_start(options)?;
    let started = session.on_consent(ConsentResult::granted())?;
    println!(
        "▶️  Recording {}x{} (side bars {} px)... (5 seconds)",
        started.geometry.recording_width, started.geometry.recording_height, started.geometry.side_bar_width_px
    );

    std::thread::sleep(Duration::from_secs(5));

    let report = session.stop();
    for failure in &report.release_failures {
        eprintln!("⚠️  {}", failure);
    }
    println!("✅ Recording saved to: {:?}", report.output_path);

    Ok(())
}
