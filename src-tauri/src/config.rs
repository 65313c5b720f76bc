use log::{warn, LevelFilter};
use screen_capture::ScreenMetrics;
use serde::Serialize;
use std::path::PathBuf;

pub const ENV_OUTPUT_DIR: &str = "RATIO_RECORDER_OUTPUT_DIR";
pub const ENV_FFMPEG: &str = "RATIO_RECORDER_FFMPEG";
pub const ENV_SCREEN: &str = "RATIO_RECORDER_SCREEN";
pub const ENV_CAPTURE_INPUT: &str = "RATIO_RECORDER_CAPTURE_INPUT";
pub const ENV_LOG: &str = "RATIO_RECORDER_LOG";

/// Application settings; defaults overridden from the environment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Where recordings are written (default: the downloads folder)
    pub output_folder: PathBuf,

    /// ffmpeg executable (default: `ffmpeg` on PATH)
    pub ffmpeg_path: PathBuf,

    /// Forces the screen size instead of the detected primary monitor
    pub screen_override: Option<ScreenMetrics>,

    /// Grabber source override (X11 display, avfoundation device, ...)
    pub capture_input: Option<String>,

    #[serde(skip)]
    pub log_level: LevelFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_folder: screen_capture::output::default_output_dir(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            screen_override: None,
            capture_input: None,
            log_level: LevelFilter::Debug,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values keep the default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            config.output_folder = PathBuf::from(dir);
        }

        if let Some(path) = lookup(ENV_FFMPEG).filter(|v| !v.trim().is_empty()) {
            config.ffmpeg_path = PathBuf::from(path);
        }

        if let Some(value) = lookup(ENV_SCREEN) {
            match parse_screen(&value) {
                Some(screen) => config.screen_override = Some(screen),
                None => warn!("⚠️  Ignoring {}={:?}, expected WxH or WxH@dpi", ENV_SCREEN, value),
            }
        }

        config.capture_input = lookup(ENV_CAPTURE_INPUT).filter(|v| !v.trim().is_empty());

        if let Some(value) = lookup(ENV_LOG) {
            match value.parse::<LevelFilter>() {
                Ok(level) => config.log_level = level,
                Err(_) => warn!("⚠️  Ignoring {}={:?}", ENV_LOG, value),
            }
        }

        config
    }

    /// Screen the recorder works with: the override, else the detected monitor
    pub fn resolve_screen(&self, detected: Option<ScreenMetrics>) -> ScreenMetrics {
        match (self.screen_override, detected) {
            (Some(screen), _) => screen,
            (None, Some(screen)) => screen,
            (None, None) => {
                warn!(
                    "⚠️  No monitor detected, assuming {}x{}; set {} to fix",
                    FALLBACK_SCREEN.width, FALLBACK_SCREEN.height, ENV_SCREEN
                );
                FALLBACK_SCREEN
            }
        }
    }
}

/// Used only when no monitor can be queried and nothing is configured
pub const FALLBACK_SCREEN: ScreenMetrics = ScreenMetrics {
    width: 1920,
    height: 1080,
    density: 96,
};

/// Metrics of a monitor reported in physical pixels with a UI scale factor
pub fn screen_from_monitor(width: u32, height: u32, scale_factor: f64) -> Option<ScreenMetrics> {
    if width == 0 || height == 0 {
        return None;
    }
    let density = (96.0 * scale_factor).round().max(1.0) as u32;
    Some(ScreenMetrics::new(width, height, density))
}

/// `1080x2400` or `1080x2400@420`
pub fn parse_screen(value: &str) -> Option<ScreenMetrics> {
    let (size, density) = match value.trim().split_once('@') {
        Some((size, density)) => (size, density.trim().parse().ok()?),
        None => (value.trim(), 96),
    };
    let (width, height) = size.split_once(['x', 'X'])?;
    let width: u32 = width.trim().parse().ok()?;
    let height: u32 = height.trim().parse().ok()?;

    if width == 0 || height == 0 {
        return None;
    }
    Some(ScreenMetrics::new(width, height, density))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.screen_override, None);
        assert_eq!(config.capture_input, None);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_OUTPUT_DIR, "/srv/videos"),
            (ENV_FFMPEG, "/opt/ffmpeg/bin/ffmpeg"),
            (ENV_SCREEN, "1080x2400@420"),
            (ENV_CAPTURE_INPUT, ":1.0"),
            (ENV_LOG, "warn"),
        ]));
        assert_eq!(config.output_folder, PathBuf::from("/srv/videos"));
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.screen_override, Some(ScreenMetrics::new(1080, 2400, 420)));
        assert_eq!(config.capture_input.as_deref(), Some(":1.0"));
        assert_eq!(config.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_SCREEN, "wide"), (ENV_LOG, "loud"), (ENV_FFMPEG, " ")]));
        assert_eq!(config.screen_override, None);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_parse_screen() {
        assert_eq!(parse_screen("1080x1920"), Some(ScreenMetrics::new(1080, 1920, 96)));
        assert_eq!(parse_screen(" 720X1280@320 "), Some(ScreenMetrics::new(720, 1280, 320)));
        assert_eq!(parse_screen("0x1920"), None);
        assert_eq!(parse_screen("1080"), None);
        assert_eq!(parse_screen("1080x1920@high"), None);
    }

    #[test]
    fn test_detected_monitor_is_used_unless_overridden() {
        let detected = screen_from_monitor(2560, 1440, 1.0);
        assert_eq!(detected, Some(ScreenMetrics::new(2560, 1440, 96)));

        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.resolve_screen(detected), ScreenMetrics::new(2560, 1440, 96));
        assert_eq!(config.resolve_screen(None), FALLBACK_SCREEN);

        let config = AppConfig::from_lookup(lookup(&[(ENV_SCREEN, "1080x2400@420")]));
        assert_eq!(config.resolve_screen(detected), ScreenMetrics::new(1080, 2400, 420));
    }

    #[test]
    fn test_screen_from_monitor() {
        assert_eq!(screen_from_monitor(2880, 1800, 2.0), Some(ScreenMetrics::new(2880, 1800, 192)));
        assert_eq!(screen_from_monitor(1920, 1080, 1.25), Some(ScreenMetrics::new(1920, 1080, 120)));
        assert_eq!(screen_from_monitor(0, 1080, 1.0), None);
    }

    #[test]
    fn test_serializes_for_frontend() {
        let json = serde_json::to_value(AppConfig::from_lookup(lookup(&[(ENV_OUTPUT_DIR, "/videos")]))).unwrap();
        assert_eq!(json["outputFolder"], "/videos");
        assert!(json["screenOverride"].is_null());
        assert!(json.get("logLevel").is_none());
    }
}
