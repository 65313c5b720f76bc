// Output artifact naming: ScreenRecord_<yyyyMMdd_HHmmss>.mp4 in the downloads folder

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "ScreenRecord_";

pub fn recording_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}{}.mp4", FILE_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

pub fn output_path_in<Tz>(dir: &Path, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dir.join(recording_file_name(at))
}

/// Public downloads directory of the current user
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_file_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(recording_file_name(&at), "ScreenRecord_20240307_090501.mp4");
    }

    #[test]
    fn test_file_name_uses_local_offset() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(recording_file_name(&at), "ScreenRecord_20241231_235959.mp4");
    }

    #[test]
    fn test_output_path_in_dir() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let path = output_path_in(Path::new("/downloads"), &at);
        assert_eq!(path, PathBuf::from("/downloads/ScreenRecord_20250102_030405.mp4"));
    }
}
