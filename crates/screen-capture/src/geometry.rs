// Recording geometry: target frame size and side-bar padding for a ratio mode
//
// All arithmetic is integer with truncating division so the numbers shown in
// the UI match the frame size handed to the encoder exactly.

use crate::error::{CaptureError, CaptureResult};
use log::warn;
use serde::{Deserialize, Serialize};

/// Output aspect ratio picked by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RatioMode {
    /// Vertical 9:16 (short-form video)
    #[default]
    Tall9x16,
    /// Widescreen 16:9
    Wide16x9,
    /// Square 1:1
    Square1x1,
}

impl RatioMode {
    pub const ALL: [RatioMode; 3] = [RatioMode::Tall9x16, RatioMode::Wide16x9, RatioMode::Square1x1];

    /// Position in the ratio picker
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            RatioMode::Tall9x16 => "9:16 (vertical)",
            RatioMode::Wide16x9 => "16:9 (widescreen)",
            RatioMode::Square1x1 => "1:1 (square)",
        }
    }
}

/// Fill color for the side bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SideBarColor {
    #[default]
    Black,
    White,
    Gray,
    Blue,
}

impl SideBarColor {
    pub const ALL: [SideBarColor; 4] = [
        SideBarColor::Black,
        SideBarColor::White,
        SideBarColor::Gray,
        SideBarColor::Blue,
    ];

    /// Position in the color picker; unknown positions fall back to black
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn rgba(self) -> [u8; 4] {
        match self {
            SideBarColor::Black => [0x00, 0x00, 0x00, 0xFF],
            SideBarColor::White => [0xFF, 0xFF, 0xFF, 0xFF],
            SideBarColor::Gray => [0x88, 0x88, 0x88, 0xFF],
            SideBarColor::Blue => [0x00, 0x00, 0xFF, 0xFF],
        }
    }
}

/// Native display dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMetrics {
    pub width: u32,
    pub height: u32,
    /// Dots per inch, forwarded to the virtual display
    pub density: u32,
}

impl ScreenMetrics {
    pub fn new(width: u32, height: u32, density: u32) -> Self {
        Self { width, height, density }
    }

    /// Screen ratio normalised to a 9-unit short side, e.g. `"20.0:9"`
    pub fn ratio_label(&self) -> String {
        if self.width == 0 {
            return "?:9".to_string();
        }
        format!("{:.1}:9", self.height as f32 / self.width as f32 * 9.0)
    }
}

/// Snapshot of the user's choices handed to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
    pub ratio: RatioMode,
    /// Only meaningful for [`RatioMode::Tall9x16`]
    pub side_bars_enabled: bool,
    pub side_bar_color: SideBarColor,
}

impl RecordingOptions {
    /// Whether side bars get painted for these options
    pub fn paints_side_bars(&self) -> bool {
        self.ratio == RatioMode::Tall9x16 && self.side_bars_enabled
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Frame size and padding computed once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub screen: ScreenMetrics,
    pub ratio: RatioMode,
    pub side_bars_enabled: bool,
    pub recording_width: u32,
    pub recording_height: u32,
    /// Padding per side; negative when the screen is already taller than
    /// 9:16 and the bars would have to eat into the content
    pub side_bar_width_px: i32,
}

impl Geometry {
    pub fn compute(screen: ScreenMetrics, options: &RecordingOptions) -> CaptureResult<Self> {
        if screen.width == 0 || screen.height == 0 {
            return Err(CaptureError::InvalidGeometry {
                width: screen.width as i64,
                height: screen.height as i64,
            });
        }

        let sw = screen.width as i64;
        let sh = screen.height as i64;

        let (width, height, side_bar) = match options.ratio {
            RatioMode::Tall9x16 if options.side_bars_enabled => {
                let height = sw * 16 / 9;
                let side_bar = (height - sh) / 2;
                (sw + side_bar * 2, height, side_bar)
            }
            RatioMode::Tall9x16 => (sw, sh, 0),
            RatioMode::Wide16x9 => (sw, sw * 9 / 16, 0),
            RatioMode::Square1x1 => {
                let size = sw.min(sh);
                (size, size, 0)
            }
        };

        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(CaptureError::InvalidGeometry { width, height });
        }

        let geometry = Self {
            screen,
            ratio: options.ratio,
            side_bars_enabled: options.side_bars_enabled,
            recording_width: width as u32,
            recording_height: height as u32,
            side_bar_width_px: side_bar as i32,
        };

        if geometry.crops_content() {
            warn!(
                "⚠️  Screen {}x{} is taller than 9:16, side bars would be {} px (mirror is scaled down to fit)",
                screen.width, screen.height, geometry.side_bar_width_px
            );
        }

        Ok(geometry)
    }

    /// True when the padding came out negative
    pub fn crops_content(&self) -> bool {
        self.side_bar_width_px < 0
    }

    /// Whole recording frame
    pub fn frame_rect(&self) -> Rect {
        Rect::new(0, 0, self.recording_width, self.recording_height)
    }

    /// Left and right bar rectangles, empty when nothing is painted
    pub fn side_bar_rects(&self) -> Vec<Rect> {
        if self.ratio != RatioMode::Tall9x16 || !self.side_bars_enabled || self.side_bar_width_px <= 0 {
            return Vec::new();
        }

        let bar = (self.side_bar_width_px as u32).min(self.recording_width / 2);
        vec![
            Rect::new(0, 0, bar, self.recording_height),
            Rect::new(self.recording_width - bar, 0, bar, self.recording_height),
        ]
    }

    /// Region of the frame the mirrored screen renders into
    pub fn content_rect(&self) -> Rect {
        match self.side_bar_rects().as_slice() {
            [left, right] => Rect::new(left.right(), 0, right.x - left.right(), self.recording_height),
            _ => self.frame_rect(),
        }
    }

    /// Where the mirrored screen lands inside the content rect
    pub fn mirror_viewport(&self) -> Rect {
        fit_within(self.screen.width, self.screen.height, self.content_rect())
    }
}

/// Largest rect with the source's aspect ratio that fits in `dest`, centered
pub fn fit_within(src_width: u32, src_height: u32, dest: Rect) -> Rect {
    if src_width == 0 || src_height == 0 || dest.is_empty() {
        return Rect::new(dest.x, dest.y, 0, 0);
    }

    let (sw, sh) = (src_width as u64, src_height as u64);
    let (dw, dh) = (dest.width as u64, dest.height as u64);

    // Compare sw/sh against dw/dh without floating point
    let (width, height) = if sw * dh >= sh * dw {
        (dw, (sh * dw / sw).max(1))
    } else {
        ((sw * dh / sh).max(1), dh)
    };

    let width = width as u32;
    let height = height as u32;
    Rect::new(
        dest.x + (dest.width - width) / 2,
        dest.y + (dest.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ratio: RatioMode, side_bars_enabled: bool) -> RecordingOptions {
        RecordingOptions {
            ratio,
            side_bars_enabled,
            side_bar_color: SideBarColor::Black,
        }
    }

    fn screen(width: u32, height: u32) -> ScreenMetrics {
        ScreenMetrics::new(width, height, 420)
    }

    #[test]
    fn test_square_uses_shorter_side() {
        for (w, h) in [(1080, 2400), (1920, 1080), (720, 720), (1, 5000)] {
            let geometry = Geometry::compute(screen(w, h), &options(RatioMode::Square1x1, false)).unwrap();
            assert_eq!(geometry.recording_width, w.min(h));
            assert_eq!(geometry.recording_height, w.min(h));
            assert_eq!(geometry.side_bar_width_px, 0);
        }
    }

    #[test]
    fn test_square_ignores_side_bar_toggle() {
        let geometry = Geometry::compute(screen(1080, 2400), &options(RatioMode::Square1x1, true)).unwrap();
        assert_eq!((geometry.recording_width, geometry.recording_height), (1080, 1080));
        assert!(geometry.side_bar_rects().is_empty());
    }

    #[test]
    fn test_wide_truncates_height() {
        let geometry = Geometry::compute(screen(1080, 2400), &options(RatioMode::Wide16x9, false)).unwrap();
        assert_eq!(geometry.recording_width, 1080);
        assert_eq!(geometry.recording_height, 607); // 1080 * 9 / 16 = 607.5

        let geometry = Geometry::compute(screen(1920, 1080), &options(RatioMode::Wide16x9, true)).unwrap();
        assert_eq!((geometry.recording_width, geometry.recording_height), (1920, 1080));
    }

    #[test]
    fn test_tall_without_bars_is_native() {
        let geometry = Geometry::compute(screen(1080, 2400), &options(RatioMode::Tall9x16, false)).unwrap();
        assert_eq!((geometry.recording_width, geometry.recording_height), (1080, 2400));
        assert_eq!(geometry.side_bar_width_px, 0);
        assert!(!geometry.crops_content());
    }

    #[test]
    fn test_tall_with_bars_exact_ratio_screen() {
        let geometry = Geometry::compute(screen(1080, 1920), &options(RatioMode::Tall9x16, true)).unwrap();
        assert_eq!(geometry.recording_height, 1920);
        assert_eq!(geometry.side_bar_width_px, 0);
        assert_eq!(geometry.recording_width, 1080);
        assert!(geometry.side_bar_rects().is_empty());
    }

    #[test]
    fn test_tall_with_bars_on_taller_screen_goes_negative() {
        let geometry = Geometry::compute(screen(1080, 2400), &options(RatioMode::Tall9x16, true)).unwrap();
        assert_eq!(geometry.recording_height, 1920);
        assert_eq!(geometry.side_bar_width_px, -240);
        assert_eq!(geometry.recording_width, 600);
        assert!(geometry.crops_content());
        // Nothing is painted and the mirror uses the whole frame
        assert!(geometry.side_bar_rects().is_empty());
        assert_eq!(geometry.content_rect(), geometry.frame_rect());
    }

    #[test]
    fn test_tall_with_bars_on_shorter_screen_pads() {
        let geometry = Geometry::compute(screen(1080, 1800), &options(RatioMode::Tall9x16, true)).unwrap();
        assert_eq!(geometry.recording_height, 1920);
        assert_eq!(geometry.side_bar_width_px, 60);
        assert_eq!(geometry.recording_width, 1200);

        let bars = geometry.side_bar_rects();
        assert_eq!(bars, vec![Rect::new(0, 0, 60, 1920), Rect::new(1140, 0, 60, 1920)]);
        assert_eq!(geometry.content_rect(), Rect::new(60, 0, 1080, 1920));
    }

    #[test]
    fn test_degenerate_geometry_is_rejected() {
        assert!(matches!(
            Geometry::compute(screen(0, 1920), &options(RatioMode::Wide16x9, false)),
            Err(CaptureError::InvalidGeometry { .. })
        ));
        // 100 * 16 / 9 = 177, bars (177 - 300) / 2 = -61, width 100 - 122 < 0
        assert!(matches!(
            Geometry::compute(screen(100, 300), &options(RatioMode::Tall9x16, true)),
            Err(CaptureError::InvalidGeometry { width: -22, height: 177 })
        ));
    }

    #[test]
    fn test_fit_within_letterboxes() {
        // Portrait screen into a landscape frame: pillarbox
        let rect = fit_within(1080, 2400, Rect::new(0, 0, 1080, 607));
        assert_eq!(rect.height, 607);
        assert_eq!(rect.width, 273);
        assert_eq!(rect.x, (1080 - 273) / 2);
        assert_eq!(rect.y, 0);

        // Same aspect fills the destination
        assert_eq!(fit_within(1080, 1920, Rect::new(60, 0, 1080, 1920)), Rect::new(60, 0, 1080, 1920));
    }

    #[test]
    fn test_mirror_viewport_stays_between_bars() {
        let geometry = Geometry::compute(screen(1080, 1800), &options(RatioMode::Tall9x16, true)).unwrap();
        let viewport = geometry.mirror_viewport();
        let content = geometry.content_rect();
        assert!(viewport.x >= content.x);
        assert!(viewport.right() <= content.right());
        assert_eq!(viewport.width, 1080);
        assert_eq!(viewport.height, 1800);
        assert_eq!(viewport.y, 60);
    }

    #[test]
    fn test_picker_indices() {
        assert_eq!(RatioMode::from_index(1), Some(RatioMode::Wide16x9));
        assert_eq!(RatioMode::from_index(3), None);
        assert_eq!(SideBarColor::from_index(3), SideBarColor::Blue);
        assert_eq!(SideBarColor::from_index(9), SideBarColor::Black);
    }

    #[test]
    fn test_screen_ratio_label() {
        assert_eq!(screen(1080, 2400).ratio_label(), "20.0:9");
        assert_eq!(screen(1080, 1920).ratio_label(), "16.0:9");
    }
}
