// Encoder input surface
//
// A shared RGBA canvas sized to the recording geometry. The virtual display
// presents mirrored frames into its viewport; the encoder reads snapshots of
// the whole canvas. Anything drawn outside the viewport (side bars) is never
// overwritten by mirrored frames.

use crate::geometry::Rect;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Surface {
    canvas: Arc<Mutex<RgbaImage>>,
    presented: Arc<AtomicU64>,
}

impl Surface {
    /// New opaque black surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Arc::new(Mutex::new(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0xFF])))),
            presented: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.lock().dimensions()
    }

    /// Fill `rect` with a solid color, clipped to the canvas
    pub fn fill_rect(&self, rect: Rect, rgba: [u8; 4]) {
        let mut canvas = self.lock();
        let (width, height) = canvas.dimensions();
        let x_end = rect.x.saturating_add(rect.width).min(width);
        let y_end = rect.y.saturating_add(rect.height).min(height);

        for y in rect.y.min(y_end)..y_end {
            for x in rect.x.min(x_end)..x_end {
                canvas.put_pixel(x, y, Rgba(rgba));
            }
        }
    }

    /// Draw a mirrored frame into `viewport`, resizing it when needed
    ///
    /// The frame may borrow its pixels, e.g. straight from a read buffer.
    pub fn present<C>(&self, frame: &ImageBuffer<Rgba<u8>, C>, viewport: Rect)
    where
        C: Deref<Target = [u8]>,
    {
        if viewport.is_empty() {
            return;
        }

        let (x, y) = (viewport.x as i64, viewport.y as i64);
        if frame.dimensions() == (viewport.width, viewport.height) {
            imageops::replace(&mut *self.lock(), frame, x, y);
        } else {
            let resized = imageops::resize(frame, viewport.width, viewport.height, FilterType::Triangle);
            imageops::replace(&mut *self.lock(), &resized, x, y);
        }

        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the canvas pixels as tightly packed RGBA
    pub fn snapshot_raw(&self) -> Vec<u8> {
        self.lock().as_raw().clone()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let canvas = self.lock();
        if x < canvas.width() && y < canvas.height() {
            Some(canvas.get_pixel(x, y).0)
        } else {
            None
        }
    }

    /// Number of mirrored frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, RgbaImage> {
        // A panicked presenter leaves whole pixels behind; keep drawing
        self.canvas.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.size();
        f.debug_struct("Surface")
            .field("width", &width)
            .field("height", &height)
            .field("frames_presented", &self.frames_presented())
            .finish()
    }
}
