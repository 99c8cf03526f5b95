use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::{imageops, DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Sensor-to-display correction carried with a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Only the four right-angle values are valid frame metadata.
    pub fn from_degrees(degrees: i32) -> Option<Rotation> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True for corrections that swap the output bounding box.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Tracks the lifetime of one frame's backing buffer.
///
/// Dropping the guard is the release. The shared counters let the capture
/// source refuse concurrent captures and let callers assert that a frame
/// was released exactly once.
#[derive(Debug, Default)]
pub struct FrameLedger {
    in_flight: AtomicBool,
    releases: AtomicUsize,
}

impl FrameLedger {
    /// Marks a frame outstanding. Fails when one already is.
    pub fn try_acquire(self: &Arc<Self>) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Rolls back an acquisition that never produced a frame.
    pub fn abandon(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FrameReleaseGuard {
    ledger: Arc<FrameLedger>,
}

impl FrameReleaseGuard {
    pub fn new(ledger: Arc<FrameLedger>) -> Self {
        Self { ledger }
    }
}

impl Drop for FrameReleaseGuard {
    fn drop(&mut self) {
        self.ledger.releases.fetch_add(1, Ordering::SeqCst);
        self.ledger.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Decoded frame plus its rotation metadata.
///
/// Owned exclusively by one capture attempt. Dropping it (or consuming it
/// via [`RawCapturedImage::into_upright`]) releases the backing buffer;
/// ownership guarantees that happens exactly once on every exit path.
#[derive(Debug)]
pub struct RawCapturedImage {
    pixels: DynamicImage,
    rotation: Rotation,
    _guard: FrameReleaseGuard,
}

impl RawCapturedImage {
    pub fn new(pixels: DynamicImage, rotation: Rotation, guard: FrameReleaseGuard) -> Self {
        Self {
            pixels,
            rotation,
            _guard: guard,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Consumes the frame and applies the rotation correction, yielding a
    /// display-upright RGBA buffer. Quarter turns swap the bounding box.
    pub fn into_upright(self) -> RgbaImage {
        let rgba = self.pixels.to_rgba8();
        match self.rotation {
            Rotation::Deg0 => rgba,
            Rotation::Deg90 => imageops::rotate90(&rgba),
            Rotation::Deg180 => imageops::rotate180(&rgba),
            Rotation::Deg270 => imageops::rotate270(&rgba),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AspectRatio {
    Ratio4x3,
    Ratio16x9,
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Ratio4x3
    }
}

/// Preview and capture ratios, passed explicitly on every session rebuild
/// rather than cached inside the capture source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSessionConfig {
    pub display_ratio: AspectRatio,
    pub capture_ratio: AspectRatio,
}
