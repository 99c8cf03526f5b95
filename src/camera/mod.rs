//! Single-shot frame capture over an injected camera backend.

mod backend;

pub use backend::{CameraBackend, EncodedFrame};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task;
use tokio::time::Instant;

use crate::error::CaptureError;
use crate::models::{
    CaptureSessionConfig, FrameLedger, FrameReleaseGuard, RawCapturedImage, Rotation,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Sequences one-shot captures against the backend.
///
/// At most one decoded frame is outstanding at a time; a second
/// `capture_frame` while the previous frame is alive fails instead of
/// queueing. Aspect changes rebind the whole session and are rejected
/// while a capture is outstanding.
pub struct CaptureSource {
    backend: Arc<dyn CameraBackend>,
    ledger: Arc<FrameLedger>,
    configured: AtomicBool,
}

impl CaptureSource {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            ledger: Arc::new(FrameLedger::default()),
            configured: AtomicBool::new(false),
        }
    }

    /// Shared ledger for the frames this source produces. Lets the owner
    /// verify that every frame was released exactly once.
    pub fn frame_ledger(&self) -> Arc<FrameLedger> {
        Arc::clone(&self.ledger)
    }

    /// Rebinds the backend session for new ratios. Rejected while a
    /// capture is outstanding; a rebind may invalidate an in-flight
    /// preview but never an in-flight capture.
    pub async fn reconfigure(&self, config: CaptureSessionConfig) -> Result<(), CaptureError> {
        if self.ledger.is_in_flight() {
            return Err(CaptureError::CaptureInFlight);
        }
        self.backend.configure(&config).await?;
        self.configured.store(true, Ordering::SeqCst);
        log_info!(
            "camera session rebound: display {:?}, capture {:?}",
            config.display_ratio,
            config.capture_ratio
        );
        Ok(())
    }

    /// Acquires and decodes exactly one frame.
    ///
    /// Nothing is allocated until the backend delivers and the bytes
    /// decode, so failure paths have nothing to leak. The returned frame
    /// owns the release guard.
    pub async fn capture_frame(&self) -> Result<RawCapturedImage, CaptureError> {
        if !self.configured.load(Ordering::SeqCst) {
            return Err(CaptureError::NotReady);
        }
        if !self.ledger.try_acquire() {
            return Err(CaptureError::CaptureInFlight);
        }

        match self.acquire_and_decode().await {
            Ok(frame) => Ok(frame),
            Err(err) => {
                self.ledger.abandon();
                log_warn!("capture attempt failed: {err}");
                Err(err)
            }
        }
    }

    async fn acquire_and_decode(&self) -> Result<RawCapturedImage, CaptureError> {
        let acquire_start = Instant::now();
        let encoded = self.backend.acquire_frame().await?;
        let acquire_duration_ms = acquire_start.elapsed().as_millis();

        let rotation = Rotation::from_degrees(encoded.rotation_degrees).ok_or_else(|| {
            CaptureError::BadFrame(format!(
                "invalid rotation metadata: {} degrees",
                encoded.rotation_degrees
            ))
        })?;

        let decode_start = Instant::now();
        let byte_count = encoded.bytes.len();
        let bytes = encoded.bytes;
        let pixels = task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|err| CaptureError::BadFrame(format!("decode worker join failed: {err}")))?
            .map_err(|err| CaptureError::BadFrame(format!("frame decode failed: {err}")))?;
        let decode_duration_ms = decode_start.elapsed().as_millis();

        log_info!(
            "frame captured: {} bytes, {}x{}, rotation {} (acquire: {}ms, decode: {}ms)",
            byte_count,
            pixels.width(),
            pixels.height(),
            rotation.degrees(),
            acquire_duration_ms,
            decode_duration_ms
        );

        Ok(RawCapturedImage::new(
            pixels,
            rotation,
            FrameReleaseGuard::new(Arc::clone(&self.ledger)),
        ))
    }
}
