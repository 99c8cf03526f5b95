use async_trait::async_trait;

use crate::error::CaptureError;
use crate::models::CaptureSessionConfig;

/// One encoded frame as delivered by the platform camera, before decoding.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    /// Sensor-to-display correction in degrees; only right angles are valid.
    pub rotation_degrees: i32,
}

/// Platform camera adapter. Implementations own the real session
/// (preview plus capture pipeline); the capture source only sequences
/// calls into it.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Tears down and rebinds the session for the given ratios.
    async fn configure(&self, config: &CaptureSessionConfig) -> Result<(), CaptureError>;

    /// Acquires exactly one frame. Resolves exactly once, success or failure.
    async fn acquire_frame(&self) -> Result<EncodedFrame, CaptureError>;
}
