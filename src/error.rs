use crate::models::SettingsResolution;

/// Failures starting or running the location feed. Authorization problems
/// are never retried automatically; the caller decides what to surface.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("location permission denied")]
    PermissionsDenied,

    #[error("location settings inadequate: {}", .0.reason)]
    SettingsResolutionRequired(SettingsResolution),

    #[error("location feed already running")]
    AlreadyRunning,
}

/// Transient provider failure for a single fix request.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("no position fix available")]
    Unavailable,

    #[error("position request timed out")]
    Timeout,

    #[error("location provider error: {0}")]
    Provider(String),
}

/// Reverse geocoding failure. Non-fatal: the sample still goes out with
/// empty place fields.
#[derive(Debug, thiserror::Error)]
#[error("reverse geocoding failed: {0}")]
pub struct GeocodeError(pub String);

/// Failures of one capture attempt. Terminal for the attempt, never for
/// the capture source.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera backend not ready")]
    NotReady,

    #[error("a capture is already in flight")]
    CaptureInFlight,

    #[error("camera backend error: {0}")]
    Backend(String),

    #[error("unusable frame: {0}")]
    BadFrame(String),
}

/// Sink rejection. The workflow reports these uniformly as processing
/// failures, whatever the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("image sink rejected the item: {0}")]
pub struct SinkError(pub String);

impl From<anyhow::Error> for SinkError {
    fn from(err: anyhow::Error) -> Self {
        SinkError(format!("{err:#}"))
    }
}

/// Workflow-level outcome errors, as reported to the embedding UI.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("no location available for capture")]
    NoLocation,

    #[error("a capture is already in progress")]
    CaptureInProgress,

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("processing failed: {0}")]
    Processing(String),
}

impl From<CaptureError> for WorkflowError {
    fn from(err: CaptureError) -> Self {
        WorkflowError::Capture(err.to_string())
    }
}
