use serde::Serialize;

use crate::media::ContentHandle;
use crate::models::{LocationSample, SettingsResolution};

/// Stage a failed capture got stuck in, for the failure event.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FailureStage {
    Capture,
    Processing,
}

/// How a finished capture ended up on disk.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CaptureOutcome {
    SavedWithGeotag { handle: ContentHandle },
    SavedWithoutGeotag { handle: ContentHandle },
}

impl CaptureOutcome {
    pub fn handle(&self) -> &ContentHandle {
        match self {
            CaptureOutcome::SavedWithGeotag { handle } => handle,
            CaptureOutcome::SavedWithoutGeotag { handle } => handle,
        }
    }

    pub fn has_geotag(&self) -> bool {
        matches!(self, CaptureOutcome::SavedWithGeotag { .. })
    }
}

/// Everything the workflow reports outward. A UI shell subscribes to the
/// receiving end and never polls.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AppEvent {
    LocationUpdated {
        sample: LocationSample,
        capture_enabled: bool,
    },
    LocationError {
        message: String,
    },
    PermissionsDenied,
    SettingsResolutionRequired {
        resolution: SettingsResolution,
    },
    CaptureStarted {
        capture_id: String,
    },
    CaptureCompleted {
        capture_id: String,
        outcome: CaptureOutcome,
    },
    CaptureFailed {
        capture_id: String,
        stage: FailureStage,
        message: String,
    },
}
