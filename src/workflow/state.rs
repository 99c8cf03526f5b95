use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CapturePhase {
    Idle,
    Capturing,
    Processing,
    Completed,
    Failed,
}

impl Default for CapturePhase {
    fn default() -> Self {
        CapturePhase::Idle
    }
}

/// Where the workflow is in its capture cycle.
///
/// Terminal phases are as ready as `Idle` for the next trigger; they only
/// preserve the last outcome for state queries. Only `Capturing` and
/// `Processing` refuse a new trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub phase: CapturePhase,
    pub capture_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
            capture_id: None,
            started_at: None,
        }
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, CapturePhase::Capturing | CapturePhase::Processing)
    }

    pub fn begin_capture(&mut self, capture_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            phase: CapturePhase::Capturing,
            capture_id: Some(capture_id),
            started_at: Some(started_at),
        };
    }

    pub fn begin_processing(&mut self) {
        self.phase = CapturePhase::Processing;
    }

    pub fn complete(&mut self) {
        self.phase = CapturePhase::Completed;
    }

    pub fn fail(&mut self) {
        self.phase = CapturePhase::Failed;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
