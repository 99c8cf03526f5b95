use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw fix from the location provider, before reverse geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated horizontal error radius. `None` when the provider has no estimate.
    pub accuracy_meters: Option<f32>,
    pub captured_at: DateTime<Utc>,
}

/// Reverse-geocoded place details. Empty strings mean "unresolved".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub city: String,
    pub address: String,
}

/// Opaque token for a recoverable location-settings problem.
///
/// The platform adapter surfaces its resolution flow (the "turn on
/// location services" dialog) and reports the outcome back through
/// the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResolution {
    pub reason: String,
}

impl SettingsResolution {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A fix enriched with place details, as delivered to consumers.
///
/// Pure value: superseded samples are discarded, no history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f32>,
    pub captured_at: DateTime<Utc>,
    pub place_city: String,
    pub place_address: String,
}

impl LocationSample {
    pub fn from_fix(fix: &PositionFix, place: Place) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_meters: fix.accuracy_meters,
            captured_at: fix.captured_at,
            place_city: place.city,
            place_address: place.address,
        }
    }

    /// Sample with empty place fields, used when geocoding fails or times out.
    pub fn without_place(fix: &PositionFix) -> Self {
        Self::from_fix(fix, Place::default())
    }
}
