use async_trait::async_trait;

use crate::error::{GeocodeError, PositionError};
use crate::models::{Place, PositionFix, SettingsResolution};

/// Platform positioning adapter.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether the app currently holds location authorization.
    async fn has_permission(&self) -> bool;

    /// Verifies platform location settings support the requested cadence.
    /// `Err` carries the opaque handle the UI needs to run its fix-it flow.
    async fn check_settings(&self) -> Result<(), SettingsResolution>;

    /// Requests one fresh fix.
    async fn current_fix(&self) -> Result<PositionFix, PositionError>;
}

/// Reverse-geocoding adapter. Availability and accuracy are the platform's
/// business; failures here never block coordinate delivery.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError>;
}
