use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::PositionError;
use crate::models::{LocationSample, PositionFix};

use super::provider::{Geocoder, LocationProvider};
use super::LocationEvent;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Desired cadence between fixes.
pub(super) const FIX_INTERVAL_SECS: u64 = 1;
/// Max tolerated delay for one fix before the tick is written off.
pub(super) const FIX_TIMEOUT_SECS: u64 = 2;
/// Reverse geocoding gets this long before the sample ships bare.
pub(super) const GEOCODE_TIMEOUT_SECS: u64 = 2;

pub(super) async fn feed_loop(
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn Geocoder>,
    events: mpsc::UnboundedSender<LocationEvent>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(FIX_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fix_fut = provider.current_fix();
                match tokio::time::timeout(Duration::from_secs(FIX_TIMEOUT_SECS), fix_fut).await {
                    Ok(Ok(fix)) => {
                        spawn_enrichment(
                            fix,
                            Arc::clone(&geocoder),
                            events.clone(),
                            cancel_token.clone(),
                        );
                    }
                    Ok(Err(err)) => {
                        log_warn!("position fix failed: {err}");
                        let _ = events.send(LocationEvent::Error(err.to_string()));
                    }
                    Err(_) => {
                        log_warn!("position fix timeout (> {FIX_TIMEOUT_SECS}s)");
                        let _ = events.send(LocationEvent::Error(PositionError::Timeout.to_string()));
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("location feed shutting down");
                break;
            }
        }
    }
}

/// Geocoding runs off the tick so a slow resolver never stalls the cadence.
/// Completions for different fixes may interleave; the consumer keeps the
/// newest sample by fix timestamp.
fn spawn_enrichment(
    fix: PositionFix,
    geocoder: Arc<dyn Geocoder>,
    events: mpsc::UnboundedSender<LocationEvent>,
    cancel_token: CancellationToken,
) {
    tokio::spawn(async move {
        let enrich_start = Instant::now();
        let sample = enrich_fix(&fix, geocoder.as_ref()).await;

        // A stopped feed emits nothing, even for lookups already in flight.
        if cancel_token.is_cancelled() {
            return;
        }

        log_info!(
            "sample ready: ({:.6}, {:.6}) city={:?} in {}ms",
            sample.latitude,
            sample.longitude,
            sample.place_city,
            enrich_start.elapsed().as_millis()
        );
        let _ = events.send(LocationEvent::Sample(sample));
    });
}

/// Attaches place details to a fix. Geocoding failure or timeout still
/// yields the sample, just with empty place fields.
pub(super) async fn enrich_fix(fix: &PositionFix, geocoder: &dyn Geocoder) -> LocationSample {
    let lookup = geocoder.reverse_geocode(fix.latitude, fix.longitude);
    match tokio::time::timeout(Duration::from_secs(GEOCODE_TIMEOUT_SECS), lookup).await {
        Ok(Ok(place)) => LocationSample::from_fix(fix, place),
        Ok(Err(err)) => {
            log_warn!("reverse geocoding failed: {err}; emitting bare coordinates");
            LocationSample::without_place(fix)
        }
        Err(_) => {
            log_warn!("reverse geocoding timeout (> {GEOCODE_TIMEOUT_SECS}s); emitting bare coordinates");
            LocationSample::without_place(fix)
        }
    }
}
