//! Cadence-driven location acquisition with reverse-geocode enrichment.

mod feed_worker;
mod provider;

pub use provider::{Geocoder, LocationProvider};

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::FeedError;
use crate::models::LocationSample;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Feed output, marshalled to the single consumer context.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Sample(LocationSample),
    /// Transient acquisition failure. The loop keeps running; consumers
    /// should treat their last-known location as stale.
    Error(String),
}

/// Owns the 1 Hz acquisition loop.
///
/// `start` refuses to run without authorization or with inadequate
/// platform settings, and refuses to double-start. `stop` cancels the
/// loop, joins it, and is idempotent. Geocode lookups in flight at stop
/// time are dropped, not delivered.
pub struct LocationFeed {
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn Geocoder>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl LocationFeed {
    pub fn new(provider: Arc<dyn LocationProvider>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            provider,
            geocoder,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn start(
        &mut self,
        events: mpsc::UnboundedSender<LocationEvent>,
    ) -> Result<(), FeedError> {
        if self.handle.is_some() {
            return Err(FeedError::AlreadyRunning);
        }
        if !self.provider.has_permission().await {
            return Err(FeedError::PermissionsDenied);
        }
        if let Err(resolution) = self.provider.check_settings().await {
            return Err(FeedError::SettingsResolutionRequired(resolution));
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(feed_worker::feed_loop(
            Arc::clone(&self.provider),
            Arc::clone(&self.geocoder),
            events,
            cancel_token.clone(),
        ));

        log_info!("location feed started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("location feed task failed to join")?;
        }
        Ok(())
    }

    /// One-shot "last known location": a single fix, geocoded with the
    /// same failure tolerance as the loop. `None` when no permission or
    /// no fix within the delay tolerance.
    pub async fn current_sample(&self) -> Option<LocationSample> {
        if !self.provider.has_permission().await {
            return None;
        }
        let fix_fut = self.provider.current_fix();
        let fix = tokio::time::timeout(
            Duration::from_secs(feed_worker::FIX_TIMEOUT_SECS),
            fix_fut,
        )
        .await
        .ok()?
        .ok()?;
        Some(feed_worker::enrich_fix(&fix, self.geocoder.as_ref()).await)
    }
}
