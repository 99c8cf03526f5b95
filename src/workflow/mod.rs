//! Capture orchestration: one state machine tying camera, location feed,
//! overlay compositing, and storage together behind an event stream.

mod events;
mod state;

pub use events::{AppEvent, CaptureOutcome, FailureStage};
pub use state::{CapturePhase, WorkflowState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use chrono::Utc;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::camera::CaptureSource;
use crate::error::{CaptureError, FeedError, WorkflowError};
use crate::location::{LocationEvent, LocationFeed};
use crate::media::{ContentHandle, ImageSink, StoreRequest, DEFAULT_RELATIVE_PATH};
use crate::models::{CaptureSessionConfig, LocationSample, OverlayStyle, RawCapturedImage};
use crate::overlay::OverlayComposer;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Horizontal accuracy a sample must beat for the capture gate the UI
/// shows. The gate is advisory; a trigger uses whatever sample is held.
pub const REQUIRED_ACCURACY_M: f32 = 100.0;

/// Stamped photos are encoded at this JPEG quality.
pub const JPEG_QUALITY: u8 = 90;

/// The capture workflow. Cheap to clone; all clones share state.
///
/// One instance per camera session. Commands come in as method calls,
/// results go out both as return values and as [`AppEvent`]s on the
/// channel supplied at construction, so an embedding UI can stay
/// subscription-driven.
#[derive(Clone)]
pub struct CaptureWorkflow {
    state: Arc<Mutex<WorkflowState>>,
    latest_location: Arc<Mutex<Option<LocationSample>>>,
    location_seen: Arc<AtomicBool>,
    style: Arc<RwLock<OverlayStyle>>,
    session_config: Arc<Mutex<CaptureSessionConfig>>,
    source: Arc<CaptureSource>,
    composer: Arc<OverlayComposer>,
    sink: Arc<dyn ImageSink>,
    feed: Arc<Mutex<LocationFeed>>,
    pump_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    events: mpsc::UnboundedSender<AppEvent>,
    relative_path: String,
}

impl CaptureWorkflow {
    pub fn new(
        source: CaptureSource,
        composer: OverlayComposer,
        sink: Arc<dyn ImageSink>,
        feed: LocationFeed,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(WorkflowState::new())),
            latest_location: Arc::new(Mutex::new(None)),
            location_seen: Arc::new(AtomicBool::new(false)),
            style: Arc::new(RwLock::new(OverlayStyle::default())),
            session_config: Arc::new(Mutex::new(CaptureSessionConfig::default())),
            source: Arc::new(source),
            composer: Arc::new(composer),
            sink,
            feed: Arc::new(Mutex::new(feed)),
            pump_handle: Arc::new(Mutex::new(None)),
            events,
            relative_path: DEFAULT_RELATIVE_PATH.to_string(),
        }
    }

    /// Store photos under a different library-relative folder.
    pub fn with_destination(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = relative_path.into();
        self
    }

    pub async fn state(&self) -> WorkflowState {
        self.state.lock().await.clone()
    }

    /// Ledger for the frames this workflow captures, for asserting that
    /// every frame is released exactly once.
    pub fn frame_ledger(&self) -> Arc<crate::models::FrameLedger> {
        self.source.frame_ledger()
    }

    pub async fn latest_location(&self) -> Option<LocationSample> {
        self.latest_location.lock().await.clone()
    }

    pub fn style(&self) -> OverlayStyle {
        self.style.read().unwrap().clone()
    }

    /// Replaces the overlay style for subsequent captures. Values are
    /// clamped to their legal ranges on the way in.
    pub fn set_style(&self, style: OverlayStyle) {
        *self.style.write().unwrap() = style.clamped();
    }

    pub async fn session_config(&self) -> CaptureSessionConfig {
        *self.session_config.lock().await
    }

    /// Rebinds the camera session for new ratios. Refused while a capture
    /// is outstanding.
    pub async fn set_aspect_ratio(&self, config: CaptureSessionConfig) -> Result<(), WorkflowError> {
        {
            let state = self.state.lock().await;
            if state.is_busy() {
                return Err(WorkflowError::CaptureInProgress);
            }
        }
        match self.source.reconfigure(config).await {
            Ok(()) => {
                *self.session_config.lock().await = config;
                Ok(())
            }
            Err(CaptureError::CaptureInFlight) => Err(WorkflowError::CaptureInProgress),
            Err(err) => Err(WorkflowError::Capture(err.to_string())),
        }
    }

    /// Starts the 1 Hz location feed plus the pump that folds feed output
    /// into the latest-location slot and outward events.
    pub async fn start_location_feed(&self) -> Result<(), FeedError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut feed = self.feed.lock().await;
            if let Err(err) = feed.start(tx).await {
                self.report_feed_error(&err);
                return Err(err);
            }
        }

        let workflow = self.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    LocationEvent::Sample(sample) => workflow.update_location(sample).await,
                    LocationEvent::Error(message) => workflow.clear_location(message).await,
                }
            }
        });
        *self.pump_handle.lock().await = Some(pump);
        Ok(())
    }

    /// Stops the feed and its pump. Idempotent. Lookups in flight at stop
    /// time are dropped, not delivered.
    pub async fn stop_location_feed(&self) -> Result<()> {
        self.feed.lock().await.stop().await?;
        if let Some(pump) = self.pump_handle.lock().await.take() {
            pump.abort();
        }
        log_info!("location feed stopped");
        Ok(())
    }

    /// Outcome of the platform's settings-resolution dialog. Acceptance
    /// retries the feed; refusal leaves the session running without one
    /// and tells the UI why.
    pub async fn resolve_location_settings(&self, accepted: bool) -> Result<(), FeedError> {
        if accepted {
            self.start_location_feed().await
        } else {
            self.emit(AppEvent::LocationError {
                message: "location settings unchanged".to_string(),
            });
            Ok(())
        }
    }

    /// Primes the slot with a one-shot fix so the UI has something to show
    /// before the feed's first tick lands.
    pub async fn prime_location(&self) -> Option<LocationSample> {
        let sample = self.feed.lock().await.current_sample().await?;
        self.update_location(sample.clone()).await;
        Some(sample)
    }

    /// Feeds one sample into the latest-location slot and republishes it
    /// with the capture gate applied. Samples older than the one already
    /// held (late geocode completions across a feed restart) are dropped.
    pub async fn update_location(&self, sample: LocationSample) {
        {
            let mut slot = self.latest_location.lock().await;
            if let Some(current) = slot.as_ref() {
                if sample.captured_at < current.captured_at {
                    log_warn!(
                        "dropping stale location sample ({} < {})",
                        sample.captured_at,
                        current.captured_at
                    );
                    return;
                }
            }
            *slot = Some(sample.clone());
        }
        self.location_seen.store(true, Ordering::SeqCst);

        let capture_enabled = sample
            .accuracy_meters
            .map(|accuracy| accuracy <= REQUIRED_ACCURACY_M)
            .unwrap_or(false);
        self.emit(AppEvent::LocationUpdated {
            sample,
            capture_enabled,
        });
    }

    async fn clear_location(&self, message: String) {
        log_warn!("location feed error: {message}");
        *self.latest_location.lock().await = None;
        self.emit(AppEvent::LocationError { message });
    }

    /// Snapshot-and-capture: uses the most recent sample known right now.
    pub async fn execute_capture(&self) -> Result<CaptureOutcome, WorkflowError> {
        let location = self.latest_location.lock().await.clone();
        self.execute_capture_with(location).await
    }

    /// Runs one full capture cycle with an explicit location snapshot.
    ///
    /// Refused outright when no sample has ever been received this
    /// session, without touching the camera. Once one has, a cleared
    /// snapshot still captures and the photo is saved without a geotag.
    pub async fn execute_capture_with(
        &self,
        location: Option<LocationSample>,
    ) -> Result<CaptureOutcome, WorkflowError> {
        if location.is_none() && !self.location_seen.load(Ordering::SeqCst) {
            return Err(WorkflowError::NoLocation);
        }

        let capture_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            if state.is_busy() {
                return Err(WorkflowError::CaptureInProgress);
            }
            state.begin_capture(capture_id.clone(), Utc::now());
        }
        self.emit(AppEvent::CaptureStarted {
            capture_id: capture_id.clone(),
        });
        log_info!(
            "capture {capture_id} started (geotag: {})",
            location.is_some()
        );

        let frame = match self.source.capture_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                let message = err.to_string();
                log_error!("capture {capture_id} failed at acquisition: {message}");
                self.finish_failed(&capture_id, FailureStage::Capture, message.clone())
                    .await;
                return Err(WorkflowError::Capture(message));
            }
        };

        self.state.lock().await.begin_processing();

        match self.process_frame(frame, location.as_ref()).await {
            Ok(handle) => {
                let outcome = if location.is_some() {
                    CaptureOutcome::SavedWithGeotag { handle }
                } else {
                    CaptureOutcome::SavedWithoutGeotag { handle }
                };
                self.state.lock().await.complete();
                self.emit(AppEvent::CaptureCompleted {
                    capture_id,
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(err) => {
                let message = format!("{err:#}");
                log_error!("capture {capture_id} failed at processing: {message}");
                self.finish_failed(&capture_id, FailureStage::Processing, message.clone())
                    .await;
                Err(WorkflowError::Processing(message))
            }
        }
    }

    async fn process_frame(
        &self,
        frame: RawCapturedImage,
        location: Option<&LocationSample>,
    ) -> Result<ContentHandle> {
        let started = Instant::now();
        let style = self.style.read().unwrap().clone();
        let composer = Arc::clone(&self.composer);
        let location = location.cloned();

        // Rotation, compositing, and encoding are CPU-bound; keep them off
        // the async runtime. Consuming the frame inside the worker releases
        // its buffer before anything is stored or reported.
        let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let upright = frame.into_upright();
            let stamped = composer.compose(&upright, location.as_ref(), &style);
            encode_jpeg(&stamped)
        })
        .await
        .context("processing worker failed to join")??;

        let display_name = format!("IMG_{}.jpg", Utc::now().timestamp_millis());
        let request = StoreRequest::jpeg(bytes, display_name, self.relative_path.clone());
        let handle = self.sink.store(request).await?;

        log_info!(
            "capture processed in {}ms -> {}",
            started.elapsed().as_millis(),
            handle.path.display()
        );
        Ok(handle)
    }

    async fn finish_failed(&self, capture_id: &str, stage: FailureStage, message: String) {
        self.state.lock().await.fail();
        self.emit(AppEvent::CaptureFailed {
            capture_id: capture_id.to_string(),
            stage,
            message,
        });
    }

    fn report_feed_error(&self, err: &FeedError) {
        match err {
            FeedError::PermissionsDenied => self.emit(AppEvent::PermissionsDenied),
            FeedError::SettingsResolutionRequired(resolution) => {
                self.emit(AppEvent::SettingsResolutionRequired {
                    resolution: resolution.clone(),
                });
            }
            FeedError::AlreadyRunning => {}
        }
    }

    fn emit(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            log_warn!("event channel closed; dropping workflow event");
        }
    }
}

/// Flattens to RGB and encodes at the fixed quality. JPEG carries no
/// alpha channel.
fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>> {
    let rgb: RgbImage = image.convert();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&rgb)
        .context("jpeg encoding failed")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use tokio::sync::Notify;

    use crate::camera::{CameraBackend, EncodedFrame};
    use crate::error::{GeocodeError, PositionError, SinkError};
    use crate::location::{Geocoder, LocationProvider};
    use crate::models::{Place, PositionFix, SettingsResolution};

    struct StubBackend {
        bytes: Vec<u8>,
        fail_reason: Option<String>,
        acquire_calls: AtomicUsize,
    }

    impl StubBackend {
        fn with_frame(bytes: Vec<u8>) -> Self {
            Self {
                bytes,
                fail_reason: None,
                acquire_calls: AtomicUsize::new(0),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                bytes: Vec::new(),
                fail_reason: Some(reason.to_string()),
                acquire_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CameraBackend for StubBackend {
        async fn configure(&self, _config: &CaptureSessionConfig) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn acquire_frame(&self) -> Result<EncodedFrame, CaptureError> {
            self.acquire_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = &self.fail_reason {
                return Err(CaptureError::Backend(reason.clone()));
            }
            Ok(EncodedFrame {
                bytes: self.bytes.clone(),
                rotation_degrees: 0,
            })
        }
    }

    /// Parks acquisition until released, to hold the workflow in
    /// `Capturing` for as long as a test needs.
    struct GatedBackend {
        bytes: Vec<u8>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CameraBackend for GatedBackend {
        async fn configure(&self, _config: &CaptureSessionConfig) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn acquire_frame(&self) -> Result<EncodedFrame, CaptureError> {
            self.release.notified().await;
            Ok(EncodedFrame {
                bytes: self.bytes.clone(),
                rotation_degrees: 0,
            })
        }
    }

    struct RecordingSink {
        stored: StdMutex<Vec<StoreRequest>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                stored: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn stored_count(&self) -> usize {
            self.stored.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageSink for RecordingSink {
        async fn store(&self, request: StoreRequest) -> Result<ContentHandle, SinkError> {
            if self.fail {
                return Err(SinkError("disk full".to_string()));
            }
            let path = PathBuf::from("/library")
                .join(&request.relative_path)
                .join(&request.display_name);
            let id = format!("media-{}", self.stored_count());
            self.stored.lock().unwrap().push(request);
            Ok(ContentHandle { id, path })
        }
    }

    struct NoopProvider;

    #[async_trait]
    impl LocationProvider for NoopProvider {
        async fn has_permission(&self) -> bool {
            false
        }

        async fn check_settings(&self) -> Result<(), SettingsResolution> {
            Ok(())
        }

        async fn current_fix(&self) -> Result<PositionFix, PositionError> {
            Err(PositionError::Unavailable)
        }
    }

    struct NoopGeocoder;

    #[async_trait]
    impl Geocoder for NoopGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Result<Place, GeocodeError> {
            Err(GeocodeError("offline".to_string()))
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn madrid_sample(captured_at: DateTime<Utc>) -> LocationSample {
        LocationSample {
            latitude: 40.416775,
            longitude: -3.703790,
            accuracy_meters: Some(8.0),
            captured_at,
            place_city: "Madrid".to_string(),
            place_address: "Gran Via 1".to_string(),
        }
    }

    async fn workflow_with(
        backend: Arc<dyn CameraBackend>,
        sink: Arc<dyn ImageSink>,
    ) -> (CaptureWorkflow, mpsc::UnboundedReceiver<AppEvent>) {
        let source = CaptureSource::new(backend);
        source
            .reconfigure(CaptureSessionConfig::default())
            .await
            .unwrap();
        let composer = OverlayComposer::new().unwrap();
        let feed = LocationFeed::new(Arc::new(NoopProvider), Arc::new(NoopGeocoder));
        let (tx, rx) = mpsc::unbounded_channel();
        (CaptureWorkflow::new(source, composer, sink, feed, tx), rx)
    }

    fn next_event(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> AppEvent {
        rx.try_recv().expect("expected a pending event")
    }

    #[tokio::test]
    async fn capture_without_any_location_fails_before_the_camera() {
        let backend = Arc::new(StubBackend::with_frame(png_bytes(8, 6)));
        let camera: Arc<dyn CameraBackend> = Arc::clone(&backend) as Arc<dyn CameraBackend>;
        let (workflow, mut rx) = workflow_with(camera, Arc::new(RecordingSink::new())).await;

        let err = workflow.execute_capture_with(None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoLocation));
        let err = workflow.execute_capture().await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoLocation));

        assert_eq!(backend.acquire_calls.load(Ordering::SeqCst), 0);
        assert_eq!(workflow.state().await.phase, CapturePhase::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn location_updates_gate_capture_on_accuracy() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(4, 4)));
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;
        let base = Utc::now();

        let mut coarse = madrid_sample(base);
        coarse.accuracy_meters = Some(150.0);
        workflow.update_location(coarse).await;

        let mut fine = madrid_sample(base + ChronoDuration::seconds(1));
        fine.accuracy_meters = Some(80.0);
        workflow.update_location(fine).await;

        let mut unknown = madrid_sample(base + ChronoDuration::seconds(2));
        unknown.accuracy_meters = None;
        workflow.update_location(unknown).await;

        let gates: Vec<bool> = (0..3)
            .map(|_| match next_event(&mut rx) {
                AppEvent::LocationUpdated {
                    capture_enabled, ..
                } => capture_enabled,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(gates, vec![false, true, false]);
    }

    #[tokio::test]
    async fn stale_location_sample_is_dropped() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(4, 4)));
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;
        let newer_at = Utc::now();
        let older_at = newer_at - ChronoDuration::seconds(5);

        workflow.update_location(madrid_sample(newer_at)).await;
        workflow.update_location(madrid_sample(older_at)).await;

        let held = workflow.latest_location().await.unwrap();
        assert_eq!(held.captured_at, newer_at);

        assert!(matches!(
            next_event(&mut rx),
            AppEvent::LocationUpdated { .. }
        ));
        assert!(rx.try_recv().is_err(), "stale sample must not republish");
    }

    #[tokio::test]
    async fn capture_with_location_saves_with_geotag() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(8, 6)));
        let sink = Arc::new(RecordingSink::new());
        let (workflow, mut rx) = workflow_with(backend, Arc::clone(&sink) as Arc<dyn ImageSink>).await;
        let ledger = workflow.source.frame_ledger();

        let outcome = workflow
            .execute_capture_with(Some(madrid_sample(Utc::now())))
            .await
            .unwrap();
        assert!(outcome.has_geotag());

        let started_id = match next_event(&mut rx) {
            AppEvent::CaptureStarted { capture_id } => capture_id,
            other => panic!("unexpected event: {other:?}"),
        };
        match next_event(&mut rx) {
            AppEvent::CaptureCompleted {
                capture_id,
                outcome: reported,
            } => {
                assert_eq!(capture_id, started_id);
                assert_eq!(reported, outcome);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(workflow.state().await.phase, CapturePhase::Completed);
        assert_eq!(ledger.release_count(), 1);
        assert!(!ledger.is_in_flight());

        let stored = sink.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].mime_type, "image/jpeg");
        assert_eq!(stored[0].relative_path, DEFAULT_RELATIVE_PATH);
        assert!(stored[0].display_name.starts_with("IMG_"));
        assert!(stored[0].display_name.ends_with(".jpg"));
        let decoded = image::load_from_memory(&stored[0].bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[tokio::test]
    async fn cleared_snapshot_after_first_sample_saves_without_geotag() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(8, 6)));
        let (workflow, _rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;

        workflow.update_location(madrid_sample(Utc::now())).await;
        let outcome = workflow.execute_capture_with(None).await.unwrap();
        assert!(!outcome.has_geotag());
    }

    #[tokio::test]
    async fn backend_failure_reports_the_capture_stage() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::failing("hardware busy"));
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;
        let ledger = workflow.source.frame_ledger();

        let err = workflow
            .execute_capture_with(Some(madrid_sample(Utc::now())))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Capture(_)));

        assert!(matches!(next_event(&mut rx), AppEvent::CaptureStarted { .. }));
        match next_event(&mut rx) {
            AppEvent::CaptureFailed { stage, message, .. } => {
                assert_eq!(stage, FailureStage::Capture);
                assert!(message.contains("hardware busy"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(workflow.state().await.phase, CapturePhase::Failed);
        assert!(!ledger.is_in_flight());
        assert_eq!(ledger.release_count(), 0);
    }

    #[tokio::test]
    async fn sink_failure_reports_processing_and_still_releases_the_frame() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(8, 6)));
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::failing())).await;
        let ledger = workflow.source.frame_ledger();

        let err = workflow
            .execute_capture_with(Some(madrid_sample(Utc::now())))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Processing(_)));

        assert!(matches!(next_event(&mut rx), AppEvent::CaptureStarted { .. }));
        match next_event(&mut rx) {
            AppEvent::CaptureFailed { stage, .. } => {
                assert_eq!(stage, FailureStage::Processing);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(ledger.release_count(), 1);
        assert!(!ledger.is_in_flight());

        // The attempt is terminal but the workflow is not: the next
        // trigger runs.
        let err = workflow.execute_capture_with(None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoLocation));
    }

    #[tokio::test]
    async fn second_trigger_while_busy_is_rejected() {
        let release = Arc::new(Notify::new());
        let backend: Arc<dyn CameraBackend> = Arc::new(GatedBackend {
            bytes: png_bytes(8, 6),
            release: Arc::clone(&release),
        });
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;

        let first = {
            let workflow = workflow.clone();
            let sample = madrid_sample(Utc::now());
            tokio::spawn(async move { workflow.execute_capture_with(Some(sample)).await })
        };
        while !workflow.state().await.is_busy() {
            tokio::task::yield_now().await;
        }

        let err = workflow
            .execute_capture_with(Some(madrid_sample(Utc::now())))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CaptureInProgress));

        let err = workflow
            .set_aspect_ratio(CaptureSessionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CaptureInProgress));

        release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.has_geotag());
        assert!(matches!(
            rx.recv().await.unwrap(),
            AppEvent::CaptureStarted { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            AppEvent::CaptureCompleted { .. }
        ));
    }

    #[tokio::test]
    async fn start_feed_without_permission_reports_denied() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(4, 4)));
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;

        let err = workflow.start_location_feed().await.unwrap_err();
        assert!(matches!(err, FeedError::PermissionsDenied));
        assert_eq!(next_event(&mut rx), AppEvent::PermissionsDenied);
    }

    #[tokio::test]
    async fn declined_settings_resolution_reports_and_continues() {
        let backend: Arc<dyn CameraBackend> = Arc::new(StubBackend::with_frame(png_bytes(4, 4)));
        let (workflow, mut rx) = workflow_with(backend, Arc::new(RecordingSink::new())).await;

        workflow.resolve_location_settings(false).await.unwrap();
        assert!(matches!(
            next_event(&mut rx),
            AppEvent::LocationError { .. }
        ));
    }

    #[test]
    fn jpeg_encoding_flattens_alpha() {
        let mut image = RgbaImage::new(10, 10);
        for pixel in image.pixels_mut() {
            *pixel = image::Rgba([200, 100, 50, 128]);
        }
        let bytes = encode_jpeg(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }
}
