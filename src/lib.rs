//! Capture-and-geotag pipeline for field survey photography.
//!
//! Wires a camera backend, a location feed, and an image sink into one
//! [`CaptureWorkflow`]: every captured photo is rotated upright, stamped
//! with a formatted location block, encoded as JPEG, and cataloged in a
//! local media library. Platform specifics (the actual camera, the actual
//! positioning service) stay behind traits so the pipeline runs the same
//! on any host.

pub mod camera;
pub mod db;
pub mod error;
pub mod location;
pub mod media;
pub mod models;
pub mod overlay;
pub mod settings;
pub mod utils;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

pub use camera::{CameraBackend, CaptureSource, EncodedFrame};
pub use db::{Database, MediaItem};
pub use error::{CaptureError, FeedError, GeocodeError, PositionError, SinkError, WorkflowError};
pub use location::{Geocoder, LocationFeed, LocationProvider};
pub use media::{ContentHandle, ImageSink, MediaLibrary, StoreRequest};
pub use models::{
    AspectRatio, CaptureSessionConfig, LocationSample, OverlayStyle, Place, PositionFix, Rotation,
    SettingsResolution,
};
pub use overlay::OverlayComposer;
pub use settings::StyleStore;
pub use workflow::{AppEvent, CaptureOutcome, CaptureWorkflow, FailureStage, WorkflowState};

/// Filesystem layout and display parameters for one app instance.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Catalog database and settings live here.
    pub data_dir: PathBuf,
    /// Stored photos land under here.
    pub library_root: PathBuf,
    /// Display density multiplier for overlay text sizing.
    pub display_density: f32,
}

impl AppConfig {
    pub fn new(data_dir: PathBuf, library_root: PathBuf) -> Self {
        Self {
            data_dir,
            library_root,
            display_density: 1.0,
        }
    }
}

/// One wired app instance: catalog, style settings, and the capture
/// workflow. The embedding UI keeps this alive for the session.
pub struct App {
    pub db: Database,
    pub style: StyleStore,
    pub workflow: CaptureWorkflow,
}

impl App {
    /// Builds the full pipeline around the supplied platform adapters and
    /// returns the event stream an embedding UI subscribes to.
    pub fn bootstrap(
        config: AppConfig,
        camera: Arc<dyn CameraBackend>,
        provider: Arc<dyn LocationProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Result<(App, mpsc::UnboundedReceiver<AppEvent>)> {
        std::fs::create_dir_all(&config.data_dir)?;

        let database = Database::new(config.data_dir.join("geostamp.sqlite3"))?;
        let style = StyleStore::new(config.data_dir.join("style.json"))?;

        let library = Arc::new(MediaLibrary::new(config.library_root, database.clone()));
        let source = CaptureSource::new(camera);
        let composer = OverlayComposer::with_density(config.display_density)?;
        let feed = LocationFeed::new(provider, geocoder);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let workflow = CaptureWorkflow::new(source, composer, library, feed, events_tx);
        workflow.set_style(style.current());

        Ok((
            App {
                db: database,
                style,
                workflow,
            },
            events_rx,
        ))
    }

    /// Commits an edited style and pushes it into the running workflow.
    pub fn commit_style(&self, draft: OverlayStyle) -> Result<OverlayStyle> {
        let committed = self.style.commit(draft)?;
        self.workflow.set_style(committed.clone());
        Ok(committed)
    }

    /// Catalog listing, newest first.
    pub async fn list_photos(&self) -> Result<Vec<MediaItem>> {
        self.db.list_media_items().await
    }
}
