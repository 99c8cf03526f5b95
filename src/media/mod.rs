//! Durable storage for finished photos: bytes on disk plus a catalog row
//! in the media index.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Database, MediaItem};
use crate::error::SinkError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Default destination folder, relative to the library root.
pub const DEFAULT_RELATIVE_PATH: &str = "Pictures/Geostamp";
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// What the workflow hands over for storage.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub bytes: Vec<u8>,
    pub display_name: String,
    pub mime_type: String,
    pub relative_path: String,
}

impl StoreRequest {
    pub fn jpeg(
        bytes: Vec<u8>,
        display_name: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            display_name: display_name.into(),
            mime_type: JPEG_MIME_TYPE.to_string(),
            relative_path: relative_path.into(),
        }
    }
}

/// Durable handle to a stored photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentHandle {
    pub id: String,
    pub path: PathBuf,
}

/// Storage boundary for finished photos. The workflow treats any failure
/// here uniformly as a processing failure, whatever the cause.
#[async_trait]
pub trait ImageSink: Send + Sync {
    async fn store(&self, request: StoreRequest) -> Result<ContentHandle, SinkError>;
}

/// Filesystem-plus-index implementation: photo bytes land under the
/// library root, the catalog row makes them queryable.
pub struct MediaLibrary {
    root: PathBuf,
    index: Database,
}

impl MediaLibrary {
    pub fn new(root: PathBuf, index: Database) -> Self {
        Self { root, index }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn persist(&self, request: StoreRequest) -> Result<ContentHandle> {
        let folder = self.root.join(sanitized_relative(&request.relative_path)?);
        let file_name = sanitized_file_name(&request.display_name)?;

        tokio::fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("failed to create destination folder {}", folder.display()))?;

        let file_path = folder.join(file_name);
        let byte_size = request.bytes.len() as u64;
        tokio::fs::write(&file_path, &request.bytes)
            .await
            .with_context(|| format!("failed to write {}", file_path.display()))?;

        let item = MediaItem {
            id: Uuid::new_v4().to_string(),
            display_name: request.display_name,
            mime_type: request.mime_type,
            relative_path: request.relative_path,
            byte_size,
            created_at: Utc::now(),
        };
        if let Err(err) = self.index.insert_media_item(&item).await {
            // Don't leave bytes the catalog knows nothing about.
            let _ = tokio::fs::remove_file(&file_path).await;
            return Err(err.context("failed to catalog stored photo"));
        }

        log_info!(
            "stored {} ({} bytes) at {}",
            item.display_name,
            byte_size,
            file_path.display()
        );

        Ok(ContentHandle {
            id: item.id,
            path: file_path,
        })
    }
}

#[async_trait]
impl ImageSink for MediaLibrary {
    async fn store(&self, request: StoreRequest) -> Result<ContentHandle, SinkError> {
        self.persist(request).await.map_err(SinkError::from)
    }
}

fn sanitized_relative(path: &str) -> Result<PathBuf> {
    let rel = Path::new(path);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("destination path {path:?} escapes the library root");
    }
    Ok(rel.to_path_buf())
}

fn sanitized_file_name(name: &str) -> Result<&str> {
    if name.is_empty() || Path::new(name).file_name() != Some(name.as_ref()) {
        bail!("display name {name:?} is not a bare file name");
    }
    Ok(name)
}
