use anyhow::{Context, Result};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::models::OverlayStyle;

/// Disk-backed overlay style.
///
/// Editing is copy-based: `draft` hands out a private copy, the settings
/// dialog mutates it freely, and only `commit` clamps it, swaps it in
/// whole, and persists. Until then `current` keeps serving the committed
/// value.
pub struct StyleStore {
    path: PathBuf,
    data: RwLock<OverlayStyle>,
}

impl StyleStore {
    /// Opens the store. A missing file means defaults; unparseable
    /// contents fall back to defaults rather than wedging startup.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read overlay style from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            OverlayStyle::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> OverlayStyle {
        self.data.read().unwrap().clone()
    }

    /// Private copy for an edit session. Mutations never leak into
    /// `current` until committed.
    pub fn draft(&self) -> OverlayStyle {
        self.current()
    }

    /// Clamps the draft, swaps it in whole, and persists it. Returns the
    /// value as committed.
    pub fn commit(&self, draft: OverlayStyle) -> Result<OverlayStyle> {
        let committed = draft.clamped();
        {
            let mut guard = self.data.write().unwrap();
            *guard = committed.clone();
            self.persist(&guard)?;
        }
        Ok(committed)
    }

    fn persist(&self, data: &OverlayStyle) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write overlay style to {}", self.path.display()))
    }
}
