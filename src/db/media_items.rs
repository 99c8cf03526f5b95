use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::connection::Database;
use super::helpers::{parse_datetime, to_i64, to_u64};

/// One row of the media index: a stored photo's catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub display_name: String,
    pub mime_type: String,
    pub relative_path: String,
    pub byte_size: u64,
    pub created_at: DateTime<Utc>,
}

fn row_to_media_item(row: &Row) -> Result<MediaItem> {
    let created_at: String = row.get("created_at")?;
    let byte_size: i64 = row.get("byte_size")?;

    Ok(MediaItem {
        id: row.get("id")?,
        display_name: row.get("display_name")?,
        mime_type: row.get("mime_type")?,
        relative_path: row.get("relative_path")?,
        byte_size: to_u64(byte_size, "byte_size")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_media_item(&self, item: &MediaItem) -> Result<()> {
        let record = item.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO media_items (id, display_name, mime_type, relative_path, byte_size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.display_name,
                    record.mime_type,
                    record.relative_path,
                    to_i64(record.byte_size)?,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_media_item(&self, id: &str) -> Result<Option<MediaItem>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, mime_type, relative_path, byte_size, created_at
                 FROM media_items
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_media_item(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Newest first, the way a gallery lists them.
    pub async fn list_media_items(&self) -> Result<Vec<MediaItem>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, mime_type, relative_path, byte_size, created_at
                 FROM media_items
                 ORDER BY created_at DESC, id",
            )?;

            let mut rows = stmt.query([])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(row_to_media_item(row)?);
            }
            Ok(items)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, name: &str, at: DateTime<Utc>) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            display_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            relative_path: "Pictures/Geostamp".to_string(),
            byte_size: 12_345,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("index.sqlite3")).unwrap();
        let stored = item(
            "a1",
            "IMG_1718443805000.jpg",
            Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 5).unwrap(),
        );
        db.insert_media_item(&stored).await.unwrap();

        let loaded = db.get_media_item("a1").await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(db.get_media_item("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("index.sqlite3")).unwrap();
        let older = item("a1", "IMG_1.jpg", Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap());
        let newer = item("a2", "IMG_2.jpg", Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap());
        db.insert_media_item(&older).await.unwrap();
        db.insert_media_item(&newer).await.unwrap();

        let listed = db.list_media_items().await.unwrap();
        assert_eq!(listed, vec![newer, older]);
    }

    #[tokio::test]
    async fn reopening_existing_index_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.sqlite3");
        {
            let db = Database::new(path.clone()).unwrap();
            db.insert_media_item(&item("a1", "IMG_1.jpg", Utc::now()))
                .await
                .unwrap();
        }
        let db = Database::new(path).unwrap();
        assert_eq!(db.list_media_items().await.unwrap().len(), 1);
    }
}
