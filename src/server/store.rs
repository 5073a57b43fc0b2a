//! Persistent selection history.

use crate::error::{InspectorError, Result};
use crate::payload::{ElementSelected, HistoryRecord};
use crate::server::schema::init_schema;
use async_trait::async_trait;
use rusqlite::params;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Storage for received selections
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a selection and return its row id
    async fn insert(&self, event: &ElementSelected) -> Result<i64>;

    /// Up to `limit` selections, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>>;

    async fn count(&self) -> Result<usize>;
}

fn storage_error(e: impl std::fmt::Display) -> InspectorError {
    InspectorError::Storage(e.to_string())
}

/// Parse a JSON column; a corrupt value reads back as `null`
fn decode_column(id: i64, column: &str, raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::warn!("Corrupt {} in history row {}: {}", column, id, e);
        serde_json::Value::Null
    })
}

/// SQLite-backed history, run on a dedicated connection thread.
pub struct SqliteHistoryStore {
    conn: Connection,
    retention: Option<usize>,
}

impl SqliteHistoryStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await.map_err(storage_error)?;
        Self::init(conn).await
    }

    /// Open or create a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening history database at {}", path.display());
        let conn = Connection::open(path).await.map_err(storage_error)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(storage_error)?;
        Ok(Self { conn, retention: None })
    }

    /// Builder method: keep at most `retention` rows, pruning the oldest
    pub fn with_retention(mut self, retention: Option<usize>) -> Self {
        self.retention = retention;
        self
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn insert(&self, event: &ElementSelected) -> Result<i64> {
        let attributes = serde_json::to_string(&event.attributes)?;
        let full_data = serde_json::to_string(event)?;
        let timestamp = event.timestamp.to_rfc3339();
        let event = event.clone();
        let retention = self.retention.map(|n| n as i64);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT INTO elements (tagName, elementId, className, url, xpath, cssSelector, attributes, elementText, timestamp, fullData)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        event.tag_name,
                        event.id,
                        event.class_name,
                        event.url,
                        event.xpath,
                        event.css_selector,
                        attributes,
                        event.text,
                        timestamp,
                        full_data
                    ],
                )?;
                let id = tx.last_insert_rowid();

                if let Some(keep) = retention {
                    let pruned = tx.execute(
                        "DELETE FROM elements WHERE id NOT IN (SELECT id FROM elements ORDER BY id DESC LIMIT ?1)",
                        [keep],
                    )?;
                    if pruned > 0 {
                        log::debug!("Pruned {} history rows", pruned);
                    }
                }

                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(storage_error)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = limit as i64;
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tagName, elementId, className, url, xpath, cssSelector, attributes, elementText, timestamp, fullData
                     FROM elements ORDER BY id DESC LIMIT ?1",
                )?;

                let records = stmt
                    .query_map([limit], |row| {
                        let id: i64 = row.get(0)?;
                        let attributes: String = row.get(7)?;
                        let full_data: String = row.get(10)?;
                        Ok(HistoryRecord {
                            id,
                            tag_name: row.get(1)?,
                            element_id: row.get(2)?,
                            class_name: row.get(3)?,
                            url: row.get(4)?,
                            xpath: row.get(5)?,
                            css_selector: row.get(6)?,
                            attributes: decode_column(id, "attributes", &attributes),
                            element_text: row.get(8)?,
                            timestamp: row.get(9)?,
                            full_data: decode_column(id, "fullData", &full_data),
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(records)
            })
            .await
            .map_err(storage_error)
    }

    async fn count(&self) -> Result<usize> {
        self.conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(storage_error)
    }
}
