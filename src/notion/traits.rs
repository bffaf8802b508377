// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::mapping::OutputPayload;

#[derive(thiserror::Error, Debug)]
pub enum NotionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notion API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Still rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Properties missing from the data source: {}", .0.join(", "))]
    MissingProperties(Vec<String>),
}

/// A destination page carrying a Steam App ID, seen during one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub page_id: String,
    pub app_id: u32,
    /// User id of whoever edited the page last
    pub last_edited_by: String,
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<SyncRecord>,
    /// Cursor for the following page; `None` on the last page
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait Destination: Send + Sync {
    /// Pages edited after `since` that have an App ID, starting at `cursor`
    async fn query_changed(
        &self,
        since: DateTime<Utc>,
        cursor: Option<String>,
    ) -> Result<RecordPage, NotionError>;

    /// Overwrite the payload's properties, cover and icon on a page
    async fn update_page(&self, page_id: &str, payload: &OutputPayload) -> Result<(), NotionError>;

    /// User id the integration writes as
    async fn own_actor_id(&self) -> Result<String, NotionError>;
}
