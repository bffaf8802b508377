// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::mapping::OutputPayload;
use crate::notion::{Destination, NotionError, RecordPage, SyncRecord};
use crate::state::{SqliteStateStore, StateStore, SyncState};
use crate::steam::{CatalogApi, CatalogInfo, ReviewInfo, SessionApi, SessionInfo, SteamError};

pub const OWN_ACTOR: &str = "bot-integration";

/// Initialized sync state over an in-memory SQLite store
pub async fn setup_test_state() -> SyncState {
    let store: Arc<dyn StateStore> =
        Arc::new(SqliteStateStore::new(Path::new(":memory:")).await.unwrap());
    let state = SyncState::new(store);
    state.initialize().await.unwrap();
    state
}

struct FakePage {
    id: String,
    app_id: u32,
    last_edited_by: String,
    edited_at: DateTime<Utc>,
}

#[derive(Default)]
struct DestinationInner {
    pages: Vec<FakePage>,
    updates: Vec<(String, OutputPayload)>,
    failing_pages: HashSet<String>,
}

/// In-memory destination. Cursors are offsets into the filtered page list.
pub struct FakeDestination {
    inner: Mutex<DestinationInner>,
    page_size: usize,
    queries: AtomicUsize,
    fail_queries: AtomicBool,
}

impl FakeDestination {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(DestinationInner::default()),
            page_size,
            queries: AtomicUsize::new(0),
            fail_queries: AtomicBool::new(false),
        }
    }

    /// Add a page, or edit it if it exists, as `editor` right now
    pub fn add_page(&self, id: &str, app_id: u32, editor: &str) {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        match inner.pages.iter_mut().find(|page| page.id == id) {
            Some(page) => {
                page.app_id = app_id;
                page.last_edited_by = editor.to_string();
                page.edited_at = now;
            }
            None => inner.pages.push(FakePage {
                id: id.to_string(),
                app_id,
                last_edited_by: editor.to_string(),
                edited_at: now,
            }),
        }
    }

    pub fn fail_updates_for(&self, page_id: &str) {
        self.inner.lock().unwrap().failing_pages.insert(page_id.to_string());
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Page ids in the order they were successfully updated
    pub fn updated_pages(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.updates.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn last_payload(&self, page_id: &str) -> Option<OutputPayload> {
        let inner = self.inner.lock().unwrap();
        inner
            .updates
            .iter()
            .rev()
            .find(|(id, _)| id == page_id)
            .map(|(_, payload)| payload.clone())
    }
}

#[async_trait]
impl Destination for FakeDestination {
    async fn query_changed(
        &self,
        since: DateTime<Utc>,
        cursor: Option<String>,
    ) -> Result<RecordPage, NotionError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(NotionError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let inner = self.inner.lock().unwrap();
        let matching: Vec<SyncRecord> = inner
            .pages
            .iter()
            .filter(|page| page.edited_at > since)
            .map(|page| SyncRecord {
                page_id: page.id.clone(),
                app_id: page.app_id,
                last_edited_by: page.last_edited_by.clone(),
            })
            .collect();

        let offset = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let end = (offset + self.page_size).min(matching.len());
        let records = matching.get(offset..end).map(<[SyncRecord]>::to_vec).unwrap_or_default();
        let next_cursor = (end < matching.len()).then(|| end.to_string());

        Ok(RecordPage {
            records,
            next_cursor,
        })
    }

    async fn update_page(&self, page_id: &str, payload: &OutputPayload) -> Result<(), NotionError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_pages.contains(page_id) {
            return Err(NotionError::Api {
                status: 500,
                body: "write failed".to_string(),
            });
        }

        if let Some(page) = inner.pages.iter_mut().find(|page| page.id == page_id) {
            page.last_edited_by = OWN_ACTOR.to_string();
            page.edited_at = Utc::now();
        }
        inner.updates.push((page_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn own_actor_id(&self) -> Result<String, NotionError> {
        Ok(OWN_ACTOR.to_string())
    }
}

/// Store API fake; unknown apps come back as `None`
#[derive(Default)]
pub struct FakeCatalog {
    pub details: HashMap<u32, CatalogInfo>,
    pub reviews: HashMap<u32, ReviewInfo>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    /// Number of app details lookups made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn app_details(&self, app_id: u32) -> Option<CatalogInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.details.get(&app_id).cloned()
    }

    async fn app_reviews(&self, app_id: u32) -> Option<ReviewInfo> {
        self.reviews.get(&app_id).cloned()
    }
}

/// Session fake that knows every app as "Game <id>" with tags 1 and 2
#[derive(Default)]
pub struct FakeSession {
    pub fail_product_info: bool,
    pub tag_languages: Vec<String>,
    batches: Mutex<Vec<Vec<u32>>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            tag_languages: vec!["english".to_string()],
            ..Self::default()
        }
    }

    /// Session whose product info requests always fail
    pub fn failing() -> Self {
        Self {
            fail_product_info: true,
            ..Self::new()
        }
    }

    /// App ids of every product info request
    pub fn batches(&self) -> Vec<Vec<u32>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionApi for FakeSession {
    async fn product_info(&self, app_ids: &[u32]) -> Result<HashMap<u32, SessionInfo>, SteamError> {
        self.batches.lock().unwrap().push(app_ids.to_vec());
        if self.fail_product_info {
            return Err(SteamError::Malformed("session dropped".to_string()));
        }

        Ok(app_ids
            .iter()
            .map(|&app_id| {
                let info = SessionInfo {
                    app_id,
                    name: Some(format!("Game {}", app_id)),
                    store_tags: vec![1, 2],
                    ..SessionInfo::default()
                };
                (app_id, info)
            })
            .collect())
    }

    async fn tag_names(&self, tag_ids: &[u32], language: &str) -> Result<Vec<String>, SteamError> {
        if !self.tag_languages.iter().any(|l| l == language) {
            return Err(SteamError::Malformed(format!("invalid language {}", language)));
        }
        Ok(tag_ids.iter().map(|id| format!("Tag {}", id)).collect())
    }
}
