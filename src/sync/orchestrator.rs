// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::TryStreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{Capabilities, Config};
use crate::mapping::{FieldMapper, MappingError, UpstreamData};
use crate::notion::{Destination, NotionError, SyncRecord, changed_records};
use crate::state::{StateError, SyncState};
use crate::steam::{CatalogApi, SessionApi, SessionInfo, SteamError, TagNames};
use crate::sync::report::CycleReport;

/// Subtracted from the cycle start when committing the watermark, so edits
/// that were not yet visible to the query are picked up next time
pub const WATERMARK_SAFETY_MARGIN: TimeDelta = TimeDelta::seconds(60);

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Destination error: {0}")]
    Destination(#[from] NotionError),
}

/// Failure of a single page; the cycle continues
#[derive(thiserror::Error, Debug)]
enum ItemError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("write failed: {0}")]
    Destination(#[from] NotionError),

    #[error("state commit failed: {0}")]
    State(#[from] StateError),
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub rate_limited_interval: Duration,
    /// Per-cycle cap while the store API is in use
    pub batch_size: usize,
    pub always_update: bool,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            rate_limited_interval: Duration::from_secs(config.rate_limited_interval_secs),
            batch_size: config.batch_size,
            always_update: config.always_update,
        }
    }
}

/// Upstream services, present only when an enabled field needs them
#[derive(Clone, Default)]
pub struct Upstreams {
    pub catalog: Option<Arc<dyn CatalogApi>>,
    pub session: Option<Arc<dyn SessionApi>>,
}

pub struct SyncOrchestrator {
    destination: Arc<dyn Destination>,
    upstreams: Upstreams,
    state: SyncState,
    mapper: FieldMapper,
    capabilities: Capabilities,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(
        destination: Arc<dyn Destination>,
        upstreams: Upstreams,
        state: SyncState,
        mapper: FieldMapper,
        capabilities: Capabilities,
        settings: SyncSettings,
    ) -> Self {
        Self {
            destination,
            upstreams,
            state,
            mapper,
            capabilities,
            settings,
        }
    }

    /// Record the integration's own user id once, if edits must be told apart
    pub async fn initialize(&self) -> Result<(), SyncError> {
        if !self.capabilities.actor_tracking {
            return Ok(());
        }

        if let Some(actor_id) = self.state.actor_id().await? {
            debug!(actor_id = %actor_id, "Using stored actor id");
            return Ok(());
        }

        let actor_id = self.destination.own_actor_id().await?;
        self.state.set_actor_id(&actor_id).await?;
        info!(actor_id = %actor_id, "Stored integration actor id");
        Ok(())
    }

    /// Poll forever. Cycles never overlap.
    pub async fn run(&self) {
        loop {
            let interval = match self.run_cycle().await {
                Ok(report) if report.hit_rate_limit => self.settings.rate_limited_interval,
                Ok(_) => self.settings.poll_interval,
                Err(e) => {
                    error!(error = %e, "Sync cycle failed");
                    self.settings.poll_interval
                }
            };

            debug!(sleep_secs = interval.as_secs(), "Waiting for next cycle");
            tokio::time::sleep(interval).await;
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let cycle_start = Utc::now();
        let since = self.state.last_updated_at().await?;
        debug!(since = %since, "Discovering changed pages");

        let pages: Vec<Vec<SyncRecord>> =
            changed_records(self.destination.as_ref(), since, None)
                .try_collect()
                .await?;
        let records: Vec<SyncRecord> = pages.into_iter().flatten().collect();

        let mut report = CycleReport {
            discovered: records.len(),
            ..CycleReport::default()
        };

        let mut batch = self.filter_eligible(records).await?;
        report.eligible = batch.len();

        if batch.len() > self.settings.batch_size && self.capabilities.store_api() {
            info!(
                eligible = batch.len(),
                cap = self.settings.batch_size,
                "More pages than the store API allows per cycle; deferring the rest"
            );
            batch.truncate(self.settings.batch_size);
            report.hit_rate_limit = true;
        }

        if batch.is_empty() {
            return self.commit(cycle_start, report).await;
        }

        let sessions = match self.fetch_sessions(&batch).await {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(error = %e, apps = batch.len(), "Product info lookup failed; skipping this cycle");
                report.failed = batch.len();
                report.log();
                return Ok(report);
            }
        };

        for record in &batch {
            match self.process(record, sessions.as_ref()).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    error!(
                        page_id = %record.page_id,
                        app_id = record.app_id,
                        error = %e,
                        "Failed to sync page"
                    );
                    report.failed += 1;
                }
            }
        }

        self.commit(cycle_start, report).await
    }

    async fn commit(
        &self,
        cycle_start: DateTime<Utc>,
        mut report: CycleReport,
    ) -> Result<CycleReport, SyncError> {
        if report.failed == 0 && !report.hit_rate_limit {
            self.state
                .set_last_updated_at(cycle_start - WATERMARK_SAFETY_MARGIN)
                .await?;
            report.watermark_advanced = true;
        }

        report.log();
        Ok(report)
    }

    /// Drop pages whose App ID was already synced, or in always-update mode,
    /// pages whose last edit is the integration's own write
    async fn filter_eligible(&self, records: Vec<SyncRecord>) -> Result<Vec<SyncRecord>, SyncError> {
        let mut seen = HashSet::new();
        let records: Vec<SyncRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.page_id.clone()))
            .collect();

        let page_ids: Vec<String> = records.iter().map(|r| r.page_id.clone()).collect();
        let stored = self.state.tracked_app_ids(&page_ids).await?;

        let own_actor = if self.settings.always_update {
            self.state.actor_id().await?
        } else {
            None
        };

        Ok(records
            .into_iter()
            .zip(stored)
            .filter(|(record, stored)| {
                if self.settings.always_update {
                    let own_edit = own_actor.as_deref() == Some(record.last_edited_by.as_str());
                    !(own_edit && stored.is_some())
                } else {
                    *stored != Some(record.app_id)
                }
            })
            .map(|(record, _)| record)
            .collect())
    }

    /// One batched product info lookup for the whole cycle
    async fn fetch_sessions(
        &self,
        batch: &[SyncRecord],
    ) -> Result<Option<HashMap<u32, SessionInfo>>, SteamError> {
        let Some(session) = self.upstreams.session.as_ref().filter(|_| self.capabilities.session) else {
            return Ok(None);
        };

        let mut app_ids: Vec<u32> = batch.iter().map(|r| r.app_id).collect();
        app_ids.sort_unstable();
        app_ids.dedup();

        session.product_info(&app_ids).await.map(Some)
    }

    async fn process(
        &self,
        record: &SyncRecord,
        sessions: Option<&HashMap<u32, SessionInfo>>,
    ) -> Result<(), ItemError> {
        let app_id = record.app_id;
        let session = sessions.and_then(|infos| infos.get(&app_id)).cloned();

        let catalog = match &self.upstreams.catalog {
            Some(catalog) if self.capabilities.catalog => catalog.app_details(app_id).await,
            _ => None,
        };
        let reviews = match &self.upstreams.catalog {
            Some(catalog) if self.capabilities.reviews => catalog.app_reviews(app_id).await,
            _ => None,
        };
        let tag_names = self.resolve_tags(app_id, session.as_ref()).await;

        let data = UpstreamData {
            catalog,
            session,
            reviews,
            tag_names,
        };
        let payload = self.mapper.map_fields(app_id, &data)?;

        self.destination.update_page(&record.page_id, &payload).await?;
        self.state.record_processed(&record.page_id, app_id).await?;

        debug!(page_id = %record.page_id, app_id, "Synced page");
        Ok(())
    }

    async fn resolve_tags(&self, app_id: u32, info: Option<&SessionInfo>) -> Option<TagNames> {
        if !self.capabilities.tags {
            return None;
        }
        let session = self.upstreams.session.as_ref()?;
        let language = self.mapper.tag_language()?;
        let tag_ids = info.map(|i| i.store_tags.as_slice()).filter(|ids| !ids.is_empty())?;

        match session.tag_names(tag_ids, language).await {
            Ok(names) => Some(TagNames::Resolved(names)),
            Err(e) => {
                warn!(app_id, language, error = %e, "Tag name lookup failed");
                Some(TagNames::Failed)
            }
        }
    }
}
