// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::state::traits::{StateError, StateStore};

/// Watermark: destination edits up to this instant have been processed
pub const LAST_UPDATED_AT: &str = "lastUpdatedAt";
/// The integration's own destination user id
pub const ACTOR_ID: &str = "actorId";
/// Steam refresh token kept across restarts
pub const SESSION_TOKEN: &str = "sessionToken";

const RESERVED_KEYS: [&str; 3] = [LAST_UPDATED_AT, ACTOR_ID, SESSION_TOKEN];

/// Minimum delay before a configured reset wipes the store
pub const RESET_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Typed view over the state store.
///
/// Every non-reserved key is a destination page id mapped to the Steam App ID
/// it was last fully processed with.
#[derive(Clone)]
pub struct SyncState {
    store: Arc<dyn StateStore>,
}

impl SyncState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Set the watermark to the epoch if it has never been written
    pub async fn initialize(&self) -> Result<(), StateError> {
        if self.store.get(LAST_UPDATED_AT).await?.is_none() {
            self.set_last_updated_at(DateTime::<Utc>::UNIX_EPOCH).await?;
            info!("Initialized local state; every page will be treated as new");
        }
        Ok(())
    }

    pub async fn last_updated_at(&self) -> Result<DateTime<Utc>, StateError> {
        let raw = self
            .store
            .get(LAST_UPDATED_AT)
            .await?
            .ok_or_else(|| StateError::NotFound(LAST_UPDATED_AT.to_string()))?;

        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StateError::InvalidValue {
                key: LAST_UPDATED_AT.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn set_last_updated_at(&self, at: DateTime<Utc>) -> Result<(), StateError> {
        self.store
            .put(LAST_UPDATED_AT, &at.to_rfc3339_opts(SecondsFormat::Millis, true))
            .await
    }

    pub async fn actor_id(&self) -> Result<Option<String>, StateError> {
        self.store.get(ACTOR_ID).await
    }

    pub async fn set_actor_id(&self, actor_id: &str) -> Result<(), StateError> {
        self.store.put(ACTOR_ID, actor_id).await
    }

    pub async fn session_token(&self) -> Result<Option<String>, StateError> {
        self.store.get(SESSION_TOKEN).await
    }

    pub async fn set_session_token(&self, token: &str) -> Result<(), StateError> {
        self.store.put(SESSION_TOKEN, token).await
    }

    /// App IDs last processed for each page, aligned with `page_ids`
    pub async fn tracked_app_ids(&self, page_ids: &[String]) -> Result<Vec<Option<u32>>, StateError> {
        let values = self.store.get_many(page_ids).await?;

        Ok(page_ids
            .iter()
            .zip(values)
            .map(|(page_id, value)| {
                let raw = value?;
                match raw.parse::<u32>() {
                    Ok(app_id) => Some(app_id),
                    Err(_) => {
                        warn!(page_id = %page_id, value = %raw, "Ignoring unparsable stored App ID");
                        None
                    }
                }
            })
            .collect())
    }

    /// Mark a page as fully processed with `app_id`
    pub async fn record_processed(&self, page_id: &str, app_id: u32) -> Result<(), StateError> {
        if RESERVED_KEYS.contains(&page_id) {
            return Err(StateError::InvalidValue {
                key: page_id.to_string(),
                reason: "page id collides with a reserved state key".to_string(),
            });
        }
        self.store.put(page_id, &app_id.to_string()).await
    }

    /// Wipe all state after `grace`, then re-initialize the watermark.
    ///
    /// Irreversible: afterwards every destination page is processed again.
    pub async fn reset(&self, grace: Duration) -> Result<(), StateError> {
        warn!(
            grace_secs = grace.as_secs(),
            "Local state reset requested; stop the process now to abort"
        );
        tokio::time::sleep(grace).await;

        self.store.clear().await?;
        self.initialize().await?;
        warn!("Local state was reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SqliteStateStore;
    use std::path::Path;

    async fn setup_state() -> (SyncState, Arc<dyn StateStore>) {
        let store: Arc<dyn StateStore> =
            Arc::new(SqliteStateStore::new(Path::new(":memory:")).await.unwrap());
        (SyncState::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_watermark_missing_before_initialize() {
        let (state, _) = setup_state().await;
        assert!(matches!(state.last_updated_at().await, Err(StateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_initialize_sets_epoch() {
        let (state, store) = setup_state().await;
        state.initialize().await.unwrap();
        assert_eq!(state.last_updated_at().await.unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(
            store.get(LAST_UPDATED_AT).await.unwrap().as_deref(),
            Some("1970-01-01T00:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_watermark() {
        let (state, _) = setup_state().await;
        let at = "2024-05-01T12:30:00Z".parse::<DateTime<Utc>>().unwrap();
        state.set_last_updated_at(at).await.unwrap();
        state.initialize().await.unwrap();
        assert_eq!(state.last_updated_at().await.unwrap(), at);
    }

    #[tokio::test]
    async fn test_invalid_watermark() {
        let (state, store) = setup_state().await;
        store.put(LAST_UPDATED_AT, "yesterday").await.unwrap();
        assert!(matches!(
            state.last_updated_at().await,
            Err(StateError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_tracked_app_ids() {
        let (state, store) = setup_state().await;
        state.record_processed("page-a", 730).await.unwrap();
        store.put("page-c", "garbage").await.unwrap();

        let ids = vec!["page-a".to_string(), "page-b".to_string(), "page-c".to_string()];
        assert_eq!(state.tracked_app_ids(&ids).await.unwrap(), vec![Some(730), None, None]);
    }

    #[tokio::test]
    async fn test_record_processed_rejects_reserved_key() {
        let (state, _) = setup_state().await;
        assert!(state.record_processed(LAST_UPDATED_AT, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_actor_and_session_token() {
        let (state, _) = setup_state().await;
        assert_eq!(state.actor_id().await.unwrap(), None);
        state.set_actor_id("bot-1").await.unwrap();
        state.set_session_token("eyJ.token.sig").await.unwrap();
        assert_eq!(state.actor_id().await.unwrap().as_deref(), Some("bot-1"));
        assert_eq!(state.session_token().await.unwrap().as_deref(), Some("eyJ.token.sig"));
    }

    #[tokio::test]
    async fn test_reset_wipes_pages_and_restores_epoch() {
        let (state, _) = setup_state().await;
        state.initialize().await.unwrap();
        state.record_processed("page-a", 730).await.unwrap();
        state.set_actor_id("bot-1").await.unwrap();
        state
            .set_last_updated_at("2024-05-01T12:30:00Z".parse().unwrap())
            .await
            .unwrap();

        state.reset(Duration::ZERO).await.unwrap();

        assert_eq!(state.last_updated_at().await.unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(state.tracked_app_ids(&["page-a".to_string()]).await.unwrap(), vec![None]);
        assert_eq!(state.actor_id().await.unwrap(), None);
    }

    #[test]
    fn test_reset_grace_period_is_at_least_ten_seconds() {
        assert!(RESET_GRACE_PERIOD >= Duration::from_secs(10));
    }
}
