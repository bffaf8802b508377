// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::collections::HashMap;

use crate::state::StateError;
use crate::steam::models::{CatalogInfo, ReviewInfo, SessionInfo};

#[derive(thiserror::Error, Debug)]
pub enum SteamError {
    #[error("Failed to discover Steam servers: {0}")]
    ServerDiscovery(#[from] steam_vent::ServerDiscoveryError),

    #[error("Failed to connect to Steam: {0}")]
    Connection(#[from] steam_vent::ConnectionError),

    #[error("Network error: {0}")]
    Network(#[from] steam_vent::NetworkError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("No usable Steam login: {0}")]
    NoUsableLogin(String),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Public store API: one call per app, unauthenticated, rate limited by Steam.
///
/// Both lookups degrade to `None` instead of failing: a missing catalog entry
/// only means the fields sourced from it are unavailable.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Store details for an app; `None` if the app is unknown or retries ran out
    async fn app_details(&self, app_id: u32) -> Option<CatalogInfo>;

    /// Review summary for an app; `None` if unavailable
    async fn app_reviews(&self, app_id: u32) -> Option<ReviewInfo>;
}

/// Authenticated Steam session
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Product info for a batch of apps. Apps Steam does not know are absent from the map.
    async fn product_info(&self, app_ids: &[u32]) -> Result<HashMap<u32, SessionInfo>, SteamError>;

    /// Localized tag names, in the order of `tag_ids`
    async fn tag_names(&self, tag_ids: &[u32], language: &str) -> Result<Vec<String>, SteamError>;
}
