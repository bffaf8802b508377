// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::steam::client::{HttpClient, Lookup};
use crate::steam::models::{CatalogInfo, ReviewInfo};
use crate::steam::traits::{CatalogApi, SteamError};

pub const STORE_URL: &str = "https://store.steampowered.com";

/// Steam store client for app details and review summaries
pub struct StoreClient {
    http: HttpClient,
    base_url: String,
}

impl StoreClient {
    pub fn new() -> Result<Self, SteamError> {
        Self::with_base_url(STORE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, SteamError> {
        Ok(Self {
            http: HttpClient::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.http = self.http.with_retry_delay(retry_delay);
        self
    }
}

#[async_trait]
impl CatalogApi for StoreClient {
    async fn app_details(&self, app_id: u32) -> Option<CatalogInfo> {
        let url = format!("{}/api/appdetails/?appids={}&cc=us", self.base_url, app_id);
        self.http
            .get_with_retry(&url, |body| parse_app_details(app_id, body))
            .await
    }

    async fn app_reviews(&self, app_id: u32) -> Option<ReviewInfo> {
        let url = format!(
            "{}/appreviews/{}?json=1&language=all&purchase_type=all&num_per_page=0",
            self.base_url, app_id
        );
        self.http.get_with_retry(&url, parse_app_reviews).await
    }
}

/// `{"<id>": {"success": bool, "data": {...}}}`
///
/// An explicit `success: false` is the store's "no such app". Anything else
/// that does not fit (the store answers `null` when throttling) is retried.
fn parse_app_details(app_id: u32, body: Value) -> Result<Lookup<CatalogInfo>, SteamError> {
    let entry = body
        .get(app_id.to_string())
        .ok_or_else(|| SteamError::Malformed(format!("no entry for app {}", app_id)))?;

    match entry.get("success").and_then(Value::as_bool) {
        Some(true) => {
            let data = entry
                .get("data")
                .cloned()
                .ok_or_else(|| SteamError::Malformed(format!("no data for app {}", app_id)))?;
            serde_json::from_value(data)
                .map(Lookup::Found)
                .map_err(|e| SteamError::Malformed(e.to_string()))
        }
        Some(false) => Ok(Lookup::NotFound),
        None => Err(SteamError::Malformed(format!(
            "missing success flag for app {}",
            app_id
        ))),
    }
}

/// `{"success": 1, "query_summary": {...}}`
fn parse_app_reviews(body: Value) -> Result<Lookup<ReviewInfo>, SteamError> {
    match body.get("success").and_then(Value::as_i64) {
        Some(1) => {
            let summary = body
                .get("query_summary")
                .cloned()
                .ok_or_else(|| SteamError::Malformed("no query_summary".to_string()))?;
            serde_json::from_value(summary)
                .map(Lookup::Found)
                .map_err(|e| SteamError::Malformed(e.to_string()))
        }
        Some(_) => Ok(Lookup::NotFound),
        None => Err(SteamError::Malformed("missing success flag".to_string())),
    }
}
