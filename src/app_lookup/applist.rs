// SPDX-License-Identifier: GPL-3.0-only
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::steam::client::{HttpClient, Lookup};
use crate::steam::traits::SteamError;

pub const APP_LIST_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";

/// One entry of the public Steam app list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SteamApp {
    pub appid: u32,
    pub name: String,
}

/// Client for the public app list endpoint
pub struct AppListClient {
    http: HttpClient,
    url: String,
}

impl AppListClient {
    pub fn new() -> Result<Self, SteamError> {
        Self::with_url(APP_LIST_URL)
    }

    pub fn with_url(url: &str) -> Result<Self, SteamError> {
        Ok(Self {
            http: HttpClient::new()?,
            url: url.to_string(),
        })
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.http = self.http.with_retry_delay(retry_delay);
        self
    }

    /// Every app Steam knows about; `None` once retries are exhausted
    pub async fn fetch(&self) -> Option<Vec<SteamApp>> {
        self.http.get_with_retry(&self.url, parse_app_list).await
    }
}

/// `{"applist": {"apps": [{"appid": 10, "name": "Counter-Strike"}, ...]}}`
fn parse_app_list(body: Value) -> Result<Lookup<Vec<SteamApp>>, SteamError> {
    let apps = body
        .get("applist")
        .and_then(|list| list.get("apps"))
        .cloned()
        .ok_or_else(|| SteamError::Malformed("no applist.apps".to_string()))?;

    serde_json::from_value(apps)
        .map(Lookup::Found)
        .map_err(|e| SteamError::Malformed(e.to_string()))
}
