// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::mapping::OutputPayload;
use crate::notion::traits::{Destination, NotionError, RecordPage, SyncRecord};

pub const NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2025-09-03";

const PAGE_SIZE: u32 = 100;
const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Connection settings for [`NotionClient::connect`]
#[derive(Clone)]
pub struct NotionSettings {
    pub api_key: String,
    pub database_id: String,
    pub data_source_id: Option<String>,
    /// Number property holding the Steam App ID
    pub app_id_property: String,
    pub base_url: String,
}

/// Notion REST client bound to one data source
#[derive(Clone)]
pub struct NotionClient {
    client: Client,
    base_url: String,
    api_key: String,
    data_source_id: String,
    app_id_property: String,
}

#[derive(Deserialize)]
struct DatabaseResponse {
    #[serde(default)]
    data_sources: Vec<DataSourceRef>,
}

#[derive(Deserialize)]
struct DataSourceRef {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct DataSourceResponse {
    #[serde(default)]
    properties: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<PageObject>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct PageObject {
    id: String,
    last_edited_by: UserRef,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct UserRef {
    id: String,
}

impl NotionClient {
    /// Build the client and resolve which data source of the database to sync
    pub async fn connect(settings: NotionSettings) -> Result<Self, NotionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("steam-notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut notion = Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            data_source_id: String::new(),
            app_id_property: settings.app_id_property,
        };

        notion.data_source_id = notion
            .resolve_data_source(&settings.database_id, settings.data_source_id.as_deref())
            .await?;
        info!(data_source_id = %notion.data_source_id, "Using Notion data source");

        Ok(notion)
    }

    async fn resolve_data_source(
        &self,
        database_id: &str,
        configured: Option<&str>,
    ) -> Result<String, NotionError> {
        let database: DatabaseResponse = self
            .send(Method::GET, &format!("databases/{}", database_id), None)
            .await?;

        match configured {
            Some(id) => {
                let wanted = normalize_id(id);
                database
                    .data_sources
                    .into_iter()
                    .find(|source| normalize_id(&source.id) == wanted)
                    .map(|source| source.id)
                    .ok_or_else(|| {
                        NotionError::DataSource(format!(
                            "data source {} is not part of database {}",
                            id, database_id
                        ))
                    })
            }
            None => {
                let mut sources = database.data_sources;
                if sources.len() != 1 {
                    let names: Vec<String> = sources
                        .iter()
                        .map(|s| format!("{} ({})", s.name.as_deref().unwrap_or("unnamed"), s.id))
                        .collect();
                    return Err(NotionError::DataSource(format!(
                        "database {} has {} data sources, set notion_data_source_id to one of: {}",
                        database_id,
                        sources.len(),
                        names.join(", ")
                    )));
                }
                Ok(sources.remove(0).id)
            }
        }
    }

    /// Fail if any of `required` is not a property of the data source
    pub async fn verify_properties(&self, required: &[String]) -> Result<(), NotionError> {
        let schema: DataSourceResponse = self
            .send(Method::GET, &format!("data_sources/{}", self.data_source_id), None)
            .await?;

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !schema.properties.contains_key(name.as_str()))
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();

        if !missing.is_empty() {
            error!(missing = ?missing, "Destination schema is incomplete");
            return Err(NotionError::MissingProperties(missing));
        }

        debug!(properties = required.len(), "Destination schema verified");
        Ok(())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, NotionError> {
        let url = format!("{}/v1/{}", self.base_url, path);

        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.api_key)
                .header("Notion-Version", NOTION_VERSION);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(response.headers());
                warn!(path, attempt, wait_secs = wait.as_secs(), "Rate limited by Notion");
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(wait).await;
                }
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                error!(status = %status, body = %text, path, "Notion request failed");
                return Err(NotionError::Api {
                    status: status.as_u16(),
                    body: text,
                });
            }

            return Ok(response.json::<T>().await?);
        }

        Err(NotionError::RateLimited(MAX_ATTEMPTS))
    }

    fn query_body(&self, since: DateTime<Utc>, cursor: Option<&str>) -> Value {
        let mut body = json!({
            "page_size": PAGE_SIZE,
            "filter": {
                "and": [
                    {
                        "timestamp": "last_edited_time",
                        "last_edited_time": {
                            "after": since.to_rfc3339_opts(SecondsFormat::Millis, true)
                        }
                    },
                    {
                        "property": self.app_id_property,
                        "number": { "is_not_empty": true }
                    }
                ]
            }
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        body
    }

    fn to_record(&self, page: PageObject) -> Option<SyncRecord> {
        let number = page
            .properties
            .get(&self.app_id_property)
            .and_then(|property| property.get("number"))
            .and_then(Value::as_f64);

        match number.and_then(app_id_from_number) {
            Some(app_id) => Some(SyncRecord {
                page_id: page.id,
                app_id,
                last_edited_by: page.last_edited_by.id,
            }),
            None => {
                warn!(page_id = %page.id, value = ?number, "Skipping page with invalid Steam App ID");
                None
            }
        }
    }
}

/// Only whole, positive numbers that fit a `u32` are App IDs
fn app_id_from_number(n: f64) -> Option<u32> {
    (n.fract() == 0.0 && n > 0.0 && n <= f64::from(u32::MAX)).then_some(n as u32)
}

fn normalize_id(id: &str) -> String {
    id.replace('-', "").to_ascii_lowercase()
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[async_trait]
impl Destination for NotionClient {
    async fn query_changed(
        &self,
        since: DateTime<Utc>,
        cursor: Option<String>,
    ) -> Result<RecordPage, NotionError> {
        let body = self.query_body(since, cursor.as_deref());
        let response: QueryResponse = self
            .send(
                Method::POST,
                &format!("data_sources/{}/query", self.data_source_id),
                Some(&body),
            )
            .await?;

        let next_cursor = if response.has_more {
            response.next_cursor
        } else {
            None
        };
        let records: Vec<SyncRecord> = response
            .results
            .into_iter()
            .filter_map(|page| self.to_record(page))
            .collect();

        debug!(records = records.len(), more = next_cursor.is_some(), "Queried changed pages");
        Ok(RecordPage {
            records,
            next_cursor,
        })
    }

    async fn update_page(&self, page_id: &str, payload: &OutputPayload) -> Result<(), NotionError> {
        let body = payload.to_notion();
        let _: Value = self
            .send(Method::PATCH, &format!("pages/{}", page_id), Some(&body))
            .await?;

        debug!(page_id, properties = payload.properties.len(), "Updated page");
        Ok(())
    }

    async fn own_actor_id(&self) -> Result<String, NotionError> {
        let me: UserResponse = self.send(Method::GET, "users/me", None).await?;
        Ok(me.id)
    }
}
