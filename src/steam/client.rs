// SPDX-License-Identifier: GPL-3.0-only
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::steam::traits::SteamError;

/// Outcome of a single successful HTTP exchange
pub enum Lookup<T> {
    Found(T),
    /// Definitive answer from upstream; retrying would not change it
    NotFound,
}

/// JSON-over-HTTP client with bounded linear backoff.
///
/// Attempt `n` that fails transiently (network error, bad status, body that
/// does not parse) is followed by a pause of `n * retry_delay`.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, SteamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("steam-notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base pause between attempts; tests shrink it to keep retries fast
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// GET `url` and interpret the body with `parse`.
    ///
    /// Returns `None` when upstream reports the item as missing or when every
    /// retry failed. Failures are logged, never propagated.
    pub async fn get_with_retry<T, F>(&self, url: &str, parse: F) -> Option<T>
    where
        F: Fn(Value) -> Result<Lookup<T>, SteamError>,
    {
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            match self.get_once(url).await.and_then(&parse) {
                Ok(Lookup::Found(value)) => {
                    if attempt > 1 {
                        info!(url = %url, attempt, "Request succeeded after retry");
                    }
                    return Some(value);
                }
                Ok(Lookup::NotFound) => {
                    debug!(url = %url, "Upstream reported no data");
                    return None;
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Request attempt failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        warn!(url = %url, attempts, "Giving up after retries");
        None
    }

    async fn get_once(&self, url: &str) -> Result<Value, SteamError> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;
        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_client() -> HttpClient {
        HttpClient::new().unwrap().with_retry_delay(Duration::from_millis(1))
    }

    fn found(body: Value) -> Result<Lookup<Value>, SteamError> {
        Ok(Lookup::Found(body))
    }

    #[tokio::test]
    async fn test_get_with_retry_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .expect(1)
            .create_async()
            .await;

        let result = fast_client()
            .get_with_retry(&format!("{}/data", server.url()), found)
            .await;

        assert_eq!(result, Some(serde_json::json!({"ok": true})));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_with_retry_exhausts_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(4)
            .create_async()
            .await;

        let result = fast_client()
            .get_with_retry(&format!("{}/flaky", server.url()), found)
            .await;

        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gone")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let result: Option<Value> = fast_client()
            .get_with_retry(&format!("{}/gone", server.url()), |_| Ok(Lookup::NotFound))
            .await;

        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_body_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/garbage")
            .with_status(200)
            .with_body("<html>busy</html>")
            .expect(4)
            .create_async()
            .await;

        let result = fast_client()
            .get_with_retry(&format!("{}/garbage", server.url()), found)
            .await;

        assert!(result.is_none());
        mock.assert_async().await;
    }
}
