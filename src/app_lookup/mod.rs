// SPDX-License-Identifier: GPL-3.0-only
//! Offline helper that turns a list of game names into Steam App IDs and
//! import-ready CSV files.
pub mod applist;
pub mod export;
pub mod matcher;

use anyhow::{Context, anyhow};
use std::path::Path;
use tracing::info;

pub use applist::AppListClient;
pub use matcher::{MatchResult, match_names, read_names};

pub const DEFAULT_PLATFORM: &str = "Epic Games";

pub const FULL_MATCH_FILE: &str = "steamAppIds_fullMatch";
pub const BEST_MATCH_FILE: &str = "steamAppIds_bestMatch";

/// Match every name in `input` against the Steam app list and write the
/// results to `output_dir`.
pub async fn run(
    client: &AppListClient,
    input: &Path,
    output_dir: &Path,
    platform: &str,
) -> anyhow::Result<MatchResult> {
    let contents = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let names = read_names(&contents);
    info!(input = %input.display(), names = names.len(), "Loaded game names");

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let apps = client
        .fetch()
        .await
        .ok_or_else(|| anyhow!("Could not fetch the Steam app list"))?;
    info!(apps = apps.len(), "Fetched Steam app list");

    let result = match_names(&names, &apps);
    info!(
        total = names.len(),
        full_matches = result.full.len(),
        best_matches = result.best.len(),
        platform = %platform,
        "Matched game names"
    );

    let file = |stem: &str, ext: &str| output_dir.join(format!("{}.{}", stem, ext));

    export::write_json(&file(FULL_MATCH_FILE, "json"), &result.full)?;
    export::write_json(&file(BEST_MATCH_FILE, "json"), &result.best)?;
    export::write_csv(
        &file(FULL_MATCH_FILE, "csv"),
        result.full.iter().map(|(_, app_id)| *app_id),
        platform,
    )?;
    export::write_csv(
        &file(BEST_MATCH_FILE, "csv"),
        result.best.iter().map(|(_, best)| best.app_id),
        platform,
    )?;

    info!(output_dir = %output_dir.display(), "Wrote match results");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_writes_all_outputs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/apps")
            .with_status(200)
            .with_body(
                r#"{"applist": {"apps": [
                    {"appid": 620, "name": "Portal 2"},
                    {"appid": 367520, "name": "Hollow Knight"}
                ]}}"#,
            )
            .create_async()
            .await;
        let client = AppListClient::with_url(&format!("{}/apps", server.url()))
            .unwrap()
            .with_retry_delay(Duration::from_millis(1));

        let dir = TempDir::new().unwrap();
        let input = dir.path().join("gameNames.txt");
        std::fs::write(&input, "Portal 2\nHollow Knight Voidheart\n").unwrap();
        let output = dir.path().join("output");

        let result = run(&client, &input, &output, DEFAULT_PLATFORM).await.unwrap();
        assert_eq!(result.full.len(), 1);
        assert_eq!(result.best.len(), 1);

        let full_json = std::fs::read_to_string(output.join("steamAppIds_fullMatch.json")).unwrap();
        assert_eq!(full_json, r#"{"Portal 2":620}"#);

        let best_csv = std::fs::read_to_string(output.join("steamAppIds_bestMatch.csv")).unwrap();
        assert_eq!(
            best_csv,
            "Steam App ID,Platform,Status,My Review\n367520,Epic Games,Backlog,Unreviewed\n"
        );
        assert!(output.join("steamAppIds_fullMatch.csv").exists());
        assert!(output.join("steamAppIds_bestMatch.json").exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_input() {
        let client = AppListClient::with_url("http://127.0.0.1:9/apps").unwrap();
        let dir = TempDir::new().unwrap();

        let err = run(&client, &dir.path().join("missing.txt"), dir.path(), DEFAULT_PLATFORM)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }
}
