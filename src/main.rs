// SPDX-License-Identifier: GPL-3.0-only
mod app_lookup;
mod config;
mod logging;
mod mapping;
mod notion;
mod state;
mod steam;
mod sync;
mod utils;

#[cfg(test)]
mod test_helpers;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use app_lookup::AppListClient;
use config::{Capabilities, Config};
use logging::setup_logging;
use mapping::FieldMapper;
use notion::{Destination, NotionClient, NotionSettings};
use state::{SqliteStateStore, StateStore, SyncState};
use state::sync_state::RESET_GRACE_PERIOD;
use steam::{CatalogApi, SessionApi, SteamSession, StoreClient};
use sync::{SyncOrchestrator, SyncSettings, Upstreams};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("match-names") => match_names(&args[1..]).await,
        Some(other) => anyhow::bail!(
            "Unknown command '{}'. Usage: steam-notion-sync [match-names <input> <output-dir> [platform]]",
            other
        ),
        None => run_daemon().await,
    }
}

async fn match_names(args: &[String]) -> anyhow::Result<()> {
    setup_logging("info", "pretty")?;

    let (input, output_dir) = match args {
        [input, output_dir, ..] => (PathBuf::from(input), PathBuf::from(output_dir)),
        _ => anyhow::bail!("Usage: steam-notion-sync match-names <input> <output-dir> [platform]"),
    };
    let platform = args
        .get(2)
        .map(String::as_str)
        .unwrap_or(app_lookup::DEFAULT_PLATFORM);

    let client = AppListClient::new()?;
    app_lookup::run(&client, &input, &output_dir, platform).await?;
    Ok(())
}

async fn run_daemon() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, &config.log_format)?;

    info!("Starting steam-notion-sync v{}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Invalid configuration")?;

    let capabilities = Capabilities::resolve(&config);
    info!(
        catalog = capabilities.catalog,
        reviews = capabilities.reviews,
        session = capabilities.session,
        tags = capabilities.tags,
        actor_tracking = capabilities.actor_tracking,
        "Resolved upstream capabilities"
    );

    // Initialize local state; a second instance fails here
    let store = Arc::new(SqliteStateStore::new(&config.state_db_path).await?);
    let state = SyncState::new(Arc::clone(&store) as Arc<dyn StateStore>);
    state.initialize().await?;
    info!(path = %config.state_db_path.display(), "Local state initialized");

    if config.force_reset {
        state.reset(RESET_GRACE_PERIOD).await?;
    }

    // Destination
    let notion = NotionClient::connect(NotionSettings {
        api_key: config.notion_api_key.clone(),
        database_id: config.notion_database_id.clone(),
        data_source_id: config.notion_data_source_id.clone(),
        app_id_property: config.steam_app_id_property.clone(),
        base_url: notion::client::NOTION_API_URL.to_string(),
    })
    .await
    .context("Failed to connect to the Notion database")?;

    notion
        .verify_properties(&config.required_properties())
        .await
        .context("Notion database is missing configured properties")?;
    let destination: Arc<dyn Destination> = Arc::new(notion);

    // Upstreams, only what the enabled fields need
    let catalog: Option<Arc<dyn CatalogApi>> = if capabilities.store_api() {
        Some(Arc::new(StoreClient::new()?))
    } else {
        None
    };

    let session: Option<Arc<dyn SessionApi>> = if capabilities.session {
        let session = SteamSession::connect(&config.steam, &state)
            .await
            .context("Failed to establish a Steam session")?;
        Some(Arc::new(session))
    } else {
        None
    };

    let orchestrator = SyncOrchestrator::new(
        destination,
        Upstreams { catalog, session },
        state,
        FieldMapper::new(&config.game_properties),
        capabilities,
        SyncSettings::from_config(&config),
    );
    orchestrator.initialize().await?;

    let sync_task = tokio::spawn(async move {
        info!("Sync loop started");
        orchestrator.run().await;
    });

    info!("All services started. Waiting for shutdown signal...");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    // Graceful shutdown
    info!("Initiating graceful shutdown...");

    sync_task.abort();
    let _ = sync_task.await;
    store.close().await;

    info!("Shutdown complete");
    Ok(())
}
