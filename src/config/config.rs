// SPDX-License-Identifier: GPL-3.0-only
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::mapping::registry;
use crate::utils::validate_url;

/// Upper bound for items processed per cycle while the store API is in use.
pub const MAX_BATCH_SIZE: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notion integration secret
    pub notion_api_key: String,

    /// Database holding the game pages
    pub notion_database_id: String,

    /// Data source to query; required when the database has more than one
    pub notion_data_source_id: Option<String>,

    /// Number property carrying the Steam App ID on each page
    pub steam_app_id_property: String,

    /// SQLite database path for the local sync state
    pub state_db_path: PathBuf,

    /// Regular polling interval in seconds
    pub poll_interval_secs: u64,

    /// Polling interval in seconds after a rate-limited cycle
    pub rate_limited_interval_secs: u64,

    /// Maximum number of pages processed per cycle when the store API is needed
    pub batch_size: usize,

    /// Re-process pages whenever a user edits them, not only when the App ID changes
    pub always_update: bool,

    /// Wipe the local state on startup (after a grace period)
    pub force_reset: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    pub steam: SteamConfig,

    /// Output fields keyed by logical field name (gameName, releaseDate, ...)
    pub game_properties: FieldMappingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    /// Log on to Steam anonymously; no account is needed for public product info
    pub anonymous: bool,
    pub account_name: Option<String>,
    pub password: Option<String>,
    /// Previously issued refresh token, used instead of the password while it is valid
    pub refresh_token: Option<String>,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            anonymous: true,
            account_name: None,
            password: None,
            refresh_token: None,
        }
    }
}

/// Output fields keyed by logical name.
///
/// Iterates by field name, not file order. Every field maps independently, so
/// the order only affects the order of validation errors and log lines.
pub type FieldMappingConfig = BTreeMap<String, FieldConfig>;

/// Per-field descriptor. Options that a field does not understand are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub enabled: bool,

    /// Destination property the value is written to
    pub notion_property: Option<String>,

    /// Write the value as the page title instead of rich text (gameName)
    pub is_page_title: bool,

    /// Output shape, e.g. "date"/"datetime" for releaseDate
    pub format: Option<String>,

    /// Language used to resolve tag names (tags)
    pub tag_language: Option<String>,

    /// Fallback image when no upstream source has one (coverImage, gameIcon)
    pub default_url: Option<String>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notion_property: None,
            is_page_title: false,
            format: None,
            tag_language: None,
            default_url: None,
        }
    }
}

impl FieldConfig {
    pub fn property(name: &str) -> Self {
        Self {
            notion_property: Some(name.to_string()),
            ..Self::default()
        }
    }
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("STEAM_NOTION_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        Self::load_with(Path::new(&config_path), |key| std::env::var(key).ok())
    }

    /// Load from `path` (defaults if it does not exist), reading overrides through `env`
    pub fn load_with<F>(path: &Path, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        if let Some(val) = env("STEAM_NOTION_NOTION_API_KEY") {
            config.notion_api_key = val;
        }
        if let Some(val) = env("STEAM_NOTION_NOTION_DATABASE_ID") {
            config.notion_database_id = val;
        }
        if let Some(val) = env("STEAM_NOTION_NOTION_DATA_SOURCE_ID") {
            config.notion_data_source_id = Some(val);
        }
        if let Some(val) = env("STEAM_NOTION_STATE_DB_PATH") {
            config.state_db_path = PathBuf::from(val);
        }
        if let Some(val) = env("STEAM_NOTION_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = val.parse().context("STEAM_NOTION_POLL_INTERVAL_SECS")?;
        }
        if let Some(val) = env("STEAM_NOTION_ALWAYS_UPDATE") {
            config.always_update = val.parse().context("STEAM_NOTION_ALWAYS_UPDATE")?;
        }
        if let Some(val) = env("STEAM_NOTION_FORCE_RESET") {
            config.force_reset = val.parse().context("STEAM_NOTION_FORCE_RESET")?;
        }
        if let Some(val) = env("STEAM_NOTION_LOG_LEVEL") {
            config.log_level = val;
        }
        if let Some(val) = env("STEAM_NOTION_LOG_FORMAT") {
            config.log_format = val;
        }
        if let Some(val) = env("STEAM_NOTION_STEAM_ACCOUNT_NAME") {
            config.steam.account_name = Some(val);
            config.steam.anonymous = false;
        }
        if let Some(val) = env("STEAM_NOTION_STEAM_PASSWORD") {
            config.steam.password = Some(val);
        }
        if let Some(val) = env("STEAM_NOTION_STEAM_REFRESH_TOKEN") {
            config.steam.refresh_token = Some(val);
        }

        Ok(config)
    }

    /// Reject configurations the daemon cannot run with. Called once at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.notion_api_key.trim().is_empty() {
            bail!("notion_api_key must be set");
        }
        if self.notion_database_id.trim().is_empty() {
            bail!("notion_database_id must be set");
        }
        if self.steam_app_id_property.trim().is_empty() {
            bail!("steam_app_id_property must not be empty");
        }
        if self.poll_interval_secs == 0 || self.rate_limited_interval_secs == 0 {
            bail!("poll intervals must be greater than zero");
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            bail!("batch_size must be between 1 and {}", MAX_BATCH_SIZE);
        }
        match self.log_format.as_str() {
            "pretty" | "json" => {}
            other => bail!("Unknown log_format '{}' (expected pretty or json)", other),
        }

        if !self.steam.anonymous {
            if self.steam.account_name.as_deref().is_none_or(str::is_empty) {
                bail!("steam.account_name is required unless steam.anonymous is set");
            }
            if self.steam.password.is_none() && self.steam.refresh_token.is_none() {
                bail!("steam.password or steam.refresh_token is required for account logon");
            }
        }

        for (name, field) in &self.game_properties {
            let spec = registry::find(name)
                .with_context(|| format!("Unknown game property '{}'", name))?;
            if !field.enabled {
                continue;
            }
            if spec.writes_property() && field.notion_property.is_none() {
                bail!("game_properties.{} needs a notion_property", name);
            }
            if let Some(format) = field.format.as_deref() {
                if !spec.formats.contains(&format) {
                    bail!(
                        "game_properties.{}: unsupported format '{}' (expected one of {:?})",
                        name,
                        format,
                        spec.formats
                    );
                }
            }
            if let Some(url) = field.default_url.as_deref() {
                validate_url(url)
                    .with_context(|| format!("game_properties.{}.default_url", name))?;
            }
        }

        Ok(())
    }

    /// Destination properties that must exist before syncing starts
    pub fn required_properties(&self) -> Vec<String> {
        let mut properties: Vec<String> = self
            .game_properties
            .values()
            .filter(|field| field.enabled)
            .filter_map(|field| field.notion_property.clone())
            .collect();
        properties.push(self.steam_app_id_property.clone());
        properties
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut game_properties = FieldMappingConfig::new();
        game_properties.insert(
            "gameName".to_string(),
            FieldConfig {
                is_page_title: true,
                ..FieldConfig::property("Name")
            },
        );
        game_properties.insert("releaseDate".to_string(), FieldConfig::property("Release"));
        game_properties.insert("reviewScore".to_string(), FieldConfig::property("Steam Reviews"));
        game_properties.insert("tags".to_string(), FieldConfig::property("Tags"));
        game_properties.insert("storePage".to_string(), FieldConfig::property("Store page"));
        game_properties.insert("coverImage".to_string(), FieldConfig::default());
        game_properties.insert("gameIcon".to_string(), FieldConfig::default());

        Self {
            notion_api_key: String::new(),
            notion_database_id: String::new(),
            notion_data_source_id: None,
            steam_app_id_property: String::from("Steam App ID"),
            state_db_path: PathBuf::from("backend/state.db"),
            poll_interval_secs: 60,
            rate_limited_interval_secs: 30,
            batch_size: 50,
            always_update: false,
            force_reset: false,
            log_level: String::from("info"),
            log_format: String::from("pretty"),
            steam: SteamConfig::default(),
            game_properties,
        }
    }
}
