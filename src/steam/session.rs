// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use steam_vent::auth::{
    AuthConfirmationHandler, ConsoleAuthConfirmationHandler, DeviceConfirmationHandler,
    FileGuardDataStore,
};
use steam_vent::{Connection, ConnectionTrait, ServerList};
use steam_vent_proto_steam::{
    steammessages_clientserver_appinfo::{
        cmsg_client_picsproduct_info_request, CMsgClientPICSAccessTokenRequest,
        CMsgClientPICSAccessTokenResponse, CMsgClientPICSProductInfoRequest,
        CMsgClientPICSProductInfoResponse,
    },
    steammessages_store_steamclient::{
        CStore_GetLocalizedNameForTags_Request, CStore_GetLocalizedNameForTags_Response,
    },
};
use tracing::{debug, info, warn};

use crate::config::SteamConfig;
use crate::state::SyncState;
use crate::steam::models::SessionInfo;
use crate::steam::token;
use crate::steam::traits::{SessionApi, SteamError};
use crate::steam::vdf;

/// Apps per product-info request
pub const PRODUCT_INFO_CHUNK: usize = 50;

/// How the session logs on, decided before any network traffic
#[derive(Debug, Clone, PartialEq)]
pub enum LoginPlan {
    Anonymous,
    /// Refresh-token logon. `persist` is set when the token is not the stored one yet.
    Token {
        account: String,
        token: String,
        persist: bool,
    },
    /// Interactive password logon (Steam Guard confirmation on the console or device)
    Credentials { account: String, password: String },
}

/// Choose a logon method: the stored token, then the configured token, then the password.
///
/// Expired tokens are skipped but never removed from the store.
pub fn plan_login(
    steam: &SteamConfig,
    stored_token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LoginPlan, SteamError> {
    if steam.anonymous {
        return Ok(LoginPlan::Anonymous);
    }

    let account = steam
        .account_name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SteamError::NoUsableLogin("no account name configured".to_string()))?;

    if let Some(stored) = stored_token.filter(|t| token::is_usable(t, now)) {
        return Ok(LoginPlan::Token {
            account,
            token: stored.to_string(),
            persist: false,
        });
    }

    if let Some(configured) = steam
        .refresh_token
        .as_deref()
        .filter(|t| token::is_usable(t, now))
    {
        return Ok(LoginPlan::Token {
            account,
            token: configured.to_string(),
            persist: stored_token != Some(configured),
        });
    }

    match steam.password.clone() {
        Some(password) => Ok(LoginPlan::Credentials { account, password }),
        None => Err(SteamError::NoUsableLogin(
            "refresh tokens are expired or invalid and no password is configured".to_string(),
        )),
    }
}

/// Logged-on Steam CM connection
pub struct SteamSession {
    connection: Connection,
}

impl SteamSession {
    pub async fn connect(steam: &SteamConfig, state: &SyncState) -> Result<Self, SteamError> {
        let stored = state.session_token().await?;
        let plan = plan_login(steam, stored.as_deref(), Utc::now())?;

        info!("Discovering Steam servers");
        let server_list = ServerList::discover().await?;

        let connection = match plan {
            LoginPlan::Anonymous => {
                info!("Establishing anonymous Steam connection");
                Connection::anonymous(&server_list).await?
            }
            LoginPlan::Token {
                account,
                token,
                persist,
            } => {
                info!(account = %account, "Logging on to Steam with refresh token");
                let connection = Connection::access(&server_list, &account, &token).await?;
                if persist {
                    state.set_session_token(&token).await?;
                    info!("Stored refresh token for later runs");
                }
                connection
            }
            LoginPlan::Credentials { account, password } => {
                info!(account = %account, "Logging on to Steam with password; confirm the login if prompted");
                Connection::login(
                    &server_list,
                    &account,
                    &password,
                    FileGuardDataStore::user_cache(),
                    ConsoleAuthConfirmationHandler::default().or(DeviceConfirmationHandler),
                )
                .await?
            }
        };

        Ok(Self { connection })
    }

    async fn access_tokens(&self, app_ids: &[u32]) -> Result<HashMap<u32, u64>, SteamError> {
        let mut req = CMsgClientPICSAccessTokenRequest::new();
        req.appids = app_ids.to_vec();

        let response: CMsgClientPICSAccessTokenResponse = self
            .connection
            .job::<CMsgClientPICSAccessTokenRequest, CMsgClientPICSAccessTokenResponse>(req)
            .await
            .map_err(SteamError::Network)?;

        if !response.app_denied_tokens.is_empty() {
            debug!(denied = ?response.app_denied_tokens, "Steam denied app access tokens");
        }

        Ok(response
            .app_access_tokens
            .iter()
            .map(|token| (token.appid(), token.access_token()))
            .collect())
    }
}

#[async_trait]
impl SessionApi for SteamSession {
    async fn product_info(&self, app_ids: &[u32]) -> Result<HashMap<u32, SessionInfo>, SteamError> {
        let mut infos = HashMap::with_capacity(app_ids.len());

        for chunk in app_ids.chunks(PRODUCT_INFO_CHUNK) {
            let tokens = self.access_tokens(chunk).await?;

            let mut req = CMsgClientPICSProductInfoRequest::new();
            req.apps = chunk
                .iter()
                .map(|&app_id| {
                    let mut app = cmsg_client_picsproduct_info_request::AppInfo::new();
                    app.set_appid(app_id);
                    if let Some(&access_token) = tokens.get(&app_id) {
                        app.set_access_token(access_token);
                    }
                    app
                })
                .collect();
            req.set_single_response(true);

            info!(apps = chunk.len(), "Requesting product info");
            let response: CMsgClientPICSProductInfoResponse = self
                .connection
                .job::<CMsgClientPICSProductInfoRequest, CMsgClientPICSProductInfoResponse>(req)
                .await
                .map_err(SteamError::Network)?;

            if !response.unknown_appids.is_empty() {
                warn!(unknown = ?response.unknown_appids, "Steam does not know some apps");
            }

            for app in &response.apps {
                let app_id = app.appid();
                let text = String::from_utf8_lossy(app.buffer());
                match vdf::parse(text.trim_end_matches('\0')) {
                    Ok(doc) => {
                        let appinfo = doc.get("appinfo").unwrap_or(&Value::Null);
                        infos.insert(app_id, SessionInfo::from_appinfo(app_id, appinfo));
                    }
                    Err(e) => {
                        warn!(app_id, error = %e, "Skipping undecodable product info");
                    }
                }
            }
        }

        Ok(infos)
    }

    async fn tag_names(&self, tag_ids: &[u32], language: &str) -> Result<Vec<String>, SteamError> {
        let mut req = CStore_GetLocalizedNameForTags_Request::new();
        req.set_language(language.to_string());
        req.tagids = tag_ids.to_vec();

        let response: CStore_GetLocalizedNameForTags_Response = self
            .connection
            .service_method(req)
            .await
            .map_err(SteamError::Network)?;

        let names: HashMap<u32, String> = response
            .tags
            .iter()
            .map(|tag| (tag.tagid(), tag.name().to_string()))
            .collect();

        Ok(tag_ids
            .iter()
            .filter_map(|id| names.get(id).cloned())
            .collect())
    }
}
