// SPDX-License-Identifier: GPL-3.0-only
use anyhow::{Context, Result};
use url::Url;

/// Maximum allowed URL length (Notion rejects longer external URLs)
const MAX_URL_LENGTH: usize = 2000;

/// Validate a configured external URL (default cover or icon image)
///
/// Checks:
/// - Only allows http/https schemes
/// - Requires a host
/// - Validates URL length
pub fn validate_url(url_str: &str) -> Result<()> {
    if url_str.len() > MAX_URL_LENGTH {
        return Err(anyhow::anyhow!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH));
    }

    let url = Url::parse(url_str)
        .context("Invalid URL format")?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(anyhow::anyhow!(
                "Invalid URL scheme: {} (only http and https are allowed)",
                scheme
            ));
        }
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(anyhow::anyhow!("URL must have a host")),
    }
}
