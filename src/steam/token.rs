// SPDX-License-Identifier: GPL-3.0-only
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::steam::traits::SteamError;

/// Tokens this close to expiry are treated as already expired
pub const EXPIRY_MARGIN: TimeDelta = TimeDelta::seconds(60);

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// Expiry instant from the `exp` claim of a Steam refresh token (a JWT)
pub fn expires_at(token: &str) -> Result<DateTime<Utc>, SteamError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|part| !part.is_empty())
        .ok_or_else(|| SteamError::InvalidToken("not a JWT".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SteamError::InvalidToken(format!("payload is not base64url: {}", e)))?;

    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| SteamError::InvalidToken(format!("payload has no exp claim: {}", e)))?;

    DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| SteamError::InvalidToken(format!("exp out of range: {}", claims.exp)))
}

/// Whether `token` can still be used at `now`. Undecodable tokens are unusable.
pub fn is_usable(token: &str, now: DateTime<Utc>) -> bool {
    match expires_at(token) {
        Ok(exp) => exp - EXPIRY_MARGIN > now,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"EdDSA"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"iss":"steam","sub":"7656","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_expires_at() {
        let token = token_with_exp(1_900_000_000);
        assert_eq!(expires_at(&token).unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_is_usable_respects_margin() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(is_usable(&token_with_exp(1_700_000_000 + 3600), now));
        assert!(!is_usable(&token_with_exp(1_700_000_000 + 30), now));
        assert!(!is_usable(&token_with_exp(1_600_000_000), now));
    }

    #[test]
    fn test_garbage_tokens_are_unusable() {
        let now = Utc::now();
        assert!(!is_usable("", now));
        assert!(!is_usable("no-dots-here", now));
        assert!(!is_usable("a.!!!.c", now));
        assert!(matches!(expires_at("a.e30.c"), Err(SteamError::InvalidToken(_))));
    }
}
