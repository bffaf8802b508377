// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store `appdetails` data for one app. Every field is optional because the
/// store omits whatever an app does not have.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogInfo {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub short_description: Option<String>,

    /// Absolute URL of the store header image
    #[serde(default)]
    pub header_image: Option<String>,

    #[serde(default)]
    pub developers: Vec<String>,

    #[serde(default)]
    pub publishers: Vec<String>,

    #[serde(default)]
    pub price_overview: Option<PriceOverview>,

    #[serde(default)]
    pub release_date: Option<CatalogReleaseDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceOverview {
    #[serde(default)]
    pub currency: Option<String>,

    /// Undiscounted price in minor units (cents)
    #[serde(default)]
    pub initial: Option<i64>,

    #[serde(default, rename = "final")]
    pub final_price: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogReleaseDate {
    #[serde(default)]
    pub coming_soon: bool,

    /// Free text: "13 Mar, 2023", "March 2023", "2023", "Coming soon", ...
    #[serde(default)]
    pub date: Option<String>,
}

/// Store review summary (`query_summary` of the appreviews endpoint)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewInfo {
    #[serde(default)]
    pub total_positive: u64,

    #[serde(default)]
    pub total_negative: u64,

    #[serde(default)]
    pub total_reviews: u64,

    /// Sentiment label, e.g. "Very Positive"
    #[serde(default)]
    pub review_score_desc: Option<String>,
}

/// The `common` section of a product-info record from the Steam session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    pub app_id: u32,
    pub name: Option<String>,
    /// Icon hash, turned into a CDN URL by the icon mapper
    pub icon: Option<String>,
    /// English header image file name
    pub header_image: Option<String>,
    pub store_tags: Vec<u32>,
    pub review_percentage: Option<u32>,
    pub deck_category: Option<u32>,
    /// Unix timestamps
    pub original_release_date: Option<i64>,
    pub steam_release_date: Option<i64>,
}

impl SessionInfo {
    /// Extract the interesting parts of a parsed `appinfo` document.
    ///
    /// All leaf values in product info are strings, numbers included.
    pub fn from_appinfo(app_id: u32, appinfo: &Value) -> Self {
        let common = appinfo.get("common").unwrap_or(&Value::Null);

        let text = |key: &str| {
            common
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |key: &str| text(key).and_then(|s| s.parse::<i64>().ok());

        let mut store_tags: Vec<(u32, u32)> = common
            .get("store_tags")
            .and_then(Value::as_object)
            .map(|tags| {
                tags.iter()
                    .filter_map(|(position, tag)| {
                        let position = position.parse::<u32>().ok()?;
                        let tag = tag.as_str()?.parse::<u32>().ok()?;
                        Some((position, tag))
                    })
                    .collect()
            })
            .unwrap_or_default();
        store_tags.sort_unstable_by_key(|(position, _)| *position);

        Self {
            app_id,
            name: text("name"),
            icon: text("icon"),
            header_image: common
                .get("header_image")
                .and_then(|images| images.get("english"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            store_tags: store_tags.into_iter().map(|(_, tag)| tag).collect(),
            review_percentage: number("review_percentage").and_then(|n| u32::try_from(n).ok()),
            deck_category: common
                .get("steam_deck_compatibility")
                .and_then(|deck| deck.get("category"))
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<u32>().ok()),
            original_release_date: number("original_release_date").filter(|ts| *ts > 0),
            steam_release_date: number("steam_release_date").filter(|ts| *ts > 0),
        }
    }
}

/// Result of resolving tag ids to names
#[derive(Debug, Clone, PartialEq)]
pub enum TagNames {
    Resolved(Vec<String>),
    /// Resolution failed (e.g. unsupported language); mapped to a placeholder tag
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_info_deserialize() {
        let data = json!({
            "type": "game",
            "name": "Portal 2",
            "steam_appid": 620,
            "short_description": "The sequel.",
            "header_image": "https://cdn.example.com/620/header.jpg",
            "developers": ["Valve"],
            "publishers": ["Valve"],
            "price_overview": {"currency": "USD", "initial": 999, "final": 199},
            "release_date": {"coming_soon": false, "date": "18 Apr, 2011"}
        });

        let info: CatalogInfo = serde_json::from_value(data).unwrap();
        assert_eq!(info.name.as_deref(), Some("Portal 2"));
        assert_eq!(info.developers, vec!["Valve".to_string()]);
        let price = info.price_overview.unwrap();
        assert_eq!(price.initial, Some(999));
        assert_eq!(price.final_price, Some(199));
        assert_eq!(info.release_date.unwrap().date.as_deref(), Some("18 Apr, 2011"));
    }

    #[test]
    fn test_catalog_info_tolerates_missing_fields() {
        let info: CatalogInfo = serde_json::from_value(json!({"name": "Free Thing"})).unwrap();
        assert!(info.price_overview.is_none());
        assert!(info.developers.is_empty());
        assert!(info.release_date.is_none());
    }

    #[test]
    fn test_session_info_from_appinfo() {
        let appinfo = json!({
            "appid": "620",
            "common": {
                "name": "Portal 2",
                "icon": "2e478fc6874d06ae5baf0d147f6f21203291aa02",
                "header_image": {"english": "header.jpg"},
                "store_tags": {"1": "1664", "0": "3859", "2": "21"},
                "review_percentage": "98",
                "steam_deck_compatibility": {"category": "3"},
                "original_release_date": "1303171200",
                "steam_release_date": "0"
            }
        });

        let info = SessionInfo::from_appinfo(620, &appinfo);
        assert_eq!(info.app_id, 620);
        assert_eq!(info.name.as_deref(), Some("Portal 2"));
        assert_eq!(info.header_image.as_deref(), Some("header.jpg"));
        assert_eq!(info.store_tags, vec![3859, 1664, 21]);
        assert_eq!(info.review_percentage, Some(98));
        assert_eq!(info.deck_category, Some(3));
        assert_eq!(info.original_release_date, Some(1303171200));
        assert_eq!(info.steam_release_date, None);
    }

    #[test]
    fn test_session_info_without_common_section() {
        let info = SessionInfo::from_appinfo(10, &json!({"appid": "10"}));
        assert_eq!(info, SessionInfo { app_id: 10, ..SessionInfo::default() });
    }
}
