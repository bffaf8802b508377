// SPDX-License-Identifier: GPL-3.0-only
use crate::config::Config;
use crate::mapping::registry::{self, Source};

/// Which upstream services the enabled output fields actually need
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Store appdetails lookups
    pub catalog: bool,
    /// Store review summaries
    pub reviews: bool,
    /// Authenticated Steam session (product info)
    pub session: bool,
    /// Tag id to name resolution over the session
    pub tags: bool,
    /// Track the integration's own destination identity (always-update mode)
    pub actor_tracking: bool,
}

impl Capabilities {
    pub fn resolve(config: &Config) -> Self {
        let mut caps = Capabilities {
            actor_tracking: config.always_update,
            ..Capabilities::default()
        };

        let enabled = config
            .game_properties
            .iter()
            .filter(|(_, field)| field.enabled)
            .filter_map(|(name, _)| registry::find(name));

        for spec in enabled {
            for source in spec.requires {
                match source {
                    Source::Catalog => caps.catalog = true,
                    Source::Reviews => caps.reviews = true,
                    Source::Session => caps.session = true,
                    Source::TagNames => {
                        caps.session = true;
                        caps.tags = true;
                    }
                }
            }
        }

        caps
    }

    /// Whether any per-item call hits the rate-limited store API
    pub fn store_api(&self) -> bool {
        self.catalog || self.reviews
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, FieldMappingConfig};

    fn config_with(fields: &[(&str, bool)]) -> Config {
        let mut game_properties = FieldMappingConfig::new();
        for (name, enabled) in fields {
            game_properties.insert(
                name.to_string(),
                FieldConfig {
                    enabled: *enabled,
                    ..FieldConfig::property("Prop")
                },
            );
        }
        Config {
            game_properties,
            ..Config::default()
        }
    }

    #[test]
    fn test_catalog_only_fields() {
        let caps = Capabilities::resolve(&config_with(&[
            ("coverImage", true),
            ("gameDescription", true),
            ("gamePrice", true),
            ("developers", true),
            ("publishers", true),
            ("releaseDate", true),
        ]));
        assert!(caps.catalog);
        assert!(!caps.session);
        assert!(!caps.tags);
        assert!(!caps.reviews);
        assert!(caps.store_api());
    }

    #[test]
    fn test_session_only_fields() {
        let caps = Capabilities::resolve(&config_with(&[
            ("gameName", true),
            ("gameIcon", true),
            ("steamDeck", true),
        ]));
        assert!(caps.session);
        assert!(!caps.catalog);
        assert!(!caps.store_api());
    }

    #[test]
    fn test_tags_need_session() {
        let caps = Capabilities::resolve(&config_with(&[("tags", true)]));
        assert!(caps.session);
        assert!(caps.tags);
        assert!(!caps.catalog);
    }

    #[test]
    fn test_review_score_needs_reviews_and_session() {
        let caps = Capabilities::resolve(&config_with(&[("reviewScore", true)]));
        assert!(caps.reviews);
        assert!(caps.session);
        assert!(caps.store_api());
    }

    #[test]
    fn test_disabled_fields_are_ignored() {
        let caps = Capabilities::resolve(&config_with(&[("gamePrice", false), ("tags", false)]));
        assert_eq!(caps, Capabilities::default());
    }

    #[test]
    fn test_store_page_needs_nothing() {
        let caps = Capabilities::resolve(&config_with(&[("storePage", true)]));
        assert_eq!(caps, Capabilities::default());
    }

    #[test]
    fn test_actor_tracking_follows_always_update() {
        let mut config = config_with(&[("gameName", true)]);
        assert!(!Capabilities::resolve(&config).actor_tracking);
        config.always_update = true;
        assert!(Capabilities::resolve(&config).actor_tracking);
    }
}
