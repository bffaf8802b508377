// SPDX-License-Identifier: GPL-3.0-only
use crate::config::FieldConfig;
use crate::mapping::fields;
use crate::mapping::models::{FieldError, FieldOutput, MappingInput};

/// Upstream data a field is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Catalog,
    Reviews,
    Session,
    TagNames,
}

/// Where a field's value ends up on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Property,
    Cover,
    Icon,
}

pub type FieldMapperFn = fn(&FieldConfig, &MappingInput<'_>) -> Result<FieldOutput, FieldError>;

pub struct FieldSpec {
    /// Logical name used as the key under `game_properties`
    pub name: &'static str,
    pub requires: &'static [Source],
    /// Accepted `format` values; the first is the default
    pub formats: &'static [&'static str],
    pub target: Target,
    pub map: FieldMapperFn,
}

impl FieldSpec {
    /// Whether the field needs a destination property name
    pub fn writes_property(&self) -> bool {
        self.target == Target::Property
    }

    pub fn default_format(&self) -> Option<&'static str> {
        self.formats.first().copied()
    }
}

pub static FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "gameName",
        requires: &[Source::Session],
        formats: &[],
        target: Target::Property,
        map: fields::game_name,
    },
    FieldSpec {
        name: "releaseDate",
        requires: &[Source::Catalog],
        formats: &["date", "datetime"],
        target: Target::Property,
        map: fields::release_date,
    },
    FieldSpec {
        name: "reviewScore",
        requires: &[Source::Reviews, Source::Session],
        formats: &["percentage", "sentiment", "total", "positive_negative"],
        target: Target::Property,
        map: fields::review_score,
    },
    FieldSpec {
        name: "tags",
        requires: &[Source::TagNames],
        formats: &[],
        target: Target::Property,
        map: fields::tags,
    },
    FieldSpec {
        name: "gameDescription",
        requires: &[Source::Catalog],
        formats: &[],
        target: Target::Property,
        map: fields::game_description,
    },
    FieldSpec {
        name: "storePage",
        requires: &[],
        formats: &[],
        target: Target::Property,
        map: fields::store_page,
    },
    FieldSpec {
        name: "coverImage",
        requires: &[Source::Catalog],
        formats: &[],
        target: Target::Cover,
        map: fields::cover_image,
    },
    FieldSpec {
        name: "gameIcon",
        requires: &[Source::Session],
        formats: &[],
        target: Target::Icon,
        map: fields::game_icon,
    },
    FieldSpec {
        name: "gamePrice",
        requires: &[Source::Catalog],
        formats: &[],
        target: Target::Property,
        map: fields::game_price,
    },
    FieldSpec {
        name: "developers",
        requires: &[Source::Catalog],
        formats: &[],
        target: Target::Property,
        map: fields::developers,
    },
    FieldSpec {
        name: "publishers",
        requires: &[Source::Catalog],
        formats: &[],
        target: Target::Property,
        map: fields::publishers,
    },
    FieldSpec {
        name: "steamDeck",
        requires: &[Source::Session],
        formats: &[],
        target: Target::Property,
        map: fields::steam_deck,
    },
];

pub fn find(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}
