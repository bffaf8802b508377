// SPDX-License-Identifier: GPL-3.0-only
//! One mapper per output field. Each returns [`FieldOutput::Omit`] when its
//! source data is missing.

use crate::config::FieldConfig;
use crate::mapping::models::{FieldError, FieldOutput, ImageRef, MappingInput, PropertyValue};
use crate::mapping::release_date;
use crate::steam::models::TagNames;

pub const STORE_PAGE_URL: &str = "https://store.steampowered.com/app";
pub const HEADER_IMAGE_URL: &str = "https://cdn.cloudflare.steamstatic.com/steam/apps";
pub const ICON_URL: &str = "https://cdn.cloudflare.steamstatic.com/steamcommunity/public/images/apps";
pub const TAGS_FAILED: &str = "Retrieving tags failed";
pub const DEFAULT_TAG_LANGUAGE: &str = "english";

/// Select option names may not contain commas
fn option_name(name: &str) -> String {
    name.replace(',', "")
}

fn format_or<'a>(field: &'a FieldConfig, default: &'a str) -> &'a str {
    field.format.as_deref().unwrap_or(default)
}

pub fn game_name(field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    let name = input
        .session
        .and_then(|s| s.name.as_deref())
        .or_else(|| input.catalog.and_then(|c| c.name.as_deref()));

    Ok(match name {
        Some(name) if field.is_page_title => FieldOutput::Property(PropertyValue::Title(name.to_string())),
        Some(name) => FieldOutput::Property(PropertyValue::RichText(name.to_string())),
        None => FieldOutput::Omit,
    })
}

pub fn cover_image(field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    let url = input
        .catalog
        .and_then(|c| c.header_image.clone())
        .or_else(|| {
            input
                .session
                .and_then(|s| s.header_image.as_deref())
                .map(|image| format!("{}/{}/{}", HEADER_IMAGE_URL, input.app_id, image))
        })
        .or_else(|| field.default_url.clone());

    Ok(url.map_or(FieldOutput::Omit, |url| FieldOutput::Cover(ImageRef::new(url))))
}

pub fn game_icon(field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    let url = input
        .session
        .and_then(|s| s.icon.as_deref())
        .map(|icon| format!("{}/{}/{}.jpg", ICON_URL, input.app_id, icon))
        .or_else(|| field.default_url.clone());

    Ok(url.map_or(FieldOutput::Omit, |url| FieldOutput::Icon(ImageRef::new(url))))
}

pub fn release_date(field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    let with_time = match format_or(field, "date") {
        "date" => false,
        "datetime" => true,
        other => return Err(FieldError::InvalidFormat(other.to_string())),
    };

    let catalog_text = input
        .catalog
        .and_then(|c| c.release_date.as_ref())
        .and_then(|r| r.date.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty());

    // Session timestamps only stand in when the store has no date text at all;
    // an unparseable text such as "Coming soon" means there is no date yet.
    let date = match catalog_text {
        Some(text) => release_date::parse(text),
        None => input
            .session
            .and_then(|s| s.original_release_date.or(s.steam_release_date))
            .and_then(release_date::from_timestamp),
    };

    Ok(date.map_or(FieldOutput::Omit, |date| {
        FieldOutput::Property(PropertyValue::Date {
            start: release_date::render(date, with_time),
        })
    }))
}

pub fn review_score(field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    let reviews = input.reviews.filter(|r| r.total_reviews > 0);

    let value = match format_or(field, "percentage") {
        "percentage" => reviews
            .map(|r| (r.total_positive as f64 * 100.0 / r.total_reviews as f64).round() / 100.0)
            .or_else(|| {
                input
                    .session
                    .and_then(|s| s.review_percentage)
                    .map(|pct| f64::from(pct) / 100.0)
            })
            .map(PropertyValue::Number),
        "sentiment" => input
            .reviews
            .and_then(|r| r.review_score_desc.as_deref())
            .filter(|desc| !desc.is_empty())
            .map(|desc| PropertyValue::Select(option_name(desc))),
        "total" => input
            .reviews
            .map(|r| PropertyValue::Number(r.total_reviews as f64)),
        "positive_negative" => reviews.map(|r| {
            PropertyValue::RichText(format!(
                "{} positive / {} negative",
                r.total_positive, r.total_negative
            ))
        }),
        other => return Err(FieldError::InvalidFormat(other.to_string())),
    };

    Ok(value.map_or(FieldOutput::Omit, FieldOutput::Property))
}

pub fn tags(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    Ok(match input.tag_names {
        Some(TagNames::Resolved(names)) if names.is_empty() => FieldOutput::Omit,
        Some(TagNames::Resolved(names)) => FieldOutput::Property(PropertyValue::MultiSelect(
            names.iter().map(|name| option_name(name)).collect(),
        )),
        Some(TagNames::Failed) => {
            FieldOutput::Property(PropertyValue::MultiSelect(vec![TAGS_FAILED.to_string()]))
        }
        None => FieldOutput::Omit,
    })
}

pub fn game_description(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    Ok(input
        .catalog
        .and_then(|c| c.short_description.as_deref())
        .filter(|text| !text.trim().is_empty())
        .map_or(FieldOutput::Omit, |text| {
            FieldOutput::Property(PropertyValue::RichText(text.to_string()))
        }))
}

pub fn store_page(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    Ok(FieldOutput::Property(PropertyValue::Url(format!(
        "{}/{}",
        STORE_PAGE_URL, input.app_id
    ))))
}

pub fn game_price(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    Ok(input
        .catalog
        .and_then(|c| c.price_overview.as_ref())
        .and_then(|p| p.initial)
        .map_or(FieldOutput::Omit, |cents| {
            FieldOutput::Property(PropertyValue::Number(cents as f64 / 100.0))
        }))
}

fn names(list: &[String]) -> FieldOutput {
    if list.is_empty() {
        return FieldOutput::Omit;
    }
    FieldOutput::Property(PropertyValue::MultiSelect(
        list.iter().map(|name| option_name(name)).collect(),
    ))
}

pub fn developers(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    Ok(input.catalog.map_or(FieldOutput::Omit, |c| names(&c.developers)))
}

pub fn publishers(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    Ok(input.catalog.map_or(FieldOutput::Omit, |c| names(&c.publishers)))
}

pub fn steam_deck(_field: &FieldConfig, input: &MappingInput<'_>) -> Result<FieldOutput, FieldError> {
    let Some(session) = input.session else {
        return Ok(FieldOutput::Omit);
    };

    let label = match session.deck_category {
        Some(1) => "Unsupported",
        Some(2) => "Playable",
        Some(3) => "Verified",
        _ => "Unknown",
    };
    Ok(FieldOutput::Property(PropertyValue::Select(label.to_string())))
}
