// SPDX-License-Identifier: GPL-3.0-only
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

use crate::steam::models::{CatalogInfo, ReviewInfo, SessionInfo, TagNames};

/// Maximum length of a single rich text / title segment in the destination
pub const MAX_TEXT_LENGTH: usize = 2000;

/// A typed destination property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Number(f64),
    /// ISO date (`2023-03-13`) or date-time (`2023-03-13T00:00:00.000Z`)
    Date { start: String },
    Url(String),
    Select(String),
    MultiSelect(Vec<String>),
}

impl PropertyValue {
    /// Serialize as a destination property object
    pub fn to_notion(&self) -> Value {
        match self {
            PropertyValue::Title(text) => json!({ "title": [text_segment(text)] }),
            PropertyValue::RichText(text) => json!({ "rich_text": [text_segment(text)] }),
            PropertyValue::Number(n) => json!({ "number": n }),
            PropertyValue::Date { start } => json!({ "date": { "start": start } }),
            PropertyValue::Url(url) => json!({ "url": url }),
            PropertyValue::Select(name) => json!({ "select": { "name": name } }),
            PropertyValue::MultiSelect(names) => json!({
                "multi_select": names.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>()
            }),
        }
    }
}

fn text_segment(text: &str) -> Value {
    let content: String = text.chars().take(MAX_TEXT_LENGTH).collect();
    json!({ "type": "text", "text": { "content": content } })
}

/// External image used as page cover or icon
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub url: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn to_notion(&self) -> Value {
        json!({ "type": "external", "external": { "url": self.url } })
    }
}

/// Everything written to one destination page.
///
/// Absent entries are left untouched on the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputPayload {
    pub properties: BTreeMap<String, PropertyValue>,
    pub cover: Option<ImageRef>,
    pub icon: Option<ImageRef>,
}

impl OutputPayload {
    /// Request body for a page update
    pub fn to_notion(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.to_notion()))
            .collect();

        let mut body = json!({ "properties": properties });
        if let Some(cover) = &self.cover {
            body["cover"] = cover.to_notion();
        }
        if let Some(icon) = &self.icon {
            body["icon"] = icon.to_notion();
        }
        body
    }
}

/// Raw upstream data gathered for one app
#[derive(Debug, Clone, Default)]
pub struct UpstreamData {
    pub catalog: Option<CatalogInfo>,
    pub session: Option<SessionInfo>,
    pub reviews: Option<ReviewInfo>,
    pub tag_names: Option<TagNames>,
}

/// Borrowed view handed to each field mapper
#[derive(Debug, Clone, Copy)]
pub struct MappingInput<'a> {
    pub app_id: u32,
    pub catalog: Option<&'a CatalogInfo>,
    pub session: Option<&'a SessionInfo>,
    pub reviews: Option<&'a ReviewInfo>,
    pub tag_names: Option<&'a TagNames>,
}

impl<'a> MappingInput<'a> {
    pub fn new(app_id: u32, data: &'a UpstreamData) -> Self {
        Self {
            app_id,
            catalog: data.catalog.as_ref(),
            session: data.session.as_ref(),
            reviews: data.reviews.as_ref(),
            tag_names: data.tag_names.as_ref(),
        }
    }
}

/// What a single field mapper produced
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutput {
    Property(PropertyValue),
    Cover(ImageRef),
    Icon(ImageRef),
    /// No data for this field; leave the destination as it is
    Omit,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("no destination property configured")]
    MissingProperty,

    #[error("unsupported format '{0}'")]
    InvalidFormat(String),
}

/// One or more fields of an item failed to map
#[derive(Debug, Clone, PartialEq)]
pub struct MappingError {
    pub app_id: u32,
    pub failures: Vec<(String, FieldError)>,
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mapping failed for app {}:", self.app_id)?;
        for (field, err) in &self.failures {
            write!(f, " {}: {};", field, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MappingError {}
