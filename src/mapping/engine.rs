// SPDX-License-Identifier: GPL-3.0-only
use tracing::debug;

use crate::config::{FieldConfig, FieldMappingConfig};
use crate::mapping::fields::DEFAULT_TAG_LANGUAGE;
use crate::mapping::models::{
    FieldError, FieldOutput, MappingError, MappingInput, OutputPayload, UpstreamData,
};
use crate::mapping::registry::{self, FieldSpec, Target};

/// Applies the configured field table to upstream data.
///
/// Pure: the same input always produces the same payload.
#[derive(Clone)]
pub struct FieldMapper {
    fields: Vec<(&'static FieldSpec, FieldConfig)>,
}

impl FieldMapper {
    /// Keep the enabled fields that have a mapper; anything else is dropped
    pub fn new(config: &FieldMappingConfig) -> Self {
        let fields = config
            .iter()
            .filter(|(_, field)| field.enabled)
            .filter_map(|(name, field)| match registry::find(name) {
                Some(spec) => Some((spec, field.clone())),
                None => {
                    debug!(field = %name, "Ignoring unknown game property");
                    None
                }
            })
            .collect();

        Self { fields }
    }

    /// Language for tag name resolution, if tags are mapped at all
    pub fn tag_language(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(spec, _)| spec.name == "tags")
            .map(|(_, field)| field.tag_language.as_deref().unwrap_or(DEFAULT_TAG_LANGUAGE))
    }

    /// Map every enabled field. Any field failure fails the whole item, after
    /// all fields have been tried.
    pub fn map_fields(&self, app_id: u32, data: &UpstreamData) -> Result<OutputPayload, MappingError> {
        let input = MappingInput::new(app_id, data);
        let mut payload = OutputPayload::default();
        let mut failures = Vec::new();

        for (spec, field) in &self.fields {
            match (spec.map)(field, &input) {
                Ok(FieldOutput::Property(value)) => match &field.notion_property {
                    Some(property) if spec.target == Target::Property => {
                        payload.properties.insert(property.clone(), value);
                    }
                    _ => failures.push((spec.name.to_string(), FieldError::MissingProperty)),
                },
                Ok(FieldOutput::Cover(image)) => payload.cover = Some(image),
                Ok(FieldOutput::Icon(image)) => payload.icon = Some(image),
                Ok(FieldOutput::Omit) => {
                    debug!(app_id, field = spec.name, "No data for field");
                }
                Err(e) => failures.push((spec.name.to_string(), e)),
            }
        }

        if failures.is_empty() {
            Ok(payload)
        } else {
            Err(MappingError { app_id, failures })
        }
    }
}
