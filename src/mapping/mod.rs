// SPDX-License-Identifier: GPL-3.0-only
pub mod engine;
pub mod fields;
pub mod models;
pub mod registry;
pub mod release_date;

pub use engine::FieldMapper;
pub use models::{ImageRef, MappingError, OutputPayload, PropertyValue, UpstreamData};
