// SPDX-License-Identifier: GPL-3.0-only
pub mod capabilities;
#[allow(clippy::module_inception)]
pub mod config;

pub use capabilities::Capabilities;
pub use config::{Config, FieldConfig, FieldMappingConfig, SteamConfig};
