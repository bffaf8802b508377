// SPDX-License-Identifier: GPL-3.0-only
pub mod orchestrator;
pub mod report;

pub use orchestrator::{SyncOrchestrator, SyncSettings, Upstreams};
