// SPDX-License-Identifier: GPL-3.0-only
pub mod client;
pub mod pagination;
pub mod traits;

pub use client::{NotionClient, NotionSettings};
pub use pagination::changed_records;
pub use traits::{Destination, NotionError, RecordPage, SyncRecord};
