// SPDX-License-Identifier: GPL-3.0-only
pub mod sqlite;
pub mod sync_state;
pub mod traits;

pub use sqlite::SqliteStateStore;
pub use sync_state::SyncState;
pub use traits::{StateError, StateStore};
