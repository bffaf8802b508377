// SPDX-License-Identifier: GPL-3.0-only
pub mod client;
pub mod models;
pub mod session;
pub mod store;
pub mod token;
pub mod traits;
pub mod vdf;

pub use models::{CatalogInfo, ReviewInfo, SessionInfo, TagNames};
pub use session::SteamSession;
pub use store::StoreClient;
pub use traits::{CatalogApi, SessionApi, SteamError};
