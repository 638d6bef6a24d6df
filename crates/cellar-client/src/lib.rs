//! Cellar Inventory REST Client
//!
//! [`HttpInventory`] implements the review session's
//! [`InventoryService`](cellar_review::InventoryService) over JSON/HTTP:
//!
//! | call                   | request                                |
//! |------------------------|----------------------------------------|
//! | `get_proposed_layout`  | `GET  /api/cellar/layout/proposal`     |
//! | `fetch_current_layout` | `GET  /api/cellar/layout`              |
//! | `validate_moves`       | `POST /api/cellar/validate-moves`      |
//! | `execute_moves`        | `POST /api/cellar/execute-moves`       |
//!
//! POST bodies are `{ "moves": [...] }`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod error;
mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{HttpInventory, CELLAR_ID_HEADER};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
