//! Client data layer for the hostdash console.
//!
//! `api` talks to the monitoring backend, `store` keeps a periodically refreshed
//! snapshot for overview screens, `listing` and `workflow` hold the per-view state
//! that decides which rows an action may touch.

pub mod api;
pub mod error;
pub mod listing;
pub mod normalize;
pub mod session;
pub mod store;
pub mod types;
pub mod workflow;

pub use api::{ApiClient, ClientConfig};
pub use error::{ApiError, ApiResult};
pub use store::{PollingStore, Snapshot, StoreStatus};
