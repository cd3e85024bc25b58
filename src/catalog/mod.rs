//! Model catalog: per-host model lists and detail records
//!
//! - types.rs: ModelRecord, HostEntry, CatalogSnapshot, FetchState
//! - store.rs: CatalogStore, the observable container
//! - guards.rs: predicates deciding whether a sync pass is still needed

pub mod types;
pub mod store;
pub mod guards;

pub use types::{CatalogSnapshot, FetchState, HostEntry, ModelRecord, Outcome};
pub use store::{CatalogStore, CatalogSubscriber, HostClaim, ModelClaim};
pub use guards::{needs_loading_after_change, needs_loading_after_restore};
