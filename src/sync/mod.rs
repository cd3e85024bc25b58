//! Keeps the model catalog in step with the hosts chats point at
//!
//! - synchronizer.rs: the two-phase list/detail pass
//! - scheduler.rs: coalescing background runner for passes
//! - triggers.rs: chat store diff that requests a pass

pub mod synchronizer;
pub mod scheduler;
pub mod triggers;

pub use synchronizer::{CatalogSynchronizer, SyncReport};
pub use scheduler::{SyncScheduler, SyncTrigger};
pub use triggers::hosts_changed;
