//! Remote synchronization seam.
//!
//! # Responsibility
//! - Define the provider contract storage uses to push pending records.
//! - Keep transport details outside core.

mod provider;

pub use provider::{
    SyncError, SyncProvider, SyncPushRequest, SyncPushResult, SyncResult, SyncSummary,
};
