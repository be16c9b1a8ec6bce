//! Controller module
//!
//! Background refresh loop that keeps the published metrics snapshot
//! current.

pub mod refresh;

pub use refresh::{RefreshConfig, RefreshScheduler, RefreshState, SnapshotHandle};
