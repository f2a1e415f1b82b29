//! Package domain types, lifecycle state machine, and persistence.
//!
//! - `Package`: versioned collection plan owning its handoffs, manifest, and
//!   audit history
//! - `PackageState`: the guarded lifecycle graph
//! - `PackageStore`: file-backed store with per-id mutual exclusion and the
//!   atomic one-live-package check-and-create

mod state;
mod store;
mod types;

pub use state::{PackageState, StatusHistoryEntry};
pub use store::PackageStore;
pub use types::{ExpectedOutput, Package, PackageKind, ValidationLevel};
