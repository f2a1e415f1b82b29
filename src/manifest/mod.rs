//! Output manifest: the reconciliation ledger between expected and actual
//! artifacts.

mod reconcile;
mod types;

pub use reconcile::Reconciler;
pub use types::{ManifestEntry, ManifestStatus};
