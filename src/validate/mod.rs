//! The three validation gates.
//!
//! Each gate is a stateless function returning an ordered error list; the
//! caller folds failures into the status history rather than raising them.
//! V0 guards draft->ready, V1 guards running->completed, V2 guards
//! outputs_ingested->validated.

mod conformance;
mod execution;
mod report;
mod schema;

pub use conformance::check_conformance;
pub use execution::check_execution;
pub use report::ValidationReport;
pub use schema::check_schema;
