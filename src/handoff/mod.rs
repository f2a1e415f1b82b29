//! Handoff protocol with the external executor.
//!
//! The executor is a foreign, asynchronously scheduled system. Everything we
//! know about it flows through `HandoffRecord`s: one per submission attempt,
//! updated by polling, never by callback.

mod gateway;
mod mailbox;
mod types;

pub use gateway::HandoffGateway;
pub use mailbox::{ExecutorBackend, FsMailbox};
pub use types::{HandoffRecord, HandoffStatus, HandoffUpdate, PriorityClass, TaskSpec};
