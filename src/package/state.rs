use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a collection package.
///
/// The happy path runs draft through closed in order, one hop at a time.
/// `failed` is reachable from every live state and resolves through recovery:
/// back to `ready` for a resubmission, or superseded by a fresh draft at the
/// next version while the failed package keeps its state forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageState {
    #[default]
    Draft,
    Ready,
    Submitted,
    Accepted,
    Queued,
    Running,
    Completed,
    OutputsIngested,
    Validated,
    Closed,
    Failed,
}

impl PackageState {
    pub fn allowed_transitions(&self) -> &'static [PackageState] {
        use PackageState::*;
        match self {
            Draft => &[Ready, Failed],
            Ready => &[Submitted, Failed],
            Submitted => &[Accepted, Failed],
            Accepted => &[Queued, Failed],
            Queued => &[Running, Failed],
            Running => &[Completed, Failed],
            Completed => &[OutputsIngested, Failed],
            OutputsIngested => &[Validated, Failed],
            Validated => &[Closed, Failed],
            Closed => &[],
            Failed => &[Ready],
        }
    }

    pub fn can_transition_to(&self, target: PackageState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Counts toward the one-live-package-per-target invariant.
    ///
    /// A failed package is excluded: it either resolves back to `ready`
    /// (becoming live again) or is superseded by a successor draft, and the
    /// successor must be creatable while the failed predecessor still exists.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Closed | Self::Failed)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// States whose exit guard depends on the external executor's status feed.
    pub fn awaits_executor(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Accepted | Self::Queued | Self::Running
        )
    }

    /// States the sweep can advance locally, without an external signal.
    pub fn is_sweep_actionable(&self) -> bool {
        matches!(
            self,
            Self::Draft
                | Self::Ready
                | Self::Completed
                | Self::OutputsIngested
                | Self::Validated
                | Self::Failed
        )
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::OutputsIngested => "outputs_ingested",
            Self::Validated => "validated",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One audit record per transition. Append-only; the full trail for a package
/// is its entries in timestamp order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub from: PackageState,
    pub to: PackageState,
    pub at: DateTime<Utc>,
    pub reason: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StatusHistoryEntry {
    pub fn new(from: PackageState, to: PackageState, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            at: Utc::now(),
            reason: reason.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(PackageState::Draft.can_transition_to(PackageState::Ready));
        assert!(PackageState::Ready.can_transition_to(PackageState::Submitted));
        assert!(PackageState::Submitted.can_transition_to(PackageState::Accepted));
        assert!(PackageState::Accepted.can_transition_to(PackageState::Queued));
        assert!(PackageState::Queued.can_transition_to(PackageState::Running));
        assert!(PackageState::Running.can_transition_to(PackageState::Completed));
        assert!(PackageState::Completed.can_transition_to(PackageState::OutputsIngested));
        assert!(PackageState::OutputsIngested.can_transition_to(PackageState::Validated));
        assert!(PackageState::Validated.can_transition_to(PackageState::Closed));
    }

    #[test]
    fn test_no_skipped_states() {
        assert!(!PackageState::Draft.can_transition_to(PackageState::Submitted));
        assert!(!PackageState::Ready.can_transition_to(PackageState::Running));
        assert!(!PackageState::Running.can_transition_to(PackageState::Validated));
        assert!(!PackageState::Completed.can_transition_to(PackageState::Closed));
    }

    #[test]
    fn test_failed_reachable_from_all_live_states() {
        use PackageState::*;
        for state in [
            Draft,
            Ready,
            Submitted,
            Accepted,
            Queued,
            Running,
            Completed,
            OutputsIngested,
            Validated,
        ] {
            assert!(state.can_transition_to(Failed), "{} -> failed", state);
        }
    }

    #[test]
    fn test_closed_is_final() {
        assert!(PackageState::Closed.allowed_transitions().is_empty());
    }

    #[test]
    fn test_failed_resolves_only_to_ready() {
        assert_eq!(PackageState::Failed.allowed_transitions(), &[PackageState::Ready]);
        assert!(!PackageState::Failed.can_transition_to(PackageState::Draft));
    }

    #[test]
    fn test_liveness() {
        assert!(PackageState::Draft.is_live());
        assert!(PackageState::Running.is_live());
        assert!(!PackageState::Closed.is_live());
        assert!(!PackageState::Failed.is_live());
    }

    #[test]
    fn test_executor_gated_states() {
        assert!(PackageState::Submitted.awaits_executor());
        assert!(PackageState::Running.awaits_executor());
        assert!(!PackageState::Draft.awaits_executor());
        assert!(!PackageState::Completed.awaits_executor());
    }
}
