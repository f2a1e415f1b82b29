use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status reported by the external executor for one handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    #[default]
    Pending,
    Submitted,
    Accepted,
    Queued,
    Running,
    Completed,
    Failed,
}

impl HandoffStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position along the executor's progression, for catch-up ordering.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Submitted => 1,
            Self::Accepted => 2,
            Self::Queued => 3,
            Self::Running => 4,
            Self::Completed => 5,
            Self::Failed => 6,
        }
    }
}

impl std::fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One submission attempt. A resubmission creates a new record; the old one
/// stays terminal and untouched for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub id: String,
    pub package_id: String,

    /// The opaque task specification the executor was given.
    pub spec: serde_json::Value,

    pub status: HandoffStatus,

    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Free-form result payload from the executor; V1 inspects it for
    /// critical-error markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl HandoffRecord {
    pub fn new(package_id: impl Into<String>, spec: serde_json::Value) -> Self {
        Self {
            id: format!("h-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            package_id: package_id.into(),
            spec,
            status: HandoffStatus::Pending,
            submitted_at: None,
            completed_at: None,
            result: None,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_submitted(&mut self) {
        self.status = HandoffStatus::Submitted;
        self.submitted_at = Some(Utc::now());
    }

    /// Applies a polled update. Terminal records are immutable; later updates
    /// for them are ignored.
    pub fn apply_update(&mut self, update: &HandoffUpdate) {
        if self.status.is_terminal() {
            return;
        }
        self.status = update.status;
        if let Some(result) = &update.result {
            self.result = Some(result.clone());
        }
        if let Some(reason) = &update.reason {
            self.failure_reason = Some(reason.clone());
        }
        if update.status.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// Status snapshot pulled from the executor for one handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffUpdate {
    pub status: HandoffStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Execution priority class derived from target priority. Deterministic,
/// no learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    High,
    Normal,
    Batch,
}

impl PriorityClass {
    pub fn from_target_priority(priority: u8) -> Self {
        match priority {
            1 => Self::High,
            2 => Self::Normal,
            _ => Self::Batch,
        }
    }
}

impl std::fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Batch => "batch",
        };
        write!(f, "{}", s)
    }
}

/// The payload handed to the external executor. Opaque on their side; this
/// struct only fixes what we promise to put in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub handoff_id: String,
    pub package_id: String,
    pub kind: String,
    pub endpoints: Vec<String>,
    pub expected_outputs: Vec<String>,
    pub priority: PriorityClass,
    pub estimated_minutes: u32,
    pub resource_intensive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_mapping() {
        assert_eq!(PriorityClass::from_target_priority(1), PriorityClass::High);
        assert_eq!(PriorityClass::from_target_priority(2), PriorityClass::Normal);
        assert_eq!(PriorityClass::from_target_priority(3), PriorityClass::Batch);
        assert_eq!(PriorityClass::from_target_priority(9), PriorityClass::Batch);
    }

    #[test]
    fn test_terminal_records_ignore_updates() {
        let mut record = HandoffRecord::new("t-001-v1", serde_json::json!({}));
        record.apply_update(&HandoffUpdate {
            status: HandoffStatus::Failed,
            result: None,
            reason: Some("executor resource conflict".to_string()),
        });
        assert_eq!(record.status, HandoffStatus::Failed);
        assert!(record.completed_at.is_some());

        record.apply_update(&HandoffUpdate {
            status: HandoffStatus::Running,
            result: None,
            reason: None,
        });
        assert_eq!(record.status, HandoffStatus::Failed, "terminal status is immutable");
    }

    #[test]
    fn test_status_rank_is_monotone() {
        assert!(HandoffStatus::Pending.rank() < HandoffStatus::Submitted.rank());
        assert!(HandoffStatus::Queued.rank() < HandoffStatus::Running.rank());
        assert!(HandoffStatus::Running.rank() < HandoffStatus::Completed.rank());
    }
}
