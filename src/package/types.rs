use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{PackageState, StatusHistoryEntry};
use crate::artifact::ArtifactKind;
use crate::handoff::HandoffRecord;
use crate::manifest::ManifestEntry;

/// A versioned collection plan bound to exactly one target.
///
/// The package exclusively owns its handoff records, manifest entries, and
/// status history; they live embedded in the package document and share its
/// persistence lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub target_id: String,

    /// Strictly increasing per target, never reused.
    pub version: u32,

    pub kind: PackageKind,
    pub state: PackageState,

    /// What this package intends to collect and why.
    pub summary: String,

    /// Collection endpoints, in the order the executor should attempt them.
    pub endpoints: Vec<String>,

    /// Artifacts the executor is expected to produce.
    pub expected_outputs: Vec<ExpectedOutput>,

    #[serde(default)]
    pub validation_level: ValidationLevel,

    /// Transient-failure resubmissions consumed so far.
    #[serde(default)]
    pub retry_count: u32,

    #[serde(default)]
    pub handoffs: Vec<HandoffRecord>,

    #[serde(default)]
    pub manifest: Vec<ManifestEntry>,

    #[serde(default)]
    pub state_history: Vec<StatusHistoryEntry>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    /// Canonical package id for a target and version, e.g. `t-014-v3`.
    pub fn id_for(target_id: &str, version: u32) -> String {
        format!("{}-v{}", target_id, version)
    }

    pub fn new(target_id: impl Into<String>, version: u32, kind: PackageKind) -> Self {
        let target_id = target_id.into();
        let now = Utc::now();
        Self {
            id: Self::id_for(&target_id, version),
            target_id,
            version,
            kind,
            state: PackageState::Draft,
            summary: String::new(),
            endpoints: Vec::new(),
            expected_outputs: Vec::new(),
            validation_level: ValidationLevel::None,
            retry_count: 0,
            handoffs: Vec::new(),
            manifest: Vec::new(),
            state_history: Vec::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_expected_outputs(mut self, outputs: Vec<ExpectedOutput>) -> Self {
        self.expected_outputs = outputs;
        self
    }

    /// Most recent handoff record, the one the gateway polls.
    pub fn current_handoff(&self) -> Option<&HandoffRecord> {
        self.handoffs.last()
    }

    pub fn current_handoff_mut(&mut self) -> Option<&mut HandoffRecord> {
        self.handoffs.last_mut()
    }

    /// Manifest entry for an expected output path, if reconciliation already
    /// produced one.
    pub fn manifest_entry_for(&self, expected_path: &str) -> Option<&ManifestEntry> {
        self.manifest
            .iter()
            .find(|e| e.expected.path == expected_path)
    }

    /// Expected outputs that reconciliation has not yet produced an entry for.
    pub fn unreconciled_outputs(&self) -> Vec<&ExpectedOutput> {
        self.expected_outputs
            .iter()
            .filter(|o| self.manifest_entry_for(&o.path).is_none())
            .collect()
    }

    /// A failed package blocks new synthesis for its target until recovery
    /// resolves it: back to ready, or superseded by a successor version.
    pub fn needs_recovery(&self) -> bool {
        self.state.is_failed() && !self.metadata.contains_key("superseded_by")
    }

    /// Reason attached to the most recent transition into `failed`.
    pub fn last_failure_reason(&self) -> Option<&str> {
        self.state_history
            .iter()
            .rev()
            .find(|e| e.to == PackageState::Failed)
            .map(|e| e.reason.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    Media,
    Document,
    Composite,
}

impl PackageKind {
    /// Media collection is flagged resource-intensive for the executor;
    /// composite packages carry media work and inherit the flag.
    pub fn is_resource_intensive(&self) -> bool {
        matches!(self, Self::Media | Self::Composite)
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Media => "media",
            Self::Document => "document",
            Self::Composite => "composite",
        };
        write!(f, "{}", s)
    }
}

/// Logical path plus the artifact kind the executor is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    pub path: String,
    pub kind: ArtifactKind,
}

impl ExpectedOutput {
    pub fn new(path: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Highest validation gate a package has cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    #[default]
    None,
    V0,
    V1,
    V2,
}

impl std::fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::V0 => "v0",
            Self::V1 => "v1",
            Self::V2 => "v2",
        };
        write!(f, "{}", s)
    }
}
