use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKind;
use crate::package::ExpectedOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
    Missing,
}

impl ManifestStatus {
    /// Terminal entries are never mutated; a re-attempt happens under a new
    /// package version.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Missing => "missing",
        };
        write!(f, "{}", s)
    }
}

/// Reconciliation record for one expected output: what we wanted, what the
/// executor actually produced, and whether it survived validation and
/// ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub package_id: String,

    pub expected: ExpectedOutput,

    /// Where the artifact was observed; absent when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_path: Option<String>,

    /// Kind detected on the observed artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_kind: Option<ArtifactKind>,

    pub status: ManifestStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Evidence-store receipt for ingested artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,

    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl ManifestEntry {
    fn base(package_id: &str, expected: ExpectedOutput) -> Self {
        Self {
            id: format!("m-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            package_id: package_id.to_string(),
            expected,
            observed_path: None,
            observed_kind: None,
            status: ManifestStatus::Pending,
            error: None,
            receipt: None,
            created_at: Utc::now(),
            validated_at: None,
        }
    }

    pub fn missing(package_id: &str, expected: ExpectedOutput, error: impl Into<String>) -> Self {
        let mut entry = Self::base(package_id, expected);
        entry.status = ManifestStatus::Missing;
        entry.error = Some(error.into());
        entry.validated_at = Some(Utc::now());
        entry
    }

    pub fn invalid(
        package_id: &str,
        expected: ExpectedOutput,
        observed_kind: ArtifactKind,
        error: impl Into<String>,
    ) -> Self {
        let mut entry = Self::base(package_id, expected);
        entry.observed_path = Some(entry.expected.path.clone());
        entry.observed_kind = Some(observed_kind);
        entry.status = ManifestStatus::Invalid;
        entry.error = Some(error.into());
        entry.validated_at = Some(Utc::now());
        entry
    }

    pub fn valid(
        package_id: &str,
        expected: ExpectedOutput,
        observed_kind: ArtifactKind,
        receipt: impl Into<String>,
    ) -> Self {
        let mut entry = Self::base(package_id, expected);
        entry.observed_path = Some(entry.expected.path.clone());
        entry.observed_kind = Some(observed_kind);
        entry.status = ManifestStatus::Valid;
        entry.receipt = Some(receipt.into());
        entry.validated_at = Some(Utc::now());
        entry
    }
}
