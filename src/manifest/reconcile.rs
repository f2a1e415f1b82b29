use std::sync::Arc;

use tracing::{debug, warn};

use super::types::ManifestEntry;
use crate::artifact::{ArtifactStore, EvidenceSink, FormatVerdict, IngestOutcome};
use crate::error::Result;
use crate::package::Package;

/// Walks a package's expected outputs and records, for each, whether a
/// matching artifact exists, parses, and made it into the evidence store.
///
/// Idempotent by construction: only expected outputs without an existing
/// manifest entry produce new entries, so re-running after a partial sweep
/// never duplicates work.
pub struct Reconciler {
    artifacts: Arc<dyn ArtifactStore>,
    evidence: Arc<dyn EvidenceSink>,
}

impl Reconciler {
    pub fn new(artifacts: Arc<dyn ArtifactStore>, evidence: Arc<dyn EvidenceSink>) -> Self {
        Self {
            artifacts,
            evidence,
        }
    }

    /// Produces manifest entries for every not-yet-reconciled expected
    /// output. The caller appends them to the package under its lock.
    pub async fn reconcile(&self, package: &Package) -> Result<Vec<ManifestEntry>> {
        let mut entries = Vec::new();

        for expected in package.unreconciled_outputs() {
            if !self.artifacts.exists(&expected.path).await? {
                warn!(package_id = %package.id, path = %expected.path, "Expected artifact missing");
                entries.push(ManifestEntry::missing(
                    &package.id,
                    expected.clone(),
                    format!("expected artifact not found: {}", expected.path),
                ));
                continue;
            }

            let observed_kind = self.artifacts.detect_kind(&expected.path).await?;
            match self
                .artifacts
                .validate_format(&expected.path, expected.kind)
                .await?
            {
                FormatVerdict::Invalid(detail) => {
                    warn!(package_id = %package.id, path = %expected.path, %detail, "Artifact failed structural validation");
                    entries.push(ManifestEntry::invalid(
                        &package.id,
                        expected.clone(),
                        observed_kind,
                        detail,
                    ));
                }
                FormatVerdict::Ok => {
                    match self.evidence.ingest(&expected.path, &package.id).await? {
                        IngestOutcome::Accepted { receipt } => {
                            debug!(package_id = %package.id, path = %expected.path, "Artifact reconciled and ingested");
                            entries.push(ManifestEntry::valid(
                                &package.id,
                                expected.clone(),
                                observed_kind,
                                receipt,
                            ));
                        }
                        IngestOutcome::Rejected(reason) => {
                            warn!(package_id = %package.id, path = %expected.path, %reason, "Evidence sink rejected artifact");
                            entries.push(ManifestEntry::invalid(
                                &package.id,
                                expected.clone(),
                                observed_kind,
                                format!("ingestion rejected: {}", reason),
                            ));
                        }
                    }
                }
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, FsArtifactStore, FsEvidenceSink};
    use crate::manifest::ManifestStatus;
    use crate::package::{ExpectedOutput, PackageKind};

    fn fixture(dir: &std::path::Path) -> (Reconciler, Package) {
        let artifacts_root = dir.join("artifacts");
        std::fs::create_dir_all(artifacts_root.join("t-001")).unwrap();
        std::fs::write(artifacts_root.join("t-001/doc.txt"), b"collected text").unwrap();

        let reconciler = Reconciler::new(
            Arc::new(FsArtifactStore::new(&artifacts_root)),
            Arc::new(FsEvidenceSink::new(&artifacts_root, dir.join("evidence"))),
        );
        let package = Package::new("t-001", 1, PackageKind::Document).with_expected_outputs(vec![
            ExpectedOutput::new("t-001/doc.txt", ArtifactKind::Document),
            ExpectedOutput::new("t-001/never-produced.pdf", ArtifactKind::Document),
        ]);
        (reconciler, package)
    }

    #[tokio::test]
    async fn test_reconcile_mixes_valid_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (reconciler, package) = fixture(dir.path());

        let entries = reconciler.reconcile(&package).await.unwrap();
        assert_eq!(entries.len(), 2);

        let by_path = |p: &str| entries.iter().find(|e| e.expected.path == p).unwrap();
        assert_eq!(by_path("t-001/doc.txt").status, ManifestStatus::Valid);
        assert!(by_path("t-001/doc.txt").receipt.is_some());
        assert_eq!(
            by_path("t-001/never-produced.pdf").status,
            ManifestStatus::Missing
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (reconciler, mut package) = fixture(dir.path());

        let first = reconciler.reconcile(&package).await.unwrap();
        package.manifest.extend(first);

        let second = reconciler.reconcile(&package).await.unwrap();
        assert!(second.is_empty(), "no duplicate entries on re-run");
    }

    #[tokio::test]
    async fn test_structural_failure_is_invalid_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts_root = dir.path().join("artifacts");
        std::fs::create_dir_all(artifacts_root.join("t-001")).unwrap();
        // Claims to be audio, is not.
        std::fs::write(artifacts_root.join("t-001/e1.mp3"), b"plain text").unwrap();

        let reconciler = Reconciler::new(
            Arc::new(FsArtifactStore::new(&artifacts_root)),
            Arc::new(FsEvidenceSink::new(&artifacts_root, dir.path().join("evidence"))),
        );
        let package = Package::new("t-001", 1, PackageKind::Media).with_expected_outputs(vec![
            ExpectedOutput::new("t-001/e1.mp3", ArtifactKind::Media),
        ]);

        let entries = reconciler.reconcile(&package).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ManifestStatus::Invalid);
        assert!(entries[0].error.as_deref().unwrap().contains("media"));
    }
}
