use serde_json::json;
use tracing::{info, warn};

use super::classifier::{FailureClass, classify};
use crate::error::{DeckError, Result};
use crate::package::{PackageState, PackageStore};
use crate::target::TargetStore;

/// How a failed package was resolved.
#[derive(Debug, Clone)]
pub enum RecoveryOutcome {
    /// Transient: same package went back to ready for another submission.
    Resubmitted {
        package_id: String,
        retry_count: u32,
    },
    /// Permanent: a successor draft supersedes the failed package.
    Replanned {
        failed_package_id: String,
        successor_id: String,
    },
    /// The package was no longer failed by the time recovery ran; a
    /// concurrent sweep got there first.
    AlreadyResolved { state: PackageState },
}

/// Resolves packages sitting in `failed`. Transient failures resubmit until
/// the retry ceiling, then count as permanent; permanent failures spawn a
/// successor draft at version+1 while the failed package keeps its state.
pub struct RecoveryPolicy {
    max_retries: u32,
}

impl RecoveryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub async fn recover(
        &self,
        packages: &PackageStore,
        targets: &TargetStore,
        package_id: &str,
    ) -> Result<RecoveryOutcome> {
        let package = packages.load(package_id).await?;
        if !package.state.is_failed() {
            return Ok(RecoveryOutcome::AlreadyResolved {
                state: package.state,
            });
        }

        let reason = package
            .last_failure_reason()
            .unwrap_or("failure reason not recorded")
            .to_string();

        let mut class = classify(&reason);
        let mut ceiling_hit = false;
        if class == FailureClass::Transient && package.retry_count >= self.max_retries {
            class = FailureClass::Permanent;
            ceiling_hit = true;
        }

        match class {
            FailureClass::Transient => {
                let retry_count = packages
                    .mutate(package_id, |p| {
                        p.retry_count += 1;
                        Ok(p.retry_count)
                    })
                    .await?;

                let mut metadata = std::collections::HashMap::new();
                metadata.insert("failure_class".to_string(), json!("transient"));
                metadata.insert("retry_count".to_string(), json!(retry_count));
                packages
                    .transition(
                        package_id,
                        PackageState::Ready,
                        format!(
                            "transient failure, resubmitting ({}/{}): {}",
                            retry_count, self.max_retries, reason
                        ),
                        metadata,
                    )
                    .await?;

                info!(package_id, retry_count, %reason, "Transient failure, package resubmitted");
                Ok(RecoveryOutcome::Resubmitted {
                    package_id: package_id.to_string(),
                    retry_count,
                })
            }
            FailureClass::Permanent => {
                let annotated = if ceiling_hit {
                    format!(
                        "{} [replanned: retry ceiling reached after: {}]",
                        package.summary, reason
                    )
                } else {
                    format!("{} [replanned after failure: {}]", package.summary, reason)
                };

                let successor = match packages
                    .create(
                        &package.target_id,
                        package.kind,
                        annotated,
                        package.endpoints.clone(),
                        package.expected_outputs.clone(),
                    )
                    .await
                {
                    Ok(successor) => successor,
                    // A crash after a previous replan can leave the successor
                    // already on disk; recovery converges on it.
                    Err(DeckError::LivePackageExists { package_id: id, .. }) => {
                        warn!(package_id, successor = %id, "Successor already exists, reusing");
                        packages.load(&id).await?
                    }
                    Err(e) => return Err(e),
                };

                packages
                    .mutate(package_id, |p| {
                        p.metadata
                            .insert("superseded_by".to_string(), json!(successor.id));
                        Ok(())
                    })
                    .await?;

                let mut target = targets.load(&package.target_id).await?;
                target.record_failed_package(package_id);
                target.current_package = Some(successor.id.clone());
                targets.save(&target).await?;

                info!(package_id, successor_id = %successor.id, %reason, "Permanent failure, package replanned");
                Ok(RecoveryOutcome::Replanned {
                    failed_package_id: package_id.to_string(),
                    successor_id: successor.id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::package::{ExpectedOutput, PackageKind};
    use crate::target::{Target, TargetCategory};

    async fn fixture() -> (tempfile::TempDir, PackageStore, TargetStore) {
        let dir = tempfile::tempdir().unwrap();
        let packages = PackageStore::new(dir.path().join("packages"));
        packages.init().await.unwrap();
        let targets = TargetStore::new(dir.path().join("targets"));
        targets.init().await.unwrap();
        targets
            .save(&Target::new("t-001", "Meridian Logistics", TargetCategory::Org))
            .await
            .unwrap();
        (dir, packages, targets)
    }

    async fn failed_package(packages: &PackageStore, reason: &str) -> String {
        let package = packages
            .create(
                "t-001",
                PackageKind::Document,
                "Collect the public filing record for the subject organization",
                vec!["https://archive.org/details/x".to_string()],
                vec![ExpectedOutput::new("t-001/doc.pdf", ArtifactKind::Document)],
            )
            .await
            .unwrap();
        packages
            .transition(&package.id, PackageState::Failed, reason, HashMap::new())
            .await
            .unwrap();
        package.id
    }

    #[tokio::test]
    async fn test_transient_failure_resubmits() {
        let (_dir, packages, targets) = fixture().await;
        let id = failed_package(&packages, "executor resource conflict").await;

        let policy = RecoveryPolicy::new(3);
        let outcome = policy.recover(&packages, &targets, &id).await.unwrap();

        match outcome {
            RecoveryOutcome::Resubmitted {
                retry_count,
                ref package_id,
            } => {
                assert_eq!(retry_count, 1);
                assert_eq!(package_id, &id);
            }
            other => panic!("expected resubmission, got {:?}", other),
        }

        let reloaded = packages.load(&id).await.unwrap();
        assert_eq!(reloaded.state, PackageState::Ready);
        assert_eq!(reloaded.retry_count, 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_replans() {
        let (_dir, packages, targets) = fixture().await;
        let id = failed_package(&packages, "endpoint returned 404").await;

        let policy = RecoveryPolicy::new(3);
        let outcome = policy.recover(&packages, &targets, &id).await.unwrap();

        let successor_id = match outcome {
            RecoveryOutcome::Replanned { successor_id, .. } => successor_id,
            other => panic!("expected replanning, got {:?}", other),
        };
        assert_eq!(successor_id, "t-001-v2");

        let old = packages.load(&id).await.unwrap();
        assert_eq!(old.state, PackageState::Failed, "failed package stays failed");

        let successor = packages.load(&successor_id).await.unwrap();
        assert_eq!(successor.state, PackageState::Draft);
        assert_eq!(successor.version, 2);
        assert!(successor.summary.contains("endpoint returned 404"));

        let target = targets.load("t-001").await.unwrap();
        let failed_list = target.metadata.get("failed_packages").unwrap();
        assert_eq!(failed_list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_ceiling_forces_replan() {
        let (_dir, packages, targets) = fixture().await;
        let id = failed_package(&packages, "executor resource conflict").await;
        packages
            .mutate(&id, |p| {
                p.retry_count = 3;
                Ok(())
            })
            .await
            .unwrap();

        let policy = RecoveryPolicy::new(3);
        let outcome = policy.recover(&packages, &targets, &id).await.unwrap();
        assert!(
            matches!(outcome, RecoveryOutcome::Replanned { .. }),
            "transient message past the ceiling is treated as permanent"
        );
    }

    #[tokio::test]
    async fn test_recover_on_non_failed_package_is_a_noop() {
        let (_dir, packages, targets) = fixture().await;
        let package = packages
            .create(
                "t-001",
                PackageKind::Document,
                "Collect the public filing record for the subject organization",
                vec!["https://archive.org/details/x".to_string()],
                vec![ExpectedOutput::new("t-001/doc.pdf", ArtifactKind::Document)],
            )
            .await
            .unwrap();

        let policy = RecoveryPolicy::new(3);
        let outcome = policy
            .recover(&packages, &targets, &package.id)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            RecoveryOutcome::AlreadyResolved {
                state: PackageState::Draft
            }
        ));
    }
}
