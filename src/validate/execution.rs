use crate::artifact::ArtifactStore;
use crate::error::Result;
use crate::handoff::HandoffStatus;
use crate::package::{Package, ValidationLevel};

use super::report::ValidationReport;

/// V1: execution gate, run before running -> completed. Deliberately weaker
/// than V2: it only decides whether ingestion is worth attempting, so a
/// single present output is enough.
pub async fn check_execution(
    package: &Package,
    artifacts: &dyn ArtifactStore,
) -> Result<ValidationReport> {
    let mut errors = Vec::new();

    match package.current_handoff() {
        None => errors.push("package has no handoff record".to_string()),
        Some(handoff) => {
            if handoff.status != HandoffStatus::Completed {
                errors.push(format!(
                    "most recent handoff is {}, not completed",
                    handoff.status
                ));
            }
            if let Some(result) = &handoff.result {
                for marker in critical_markers(result) {
                    errors.push(format!("executor reported critical error: {}", marker));
                }
            }
        }
    }

    let mut any_present = false;
    for output in &package.expected_outputs {
        if artifacts.exists(&output.path).await? {
            any_present = true;
            break;
        }
    }
    if !any_present {
        errors.push("no expected output exists on the artifact store".to_string());
    }

    Ok(ValidationReport::from_errors(ValidationLevel::V1, errors))
}

/// Collects critical-error markers from a free-form result payload: objects
/// whose `severity`/`level` is "critical" or whose `critical` flag is set,
/// and strings mentioning a critical error.
fn critical_markers(value: &serde_json::Value) -> Vec<String> {
    let mut markers = Vec::new();
    collect_markers(value, &mut markers);
    markers
}

fn collect_markers(value: &serde_json::Value, markers: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            let flagged = map
                .get("critical")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
                || ["severity", "level"].iter().any(|key| {
                    map.get(*key)
                        .and_then(|v| v.as_str())
                        .is_some_and(|s| s.eq_ignore_ascii_case("critical"))
                });
            if flagged {
                let detail = map
                    .get("message")
                    .or_else(|| map.get("error"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unspecified critical entry");
                markers.push(detail.to_string());
                return;
            }
            for child in map.values() {
                collect_markers(child, markers);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_markers(item, markers);
            }
        }
        serde_json::Value::String(s) => {
            if s.to_ascii_lowercase().contains("critical error") {
                markers.push(s.clone());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::artifact::{ArtifactKind, FsArtifactStore};
    use crate::handoff::{HandoffRecord, HandoffUpdate};
    use crate::package::{ExpectedOutput, PackageKind};

    fn package_with_handoff(status: HandoffStatus, result: Option<serde_json::Value>) -> Package {
        let mut package = Package::new("t-001", 1, PackageKind::Document).with_expected_outputs(
            vec![ExpectedOutput::new("t-001/doc.txt", ArtifactKind::Document)],
        );
        let mut handoff = HandoffRecord::new(&package.id, json!({}));
        handoff.apply_update(&HandoffUpdate {
            status,
            result,
            reason: None,
        });
        package.handoffs.push(handoff);
        package
    }

    fn artifact_store(with_output: bool) -> (tempfile::TempDir, FsArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        if with_output {
            std::fs::create_dir_all(dir.path().join("t-001")).unwrap();
            std::fs::write(dir.path().join("t-001/doc.txt"), b"text").unwrap();
        }
        let store = FsArtifactStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_completed_clean_handoff_passes() {
        let package = package_with_handoff(HandoffStatus::Completed, Some(json!({"fetched": 2})));
        let (_dir, store) = artifact_store(true);
        let report = check_execution(&package, &store).await.unwrap();
        assert!(report.passed, "errors: {:?}", report.errors);
    }

    #[tokio::test]
    async fn test_non_completed_handoff_fails() {
        let package = package_with_handoff(HandoffStatus::Running, None);
        let (_dir, store) = artifact_store(true);
        let report = check_execution(&package, &store).await.unwrap();
        assert!(!report.passed);
        assert!(report.errors[0].contains("not completed"));
    }

    #[tokio::test]
    async fn test_critical_marker_in_result_fails() {
        let result = json!({
            "entries": [
                {"severity": "warning", "message": "slow endpoint"},
                {"severity": "critical", "message": "decoder crashed"}
            ]
        });
        let package = package_with_handoff(HandoffStatus::Completed, Some(result));
        let (_dir, store) = artifact_store(true);
        let report = check_execution(&package, &store).await.unwrap();
        assert!(!report.passed);
        assert!(report.errors[0].contains("decoder crashed"));
    }

    #[tokio::test]
    async fn test_no_outputs_on_store_fails() {
        let package = package_with_handoff(HandoffStatus::Completed, None);
        let (_dir, store) = artifact_store(false);
        let report = check_execution(&package, &store).await.unwrap();
        assert!(!report.passed);
        assert!(report.errors[0].contains("no expected output"));
    }

    #[test]
    fn test_marker_scan_reaches_nested_strings() {
        let markers = critical_markers(&json!({"log": ["ok", "CRITICAL ERROR: disk full"]}));
        assert_eq!(markers.len(), 1);
    }
}
