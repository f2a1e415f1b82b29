use crate::manifest::ManifestStatus;
use crate::package::{Package, ValidationLevel};

use super::report::ValidationReport;

/// V2: output conformance gate, run before outputs_ingested -> validated.
/// Unlike V1, this demands the full expected set: every output reconciled,
/// nothing missing or invalid, and entry count equal to the expected count so
/// partial ingestion cannot slip through.
pub fn check_conformance(package: &Package) -> ValidationReport {
    let mut errors = Vec::new();

    for output in &package.expected_outputs {
        match package.manifest_entry_for(&output.path) {
            None => errors.push(format!("no manifest entry for expected output '{}'", output.path)),
            Some(entry) => match entry.status {
                ManifestStatus::Valid => {}
                ManifestStatus::Pending => errors.push(format!(
                    "manifest entry for '{}' is still pending",
                    output.path
                )),
                ManifestStatus::Missing | ManifestStatus::Invalid => errors.push(format!(
                    "manifest entry for '{}' is {}: {}",
                    output.path,
                    entry.status,
                    entry.error.as_deref().unwrap_or("no detail recorded")
                )),
            },
        }
    }

    if package.manifest.len() != package.expected_outputs.len() {
        errors.push(format!(
            "manifest has {} entries for {} expected outputs",
            package.manifest.len(),
            package.expected_outputs.len()
        ));
    }

    ValidationReport::from_errors(ValidationLevel::V2, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::manifest::ManifestEntry;
    use crate::package::{ExpectedOutput, PackageKind};

    fn package() -> Package {
        Package::new("t-001", 1, PackageKind::Document).with_expected_outputs(vec![
            ExpectedOutput::new("t-001/a.pdf", ArtifactKind::Document),
            ExpectedOutput::new("t-001/b.pdf", ArtifactKind::Document),
        ])
    }

    fn valid_entry(package: &Package, path: &str) -> ManifestEntry {
        ManifestEntry::valid(
            &package.id,
            ExpectedOutput::new(path, ArtifactKind::Document),
            ArtifactKind::Document,
            "r-1",
        )
    }

    #[test]
    fn test_fully_reconciled_passes() {
        let mut package = package();
        package.manifest.push(valid_entry(&package, "t-001/a.pdf"));
        package.manifest.push(valid_entry(&package, "t-001/b.pdf"));
        let report = check_conformance(&package);
        assert!(report.passed, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_missing_entry_fails() {
        let mut package = package();
        package.manifest.push(valid_entry(&package, "t-001/a.pdf"));
        package.manifest.push(ManifestEntry::missing(
            &package.id,
            ExpectedOutput::new("t-001/b.pdf", ArtifactKind::Document),
            "expected artifact not found",
        ));
        let report = check_conformance(&package);
        assert!(!report.passed);
        assert!(report.errors[0].contains("missing"));
    }

    #[test]
    fn test_partial_ingestion_fails_on_count() {
        let mut package = package();
        package.manifest.push(valid_entry(&package, "t-001/a.pdf"));
        let report = check_conformance(&package);
        assert!(!report.passed);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("no manifest entry for expected output"))
        );
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("1 entries for 2 expected outputs"))
        );
    }
}
