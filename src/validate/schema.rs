use std::path::Component;

use url::Url;

use crate::config::ValidationConfig;
use crate::package::{Package, ValidationLevel};
use crate::target::Target;

use super::report::ValidationReport;

/// V0: schema gate, run before draft -> ready. Purely syntactic; the target
/// lookup happens at the caller so the check itself stays stateless.
pub fn check_schema(
    package: &Package,
    target: Option<&Target>,
    config: &ValidationConfig,
) -> ValidationReport {
    let mut errors = Vec::new();

    let expected_id = Package::id_for(&package.target_id, package.version);
    if package.id != expected_id {
        errors.push(format!(
            "package id '{}' does not match naming convention '{}'",
            package.id, expected_id
        ));
    }

    match target {
        None => errors.push(format!(
            "target reference '{}' does not resolve",
            package.target_id
        )),
        Some(t) if t.id != package.target_id => errors.push(format!(
            "target reference '{}' resolved to a different target '{}'",
            package.target_id, t.id
        )),
        Some(_) => {}
    }

    let summary = package.summary.trim();
    if summary.is_empty() {
        errors.push("plan summary is empty".to_string());
    } else if summary.len() < config.min_summary_chars {
        errors.push(format!(
            "plan summary is {} chars, minimum is {}",
            summary.len(),
            config.min_summary_chars
        ));
    }

    if package.endpoints.is_empty() {
        errors.push("collection endpoint list is empty".to_string());
    }
    for endpoint in &package.endpoints {
        if let Err(e) = Url::parse(endpoint) {
            errors.push(format!("invalid collection endpoint '{}': {}", endpoint, e));
        }
    }

    if package.expected_outputs.is_empty() {
        errors.push("expected output list is empty".to_string());
    }
    for output in &package.expected_outputs {
        if let Some(problem) = path_problem(&output.path) {
            errors.push(format!(
                "invalid expected output path '{}': {}",
                output.path, problem
            ));
        }
    }

    ValidationReport::from_errors(ValidationLevel::V0, errors)
}

/// Expected outputs are logical paths relative to the artifact store root.
fn path_problem(path: &str) -> Option<&'static str> {
    if path.trim().is_empty() {
        return Some("path is empty");
    }
    if path.contains('\0') {
        return Some("path contains a NUL byte");
    }
    for component in std::path::Path::new(path).components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            Component::ParentDir => return Some("path escapes the artifact root"),
            Component::RootDir | Component::Prefix(_) => return Some("path must be relative"),
        }
    }
    None
}
