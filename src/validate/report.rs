use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::package::ValidationLevel;

/// Result of one validation gate. Errors are ordered the way the checks ran;
/// an empty list means the gate passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub gate: ValidationLevel,
    pub passed: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(gate: ValidationLevel, errors: Vec<String>) -> Self {
        Self {
            gate,
            passed: errors.is_empty(),
            errors,
        }
    }

    pub fn summary(&self) -> String {
        if self.passed {
            format!("{} validation passed", self.gate)
        } else {
            format!(
                "{} validation failed: {}",
                self.gate,
                self.errors.join("; ")
            )
        }
    }

    /// Structured form for the triggering status-history entry.
    pub fn to_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut metadata = HashMap::new();
        metadata.insert(
            "validation_gate".to_string(),
            serde_json::Value::String(self.gate.to_string()),
        );
        if !self.errors.is_empty() {
            metadata.insert(
                "validation_errors".to_string(),
                serde_json::Value::Array(
                    self.errors
                        .iter()
                        .map(|e| serde_json::Value::String(e.clone()))
                        .collect(),
                ),
            );
        }
        metadata
    }
}
