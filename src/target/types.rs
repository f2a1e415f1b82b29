use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A research subject tracked for eventual collection and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub category: TargetCategory,

    /// 1 is highest. Anything >= 3 is batch work.
    pub priority: u8,

    pub status: TargetStatus,

    /// Weak back-reference to the current package. Lookup only; the package's
    /// existence does not extend the target's lifecycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_package: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: TargetCategory) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            category,
            priority: 2,
            status: TargetStatus::New,
            current_package: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.max(1);
        self
    }

    pub fn needs_collection(&self) -> bool {
        matches!(self.status, TargetStatus::New | TargetStatus::UnderResearch)
    }

    /// Records a package that ended permanently failed, for operator visibility.
    pub fn record_failed_package(&mut self, package_id: &str) {
        let entry = self
            .metadata
            .entry("failed_packages".to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let serde_json::Value::Array(list) = entry {
            list.push(serde_json::Value::String(package_id.to_string()));
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    Person,
    Org,
    Event,
    Location,
    Tech,
    Operation,
}

impl std::fmt::Display for TargetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Person => "person",
            Self::Org => "org",
            Self::Event => "event",
            Self::Location => "location",
            Self::Tech => "tech",
            Self::Operation => "operation",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TargetCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "person" => Ok(Self::Person),
            "org" | "organization" => Ok(Self::Org),
            "event" => Ok(Self::Event),
            "location" => Ok(Self::Location),
            "tech" | "technology" => Ok(Self::Tech),
            "operation" => Ok(Self::Operation),
            _ => Err(format!("Invalid target category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    #[default]
    New,
    UnderResearch,
    Validated,
    Closed,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::UnderResearch => "under_research",
            Self::Validated => "validated",
            Self::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_collection() {
        let mut target = Target::new("t-001", "Acme Corp", TargetCategory::Org);
        assert!(target.needs_collection());
        target.status = TargetStatus::Validated;
        assert!(!target.needs_collection());
        target.status = TargetStatus::Closed;
        assert!(!target.needs_collection());
    }

    #[test]
    fn test_record_failed_package_accumulates() {
        let mut target = Target::new("t-001", "Acme Corp", TargetCategory::Org);
        target.record_failed_package("t-001-v1");
        target.record_failed_package("t-001-v2");
        let list = target.metadata.get("failed_packages").unwrap();
        assert_eq!(
            list.as_array().unwrap().len(),
            2,
            "both failed packages recorded"
        );
    }

    #[test]
    fn test_priority_floor() {
        let target = Target::new("t-001", "x", TargetCategory::Person).with_priority(0);
        assert_eq!(target.priority, 1);
    }
}
