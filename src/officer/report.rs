use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;

/// Structured summary of one sweep cycle, consumable by external reporting
/// tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub targets_scanned: usize,
    pub packages_created: Vec<String>,
    pub packages_failed: Vec<String>,
    pub packages_closed: Vec<String>,

    /// Transitions performed this cycle.
    pub transitions: u32,

    /// Package count per lifecycle state at the end of the cycle.
    pub state_counts: BTreeMap<String, usize>,

    /// Packages sitting in executor-gated states well past their estimate.
    /// Candidates for manual failure injection, nothing automatic.
    pub stuck: Vec<StuckCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StuckCandidate {
    pub package_id: String,
    pub state: String,
    pub minutes_in_flight: i64,
    pub estimated_minutes: u32,
}

impl CycleReport {
    pub fn new() -> Self {
        Self {
            cycle_id: format!("c-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            started_at: Utc::now(),
            finished_at: None,
            targets_scanned: 0,
            packages_created: Vec::new(),
            packages_failed: Vec::new(),
            packages_closed: Vec::new(),
            transitions: 0,
            state_counts: BTreeMap::new(),
            stuck: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub async fn save(&self, reports_dir: &Path) -> Result<()> {
        fs::create_dir_all(reports_dir).await?;
        let stamp = self.started_at.format("%Y%m%d-%H%M%S");
        let path = reports_dir.join(format!("cycle-{}-{}.yaml", stamp, self.cycle_id));
        fs::write(&path, serde_yaml_bw::to_string(self)?).await?;
        Ok(())
    }

    /// Most recent persisted report, by file name (they sort by timestamp).
    pub async fn load_latest(reports_dir: &Path) -> Result<Option<Self>> {
        if !reports_dir.exists() {
            return Ok(None);
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(reports_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                names.push(path);
            }
        }
        names.sort();

        match names.last() {
            None => Ok(None),
            Some(path) => {
                let content = fs::read_to_string(path).await?;
                Ok(Some(serde_yaml_bw::from_str(&content)?))
            }
        }
    }
}

impl Default for CycleReport {
    fn default() -> Self {
        Self::new()
    }
}
