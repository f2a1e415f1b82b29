//! Configuration types and loading.
//!
//! All tunables live in `config.toml` under the deck directory. Every section
//! has serde defaults so a missing or partial file behaves like a fresh one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{DeckError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub officer: OfficerConfig,
    pub gateway: GatewayConfig,
    pub validation: ValidationConfig,
    pub recovery: RecoveryConfig,
}

impl DeckConfig {
    pub async fn load(deck_dir: &Path) -> Result<Self> {
        let config_path = deck_dir.join("config.toml");
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, deck_dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = deck_dir.join("config.toml");
        let content = toml::to_string_pretty(self).map_err(|e| DeckError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.officer.stuck_multiplier < 1.0 {
            errors.push("officer.stuck_multiplier must be at least 1.0");
        }
        if self.gateway.media_minutes_per_endpoint == 0 {
            errors.push("gateway.media_minutes_per_endpoint must be greater than 0");
        }
        if self.gateway.document_minutes_per_endpoint == 0 {
            errors.push("gateway.document_minutes_per_endpoint must be greater than 0");
        }
        if self.validation.min_summary_chars == 0 {
            errors.push("validation.min_summary_chars must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DeckError::Config(errors.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficerConfig {
    /// Close validated packages automatically during the sweep.
    pub auto_close: bool,
    /// A package is flagged as stuck once it has sat in an executor-gated
    /// state longer than stuck_multiplier x its duration estimate.
    pub stuck_multiplier: f64,
}

impl Default for OfficerConfig {
    fn default() -> Self {
        Self {
            auto_close: true,
            stuck_multiplier: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Estimated minutes per media endpoint (downloads plus transcription).
    pub media_minutes_per_endpoint: u32,
    /// Estimated minutes per document endpoint.
    pub document_minutes_per_endpoint: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            media_minutes_per_endpoint: 45,
            document_minutes_per_endpoint: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum length of a plan summary accepted by the schema gate.
    pub min_summary_chars: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_summary_chars: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Transient-failure resubmissions allowed before reclassifying as permanent.
    pub max_retries: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Resolved filesystem layout for a deck project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub deck_dir: PathBuf,
    pub targets_dir: PathBuf,
    pub packages_dir: PathBuf,
    pub outbox_dir: PathBuf,
    pub inbox_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub evidence_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let deck_dir = root.join(".deck");
        Self {
            targets_dir: deck_dir.join("targets"),
            packages_dir: deck_dir.join("packages"),
            outbox_dir: deck_dir.join("outbox"),
            inbox_dir: deck_dir.join("inbox"),
            artifacts_dir: deck_dir.join("artifacts"),
            evidence_dir: deck_dir.join("evidence"),
            reports_dir: deck_dir.join("reports"),
            deck_dir,
            root,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.deck_dir.exists()
    }

    pub async fn create_all(&self) -> Result<()> {
        for dir in [
            &self.deck_dir,
            &self.targets_dir,
            &self.packages_dir,
            &self.outbox_dir,
            &self.inbox_dir,
            &self.artifacts_dir,
            &self.evidence_dir,
            &self.reports_dir,
        ] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DeckConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_multiplier_rejected() {
        let mut config = DeckConfig::default();
        config.gateway.media_minutes_per_endpoint = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_paths_layout() {
        let paths = ProjectPaths::new("/tmp/project");
        assert_eq!(paths.deck_dir, PathBuf::from("/tmp/project/.deck"));
        assert_eq!(paths.targets_dir, PathBuf::from("/tmp/project/.deck/targets"));
    }
}
