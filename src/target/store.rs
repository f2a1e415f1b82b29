use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::Target;
use crate::error::{DeckError, Result};

pub struct TargetStore {
    targets_dir: PathBuf,
}

impl TargetStore {
    pub fn new(targets_dir: impl Into<PathBuf>) -> Self {
        Self {
            targets_dir: targets_dir.into(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.targets_dir).await?;
        self.recover_interrupted_writes().await;
        Ok(())
    }

    pub async fn save(&self, target: &Target) -> Result<()> {
        let path = self.target_path(&target.id);
        let content = serde_yaml_bw::to_string(target)?;
        write_atomic(&path, &content).await
    }

    pub async fn load(&self, target_id: &str) -> Result<Target> {
        let path = self.target_path(target_id);
        if !path.exists() {
            return Err(DeckError::TargetNotFound(target_id.to_string()));
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml_bw::from_str(&content)?)
    }

    pub async fn exists(&self, target_id: &str) -> bool {
        self.target_path(target_id).exists()
    }

    pub async fn create(&self, target: &Target) -> Result<()> {
        if self.exists(&target.id).await {
            return Err(DeckError::TargetAlreadyExists(target.id.clone()));
        }
        self.save(target).await
    }

    pub async fn list(&self) -> Result<Vec<Target>> {
        let mut targets = Vec::new();

        if !self.targets_dir.exists() {
            return Ok(targets);
        }

        let mut entries = fs::read_dir(&self.targets_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml")
                && let Ok(content) = fs::read_to_string(&path).await
                && let Ok(target) = serde_yaml_bw::from_str::<Target>(&content)
            {
                targets.push(target);
            }
        }

        // Priority first, then id for a stable order.
        targets.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Ok(targets)
    }

    pub async fn next_id(&self) -> Result<String> {
        let targets = self.list().await?;
        let max_num = targets
            .iter()
            .filter_map(|t| t.id.strip_prefix("t-").and_then(|s| s.parse::<u32>().ok()))
            .max()
            .unwrap_or(0);

        Ok(format!("t-{:03}", max_num + 1))
    }

    async fn recover_interrupted_writes(&self) {
        if let Ok(mut entries) = fs::read_dir(&self.targets_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    debug!(path = %path.display(), "Removing interrupted write");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
    }

    fn target_path(&self, target_id: &str) -> PathBuf {
        self.targets_dir.join(format!("{}.yaml", target_id))
    }
}

/// Write-to-temp, fsync, rename. POSIX guarantees the rename is atomic, so a
/// crash leaves either the old document or the new one, never a torn file.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp_path = path.with_extension("yaml.tmp");

    fs::write(&tmp_path, content).await?;

    let tmp_path_clone = tmp_path.clone();
    let sync_result = tokio::task::spawn_blocking(move || {
        std::fs::File::open(&tmp_path_clone).and_then(|file| file.sync_all())
    })
    .await;

    match sync_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to sync temp file to disk"),
        Err(e) => tracing::warn!(error = %e, "Failed to sync temp file to disk"),
    }

    fs::rename(&tmp_path, path).await?;

    debug!(path = %path.display(), "Atomic write completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetCategory;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("targets"));
        store.init().await.unwrap();

        let target = Target::new("t-001", "Meridian Logistics", TargetCategory::Org);
        store.save(&target).await.unwrap();

        let loaded = store.load("t-001").await.unwrap();
        assert_eq!(loaded.name, "Meridian Logistics");
        assert_eq!(loaded.category, TargetCategory::Org);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("targets"));
        store.init().await.unwrap();

        let target = Target::new("t-001", "Meridian Logistics", TargetCategory::Org);
        store.create(&target).await.unwrap();
        assert!(matches!(
            store.create(&target).await,
            Err(DeckError::TargetAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_next_id_increments() {
        let dir = tempfile::tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("targets"));
        store.init().await.unwrap();

        assert_eq!(store.next_id().await.unwrap(), "t-001");
        let target = Target::new("t-007", "x", TargetCategory::Person);
        store.save(&target).await.unwrap();
        assert_eq!(store.next_id().await.unwrap(), "t-008");
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("targets"));
        store.init().await.unwrap();
        assert!(matches!(
            store.load("t-999").await,
            Err(DeckError::TargetNotFound(_))
        ));
    }
}
