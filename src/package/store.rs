use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::fs;
use tracing::{debug, info};

use super::state::{PackageState, StatusHistoryEntry};
use super::types::{ExpectedOutput, Package, PackageKind};
use crate::error::{DeckError, Result};
use crate::target::write_atomic;

/// File-per-package store with per-id mutual exclusion.
///
/// Every read-modify-write (transition, handoff update, manifest append) runs
/// under the lock for its package id, so concurrent attempts serialize and
/// losers observe the winner's state. Package creation locks the target id
/// instead, making the one-live-package check-and-create atomic.
pub struct PackageStore {
    packages_dir: PathBuf,
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PackageStore {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.packages_dir).await?;
        self.recover_interrupted_writes().await;
        Ok(())
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    pub async fn load(&self, package_id: &str) -> Result<Package> {
        let path = self.package_path(package_id);
        if !path.exists() {
            return Err(DeckError::PackageNotFound(package_id.to_string()));
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_yaml_bw::from_str(&content)?)
    }

    pub async fn exists(&self, package_id: &str) -> bool {
        self.package_path(package_id).exists()
    }

    pub async fn list(&self) -> Result<Vec<Package>> {
        let mut packages = Vec::new();

        if !self.packages_dir.exists() {
            return Ok(packages);
        }

        let mut entries = fs::read_dir(&self.packages_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml")
                && let Ok(content) = fs::read_to_string(&path).await
                && let Ok(package) = serde_yaml_bw::from_str::<Package>(&content)
            {
                packages.push(package);
            }
        }

        packages.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(packages)
    }

    pub async fn list_for_target(&self, target_id: &str) -> Result<Vec<Package>> {
        let mut packages: Vec<Package> = self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.target_id == target_id)
            .collect();
        packages.sort_by_key(|p| p.version);
        Ok(packages)
    }

    /// The live (non-closed, non-failed) package for a target, if any.
    pub async fn live_package_for(&self, target_id: &str) -> Result<Option<Package>> {
        Ok(self
            .list_for_target(target_id)
            .await?
            .into_iter()
            .find(|p| p.state.is_live()))
    }

    /// Atomic check-and-create scoped by target id: rejects a second live
    /// package and allocates the next version number in one locked step.
    pub async fn create(
        &self,
        target_id: &str,
        kind: PackageKind,
        summary: impl Into<String>,
        endpoints: Vec<String>,
        expected_outputs: Vec<ExpectedOutput>,
    ) -> Result<Package> {
        let lock = self.lock_for(&format!("target:{}", target_id));
        let _guard = lock.lock().await;

        let existing = self.list_for_target(target_id).await?;
        if let Some(live) = existing.iter().find(|p| p.state.is_live()) {
            return Err(DeckError::LivePackageExists {
                target_id: target_id.to_string(),
                package_id: live.id.clone(),
            });
        }

        let version = existing.iter().map(|p| p.version).max().unwrap_or(0) + 1;
        let package = Package::new(target_id, version, kind)
            .with_summary(summary)
            .with_endpoints(endpoints)
            .with_expected_outputs(expected_outputs);

        self.save(&package).await?;
        info!(package_id = %package.id, target_id, version, %kind, "Package created");
        Ok(package)
    }

    /// Applies `f` to a freshly loaded package under its lock and persists the
    /// result. All mutation outside `create` goes through here.
    pub async fn mutate<F, T>(&self, package_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Package) -> Result<T>,
    {
        let lock = self.lock_for(package_id);
        let _guard = lock.lock().await;

        let mut package = self.load(package_id).await?;
        let out = f(&mut package)?;
        package.updated_at = Utc::now();
        self.save(&package).await?;
        Ok(out)
    }

    /// One atomic transition: guard check, state change, exactly one appended
    /// history entry. Returns the updated package; an illegal edge fails
    /// without touching state or history.
    pub async fn transition(
        &self,
        package_id: &str,
        to: PackageState,
        reason: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Package> {
        let reason = reason.into();
        let updated = self
            .mutate(package_id, |package| {
                let from = package.state;
                if !from.can_transition_to(to) {
                    return Err(DeckError::InvalidStateTransition {
                        from: from.to_string(),
                        to: to.to_string(),
                        allowed: from
                            .allowed_transitions()
                            .iter()
                            .map(|s| s.to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }

                let mut entry = StatusHistoryEntry::new(from, to, reason.clone());
                entry.metadata = metadata.clone();
                package.state = to;
                package.state_history.push(entry);
                Ok(package.clone())
            })
            .await?;

        if let Some(entry) = updated.state_history.last() {
            info!(package_id, from = %entry.from, to = %entry.to, reason = %entry.reason, "State transition");
        }
        Ok(updated)
    }

    async fn save(&self, package: &Package) -> Result<()> {
        let path = self.package_path(&package.id);
        let content = serde_yaml_bw::to_string(package)?;
        write_atomic(&path, &content).await
    }

    async fn recover_interrupted_writes(&self) {
        if let Ok(mut entries) = fs::read_dir(&self.packages_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    debug!(path = %path.display(), "Removing interrupted write");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
    }

    fn package_path(&self, package_id: &str) -> PathBuf {
        self.packages_dir.join(format!("{}.yaml", package_id))
    }
}
