use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use super::heuristics::synthesize_plan;
use super::report::{CycleReport, StuckCandidate};
use crate::artifact::{ArtifactStore, EvidenceSink, FsArtifactStore, FsEvidenceSink};
use crate::config::{DeckConfig, ProjectPaths};
use crate::error::{DeckError, Result};
use crate::handoff::{ExecutorBackend, FsMailbox, HandoffGateway, HandoffStatus, TaskSpec};
use crate::manifest::{ManifestStatus, Reconciler};
use crate::package::{Package, PackageState, PackageStore, ValidationLevel};
use crate::recovery::{RecoveryOutcome, RecoveryPolicy};
use crate::target::{TargetStatus, TargetStore};
use crate::validate;

/// The orchestrator loop. One `run_cycle` call scans targets, opens packages
/// for the uncovered ones, and advances every package by at most one stage.
/// Externally-gated states are polled, never waited on; whatever the executor
/// has not finished is picked up by a later cycle.
pub struct TargetingOfficer {
    config: DeckConfig,
    reports_dir: PathBuf,
    targets: TargetStore,
    packages: PackageStore,
    gateway: HandoffGateway,
    reconciler: Reconciler,
    policy: RecoveryPolicy,
    artifacts: Arc<dyn ArtifactStore>,
}

impl TargetingOfficer {
    pub fn new(config: DeckConfig, paths: &ProjectPaths) -> Self {
        let backend: Arc<dyn ExecutorBackend> =
            Arc::new(FsMailbox::new(&paths.outbox_dir, &paths.inbox_dir));
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FsArtifactStore::new(&paths.artifacts_dir));
        let evidence: Arc<dyn EvidenceSink> =
            Arc::new(FsEvidenceSink::new(&paths.artifacts_dir, &paths.evidence_dir));
        Self::with_backends(config, paths, backend, artifacts, evidence)
    }

    /// Wires in substitute collaborators; the executor, artifact store, and
    /// evidence sink are all external systems.
    pub fn with_backends(
        config: DeckConfig,
        paths: &ProjectPaths,
        backend: Arc<dyn ExecutorBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        evidence: Arc<dyn EvidenceSink>,
    ) -> Self {
        let gateway = HandoffGateway::new(backend, config.gateway.clone());
        let reconciler = Reconciler::new(artifacts.clone(), evidence);
        let policy = RecoveryPolicy::new(config.recovery.max_retries);
        Self {
            reports_dir: paths.reports_dir.clone(),
            targets: TargetStore::new(&paths.targets_dir),
            packages: PackageStore::new(&paths.packages_dir),
            gateway,
            reconciler,
            policy,
            artifacts,
            config,
        }
    }

    pub async fn init(&self) -> Result<()> {
        self.targets.init().await?;
        self.packages.init().await?;
        Ok(())
    }

    pub fn targets(&self) -> &TargetStore {
        &self.targets
    }

    pub fn packages(&self) -> &PackageStore {
        &self.packages
    }

    /// One sweep. Safe to re-run immediately: submission only fires from
    /// `ready`, reconciliation only fills manifest gaps, so a cycle with no
    /// external change performs no duplicate work.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::new();
        info!(cycle_id = %report.cycle_id, "Sweep cycle started");

        self.open_packages(&mut report).await?;

        let snapshot = self.packages.list().await?;
        for package in &snapshot {
            match self.advance(package, &mut report).await {
                Ok(()) => {}
                // A concurrent sweep won the transition; this cycle's view was
                // stale. The package is re-examined next cycle.
                Err(DeckError::InvalidStateTransition { from, to, .. }) => {
                    debug!(package_id = %package.id, %from, %to, "Lost transition race, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        for package in self.packages.list().await? {
            *report
                .state_counts
                .entry(package.state.to_string())
                .or_insert(0) += 1;
        }

        report.finish();
        report.save(&self.reports_dir).await?;
        info!(
            cycle_id = %report.cycle_id,
            created = report.packages_created.len(),
            failed = report.packages_failed.len(),
            closed = report.packages_closed.len(),
            transitions = report.transitions,
            "Sweep cycle finished"
        );
        Ok(report)
    }

    /// Drives any non-terminal package to `failed` through the ordinary
    /// transition path. The operator's answer to a stuck-candidate flag.
    pub async fn inject_failure(&self, package_id: &str, reason: &str) -> Result<Package> {
        let mut metadata = HashMap::new();
        metadata.insert("injected".to_string(), json!(true));
        self.packages
            .transition(
                package_id,
                PackageState::Failed,
                format!("manual failure injection: {}", reason),
                metadata,
            )
            .await
    }

    /// Opens a draft for every researchable target without a live package.
    async fn open_packages(&self, report: &mut CycleReport) -> Result<()> {
        let targets = self.targets.list().await?;
        report.targets_scanned = targets.len();

        for target in targets.iter().filter(|t| t.needs_collection()) {
            let existing = self.packages.list_for_target(&target.id).await?;
            if existing
                .iter()
                .any(|p| p.state.is_live() || p.needs_recovery())
            {
                continue;
            }

            let plan = synthesize_plan(target);
            let package = match self
                .packages
                .create(
                    &target.id,
                    plan.kind,
                    plan.summary,
                    plan.endpoints,
                    plan.expected_outputs,
                )
                .await
            {
                Ok(package) => package,
                Err(DeckError::LivePackageExists { package_id, .. }) => {
                    debug!(target_id = %target.id, %package_id, "Live package appeared concurrently");
                    continue;
                }
                Err(e) => return Err(e),
            };

            report.packages_created.push(package.id.clone());

            let mut target = self.targets.load(&target.id).await?;
            if target.status == TargetStatus::New {
                target.status = TargetStatus::UnderResearch;
            }
            target.current_package = Some(package.id.clone());
            target.updated_at = Utc::now();
            self.targets.save(&target).await?;
        }
        Ok(())
    }

    /// Advances one package by at most one stage, per its snapshot state.
    async fn advance(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        match package.state {
            PackageState::Draft => self.advance_draft(package, report).await,
            PackageState::Ready => self.submit(package, report).await,
            state if state.awaits_executor() => self.poll_executor(package, report).await,
            PackageState::Completed => self.ingest(package, report).await,
            PackageState::OutputsIngested => self.validate_outputs(package, report).await,
            PackageState::Validated => {
                if self.config.officer.auto_close {
                    self.close(package, report).await
                } else {
                    Ok(())
                }
            }
            PackageState::Failed => self.recover(package, report).await,
            PackageState::Closed => Ok(()),
            _ => Ok(()),
        }
    }

    async fn advance_draft(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        let target = match self.targets.load(&package.target_id).await {
            Ok(target) => Some(target),
            Err(DeckError::TargetNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let v0 = validate::check_schema(package, target.as_ref(), &self.config.validation);
        if v0.passed {
            self.packages
                .mutate(&package.id, |p| {
                    if p.validation_level < ValidationLevel::V0 {
                        p.validation_level = ValidationLevel::V0;
                    }
                    Ok(())
                })
                .await?;
            self.step(
                report,
                &package.id,
                PackageState::Ready,
                "v0 schema validation passed".to_string(),
                v0.to_metadata(),
            )
            .await?;
        } else {
            self.step(
                report,
                &package.id,
                PackageState::Failed,
                v0.summary(),
                v0.to_metadata(),
            )
            .await?;
        }
        Ok(())
    }

    async fn submit(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        let target = match self.targets.load(&package.target_id).await {
            Ok(target) => target,
            Err(DeckError::TargetNotFound(_)) => {
                self.step(
                    report,
                    &package.id,
                    PackageState::Failed,
                    format!(
                        "plan validation failed: target reference '{}' does not resolve",
                        package.target_id
                    ),
                    HashMap::new(),
                )
                .await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // A pending record left behind by an interrupted sweep is re-dispatched
        // rather than duplicated; a fresh attempt gets a fresh record.
        let record = match package.current_handoff() {
            Some(h) if h.status == HandoffStatus::Pending => h.clone(),
            _ => {
                let record = self.gateway.prepare(package, &target)?;
                let pushed = record.clone();
                self.packages
                    .mutate(&package.id, move |p| {
                        p.handoffs.push(pushed);
                        Ok(())
                    })
                    .await?;
                record
            }
        };

        match self.gateway.dispatch(&record).await {
            Ok(()) => {
                self.packages
                    .mutate(&package.id, |p| {
                        if let Some(h) = p.current_handoff_mut() {
                            h.mark_submitted();
                        }
                        Ok(())
                    })
                    .await?;

                let mut metadata = HashMap::new();
                metadata.insert("handoff_id".to_string(), json!(record.id));
                self.step(
                    report,
                    &package.id,
                    PackageState::Submitted,
                    format!("handoff {} dispatched to executor", record.id),
                    metadata,
                )
                .await?;
            }
            Err(e) => {
                self.step(
                    report,
                    &package.id,
                    PackageState::Failed,
                    format!("handoff dispatch failed: {}", e),
                    HashMap::new(),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn poll_executor(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        let Some(handoff) = package.current_handoff() else {
            self.step(
                report,
                &package.id,
                PackageState::Failed,
                "package is executor-gated but has no handoff record".to_string(),
                HashMap::new(),
            )
            .await?;
            return Ok(());
        };

        let update = match self.gateway.poll(&handoff.id).await {
            Ok(update) => update,
            Err(e) => {
                // An unreadable status snapshot is news that can wait; the
                // next cycle polls again.
                warn!(package_id = %package.id, handoff_id = %handoff.id, error = %e, "Status poll failed");
                return Ok(());
            }
        };

        let Some(update) = update else {
            self.check_stuck(package, report);
            return Ok(());
        };

        self.packages
            .mutate(&package.id, |p| {
                if let Some(h) = p.current_handoff_mut() {
                    h.apply_update(&update);
                }
                Ok(())
            })
            .await?;

        match update.status {
            HandoffStatus::Failed => {
                let reason = update
                    .reason
                    .clone()
                    .unwrap_or_else(|| "executor reported failure without a reason".to_string());
                self.step(
                    report,
                    &package.id,
                    PackageState::Failed,
                    format!("handoff failed: {}", reason),
                    HashMap::new(),
                )
                .await?;
            }
            HandoffStatus::Accepted
            | HandoffStatus::Queued
            | HandoffStatus::Running
            | HandoffStatus::Completed => {
                self.catch_up(report, &package.id, update.status).await?;

                if update.status == HandoffStatus::Completed {
                    let current = self.packages.load(&package.id).await?;
                    if current.state == PackageState::Running {
                        let v1 =
                            validate::check_execution(&current, self.artifacts.as_ref()).await?;
                        if v1.passed {
                            self.packages
                                .mutate(&current.id, |p| {
                                    if p.validation_level < ValidationLevel::V1 {
                                        p.validation_level = ValidationLevel::V1;
                                    }
                                    Ok(())
                                })
                                .await?;
                            self.step(
                                report,
                                &current.id,
                                PackageState::Completed,
                                "executor completed, v1 execution validation passed".to_string(),
                                v1.to_metadata(),
                            )
                            .await?;
                        } else {
                            self.step(
                                report,
                                &current.id,
                                PackageState::Failed,
                                v1.summary(),
                                v1.to_metadata(),
                            )
                            .await?;
                        }
                    }
                } else {
                    let current = self.packages.load(&package.id).await?;
                    self.check_stuck(&current, report);
                }
            }
            HandoffStatus::Pending | HandoffStatus::Submitted => {
                self.check_stuck(package, report);
            }
        }
        Ok(())
    }

    /// Walks the package up the executor-gated states, one transition per
    /// edge, until it matches what the executor reported. Catch-up keeps the
    /// audit trail complete even when the executor jumped several statuses
    /// between polls.
    async fn catch_up(
        &self,
        report: &mut CycleReport,
        package_id: &str,
        status: HandoffStatus,
    ) -> Result<()> {
        const ORDER: [PackageState; 4] = [
            PackageState::Submitted,
            PackageState::Accepted,
            PackageState::Queued,
            PackageState::Running,
        ];

        let desired = match status {
            HandoffStatus::Accepted => PackageState::Accepted,
            HandoffStatus::Queued => PackageState::Queued,
            HandoffStatus::Running | HandoffStatus::Completed => PackageState::Running,
            _ => return Ok(()),
        };

        let current = self.packages.load(package_id).await?;
        let Some(cur_idx) = ORDER.iter().position(|s| *s == current.state) else {
            return Ok(());
        };
        let Some(want_idx) = ORDER.iter().position(|s| *s == desired) else {
            return Ok(());
        };

        if want_idx > cur_idx {
            for state in &ORDER[cur_idx + 1..=want_idx] {
                self.step(
                    report,
                    package_id,
                    *state,
                    format!("executor status advanced to {}", status),
                    HashMap::new(),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn ingest(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        let entries = self.reconciler.reconcile(package).await?;
        if !entries.is_empty() {
            self.packages
                .mutate(&package.id, move |p| {
                    p.manifest.extend(entries);
                    Ok(())
                })
                .await?;
        }

        let current = self.packages.load(&package.id).await?;
        if current.unreconciled_outputs().is_empty() {
            let count = |status: ManifestStatus| {
                current.manifest.iter().filter(|e| e.status == status).count()
            };
            let mut metadata = HashMap::new();
            metadata.insert("manifest_entries".to_string(), json!(current.manifest.len()));
            self.step(
                report,
                &current.id,
                PackageState::OutputsIngested,
                format!(
                    "ingestion complete: {} valid, {} missing, {} invalid",
                    count(ManifestStatus::Valid),
                    count(ManifestStatus::Missing),
                    count(ManifestStatus::Invalid)
                ),
                metadata,
            )
            .await?;
        }
        Ok(())
    }

    async fn validate_outputs(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        let v2 = validate::check_conformance(package);
        if v2.passed {
            self.packages
                .mutate(&package.id, |p| {
                    if p.validation_level < ValidationLevel::V2 {
                        p.validation_level = ValidationLevel::V2;
                    }
                    Ok(())
                })
                .await?;
            self.step(
                report,
                &package.id,
                PackageState::Validated,
                "v2 output conformance passed".to_string(),
                v2.to_metadata(),
            )
            .await?;
        } else {
            self.step(
                report,
                &package.id,
                PackageState::Failed,
                v2.summary(),
                v2.to_metadata(),
            )
            .await?;
        }
        Ok(())
    }

    async fn close(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        self.step(
            report,
            &package.id,
            PackageState::Closed,
            "package closed; collection accepted".to_string(),
            HashMap::new(),
        )
        .await?;
        report.packages_closed.push(package.id.clone());

        match self.targets.load(&package.target_id).await {
            Ok(mut target) => {
                target.status = TargetStatus::Validated;
                target.updated_at = Utc::now();
                self.targets.save(&target).await?;
            }
            Err(DeckError::TargetNotFound(_)) => {
                warn!(package_id = %package.id, target_id = %package.target_id, "Closed a package for a missing target");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn recover(&self, package: &Package, report: &mut CycleReport) -> Result<()> {
        match self
            .policy
            .recover(&self.packages, &self.targets, &package.id)
            .await?
        {
            RecoveryOutcome::Resubmitted { .. } => {
                report.transitions += 1;
            }
            RecoveryOutcome::Replanned { successor_id, .. } => {
                report.packages_created.push(successor_id);
            }
            RecoveryOutcome::AlreadyResolved { .. } => {}
        }
        Ok(())
    }

    fn check_stuck(&self, package: &Package, report: &mut CycleReport) {
        if !package.state.awaits_executor() {
            return;
        }
        let Some(handoff) = package.current_handoff() else {
            return;
        };
        let Some(submitted_at) = handoff.submitted_at else {
            return;
        };
        let estimate = serde_json::from_value::<TaskSpec>(handoff.spec.clone())
            .map(|s| s.estimated_minutes)
            .unwrap_or(0);
        if estimate == 0 {
            return;
        }

        let elapsed = Utc::now().signed_duration_since(submitted_at).num_minutes();
        if elapsed as f64 > self.config.officer.stuck_multiplier * f64::from(estimate) {
            debug!(package_id = %package.id, elapsed, estimate, "Package flagged as stuck candidate");
            report.stuck.push(StuckCandidate {
                package_id: package.id.clone(),
                state: package.state.to_string(),
                minutes_in_flight: elapsed,
                estimated_minutes: estimate,
            });
        }
    }

    async fn step(
        &self,
        report: &mut CycleReport,
        package_id: &str,
        to: PackageState,
        reason: String,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Package> {
        let updated = self
            .packages
            .transition(package_id, to, reason, metadata)
            .await?;
        report.transitions += 1;
        if to == PackageState::Failed {
            report.packages_failed.push(package_id.to_string());
        }
        Ok(updated)
    }
}
