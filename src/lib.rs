pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod handoff;
pub mod manifest;
pub mod officer;
pub mod package;
pub mod recovery;
pub mod target;
pub mod validate;

pub use artifact::{ArtifactKind, ArtifactStore, EvidenceSink, FsArtifactStore, FsEvidenceSink};
pub use config::{DeckConfig, ProjectPaths};
pub use error::{DeckError, Result};
pub use handoff::{ExecutorBackend, FsMailbox, HandoffGateway, HandoffStatus, HandoffUpdate};
pub use manifest::{ManifestEntry, ManifestStatus, Reconciler};
pub use officer::{CycleReport, TargetingOfficer, synthesize_plan};
pub use package::{
    ExpectedOutput, Package, PackageKind, PackageState, PackageStore, ValidationLevel,
};
pub use recovery::{FailureClass, RecoveryOutcome, RecoveryPolicy, classify};
pub use target::{Target, TargetCategory, TargetStatus, TargetStore};
pub use validate::{ValidationReport, check_conformance, check_execution, check_schema};
