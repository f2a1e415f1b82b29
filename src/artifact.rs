//! Artifact store and evidence sink seams.
//!
//! Both are external collaborators: the artifact store is where the executor
//! drops collected files, the evidence sink is the downstream store validated
//! artifacts are ingested into. The filesystem implementations here are the
//! defaults; tests substitute their own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{DeckError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Media,
    Transcript,
    Document,
    Other,
}

impl ArtifactKind {
    /// Kind implied by a path's extension. Unknown extensions are `Other`.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" | "wav" | "m4a" | "flac" | "ogg" | "mp4" | "mkv" | "webm" => Self::Media,
            "srt" | "vtt" => Self::Transcript,
            "pdf" | "html" | "htm" | "txt" | "md" | "docx" => Self::Document,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Media => "media",
            Self::Transcript => "transcript",
            Self::Document => "document",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a format-specific structural check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVerdict {
    Ok,
    Invalid(String),
}

impl FormatVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Outcome of handing an artifact to the evidence sink.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Accepted { receipt: String },
    Rejected(String),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool>;

    async fn detect_kind(&self, path: &str) -> Result<ArtifactKind>;

    /// Structural validation appropriate to the kind (parseable/playable).
    async fn validate_format(&self, path: &str, kind: ArtifactKind) -> Result<FormatVerdict>;
}

#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Ingest a validated artifact under its logical path.
    async fn ingest(&self, path: &str, package_id: &str) -> Result<IngestOutcome>;
}

/// Artifacts as files under a root directory, keyed by logical path.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.resolve(path)).await?)
    }

    async fn detect_kind(&self, path: &str) -> Result<ArtifactKind> {
        Ok(ArtifactKind::from_path(path))
    }

    async fn validate_format(&self, path: &str, kind: ArtifactKind) -> Result<FormatVerdict> {
        let full = self.resolve(path);
        let bytes = fs::read(&full).await?;

        if bytes.is_empty() {
            return Ok(FormatVerdict::Invalid("artifact is empty".to_string()));
        }

        let verdict = match kind {
            ArtifactKind::Media => {
                if has_media_magic(&bytes) {
                    FormatVerdict::Ok
                } else {
                    FormatVerdict::Invalid("no recognized media container header".to_string())
                }
            }
            ArtifactKind::Transcript => match std::str::from_utf8(&bytes) {
                Ok(text) if text.trim().is_empty() => {
                    FormatVerdict::Invalid("transcript contains no text".to_string())
                }
                Ok(_) => FormatVerdict::Ok,
                Err(_) => FormatVerdict::Invalid("transcript is not valid UTF-8".to_string()),
            },
            ArtifactKind::Document => {
                if bytes.starts_with(b"%PDF") || std::str::from_utf8(&bytes).is_ok() {
                    FormatVerdict::Ok
                } else {
                    FormatVerdict::Invalid(
                        "document is neither PDF nor readable text".to_string(),
                    )
                }
            }
            ArtifactKind::Other => {
                // Nothing structural to assert beyond non-emptiness.
                FormatVerdict::Ok
            }
        };
        Ok(verdict)
    }
}

/// Known container headers: ID3/MPEG audio, RIFF (wav), OggS, fLaC,
/// ISO base media (ftyp at offset 4), EBML (mkv/webm).
fn has_media_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ID3")
        || bytes.starts_with(&[0xFF, 0xFB])
        || bytes.starts_with(&[0xFF, 0xF3])
        || bytes.starts_with(b"RIFF")
        || bytes.starts_with(b"OggS")
        || bytes.starts_with(b"fLaC")
        || (bytes.len() > 8 && &bytes[4..8] == b"ftyp")
        || bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3])
}

/// Copies accepted artifacts into an evidence directory and writes a YAML
/// receipt alongside, one per ingestion.
pub struct FsEvidenceSink {
    artifacts_root: PathBuf,
    evidence_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct EvidenceReceipt {
    receipt: String,
    package_id: String,
    logical_path: String,
    ingested_at: chrono::DateTime<Utc>,
}

impl FsEvidenceSink {
    pub fn new(artifacts_root: impl Into<PathBuf>, evidence_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_root: artifacts_root.into(),
            evidence_dir: evidence_dir.into(),
        }
    }
}

#[async_trait]
impl EvidenceSink for FsEvidenceSink {
    async fn ingest(&self, path: &str, package_id: &str) -> Result<IngestOutcome> {
        let source = self.artifacts_root.join(path);
        if !fs::try_exists(&source).await? {
            return Ok(IngestOutcome::Rejected(format!(
                "artifact disappeared before ingestion: {}",
                path
            )));
        }

        let receipt = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let dest_dir = self.evidence_dir.join(package_id);
        fs::create_dir_all(&dest_dir).await?;

        let file_name = Path::new(path)
            .file_name()
            .ok_or_else(|| DeckError::Artifact(format!("artifact path has no file name: {}", path)))?;
        let dest = dest_dir.join(file_name);
        fs::copy(&source, &dest).await?;

        let receipt_doc = EvidenceReceipt {
            receipt: receipt.clone(),
            package_id: package_id.to_string(),
            logical_path: path.to_string(),
            ingested_at: Utc::now(),
        };
        let receipt_path = dest_dir.join(format!("{}.receipt.yaml", receipt));
        fs::write(&receipt_path, serde_yaml_bw::to_string(&receipt_doc)?).await?;

        debug!(package_id, path, receipt = %receipt, "Artifact ingested");
        Ok(IngestOutcome::Accepted { receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ArtifactKind::from_path("a/b/episode.mp3"), ArtifactKind::Media);
        assert_eq!(ArtifactKind::from_path("a/b/talk.srt"), ArtifactKind::Transcript);
        assert_eq!(ArtifactKind::from_path("a/b/filing.pdf"), ArtifactKind::Document);
        assert_eq!(ArtifactKind::from_path("a/b/blob.bin"), ArtifactKind::Other);
        assert_eq!(ArtifactKind::from_path("noext"), ArtifactKind::Other);
    }

    #[tokio::test]
    async fn test_missing_artifact_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert!(!store.exists("nope/missing.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_artifact_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.txt"), b"").unwrap();
        let store = FsArtifactStore::new(dir.path());
        let verdict = store
            .validate_format("empty.txt", ArtifactKind::Document)
            .await
            .unwrap();
        assert!(!verdict.is_ok());
    }

    #[tokio::test]
    async fn test_media_magic_checks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.mp3"), b"ID3\x04rest-of-file").unwrap();
        std::fs::write(dir.path().join("bad.mp3"), b"this is not audio").unwrap();
        let store = FsArtifactStore::new(dir.path());

        assert!(store
            .validate_format("ok.mp3", ArtifactKind::Media)
            .await
            .unwrap()
            .is_ok());
        assert!(!store
            .validate_format("bad.mp3", ArtifactKind::Media)
            .await
            .unwrap()
            .is_ok());
    }

    #[tokio::test]
    async fn test_ingestion_writes_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = dir.path().join("artifacts");
        let evidence = dir.path().join("evidence");
        std::fs::create_dir_all(artifacts.join("t-001")).unwrap();
        std::fs::write(artifacts.join("t-001/doc.txt"), b"collected text").unwrap();

        let sink = FsEvidenceSink::new(&artifacts, &evidence);
        let outcome = sink.ingest("t-001/doc.txt", "t-001-v1").await.unwrap();
        assert!(matches!(outcome, IngestOutcome::Accepted { .. }));
        assert!(evidence.join("t-001-v1/doc.txt").exists());
    }
}
