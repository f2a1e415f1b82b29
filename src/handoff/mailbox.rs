use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::types::{HandoffUpdate, TaskSpec};
use crate::error::Result;

/// The executor side of the handoff. The orchestrator never calls into the
/// executor directly; it drops task specs in and pulls status snapshots out.
#[async_trait]
pub trait ExecutorBackend: Send + Sync {
    async fn submit(&self, spec: &TaskSpec) -> Result<()>;

    /// Latest status for a handoff, or None if the executor has said nothing.
    async fn poll(&self, handoff_id: &str) -> Result<Option<HandoffUpdate>>;
}

/// Filesystem mailbox: specs go to `outbox/<handoff>.json`, the executor
/// drops `{status, result, reason}` snapshots into `inbox/<handoff>.json`.
pub struct FsMailbox {
    outbox_dir: PathBuf,
    inbox_dir: PathBuf,
}

impl FsMailbox {
    pub fn new(outbox_dir: impl Into<PathBuf>, inbox_dir: impl Into<PathBuf>) -> Self {
        Self {
            outbox_dir: outbox_dir.into(),
            inbox_dir: inbox_dir.into(),
        }
    }
}

#[async_trait]
impl ExecutorBackend for FsMailbox {
    async fn submit(&self, spec: &TaskSpec) -> Result<()> {
        fs::create_dir_all(&self.outbox_dir).await?;
        let path = self.outbox_dir.join(format!("{}.json", spec.handoff_id));
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(spec)?).await?;
        fs::rename(&tmp, &path).await?;
        debug!(handoff_id = %spec.handoff_id, path = %path.display(), "Task spec dropped in outbox");
        Ok(())
    }

    async fn poll(&self, handoff_id: &str) -> Result<Option<HandoffUpdate>> {
        let path = self.inbox_dir.join(format!("{}.json", handoff_id));
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{HandoffStatus, PriorityClass};

    fn spec(handoff_id: &str) -> TaskSpec {
        TaskSpec {
            handoff_id: handoff_id.to_string(),
            package_id: "t-001-v1".to_string(),
            kind: "document".to_string(),
            endpoints: vec!["https://archive.org/details/x".to_string()],
            expected_outputs: vec!["t-001/doc.pdf".to_string()],
            priority: PriorityClass::Normal,
            estimated_minutes: 10,
            resource_intensive: false,
        }
    }

    #[tokio::test]
    async fn test_submit_writes_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FsMailbox::new(dir.path().join("outbox"), dir.path().join("inbox"));
        mailbox.submit(&spec("h-1234")).await.unwrap();
        assert!(dir.path().join("outbox/h-1234.json").exists());
    }

    #[tokio::test]
    async fn test_poll_without_inbox_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FsMailbox::new(dir.path().join("outbox"), dir.path().join("inbox"));
        assert!(mailbox.poll("h-1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poll_reads_executor_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(
            inbox.join("h-1234.json"),
            r#"{"status":"running","result":null}"#,
        )
        .unwrap();

        let mailbox = FsMailbox::new(dir.path().join("outbox"), &inbox);
        let update = mailbox.poll("h-1234").await.unwrap().unwrap();
        assert_eq!(update.status, HandoffStatus::Running);
    }
}
