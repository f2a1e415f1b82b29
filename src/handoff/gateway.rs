use std::sync::Arc;

use tracing::debug;

use super::mailbox::ExecutorBackend;
use super::types::{HandoffRecord, HandoffUpdate, PriorityClass, TaskSpec};
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::package::{Package, PackageKind};
use crate::target::Target;

/// Translates packages into task specs for the external executor and pulls
/// its status feed back in. The gateway executes nothing itself; it is a
/// mailbox plus deterministic priority and duration functions.
pub struct HandoffGateway {
    backend: Arc<dyn ExecutorBackend>,
    config: GatewayConfig,
}

impl HandoffGateway {
    pub fn new(backend: Arc<dyn ExecutorBackend>, config: GatewayConfig) -> Self {
        Self { backend, config }
    }

    /// Builds the handoff record for one submission attempt. The spec payload
    /// is embedded in the record; the record starts pending and is dispatched
    /// separately.
    pub fn prepare(&self, package: &Package, target: &Target) -> Result<HandoffRecord> {
        let mut record = HandoffRecord::new(&package.id, serde_json::Value::Null);
        let spec = TaskSpec {
            handoff_id: record.id.clone(),
            package_id: package.id.clone(),
            kind: package.kind.to_string(),
            endpoints: package.endpoints.clone(),
            expected_outputs: package
                .expected_outputs
                .iter()
                .map(|o| o.path.clone())
                .collect(),
            priority: PriorityClass::from_target_priority(target.priority),
            estimated_minutes: self.estimate_minutes(package),
            resource_intensive: package.kind.is_resource_intensive(),
        };
        record.spec = serde_json::to_value(&spec)?;
        Ok(record)
    }

    /// Hands the spec to the executor backend.
    pub async fn dispatch(&self, record: &HandoffRecord) -> Result<()> {
        let spec: TaskSpec = serde_json::from_value(record.spec.clone())?;
        self.backend.submit(&spec).await?;
        debug!(handoff_id = %record.id, package_id = %record.package_id, "Handoff dispatched");
        Ok(())
    }

    pub async fn poll(&self, handoff_id: &str) -> Result<Option<HandoffUpdate>> {
        self.backend.poll(handoff_id).await
    }

    /// Advisory duration estimate: a fixed per-endpoint-type multiplier times
    /// the endpoint count. Never a hard timeout.
    pub fn estimate_minutes(&self, package: &Package) -> u32 {
        package
            .endpoints
            .iter()
            .map(|endpoint| match package.kind {
                PackageKind::Media => self.config.media_minutes_per_endpoint,
                PackageKind::Document => self.config.document_minutes_per_endpoint,
                PackageKind::Composite => {
                    if is_media_endpoint(endpoint) {
                        self.config.media_minutes_per_endpoint
                    } else {
                        self.config.document_minutes_per_endpoint
                    }
                }
            })
            .sum()
    }
}

/// Classifies a composite package's endpoint as media work by its URI shape.
fn is_media_endpoint(endpoint: &str) -> bool {
    let lower = endpoint.to_ascii_lowercase();
    const MEDIA_HINTS: &[&str] = &[
        "rss", "feed", "podcast", "audio", "video", "mediatype=audio", "mediatype=movies",
    ];
    const MEDIA_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".wav", ".mp4", ".mkv", ".xml"];

    MEDIA_HINTS.iter().any(|hint| lower.contains(hint))
        || MEDIA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
