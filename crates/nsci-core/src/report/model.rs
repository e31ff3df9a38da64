use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::SCHEMA_VERSION;
use crate::api::model::Platform;
use crate::submit::BuildHandle;
use crate::verdict::{Outcome, VerdictInfo};

/// Top-level run report.
///
/// This is the document written to the output sink. The `assessment`
/// block is the platform's status payload verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactInfo>,
    pub build: BuildInfo,
    /// Most recent status payload; `null` when polling was not requested.
    pub assessment: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictInfo>,
}

impl RunReport {
    /// Report for a build that was submitted but not waited on.
    pub fn submitted(
        tool: ToolInfo,
        artifact: Option<ArtifactInfo>,
        handle: &BuildHandle,
        ui_host: &str,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            artifact,
            build: BuildInfo::new(handle, ui_host),
            assessment: None,
            verdict: None,
        }
    }

    /// Report for a finished, evaluated assessment.
    pub fn evaluated(
        tool: ToolInfo,
        artifact: Option<ArtifactInfo>,
        handle: &BuildHandle,
        ui_host: &str,
        outcome: &Outcome,
    ) -> Self {
        Self {
            assessment: Some(outcome.final_status.raw.clone()),
            verdict: Some(outcome.info()),
            ..Self::submitted(tool, artifact, handle, ui_host)
        }
    }

    pub fn passed(&self) -> Option<bool> {
        self.verdict.as_ref().map(|v| v.passed)
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Uploaded binary bound to this report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: Option<String>,
    pub size_bytes: u64,
    pub hash: ArtifactHash,
}

/// Cryptographic artifact fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHash {
    pub algorithm: String,
    pub value: String,
}

/// The build the assessment runs against.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub application: Option<Uuid>,
    pub package: String,
    pub platform: Platform,
    pub task: f64,
    #[serde(rename = "ref")]
    pub reference: Uuid,
    pub assessment_url: String,
    /// Submission response verbatim.
    pub response: Value,
}

impl BuildInfo {
    fn new(handle: &BuildHandle, ui_host: &str) -> Self {
        Self {
            application: handle.application_id,
            package: handle.package_name.clone(),
            platform: handle.platform,
            task: handle.task_id,
            reference: handle.assessment_ref,
            assessment_url: handle.assessment_url(ui_host),
            response: handle.raw.clone(),
        }
    }
}
