use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// Mobile platform an app is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(format!("unknown platform '{other}', expected ios or android")),
        }
    }
}

/// Kind of analysis the platform runs against a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Full,
    Static,
    Sbom,
}

impl AnalysisType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::Full => "full",
            AnalysisType::Static => "static",
            AnalysisType::Sbom => "sbom",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(AnalysisType::Full),
            "static" => Ok(AnalysisType::Static),
            "sbom" => Ok(AnalysisType::Sbom),
            other => Err(format!(
                "unknown analysis type '{other}', expected full, static or sbom"
            )),
        }
    }
}

/// Lifecycle state of an assessment task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// `completed` and `failed` end an assessment; nothing else does.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of the upload and trigger endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub application: Option<Uuid>,
    pub package: String,
    pub platform: Platform,
    pub task: f64,
    pub reference: Uuid,
    /// Body exactly as the service returned it.
    pub raw: Value,
}

#[derive(Deserialize)]
struct BuildFields {
    #[serde(default)]
    application: Option<Uuid>,
    package: String,
    platform: Platform,
    task: f64,
    #[serde(rename = "ref")]
    reference: Uuid,
}

impl BuildResult {
    pub fn from_payload(raw: Value) -> Result<Self, ApiError> {
        let fields = BuildFields::deserialize(&raw)
            .map_err(|err| ApiError::Decode(format!("build response: {err}")))?;

        Ok(Self {
            application: fields.application,
            package: fields.package,
            platform: fields.platform,
            task: fields.task,
            reference: fields.reference,
            raw,
        })
    }
}

/// One entry of the app catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub package: String,
    pub platform: Platform,
    #[serde(default, rename = "ref")]
    pub reference: Option<Uuid>,
}

/// Snapshot of an assessment returned by one status query.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentStatus {
    pub task_status: TaskStatus,
    pub adjusted_score: Option<f64>,
    pub raw: Value,
}

#[derive(Deserialize)]
struct StatusFields {
    #[serde(default)]
    task_status: Option<TaskStatus>,
    #[serde(default)]
    adjusted_score: Option<f64>,
}

impl AssessmentStatus {
    /// A missing or null `task_status` decodes as [`TaskStatus::Unknown`].
    pub fn from_payload(raw: Value) -> Result<Self, ApiError> {
        let fields = StatusFields::deserialize(&raw)
            .map_err(|err| ApiError::Decode(format!("assessment response: {err}")))?;

        Ok(Self {
            task_status: fields.task_status.unwrap_or(TaskStatus::Unknown),
            adjusted_score: fields.adjusted_score,
            raw,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.task_status.is_terminal()
    }
}
