//! Platform API surface consumed by the run orchestrator.
//!
//! [`AssessmentApi`] is the seam between orchestration and transport:
//! [`client::PlatformClient`] implements it over HTTP, tests implement it
//! with scripted responses.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

pub mod client;
pub mod model;

use model::{AnalysisType, AppRecord, AssessmentStatus, BuildResult, Platform};

/// Parameters for uploading a binary.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadParams {
    pub analysis_type: AnalysisType,
    pub group: Option<Uuid>,
}

/// Parameters for assessing an app the platform already knows.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerParams {
    pub package: String,
    pub platform: Platform,
    pub group: Option<Uuid>,
    pub analysis_type: AnalysisType,
}

/// Catalog filter. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppFilter {
    pub platform: Option<Platform>,
    pub package: Option<String>,
    pub group: Option<Uuid>,
    pub reference: Option<Uuid>,
}

/// Identifies one assessment task.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusQuery {
    pub package: String,
    pub platform: Platform,
    pub group: Option<Uuid>,
    pub task: f64,
}

#[async_trait]
pub trait AssessmentApi: Send + Sync {
    async fn upload_build(
        &self,
        params: &UploadParams,
        binary: Vec<u8>,
    ) -> Result<BuildResult, ApiError>;

    async fn trigger_assessment(&self, params: &TriggerParams) -> Result<BuildResult, ApiError>;

    async fn list_apps(&self, filter: &AppFilter) -> Result<Vec<AppRecord>, ApiError>;

    async fn assessment_status(&self, query: &StatusQuery) -> Result<AssessmentStatus, ApiError>;

    async fn findings(&self, query: &StatusQuery) -> Result<Value, ApiError>;
}
