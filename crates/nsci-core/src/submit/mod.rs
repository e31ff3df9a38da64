//! Submission resolver.
//!
//! Turns one of the three addressing modes into a [`BuildHandle`]:
//!
//! - `ByFile`    → read, fingerprint and upload the binary
//! - `ByAppId`   → look the app up in the catalog, then trigger an assessment
//! - `ByPackage` → trigger an assessment directly
//!
//! Nothing here retries. A failed submission is surfaced to the caller
//! as-is; only the polling engine absorbs transient failures.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::model::{BuildResult, Platform};
use crate::api::{AppFilter, AssessmentApi, StatusQuery, TriggerParams, UploadParams};
use crate::config::RunSettings;
use crate::error::RunError;
use crate::report::model::ArtifactInfo;

pub mod artifact;

/// What to assess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionRequest {
    /// Upload a binary from disk.
    ByFile { path: PathBuf },
    /// Assess an app already in the catalog, addressed by its id and
    /// optionally narrowed to one platform.
    ByAppId {
        app: Uuid,
        platform: Option<Platform>,
    },
    /// Assess an app already known to the platform by package and platform.
    ByPackage { package: String, platform: Platform },
}

/// Canonical reference to a submitted build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildHandle {
    pub application_id: Option<Uuid>,
    pub package_name: String,
    pub platform: Platform,
    pub task_id: f64,
    pub assessment_ref: Uuid,
    /// Submission response exactly as the service returned it.
    pub raw: Value,
}

impl BuildHandle {
    pub fn status_query(&self, group: Option<Uuid>) -> StatusQuery {
        StatusQuery {
            package: self.package_name.clone(),
            platform: self.platform,
            group,
            task: self.task_id,
        }
    }

    /// Link to the assessment in the web UI.
    pub fn assessment_url(&self, ui_host: &str) -> String {
        let application = self
            .application_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.package_name.clone());
        format!(
            "{}/app/{}/assessment/{}",
            ui_host.trim_end_matches('/'),
            application,
            self.assessment_ref
        )
    }
}

impl From<BuildResult> for BuildHandle {
    fn from(build: BuildResult) -> Self {
        Self {
            application_id: build.application,
            package_name: build.package,
            platform: build.platform,
            task_id: build.task,
            assessment_ref: build.reference,
            raw: build.raw,
        }
    }
}

/// A resolved submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub handle: BuildHandle,
    /// Present for uploaded binaries.
    pub artifact: Option<ArtifactInfo>,
}

pub async fn resolve(
    request: &SubmissionRequest,
    api: &dyn AssessmentApi,
    settings: &RunSettings,
) -> Result<Submission, RunError> {
    let submission = match request {
        SubmissionRequest::ByFile { path } => {
            let binary = artifact::read_binary(path).await?;
            let info = binary.info();
            info!(
                path = %path.display(),
                size_bytes = info.size_bytes,
                sha256 = %info.hash.value,
                "uploading binary"
            );

            let params = UploadParams {
                analysis_type: settings.analysis_type,
                group: settings.group,
            };
            let build = api.upload_build(&params, binary.into_bytes()).await?;

            Submission {
                handle: build.into(),
                artifact: Some(info),
            }
        }
        SubmissionRequest::ByAppId { app, platform } => {
            let record = lookup_app(api, *app, *platform, settings.group).await?;
            debug!(package = %record.package, platform = %record.platform, "catalog match");

            let build = trigger(api, record.package, record.platform, settings).await?;
            Submission {
                handle: build.into(),
                artifact: None,
            }
        }
        SubmissionRequest::ByPackage { package, platform } => {
            let build = trigger(api, package.clone(), *platform, settings).await?;
            Submission {
                handle: build.into(),
                artifact: None,
            }
        }
    };

    info!(
        package = %submission.handle.package_name,
        platform = %submission.handle.platform,
        task = submission.handle.task_id,
        url = %submission.handle.assessment_url(&settings.ui_host),
        "assessment submitted"
    );

    Ok(submission)
}

/// Exactly one catalog entry must match; anything else fails before an
/// assessment is triggered.
async fn lookup_app(
    api: &dyn AssessmentApi,
    app: Uuid,
    platform: Option<Platform>,
    group: Option<Uuid>,
) -> Result<crate::api::model::AppRecord, RunError> {
    let filter = AppFilter {
        platform,
        group,
        reference: Some(app),
        ..Default::default()
    };

    let mut apps = api.list_apps(&filter).await?;
    match apps.len() {
        0 => Err(RunError::NotFound { app }),
        1 => Ok(apps.remove(0)),
        count => Err(RunError::Ambiguous { app, count }),
    }
}

async fn trigger(
    api: &dyn AssessmentApi,
    package: String,
    platform: Platform,
    settings: &RunSettings,
) -> Result<BuildResult, RunError> {
    info!(%package, %platform, analysis_type = %settings.analysis_type, "triggering assessment");

    let params = TriggerParams {
        package,
        platform,
        group: settings.group,
        analysis_type: settings.analysis_type,
    };
    Ok(api.trigger_assessment(&params).await?)
}
