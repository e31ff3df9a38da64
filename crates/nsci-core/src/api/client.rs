use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::model::{AppRecord, AssessmentStatus, BuildResult};
use super::{AppFilter, AssessmentApi, StatusQuery, TriggerParams, UploadParams};
use crate::error::{ApiError, ErrorBody, RunError};

/// Connection settings for [`PlatformClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_host: String,
    pub token: String,
    pub user_agent: String,
    /// Upper bound for a single request, including the upload.
    pub request_timeout: Duration,
}

/// HTTP implementation of [`AssessmentApi`].
#[derive(Debug, Clone)]
pub struct PlatformClient {
    base: Url,
    http: Client,
}

impl PlatformClient {
    pub fn new(config: &ClientConfig) -> Result<Self, RunError> {
        let base = Url::parse(&config.api_host)
            .map_err(|err| RunError::Config(format!("api host '{}': {err}", config.api_host)))?;
        if base.cannot_be_a_base() {
            return Err(RunError::Config(format!(
                "api host '{}' is not a base URL",
                config.api_host
            )));
        }

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| RunError::Config("token contains invalid header characters".into()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|_| {
                RunError::Config("user agent contains invalid header characters".into())
            })?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| RunError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { base, http })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        endpoint(&self.base, segments)
    }

    /// Send a request and decode a 2xx JSON body; 4xx/5xx become typed errors.
    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url().path(), %status, "platform response");

        if status.is_client_error() || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            let body = ErrorBody::parse(status.as_u16(), &text);
            return Err(if status.is_client_error() {
                ApiError::Client(body)
            } else {
                ApiError::Service(body)
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn group_param(group: Option<Uuid>) -> Vec<(&'static str, String)> {
    group
        .map(|g| vec![("group", g.to_string())])
        .unwrap_or_default()
}

/// Task ids travel as integers in URL paths.
fn task_segment(task: f64) -> String {
    (task as i64).to_string()
}

#[async_trait]
impl AssessmentApi for PlatformClient {
    async fn upload_build(
        &self,
        params: &UploadParams,
        binary: Vec<u8>,
    ) -> Result<BuildResult, ApiError> {
        let url = self.endpoint(&["build"]);
        debug!(path = url.path(), bytes = binary.len(), "uploading build");

        let mut query = group_param(params.group);
        query.push(("analysisType", params.analysis_type.to_string()));
        query.push(("assessment", "true".into()));
        query.push(("hideSensitiveDataValues", "false".into()));

        let request = self
            .http
            .post(url)
            .query(&query)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(binary);

        BuildResult::from_payload(self.send(request).await?)
    }

    async fn trigger_assessment(&self, params: &TriggerParams) -> Result<BuildResult, ApiError> {
        let url = self.endpoint(&[
            "app",
            params.platform.as_str(),
            params.package.as_str(),
            "assessment",
        ]);
        debug!(path = url.path(), "triggering assessment");

        let mut query = group_param(params.group);
        query.push(("analysisType", params.analysis_type.to_string()));
        query.push(("failfast", "true".into()));
        query.push(("hideSensitiveDataValues", "false".into()));

        BuildResult::from_payload(self.send(self.http.post(url).query(&query)).await?)
    }

    async fn list_apps(&self, filter: &AppFilter) -> Result<Vec<AppRecord>, ApiError> {
        let url = self.endpoint(&["app"]);

        let mut query = group_param(filter.group);
        if let Some(platform) = filter.platform {
            query.push(("platform", platform.to_string()));
        }
        if let Some(package) = &filter.package {
            query.push(("package", package.clone()));
        }
        if let Some(reference) = filter.reference {
            query.push(("ref", reference.to_string()));
        }
        debug!(path = url.path(), ?query, "listing apps");

        let body = self.send(self.http.get(url).query(&query)).await?;
        serde_json::from_value(body).map_err(|err| ApiError::Decode(format!("app list: {err}")))
    }

    async fn assessment_status(&self, query: &StatusQuery) -> Result<AssessmentStatus, ApiError> {
        let task = task_segment(query.task);
        let url = self.endpoint(&[
            "app",
            query.platform.as_str(),
            query.package.as_str(),
            "assessment",
            task.as_str(),
        ]);
        debug!(path = url.path(), "fetching assessment status");

        let request = self.http.get(url).query(&group_param(query.group));
        AssessmentStatus::from_payload(self.send(request).await?)
    }

    async fn findings(&self, query: &StatusQuery) -> Result<Value, ApiError> {
        let task = task_segment(query.task);
        let url = self.endpoint(&[
            "app",
            query.platform.as_str(),
            query.package.as_str(),
            "assessment",
            task.as_str(),
            "results",
        ]);
        debug!(path = url.path(), "fetching findings");

        self.send(self.http.get(url).query(&group_param(query.group)))
            .await
    }
}
