#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use nsci_core::api::model::{AppRecord, AssessmentStatus, BuildResult, Platform};
use nsci_core::api::{AppFilter, AssessmentApi, StatusQuery, TriggerParams, UploadParams};
use nsci_core::error::{ApiError, ErrorBody};
use nsci_core::report::model::ToolInfo;

/// A recorded call against [`ScriptedApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { params: UploadParams, bytes: usize },
    Trigger(TriggerParams),
    ListApps(AppFilter),
    Status(StatusQuery),
    Findings(StatusQuery),
}

/// In-memory platform that replays scripted responses.
///
/// Status responses are consumed in order; once the script runs out,
/// every further query answers `running`.
#[derive(Default)]
pub struct ScriptedApi {
    builds: Mutex<VecDeque<Result<BuildResult, ApiError>>>,
    apps: Mutex<Option<Result<Vec<AppRecord>, ApiError>>>,
    statuses: Mutex<VecDeque<Result<AssessmentStatus, ApiError>>>,
    findings: Mutex<Option<Result<Value, ApiError>>>,
    status_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build(self, build: Result<BuildResult, ApiError>) -> Self {
        self.builds.lock().unwrap().push_back(build);
        self
    }

    pub fn with_apps(self, apps: Vec<AppRecord>) -> Self {
        *self.apps.lock().unwrap() = Some(Ok(apps));
        self
    }

    pub fn with_statuses(self, statuses: Vec<Result<AssessmentStatus, ApiError>>) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn with_findings(self, findings: Result<Value, ApiError>) -> Self {
        *self.findings.lock().unwrap() = Some(findings);
        self
    }

    /// Every status query takes `delay` before answering.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Status(_)))
            .count()
    }

    pub fn triggered(&self) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, Call::Trigger(_) | Call::Upload { .. }))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_build(&self) -> Result<BuildResult, ApiError> {
        self.builds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no build scripted".into())))
    }
}

#[async_trait]
impl AssessmentApi for ScriptedApi {
    async fn upload_build(
        &self,
        params: &UploadParams,
        binary: Vec<u8>,
    ) -> Result<BuildResult, ApiError> {
        self.record(Call::Upload {
            params: params.clone(),
            bytes: binary.len(),
        });
        self.next_build()
    }

    async fn trigger_assessment(&self, params: &TriggerParams) -> Result<BuildResult, ApiError> {
        self.record(Call::Trigger(params.clone()));
        self.next_build()
    }

    async fn list_apps(&self, filter: &AppFilter) -> Result<Vec<AppRecord>, ApiError> {
        self.record(Call::ListApps(filter.clone()));
        self.apps
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn assessment_status(&self, query: &StatusQuery) -> Result<AssessmentStatus, ApiError> {
        self.record(Call::Status(query.clone()));
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(status("running")))
    }

    async fn findings(&self, query: &StatusQuery) -> Result<Value, ApiError> {
        self.record(Call::Findings(query.clone()));
        self.findings
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(json!({"findings": []})))
    }
}

pub fn build(app: Uuid, package: &str, platform: Platform) -> BuildResult {
    BuildResult::from_payload(json!({
        "application": app,
        "package": package,
        "platform": platform,
        "task": 1234.5,
        "ref": app,
    }))
    .expect("scripted build decodes")
}

pub fn status(task_status: &str) -> AssessmentStatus {
    AssessmentStatus::from_payload(json!({
        "task": 1234.5,
        "task_status": task_status,
    }))
    .expect("scripted status decodes")
}

pub fn completed(score: f64) -> AssessmentStatus {
    AssessmentStatus::from_payload(json!({
        "package": "com.example",
        "task": 1234.5,
        "task_status": "completed",
        "adjusted_score": score,
    }))
    .expect("scripted status decodes")
}

pub fn service_error() -> ApiError {
    ApiError::Service(ErrorBody::parse(
        500,
        r#"{"status":"500","name":"Some name","message":"Some message","description":"Some error"}"#,
    ))
}

pub fn client_error(code: u16, description: &str) -> ApiError {
    ApiError::Client(ErrorBody::parse(
        code,
        &json!({
            "status": code.to_string(),
            "name": "ClientError",
            "message": description,
            "description": description,
        })
        .to_string(),
    ))
}

pub fn tool() -> ToolInfo {
    ToolInfo {
        name: "ns-ci".into(),
        version: "0.1.0-test".into(),
    }
}

/// Writer whose contents stay readable after the sink takes ownership.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("utf8 output")
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(self.contents().trim()).expect("output is one JSON document")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
