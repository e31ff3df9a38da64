mod common;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::time::Instant;
use uuid::Uuid;

use common::{
    Call, ScriptedApi, SharedBuf, build, client_error, completed, service_error, status, tool,
};
use nsci_core::api::StatusQuery;
use nsci_core::api::model::{AppRecord, AssessmentStatus, Platform};
use nsci_core::config::{PollConfig, RunSettings};
use nsci_core::error::{ApiError, RunError};
use nsci_core::poll::{CancelToken, cancel_pair};
use nsci_core::report::output::{OutputFormat, OutputSink};
use nsci_core::submit::SubmissionRequest;
use nsci_core::{Runner, poll};

/// Writes a throwaway binary and returns a request uploading it.
fn binary_request() -> (NamedTempFile, SubmissionRequest) {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(b"fake apk bytes").expect("write binary");
    file.flush().expect("flush");
    let request = SubmissionRequest::ByFile {
        path: file.path().to_path_buf(),
    };
    (file, request)
}

fn polling(interval_secs: u64, deadline_secs: u64, minimum_score: i64) -> RunSettings {
    RunSettings {
        poll: Some(
            PollConfig::new(
                Duration::from_secs(interval_secs),
                Some(Duration::from_secs(deadline_secs)),
            )
            .expect("valid poll config"),
        ),
        minimum_score,
        ui_host: "https://ui.example.com".into(),
        ..Default::default()
    }
}

fn sink() -> (SharedBuf, OutputSink) {
    let buf = SharedBuf::default();
    let sink = OutputSink::from_writer(buf.clone(), OutputFormat::Json);
    (buf, sink)
}

async fn run(
    api: &ScriptedApi,
    settings: &RunSettings,
    request: &SubmissionRequest,
    out: &mut OutputSink,
) -> Result<nsci_core::report::model::RunReport, RunError> {
    Runner::new(api, settings, tool())
        .run(request, &CancelToken::never(), out)
        .await
}

#[tokio::test(start_paused = true)]
async fn upload_and_poll_passes_above_threshold() {
    let app = Uuid::new_v4();
    let api = ScriptedApi::new()
        .with_build(Ok(build(app, "com.example", Platform::Android)))
        .with_statuses(vec![Ok(completed(85.5))]);
    let settings = polling(1, 2, 70);
    let (_file, request) = binary_request();
    let (buf, mut out) = sink();

    let report = run(&api, &settings, &request, &mut out)
        .await
        .expect("run passes");

    assert_eq!(report.passed(), Some(true));
    assert_eq!(api.status_calls(), 1);

    let written = buf.json();
    assert_eq!(written["assessment"]["adjusted_score"], 85.5);
    assert_eq!(written["verdict"]["passed"], true);
    assert_eq!(written["artifact"]["hash"]["algorithm"], "sha256");
    assert_eq!(written["artifact"]["size_bytes"], 14);
    assert_eq!(
        written["build"]["assessment_url"],
        format!("https://ui.example.com/app/{app}/assessment/{app}")
    );
}

#[tokio::test(start_paused = true)]
async fn below_threshold_fails_after_writing_report() {
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(completed(85.5))]);
    let settings = polling(1, 2, 90);
    let (_file, request) = binary_request();
    let (buf, mut out) = sink();

    let err = run(&api, &settings, &request, &mut out)
        .await
        .expect_err("gate fails");

    assert!(matches!(err, RunError::BelowMinimum { .. }));
    assert!(err.to_string().contains("less than the required minimum"));
    assert_eq!(err.exit_code(), 1);

    let written = buf.json();
    assert_eq!(written["assessment"]["adjusted_score"], 85.5);
    assert_eq!(written["verdict"]["passed"], false);
}

#[tokio::test(start_paused = true)]
async fn flaky_api_is_tolerated_until_completion() {
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Ios)))
        .with_statuses(vec![
            Err(service_error()),
            Err(service_error()),
            Err(ApiError::Transport("connection reset".into())),
            Ok(completed(85.5)),
        ]);
    let settings = polling(1, 10, 50);
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    let report = run(&api, &settings, &request, &mut out)
        .await
        .expect("flaky responses are retried");

    assert_eq!(report.passed(), Some(true));
    assert_eq!(api.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn never_terminal_times_out() {
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(status("pending"))]);
    let settings = polling(1, 5, 0);
    let (_file, request) = binary_request();
    let (buf, mut out) = sink();

    let err = run(&api, &settings, &request, &mut out)
        .await
        .expect_err("deadline expires");

    match &err {
        RunError::Timeout { waited, .. } => assert_eq!(*waited, Duration::from_secs(5)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.to_string().starts_with("assessment not completed"));
    assert_eq!(err.exit_code(), 4);
    assert!((3..=4).contains(&api.status_calls()));
    assert!(buf.contents().is_empty());
}

#[tokio::test(start_paused = true)]
async fn client_error_stops_polling_immediately() {
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![
            Ok(status("running")),
            Err(client_error(403, "forbidden")),
            Ok(completed(99.0)),
        ]);
    let settings = polling(1, 3600, 0);
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    let started = Instant::now();
    let err = run(&api, &settings, &request, &mut out)
        .await
        .expect_err("4xx is fatal");

    assert!(matches!(err, RunError::Api(ApiError::Client(_))));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(api.status_calls(), 2);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn slow_status_request_cannot_outlive_deadline() {
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(completed(99.0))])
        .with_status_delay(Duration::from_secs(3600));
    let settings = polling(1, 3, 0);
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    let started = Instant::now();
    let err = run(&api, &settings, &request, &mut out)
        .await
        .expect_err("deadline wins over slow call");

    assert!(matches!(err, RunError::Timeout { .. }));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling() {
    let api = ScriptedApi::new();
    let config = PollConfig::new(Duration::from_secs(1), None).expect("valid poll config");
    let query = StatusQuery {
        package: "com.example".into(),
        platform: Platform::Android,
        group: None,
        task: 1234.5,
    };
    let (handle, token) = cancel_pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        handle.cancel();
    });

    let err = poll::poll(&api, &query, &config, &token)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, RunError::Cancelled));
    assert_eq!(api.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_task_fails_regardless_of_score() {
    let failed = AssessmentStatus::from_payload(serde_json::json!({
        "task_status": "failed",
        "adjusted_score": 100.0,
    }))
    .unwrap();
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(failed)]);
    let settings = polling(1, 5, 0);
    let (_file, request) = binary_request();
    let (buf, mut out) = sink();

    let err = run(&api, &settings, &request, &mut out)
        .await
        .expect_err("failed task");

    assert!(matches!(err, RunError::AssessmentFailed { .. }));
    assert_eq!(buf.json()["verdict"]["task_status"], "failed");
}

#[tokio::test(start_paused = true)]
async fn completed_without_score_fails_before_reporting() {
    let unscored = AssessmentStatus::from_payload(serde_json::json!({
        "task": 1234.5,
        "task_status": "completed",
    }))
    .unwrap();
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(unscored)]);
    let settings = polling(1, 5, 70);
    let (_file, request) = binary_request();
    let (buf, mut out) = sink();

    let err = run(&api, &settings, &request, &mut out)
        .await
        .expect_err("missing score");

    assert!(matches!(err, RunError::MissingScore { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(buf.contents().is_empty());
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_beyond_clock_range_still_polls_to_completion() {
    let api = ScriptedApi::new().with_statuses(vec![Ok(status("running")), Ok(completed(99.0))]);
    let config =
        PollConfig::new(Duration::from_secs(1), Some(Duration::MAX)).expect("valid poll config");
    let query = StatusQuery {
        package: "com.example".into(),
        platform: Platform::Android,
        group: None,
        task: 1234.5,
    };

    let status = poll::poll(&api, &query, &config, &CancelToken::never())
        .await
        .expect("completes without overflowing the deadline");

    assert_eq!(status.adjusted_score, Some(99.0));
    assert_eq!(api.status_calls(), 2);
}

#[tokio::test]
async fn without_polling_reports_the_build_only() {
    let api =
        ScriptedApi::new().with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Ios)));
    let settings = RunSettings {
        minimum_score: 80,
        ..Default::default()
    };
    let (_file, request) = binary_request();
    let (buf, mut out) = sink();

    let report = run(&api, &settings, &request, &mut out)
        .await
        .expect("submission succeeds");

    assert_eq!(report.passed(), None);
    assert_eq!(api.status_calls(), 0);
    let written = buf.json();
    assert!(written["assessment"].is_null());
    assert_eq!(written["build"]["package"], "com.example");
    assert_eq!(written["build"]["response"]["task"], 1234.5);
}

#[tokio::test]
async fn missing_file_fails_before_upload() {
    let api = ScriptedApi::new();
    let request = SubmissionRequest::ByFile {
        path: PathBuf::from("/nonexistent/file.apk"),
    };
    let (_buf, mut out) = sink();

    let err = run(&api, &RunSettings::default(), &request, &mut out)
        .await
        .expect_err("missing file");

    assert!(matches!(err, RunError::Io { .. }));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn upload_client_error_carries_description_and_is_not_retried() {
    let api = ScriptedApi::new().with_build(Err(client_error(400, "unsupported binary")));
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    let err = run(&api, &RunSettings::default(), &request, &mut out)
        .await
        .expect_err("upload rejected");

    assert!(err.to_string().contains("unsupported binary"));
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn upload_service_error_is_not_retried() {
    let api = ScriptedApi::new()
        .with_build(Err(service_error()))
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Ios)));
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    let err = run(&api, &RunSettings::default(), &request, &mut out)
        .await
        .expect_err("5xx surfaces");

    assert!(matches!(err, RunError::Api(ApiError::Service(_))));
    assert_eq!(err.to_string(), "HTTP 500 - Some name: Some message");
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn app_id_with_no_match_fails_before_trigger() {
    let app = Uuid::new_v4();
    let api = ScriptedApi::new().with_apps(vec![]);
    let (_buf, mut out) = sink();

    let err = run(
        &api,
        &RunSettings::default(),
        &SubmissionRequest::ByAppId {
            app,
            platform: None,
        },
        &mut out,
    )
    .await
    .expect_err("no app");

    assert!(matches!(err, RunError::NotFound { app: a } if a == app));
    assert!(!api.triggered());
}

#[tokio::test]
async fn app_id_with_many_matches_fails_before_trigger() {
    let app = Uuid::new_v4();
    let record = AppRecord {
        package: "com.example".into(),
        platform: Platform::Android,
        reference: Some(app),
    };
    let api = ScriptedApi::new().with_apps(vec![record.clone(), record]);
    let (_buf, mut out) = sink();

    let err = run(
        &api,
        &RunSettings::default(),
        &SubmissionRequest::ByAppId {
            app,
            platform: None,
        },
        &mut out,
    )
    .await
    .expect_err("ambiguous app");

    assert!(matches!(err, RunError::Ambiguous { count: 2, .. }));
    assert!(!api.triggered());
}

#[tokio::test]
async fn app_id_triggers_assessment_for_catalog_entry() {
    let app = Uuid::new_v4();
    let group = Uuid::new_v4();
    let api = ScriptedApi::new()
        .with_apps(vec![AppRecord {
            package: "com.example.app".into(),
            platform: Platform::Ios,
            reference: Some(app),
        }])
        .with_build(Ok(build(app, "com.example.app", Platform::Ios)));
    let settings = RunSettings {
        group: Some(group),
        ..Default::default()
    };
    let (_buf, mut out) = sink();

    let request = SubmissionRequest::ByAppId {
        app,
        platform: Some(Platform::Ios),
    };

    run(&api, &settings, &request, &mut out)
        .await
        .expect("trigger succeeds");

    let calls = api.calls();
    match &calls[0] {
        Call::ListApps(filter) => {
            assert_eq!(filter.reference, Some(app));
            assert_eq!(filter.group, Some(group));
            assert_eq!(filter.platform, Some(Platform::Ios));
        }
        other => panic!("expected catalog lookup first, got {other:?}"),
    }
    match &calls[1] {
        Call::Trigger(params) => {
            assert_eq!(params.package, "com.example.app");
            assert_eq!(params.platform, Platform::Ios);
            assert_eq!(params.group, Some(group));
        }
        other => panic!("expected trigger, got {other:?}"),
    }
}

#[tokio::test]
async fn package_triggers_without_catalog_lookup() {
    let api = ScriptedApi::new().with_build(Ok(build(
        Uuid::new_v4(),
        "com.example",
        Platform::Android,
    )));
    let request = SubmissionRequest::ByPackage {
        package: "com.example".into(),
        platform: Platform::Android,
    };
    let (_buf, mut out) = sink();

    run(&api, &RunSettings::default(), &request, &mut out)
        .await
        .expect("trigger succeeds");

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], Call::Trigger(p) if p.package == "com.example"));
}

#[tokio::test(start_paused = true)]
async fn findings_are_written_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("findings.json");
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(completed(85.5))])
        .with_findings(Ok(serde_json::json!({"findings": [{"key": "weak-crypto"}]})));
    let settings = RunSettings {
        findings_path: Some(path.clone()),
        ..polling(1, 2, 0)
    };
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    run(&api, &settings, &request, &mut out)
        .await
        .expect("run passes");

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["findings"][0]["key"], "weak-crypto");
}

#[tokio::test(start_paused = true)]
async fn findings_failure_does_not_fail_a_passing_run() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new()
        .with_build(Ok(build(Uuid::new_v4(), "com.example", Platform::Android)))
        .with_statuses(vec![Ok(completed(85.5))])
        .with_findings(Err(service_error()));
    let settings = RunSettings {
        findings_path: Some(dir.path().join("findings.json")),
        ..polling(1, 2, 70)
    };
    let (_file, request) = binary_request();
    let (_buf, mut out) = sink();

    let report = run(&api, &settings, &request, &mut out)
        .await
        .expect("findings failure is not fatal");

    assert_eq!(report.passed(), Some(true));
    assert!(!dir.path().join("findings.json").exists());
}
