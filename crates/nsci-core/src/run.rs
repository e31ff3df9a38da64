use tracing::{info, warn};

use crate::api::AssessmentApi;
use crate::config::RunSettings;
use crate::error::RunError;
use crate::poll::{self, CancelToken};
use crate::report::model::{RunReport, ToolInfo};
use crate::report::output::OutputSink;
use crate::report::persist_findings;
use crate::submit::{self, SubmissionRequest};
use crate::verdict;

/// Drives one assessment from submission to report.
pub struct Runner<'a> {
    api: &'a dyn AssessmentApi,
    settings: &'a RunSettings,
    tool: ToolInfo,
}

impl<'a> Runner<'a> {
    pub fn new(api: &'a dyn AssessmentApi, settings: &'a RunSettings, tool: ToolInfo) -> Self {
        Self {
            api,
            settings,
            tool,
        }
    }

    /// Submit, optionally wait and evaluate, then write the report to `sink`.
    ///
    /// The report is written before a failed gate is returned as an error,
    /// so the payload explaining the failure always reaches the sink.
    pub async fn run(
        &self,
        request: &SubmissionRequest,
        cancel: &CancelToken,
        sink: &mut OutputSink,
    ) -> Result<RunReport, RunError> {
        let settings = self.settings;
        let submission = submit::resolve(request, self.api, settings).await?;
        let handle = &submission.handle;

        let Some(poll_config) = &settings.poll else {
            if settings.minimum_score > 0 {
                warn!(
                    minimum_score = settings.minimum_score,
                    "polling is disabled, minimum score is not checked"
                );
            }
            let report = RunReport::submitted(
                self.tool.clone(),
                submission.artifact,
                handle,
                &settings.ui_host,
            );
            sink.write_report(&report)?;
            return Ok(report);
        };

        let query = handle.status_query(settings.group);
        let status = poll::poll(self.api, &query, poll_config, cancel).await?;
        let outcome = verdict::evaluate(status, handle.task_id, settings.minimum_score)?;

        info!(
            task = handle.task_id,
            status = %outcome.final_status.task_status,
            score = outcome.final_status.adjusted_score,
            passed = outcome.passed,
            "assessment finished"
        );

        let report = RunReport::evaluated(
            self.tool.clone(),
            submission.artifact,
            handle,
            &settings.ui_host,
            &outcome,
        );
        sink.write_report(&report)?;

        if let Some(path) = &settings.findings_path {
            persist_findings(self.api, &query, path).await;
        }

        outcome.gate()?;
        Ok(report)
    }
}
