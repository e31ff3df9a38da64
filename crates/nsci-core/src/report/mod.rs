//! Result reporting: the run report document, its sinks, and the
//! findings artifact.

use std::path::Path;

use tracing::{info, warn};

use crate::api::{AssessmentApi, StatusQuery};
use crate::error::RunError;

pub mod model;
pub mod output;
pub mod render;

use output::{OutputFormat, OutputSink};

/// Fetch detailed findings for a task and write them to `path` as
/// indented JSON.
pub async fn save_findings(
    api: &dyn AssessmentApi,
    query: &StatusQuery,
    path: &Path,
) -> Result<(), RunError> {
    let findings = api.findings(query).await?;

    let mut sink = OutputSink::create(path, OutputFormat::Pretty)?;
    sink.write(&findings)?;
    sink.close()?;

    info!(path = %path.display(), "findings written");
    Ok(())
}

/// Like [`save_findings`], but a failure is only logged. The findings
/// artifact never changes the outcome of a run.
pub async fn persist_findings(api: &dyn AssessmentApi, query: &StatusQuery, path: &Path) {
    if let Err(err) = save_findings(api, query, path).await {
        warn!(path = %path.display(), error = %err, "failed to save findings");
    }
}
