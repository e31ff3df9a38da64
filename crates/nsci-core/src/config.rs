use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::api::model::AnalysisType;
use crate::error::RunError;

/// Timing of the status polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    deadline: Option<Duration>,
}

impl PollConfig {
    /// `deadline: None` waits until a terminal status or cancellation.
    ///
    /// Rejects a zero interval and a deadline shorter than one interval,
    /// either of which would let the loop finish without a single query.
    pub fn new(interval: Duration, deadline: Option<Duration>) -> Result<Self, RunError> {
        if interval.is_zero() {
            return Err(RunError::Config("polling interval must be positive".into()));
        }
        if let Some(deadline) = deadline {
            if deadline < interval {
                return Err(RunError::Config(format!(
                    "polling deadline ({}s) is shorter than the polling interval ({}s)",
                    deadline.as_secs_f64(),
                    interval.as_secs_f64()
                )));
            }
        }
        Ok(Self { interval, deadline })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

/// Everything a run needs besides the API client and the request.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub group: Option<Uuid>,
    pub analysis_type: AnalysisType,
    /// `None` submits without waiting for the assessment.
    pub poll: Option<PollConfig>,
    /// Values `<= 0` disable the score gate.
    pub minimum_score: i64,
    /// Where to write detailed findings, if anywhere.
    pub findings_path: Option<PathBuf>,
    /// Web UI base used for assessment links.
    pub ui_host: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            group: None,
            analysis_type: AnalysisType::Full,
            poll: None,
            minimum_score: 0,
            findings_path: None,
            ui_host: crate::DEFAULT_UI_HOST.to_string(),
        }
    }
}
