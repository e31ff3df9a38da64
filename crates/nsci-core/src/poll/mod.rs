//! Polling engine.
//!
//! Waits for an assessment to reach a terminal status by querying it on a
//! fixed interval. Every tick's response is classified:
//!
//!   - 2xx, `completed` or `failed`   → done, return the status
//!   - 2xx, any other status          → keep waiting
//!   - 5xx or transport failure       → keep waiting (logged)
//!   - 4xx or undecodable body        → fatal, return the error
//!
//! There is no attempt counter. The loop is bounded by the deadline and
//! by the caller's cancellation token, both of which are also raced
//! against the in-flight request.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::model::{AssessmentStatus, TaskStatus};
use crate::api::{AssessmentApi, StatusQuery};
use crate::config::PollConfig;
use crate::error::{ApiError, RunError};

pub mod cancel;

pub use cancel::{CancelHandle, CancelToken, cancel_pair};

/// State of the wait loop after one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Waiting,
    Done(AssessmentStatus),
}

/// Decide what one status response means for the loop.
pub fn classify(response: Result<AssessmentStatus, ApiError>) -> Result<PollState, ApiError> {
    match response {
        Ok(status) if status.is_terminal() => Ok(PollState::Done(status)),
        Ok(_) => Ok(PollState::Waiting),
        Err(err) if err.is_transient() => Ok(PollState::Waiting),
        Err(err) => Err(err),
    }
}

/// Poll until the assessment finishes, the deadline passes or `cancel` fires.
///
/// The first query is issued one interval after the call, matching the
/// cadence of a ticker started at submission time.
pub async fn poll(
    api: &dyn AssessmentApi,
    query: &StatusQuery,
    config: &PollConfig,
    cancel: &CancelToken,
) -> Result<AssessmentStatus, RunError> {
    let started = Instant::now();
    // A deadline past the clock's range never expires.
    let deadline = config.deadline().and_then(|d| started.checked_add(d));
    let first_tick = started.checked_add(config.interval()).ok_or_else(|| {
        RunError::Config(format!(
            "polling interval of {}s is out of range",
            config.interval().as_secs()
        ))
    })?;

    let mut ticker = time::interval_at(first_tick, config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_status: Option<TaskStatus> = None;
    let mut tick: u64 = 0;

    debug!(
        task = query.task,
        interval_ms = config.interval().as_millis() as u64,
        deadline_s = config.deadline().map(|d| d.as_secs()),
        "polling started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            _ = expiry(deadline) => return Err(timeout(started, last_status)),
            _ = ticker.tick() => {}
        }
        tick += 1;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            _ = expiry(deadline) => return Err(timeout(started, last_status)),
            response = api.assessment_status(query) => response,
        };

        match &response {
            Ok(status) => {
                debug!(tick, status = %status.task_status, "assessment status");
                last_status = Some(status.task_status);
            }
            Err(err) if err.is_transient() => {
                warn!(tick, error = %err, "status query failed, retrying on next tick");
            }
            Err(_) => {}
        }

        match classify(response)? {
            PollState::Waiting => continue,
            PollState::Done(status) => {
                debug!(tick, status = %status.task_status, "polling complete");
                return Ok(status);
            }
        }
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}

fn timeout(started: Instant, last_status: Option<TaskStatus>) -> RunError {
    RunError::Timeout {
        waited: round_to_secs(started.elapsed()),
        last_status,
    }
}

fn round_to_secs(waited: Duration) -> Duration {
    Duration::from_secs(waited.as_secs_f64().round() as u64)
}
