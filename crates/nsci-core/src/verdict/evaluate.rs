//! Outcome evaluation for finished assessments.
//!
//! This module turns the final assessment status into a pass/fail verdict.
//!
//! Responsibilities:
//! - Apply the minimum-score gate to the adjusted score
//! - Fail assessments whose task failed, whatever their score
//! - Reject completed assessments that carry no score
//!
//! Non-responsibilities:
//! - Deciding when an assessment is finished (handled in `poll`)
//! - Writing reports or choosing exit codes
//!
//! The policy:
//!
//!   - task `failed`                      → FAIL
//!   - `completed`, no score              → error (remote contract violation)
//!   - `completed`, minimum <= 0          → PASS
//!   - `completed`, score >= minimum      → PASS
//!   - `completed`, score <  minimum      → FAIL
//!   - anything else                      → FAIL

use serde::Serialize;

use crate::api::model::{AssessmentStatus, TaskStatus};
use crate::error::RunError;

/// Verdict for one assessment. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub final_status: AssessmentStatus,
    pub passed: bool,
    /// Why the outcome did not pass.
    pub reason: Option<String>,
    pub minimum_score: i64,
    pub task: f64,
}

/// Report-facing summary of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictInfo {
    pub passed: bool,
    pub task_status: TaskStatus,
    pub adjusted_score: Option<f64>,
    pub minimum_score: i64,
    pub reason: Option<String>,
    pub exit_code: i32,
}

impl Outcome {
    pub fn info(&self) -> VerdictInfo {
        VerdictInfo {
            passed: self.passed,
            task_status: self.final_status.task_status,
            adjusted_score: self.final_status.adjusted_score,
            minimum_score: self.minimum_score,
            reason: self.reason.clone(),
            exit_code: if self.passed {
                0
            } else {
                crate::error::EXIT_GATE_FAILED
            },
        }
    }

    /// `Ok` for a passing outcome, otherwise the error that explains it.
    pub fn gate(&self) -> Result<(), RunError> {
        if self.passed {
            return Ok(());
        }

        match (self.final_status.task_status, self.final_status.adjusted_score) {
            (TaskStatus::Completed, Some(score)) => Err(RunError::BelowMinimum {
                score,
                minimum: self.minimum_score,
            }),
            _ => Err(RunError::AssessmentFailed { task: self.task }),
        }
    }
}

/// Evaluate a final assessment status against `minimum_score`.
pub fn evaluate(
    status: AssessmentStatus,
    task: f64,
    minimum_score: i64,
) -> Result<Outcome, RunError> {
    let (passed, reason) = match status.task_status {
        TaskStatus::Failed => (false, Some(format!("assessment task {task} failed"))),
        TaskStatus::Completed => {
            let score = status
                .adjusted_score
                .ok_or(RunError::MissingScore { task })?;

            // A non-positive minimum disables the gate.
            if minimum_score <= 0 || score >= minimum_score as f64 {
                (true, None)
            } else {
                (
                    false,
                    Some(format!(
                        "the score {score:.2} is less than the required minimum {minimum_score}"
                    )),
                )
            }
        }
        other => (
            false,
            Some(format!(
                "assessment did not reach a terminal state (status: {other})"
            )),
        ),
    };

    Ok(Outcome {
        final_status: status,
        passed,
        reason,
        minimum_score,
        task,
    })
}
