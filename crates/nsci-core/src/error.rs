//! Error taxonomy shared by the transport layer and the run orchestrator.
//!
//! Two levels:
//!
//! - [`ApiError`] describes what went wrong talking to the platform API
//!   and knows whether a failure is worth retrying.
//! - [`RunError`] is what a run surfaces to its caller. It owns the
//!   process exit-code mapping.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::api::model::TaskStatus;

/// Exit code for a run that finished but did not meet the gate.
pub const EXIT_GATE_FAILED: i32 = 1;
/// Exit code for errors reported by the platform API.
pub const EXIT_API_ERROR: i32 = 3;
/// Exit code for an assessment that did not finish before the deadline.
pub const EXIT_TIMEOUT: i32 = 4;
/// Exit code for a run interrupted by the user.
pub const EXIT_CANCELLED: i32 = 130;

/// Error document returned by the platform on 4xx/5xx responses.
///
/// Every field is optional; the service is not consistent about which
/// ones it fills in, and some gateways answer with a non-JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code of the response that carried this body.
    #[serde(skip)]
    pub code: u16,

    #[serde(default, deserialize_with = "status_as_string")]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorBody {
    /// Decode an error body, falling back to the raw text as the message.
    pub fn parse(code: u16, body: &str) -> Self {
        let mut parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_else(|_| ErrorBody {
            message: Some(body.trim().to_string()).filter(|m| !m.is_empty()),
            ..Default::default()
        });
        parsed.code = code;
        parsed
    }

    pub fn status_code(&self) -> u16 {
        self.status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.code)
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("Error");
        let message = self
            .message
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("no message provided");
        write!(f, "HTTP {} - {}: {}", self.status_code(), name, message)
    }
}

fn status_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Failure talking to the platform API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 4xx: the request itself is wrong or unauthorized.
    #[error("{0}")]
    Client(ErrorBody),

    /// 5xx: the service failed to handle a valid request.
    #[error("{0}")]
    Service(ErrorBody),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether polling may try again on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Service(_) | ApiError::Transport(_))
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Client(body) | ApiError::Service(body) => Some(body),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Error surfaced by a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no app found with id {app}")]
    NotFound { app: Uuid },

    #[error("got {count} apps for id {app} but expected exactly one")]
    Ambiguous { app: Uuid, count: usize },

    #[error("assessment not completed after {}s (last status: {})", waited.as_secs(), last_status_label(*last_status))]
    Timeout {
        waited: Duration,
        last_status: Option<TaskStatus>,
    },

    #[error("polling cancelled")]
    Cancelled,

    #[error("assessment for task {task} completed without an adjusted score")]
    MissingScore { task: f64 },

    #[error("the score {score:.2} is less than the required minimum {minimum}")]
    BelowMinimum { score: f64, minimum: i64 },

    #[error("assessment task {task} failed")]
    AssessmentFailed { task: f64 },

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn last_status_label(status: Option<TaskStatus>) -> &'static str {
    status.map(TaskStatus::as_str).unwrap_or("none")
}

impl RunError {
    /// Process exit code for this error.
    ///
    /// - API errors (client or service) → 3
    /// - timeout → 4
    /// - cancellation → 130
    /// - everything else, including a failed gate → 1
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Api(ApiError::Client(_) | ApiError::Service(_)) => EXIT_API_ERROR,
            RunError::Timeout { .. } => EXIT_TIMEOUT,
            RunError::Cancelled => EXIT_CANCELLED,
            _ => EXIT_GATE_FAILED,
        }
    }
}
