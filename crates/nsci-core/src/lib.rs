pub mod api;
pub mod config;
pub mod error;
pub mod poll;
pub mod report;
pub mod run;
pub mod submit;
pub mod verdict;

pub use error::{ApiError, RunError};
pub use run::Runner;

pub const TOOL_NAME: &str = "ns-ci";

/// JSON schema version of run reports.
/// Bump only when the report layout changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

pub const DEFAULT_API_HOST: &str = "https://lab-api.nowsecure.com";

pub const DEFAULT_UI_HOST: &str = "https://app.nowsecure.com";
