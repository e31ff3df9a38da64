use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use nsci_core::api::client::ClientConfig;
use nsci_core::api::model::Platform;
use nsci_core::config::{PollConfig, RunSettings};
use nsci_core::error::RunError;
use nsci_core::report::output::OutputFormat;
use nsci_core::{DEFAULT_API_HOST, DEFAULT_UI_HOST, TOOL_NAME};

use crate::args::{self, AnalysisKind, GlobalArgs, RunOptions};

const DEFAULT_CONFIG_FILE: &str = ".ns-ci.toml";
const DEFAULT_LOG_LEVEL: &str = "info";
const FINDINGS_FILE: &str = "findings.json";
const DEFAULT_POLL_MINUTES: i64 = 60;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Keys accepted in the TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_host: Option<String>,
    pub ui_host: Option<String>,
    pub token: Option<String>,
    pub group_ref: Option<Uuid>,
    pub log_level: Option<String>,
    pub output: Option<PathBuf>,
    pub output_format: Option<args::OutputFormat>,
    pub ci_environment: Option<String>,
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub analysis_type: Option<AnalysisKind>,
    pub poll_for_minutes: Option<i64>,
    pub polling_interval_secs: Option<u64>,
    pub minimum_score: Option<i64>,
    pub save_findings: Option<bool>,
    pub artifacts_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(path: &Path, content: &str) -> Result<Self, RunError> {
        toml::from_str(content).map_err(|err| {
            RunError::Config(format!("invalid config file {}: {err}", path.display()))
        })
    }

    /// Load the explicitly named file, or `~/.ns-ci.toml` if it exists.
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, RunError> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(RunError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            Some(path) => path.to_path_buf(),
            None => match dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE)) {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &content)
    }
}

/// Global settings after layering flags, environment, config file and
/// defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_host: String,
    pub ui_host: String,
    pub token: String,
    pub group: Option<Uuid>,
    pub log_level: String,
    pub output: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub user_agent: String,
    /// Narrows app-id lookups when `run id` has no `--platform`.
    pub platform: Option<Platform>,
    /// `run` values taken from the config file.
    pub run_file: RunFileConfig,
}

/// `run` keys of the config file, applied beneath flags and env.
#[derive(Debug, Clone, Default)]
pub struct RunFileConfig {
    pub analysis_type: Option<AnalysisKind>,
    pub poll_for_minutes: Option<i64>,
    pub polling_interval_secs: Option<u64>,
    pub minimum_score: Option<i64>,
    pub save_findings: Option<bool>,
    pub artifacts_dir: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(args: &GlobalArgs, file: FileConfig) -> Result<Self, RunError> {
        let token = args
            .token
            .clone()
            .or(file.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                RunError::Config("an API token is required (--token or NS_TOKEN)".into())
            })?;

        let log_level = if args.verbose {
            "debug".to_string()
        } else {
            args.log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };

        let user_agent = args
            .user_agent
            .clone()
            .or(file.user_agent)
            .unwrap_or_else(|| format!("{TOOL_NAME}/{}", env!("CARGO_PKG_VERSION")));
        let user_agent = match args.ci_environment.clone().or(file.ci_environment) {
            Some(ci) if !ci.is_empty() => format!("{user_agent} ({ci})"),
            _ => user_agent,
        };

        let platform = file
            .platform
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()
            .map_err(RunError::Config)?;

        Ok(Self {
            api_host: args
                .api_host
                .clone()
                .or(file.api_host)
                .unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            ui_host: args
                .ui_host
                .clone()
                .or(file.ui_host)
                .unwrap_or_else(|| DEFAULT_UI_HOST.to_string()),
            token,
            group: args.group_ref.or(file.group_ref),
            log_level,
            output: args.output.clone().or(file.output),
            output_format: args
                .output_format
                .or(file.output_format)
                .map(Into::into)
                .unwrap_or_default(),
            user_agent,
            platform,
            run_file: RunFileConfig {
                analysis_type: file.analysis_type,
                poll_for_minutes: file.poll_for_minutes,
                polling_interval_secs: file.polling_interval_secs,
                minimum_score: file.minimum_score,
                save_findings: file.save_findings,
                artifacts_dir: file.artifacts_dir,
            },
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_host: self.api_host.clone(),
            token: self.token.clone(),
            user_agent: self.user_agent.clone(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn run_settings(&self, options: &RunOptions) -> Result<RunSettings, RunError> {
        let file = &self.run_file;
        let minutes = options
            .poll_for_minutes
            .or(file.poll_for_minutes)
            .unwrap_or(DEFAULT_POLL_MINUTES);
        let interval_secs = options
            .polling_interval_secs
            .or(file.polling_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let poll = if minutes > 0 {
            let deadline = (minutes as u64)
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    RunError::Config(format!("poll window of {minutes} minutes is too large"))
                })?;
            let interval = Duration::from_secs(interval_secs);
            Some(PollConfig::new(interval, Some(deadline))?)
        } else {
            None
        };

        let save_findings = options.save_findings || file.save_findings.unwrap_or(false);
        let artifacts_dir = options
            .artifacts_dir
            .clone()
            .or_else(|| file.artifacts_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(RunSettings {
            group: self.group,
            analysis_type: options
                .analysis_type
                .or(file.analysis_type)
                .unwrap_or(AnalysisKind::Full)
                .into(),
            poll,
            minimum_score: options.minimum_score.or(file.minimum_score).unwrap_or(0),
            findings_path: save_findings.then(|| artifacts_dir.join(FINDINGS_FILE)),
            ui_host: self.ui_host.clone(),
        })
    }
}
