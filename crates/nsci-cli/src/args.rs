use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use nsci_core::api::model::{AnalysisType, Platform};
use nsci_core::report::output;
use nsci_core::submit::SubmissionRequest;

#[derive(Debug, Parser)]
#[command(
    name = "ns",
    version,
    about = "Submit mobile app builds for security assessment and gate CI on the score"
)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection, logging and output options shared by every command.
///
/// Every field is optional so that unset flags fall through to the config
/// file and then to the built-in defaults.
#[derive(Debug, Default, ClapArgs)]
pub struct GlobalArgs {
    /// TOML config file (default: ~/.ns-ci.toml when present)
    #[arg(long, env = "NS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Platform API base URL
    #[arg(long, env = "NS_API_HOST", global = true)]
    pub api_host: Option<String>,

    /// Web UI base URL used for assessment links
    #[arg(long, env = "NS_UI_HOST", global = true)]
    pub ui_host: Option<String>,

    /// API bearer token
    #[arg(long, env = "NS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Group reference to scope requests to
    #[arg(short = 'g', long, env = "NS_GROUP_REF", global = true)]
    pub group_ref: Option<Uuid>,

    /// Log level or filter directive (e.g. debug, nsci_core=trace)
    #[arg(long, env = "NS_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true, conflicts_with = "log_level")]
    pub verbose: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, env = "NS_OUTPUT", global = true)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, env = "NS_OUTPUT_FORMAT", global = true)]
    pub output_format: Option<OutputFormat>,

    /// CI system name, appended to the user agent
    #[arg(long, env = "NS_CI_ENVIRONMENT", global = true)]
    pub ci_environment: Option<String>,

    /// User agent sent with every request
    #[arg(long, env = "NS_USER_AGENT", global = true)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an assessment and optionally wait for its score
    Run(RunArgs),
}

#[derive(Debug, ClapArgs)]
pub struct RunArgs {
    #[command(flatten)]
    pub options: RunOptions,

    #[command(subcommand)]
    pub target: RunTarget,
}

/// Options of `run`. Unset values fall through to the config file and
/// then to the defaults.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct RunOptions {
    /// Kind of analysis to run [default: full]
    #[arg(long, value_enum, env = "NS_ANALYSIS_TYPE", global = true)]
    pub analysis_type: Option<AnalysisKind>,

    /// Minutes to wait for the assessment; 0 submits without waiting [default: 60]
    #[arg(long, env = "NS_POLL_FOR_MINUTES", global = true)]
    pub poll_for_minutes: Option<i64>,

    /// Seconds between status queries [default: 60]
    #[arg(long, env = "NS_POLLING_INTERVAL_SECS", global = true)]
    pub polling_interval_secs: Option<u64>,

    /// Lowest adjusted score that passes; 0 disables the gate [default: 0]
    #[arg(long, env = "NS_MINIMUM_SCORE", global = true)]
    pub minimum_score: Option<i64>,

    /// Download detailed findings once the assessment completes
    #[arg(long, env = "NS_SAVE_FINDINGS", global = true)]
    pub save_findings: bool,

    /// Directory the findings file is written to [default: .]
    #[arg(long, env = "NS_ARTIFACTS_DIR", global = true)]
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum RunTarget {
    /// Upload a binary (.apk or .ipa)
    File {
        /// Path to the binary
        path: PathBuf,
    },
    /// Re-assess an application already known to the platform
    Id {
        /// Application reference
        app: Uuid,

        /// Only match catalog entries for this platform (ios or android)
        #[arg(long, env = "NS_PLATFORM")]
        platform: Option<Platform>,
    },
    /// Re-assess the latest build of a package
    Package {
        /// Package name or bundle id
        name: String,

        #[command(flatten)]
        platform: PlatformFlag,
    },
}

#[derive(Debug, Clone, ClapArgs)]
#[group(required = true, multiple = false)]
pub struct PlatformFlag {
    /// The package is an iOS app
    #[arg(long)]
    pub ios: bool,

    /// The package is an Android app
    #[arg(long)]
    pub android: bool,
}

impl PlatformFlag {
    pub fn platform(&self) -> Platform {
        if self.ios {
            Platform::Ios
        } else {
            Platform::Android
        }
    }
}

impl RunTarget {
    /// Build the submission. `default_platform` narrows an app-id lookup
    /// when no `--platform` was given.
    pub fn request(&self, default_platform: Option<Platform>) -> SubmissionRequest {
        match self {
            RunTarget::File { path } => SubmissionRequest::ByFile { path: path.clone() },
            RunTarget::Id { app, platform } => SubmissionRequest::ByAppId {
                app: *app,
                platform: platform.or(default_platform),
            },
            RunTarget::Package { name, platform } => SubmissionRequest::ByPackage {
                package: name.clone(),
                platform: platform.platform(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Pretty,
    Text,
}

impl From<OutputFormat> for output::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => output::OutputFormat::Json,
            OutputFormat::Pretty => output::OutputFormat::Pretty,
            OutputFormat::Text => output::OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Full,
    Static,
    Sbom,
}

impl From<AnalysisKind> for AnalysisType {
    fn from(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::Full => AnalysisType::Full,
            AnalysisKind::Static => AnalysisType::Static,
            AnalysisKind::Sbom => AnalysisType::Sbom,
        }
    }
}
