use anyhow::Result;
use clap::Parser;
use tracing::warn;

use nsci_core::api::client::PlatformClient;
use nsci_core::error::{EXIT_GATE_FAILED, RunError};
use nsci_core::poll::{CancelHandle, cancel_pair};
use nsci_core::report::model::ToolInfo;
use nsci_core::report::output::OutputSink;
use nsci_core::{Runner, TOOL_NAME};

mod args;
mod settings;
mod telemetry;

use args::{Args, Command, RunArgs};
use settings::{FileConfig, Settings};

#[tokio::main]
async fn main() {
    // A missing .env is the common case.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    if let Err(err) = execute(args).await {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

async fn execute(args: Args) -> Result<()> {
    let file = FileConfig::load(args.global.config.as_deref())?;
    let settings = Settings::resolve(&args.global, file)?;
    telemetry::init(&settings.log_level)?;

    match args.command {
        Command::Run(run) => run_assessment(&settings, run).await,
    }
}

async fn run_assessment(settings: &Settings, args: RunArgs) -> Result<()> {
    let run_settings = settings.run_settings(&args.options)?;
    let client = PlatformClient::new(&settings.client_config())?;
    let mut sink = OutputSink::open(settings.output.as_deref(), settings.output_format)?;

    let tool = ToolInfo {
        name: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let (handle, cancel) = cancel_pair();
    watch_interrupt(handle);

    let request = args.target.request(settings.platform);
    Runner::new(&client, &run_settings, tool)
        .run(&request, &cancel, &mut sink)
        .await?;
    sink.close()?;
    Ok(())
}

fn watch_interrupt(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            handle.cancel();
        }
    });
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<RunError>()
        .map(RunError::exit_code)
        .unwrap_or(EXIT_GATE_FAILED)
}
