//! PULSO command line interface: run the feedback analysis pipeline over a
//! JSON-encoded dataset and print the aggregate report.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pulso_core::Dataset;
use pulso_pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "pulso-cli")]
#[command(about = "Customer feedback sentiment/insight pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a dataset file and print the aggregate report as JSON
    Analyze {
        /// Dataset file: {"columns": [...], "rows": [[...], ...]}
        input: PathBuf,

        /// Mark the result invalid when oversight confidence is low
        #[arg(long)]
        strict: bool,

        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Analyze {
            input,
            strict,
            compact,
        }) => run_analyze(&input, strict, compact).await,
        None => {
            println!("pulso-cli: use the `analyze` subcommand (see --help)");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_analyze(input: &Path, strict: bool, compact: bool) -> anyhow::Result<ExitCode> {
    let mut config = pulso_core::load_config().context("loading configuration")?;
    if strict {
        config.oversight.strict = true;
    }

    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading dataset {}", input.display()))?;
    let dataset: Dataset = serde_json::from_str(&raw).context("parsing dataset JSON")?;

    let pipeline = Pipeline::new(config);
    match pipeline.run(&dataset).await {
        Ok(result) => {
            let rendered = if compact {
                serde_json::to_string(&result)
            } else {
                serde_json::to_string_pretty(&result)
            }
            .context("serializing aggregate result")?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            // Fatal pipeline faults become a small structured error object,
            // never a stack trace.
            let report =
                serde_json::to_string(&e.to_report()).context("serializing error report")?;
            eprintln!("{report}");
            Ok(ExitCode::FAILURE)
        }
    }
}
