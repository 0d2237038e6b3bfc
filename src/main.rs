//! Edge dispatch compiler.
//!
//! Compiles a site's route declarations into a CDN dispatch table and the
//! edge functions its routes run before dispatch.
//!
//! # Architecture Overview
//!
//! ```text
//!     site.toml
//!         │
//!         ▼
//!   ┌──────────┐    ┌──────────────┐    ┌──────────────┐
//!   │  config  │───▶│   routing    │───▶│  provision   │───▶ dispatch.json
//!   │ validate │    │   compiler   │    │  (dry run)   │     functions/*.js
//!   └──────────┘    └──────┬───────┘    └──────┬───────┘     policies/*.json
//!                          │                   │
//!                          ▼                   ▼
//!                   ┌──────────────┐    ┌──────────────┐
//!                   │   pipeline   │    │   storage    │
//!                   │ chain + code │    │ grant/policy │
//!                   └──────┬───────┘    └──────────────┘
//!                          │
//!                          ▼
//!                   ┌──────────────┐
//!                   │   rewrite    │
//!                   │   handlers   │
//!                   └──────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use edge_dispatch::config::{load_config, ObservabilityConfig, Site};
use edge_dispatch::observability::logging::init_logging;
use edge_dispatch::provision::DryRun;
use edge_dispatch::rewrite::{EdgeRequest, Message};

#[derive(Parser)]
#[command(name = "edge-dispatch")]
#[command(about = "Compile site routes into an edge dispatch table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a site config and compile it without writing anything
    Check { config: PathBuf },
    /// Compile a site config and write the deployment artifacts
    Compile {
        config: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
        /// Distribution ARN used to finalize bucket policies
        #[arg(long)]
        distribution_arn: Option<String>,
    },
    /// Show which behavior serves a path and what its viewer-request chain does
    Resolve { config: PathBuf, path: String },
}

impl Commands {
    fn config_path(&self) -> &Path {
        match self {
            Commands::Check { config }
            | Commands::Compile { config, .. }
            | Commands::Resolve { config, .. } => config,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config(cli.command.config_path()) {
        Ok(config) => config,
        Err(e) => {
            // without a config, report through the default subscriber
            if let Err(init) = init_logging(&ObservabilityConfig::default()) {
                eprintln!("Logging already initialized: {init}");
            }
            return Err(e.into());
        }
    };
    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Logging already initialized: {e}");
    }
    tracing::debug!(
        log_level = %config.observability.log_level,
        json = config.observability.json,
        "Logging initialized"
    );

    let mut site = Site::from_config(&config)?;
    let table = site.compile()?;

    match cli.command {
        Commands::Check { .. } => {
            println!(
                "{}: {} behaviors, {} functions, {} read grants",
                table.name,
                table.ordered_behaviors.len() + 1,
                table.functions.len(),
                table.read_grants.len()
            );
        }
        Commands::Compile {
            out,
            distribution_arn,
            ..
        } => {
            let mut dry_run = DryRun::new(&out);
            if let Some(arn) = distribution_arn {
                dry_run = dry_run.with_distribution_arn(arn);
            }
            let outcome = dry_run.deploy(&table, &mut site.stores)?;
            tracing::info!(
                out = %out.display(),
                distribution = %outcome.distribution.arn,
                functions = outcome.functions.len(),
                bucket_policies = outcome.bucket_policies.len(),
                "Deployment artifacts written"
            );
            println!("{}", out.display());
        }
        Commands::Resolve { path, .. } => {
            let behavior = table.resolve(&path);
            println!("{}", serde_json::to_string_pretty(behavior)?);
            match table.simulate(EdgeRequest::new(path.as_str())) {
                Message::Request(request) => println!("forward {}", request.uri),
                Message::Response(response) => println!(
                    "respond {} {}",
                    response.status_code, response.status_description
                ),
            }
        }
    }

    Ok(())
}
