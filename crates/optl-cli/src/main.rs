use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "optl")]
#[command(about = "OptListing payment reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> variant -> local overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Poll the account endpoint until the purchase lands or the deadline passes.
    /// Exit code: 0 = success, 2 = timeout, 130 = interrupted.
    Reconcile {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Credit balance observed before payment (credits variant). Fetched
        /// from the endpoint when omitted.
        #[arg(long)]
        baseline_credits: Option<i64>,

        /// Plan tier the subscription must reach; overrides /target/plan.
        #[arg(long)]
        target_plan: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = optl_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Reconcile {
            config_paths,
            baseline_credits,
            target_plan,
        } => {
            let outcome = commands::reconcile::run(commands::reconcile::ReconcileArgs {
                config_paths,
                baseline_credits,
                target_plan,
            })
            .await?;
            Ok(outcome.exit_code())
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
