use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reposift::chain::ItemStatus;
use reposift::config::{self, ChainConfig};
use reposift::github::{GitHubClient, QueryBackend};
use reposift::subprocess::SubprocessManager;
use reposift::tasks::ChainBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Filter repository search results through resumable task chains
#[derive(Parser)]
#[command(name = "reposift")]
#[command(about = "Filter and enrich repository search results through resumable task chains", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a chain, resuming from its checkpoint when one exists
    Run {
        /// Path to the chain definition
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Discard any existing checkpoint and results before running
        #[arg(long)]
        fresh: bool,
    },
    /// Remove a chain's checkpoint and results files
    Clean {
        /// Path to the chain definition
        #[arg(short = 'c', long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    let result = match cli.command {
        Commands::Run { config, fresh } => run_chain(&config, fresh).await,
        Commands::Clean { config } => clean_chain(&config),
    };

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_chain(config_path: &PathBuf, fresh: bool) -> Result<()> {
    let config = config::load_chain_config(config_path)?;
    if fresh {
        remove_chain_files(&config)?;
    }

    let token = std::env::var("GITHUB_TOKEN").ok();
    if token.is_none() {
        warn!("GITHUB_TOKEN is not set; unauthenticated requests are heavily rate limited");
    }
    let backend: Arc<dyn QueryBackend> = Arc::new(GitHubClient::new(token)?);
    let subprocess = SubprocessManager::production();

    let name = config.name.clone();
    let results_path = config.results_path();
    let builder = ChainBuilder::from_config(config, backend, subprocess)?;

    info!("Running chain {name}");
    let summary = builder
        .run_with(|outcome| match &outcome.status {
            ItemStatus::Accepted => info!("{} accepted", outcome.item.repo.full_name),
            ItemStatus::Rejected { task } => {
                info!("{} rejected by {task}", outcome.item.repo.full_name)
            }
        })
        .await?;

    info!(
        "Accepted {} repositories, rejected {} -> {}",
        summary.accepted,
        summary.rejected,
        results_path.display()
    );
    Ok(())
}

fn clean_chain(config_path: &PathBuf) -> Result<()> {
    let config = config::load_chain_config(config_path)?;
    remove_chain_files(&config)
}

fn remove_chain_files(config: &ChainConfig) -> Result<()> {
    for path in [config.checkpoint_path(), config.results_path()] {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            debug!("Removed {}", path.display());
        }
    }
    Ok(())
}
