//! Tournament Shuffler - submits a signed `playersShuffle` transaction
//!
//! Loads configuration, derives the sender from the configured key, and
//! broadcasts one contract call to the tournament contract. The transaction
//! hash is printed as soon as the node accepts it.

use anyhow::Result;
use clap::Parser;
use ethers::types::U256;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod chain;
mod config;
mod contract;
mod error;
mod tx;
mod wallet;

use chain::ChainProvider;
use config::Settings;
use error::{ErrorKind, SubmitterError};
use tx::TransactionSubmitter;

#[derive(Parser, Debug)]
#[command(name = "tournament-shuffler", version)]
#[command(about = "Submit a playersShuffle transaction for a tournament")]
struct Args {
    /// On-chain tournament id to shuffle
    #[arg(short, long)]
    tournament_id: u64,

    /// Configuration file (defaults to $SHUFFLER_CONFIG, then config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the submission as JSON instead of the bare hash
    #[arg(long)]
    json: bool,

    /// Skip gas estimation and balance checks before signing
    #[arg(long)]
    skip_preflight: bool,
}

#[tokio::main]
async fn main() {
    init_logging();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Submission failed: {:#}", e);

        let kind = e
            .downcast_ref::<SubmitterError>()
            .map(SubmitterError::kind)
            .unwrap_or(ErrorKind::Configuration);
        std::process::exit(kind.exit_code());
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting Tournament Shuffler v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(args.config.as_deref())?;
    info!(
        "Loaded configuration for chain {} at {}",
        settings.chain.chain_id, settings.chain.rpc_url
    );

    let provider = Arc::new(ChainProvider::new(&settings.chain)?);
    let submitter = TransactionSubmitter::from_settings(&settings, provider)?
        .with_preflight(settings.submission.preflight && !args.skip_preflight);

    if settings.chain.verify_chain_id {
        submitter.verify_chain().await?;
    }

    let tournament_id = U256::from(args.tournament_id);
    if args.json {
        let submission = submitter
            .submit_players_shuffle_detailed(tournament_id)
            .await?;
        println!("{}", serde_json::to_string_pretty(&submission)?);
    } else {
        let tx_hash = submitter.submit_players_shuffle(tournament_id).await?;
        println!("Transaction Hash: {:?}", tx_hash);
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tournament_shuffler=debug,hyper=warn"));

    // stdout carries only the result
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
