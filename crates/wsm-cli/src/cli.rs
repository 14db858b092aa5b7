use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wsm",
    about = "WorldLine State Machine: query the projected state of a ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true, default_value = "wsm.toml")]
    pub config: PathBuf,

    /// Ledger fixture to load, overriding the configured one
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the latest consensus state of an object
    Get(GetArgs),
    /// Show the consensus-ordered operation history of a record
    History(HistoryArgs),
    /// Check whether operations of an event are stored and ordered
    Exists(ExistsArgs),
    /// Replay pending blocks into the state machine
    CatchUp(CatchUpArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub object_id: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub record_id: String,
    /// Only include operations at or below this block height
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_block_height: Option<u64>,
}

#[derive(Args)]
pub struct ExistsArgs {
    pub event_hash: String,
    #[arg(required = true)]
    pub operation_hashes: Vec<String>,
}

#[derive(Args)]
pub struct CatchUpArgs {}
