use colored::Colorize;
use serde::Serialize;
use wsm_state::{CatchUpReport, HistoryEntry};
use wsm_types::{EventHash, RecordId, StateRecord};

use crate::cli::*;
use crate::config::CliConfig;
use crate::fixture::{Fixture, Ledger};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(&cli.config)?;
    if let Some(path) = cli.fixture {
        config.fixture = path;
    }
    tracing::debug!(
        ledger = %config.state.ledger_id,
        fixture = %config.fixture.display(),
        "opening ledger"
    );
    let ledger = Fixture::load(&config.fixture)?.open(config.state).await?;

    let format = cli.format;
    match cli.command {
        Command::Get(args) => cmd_get(&ledger, args, &format).await,
        Command::History(args) => cmd_history(&ledger, args, &format).await,
        Command::Exists(args) => cmd_exists(&ledger, args, &format).await,
        Command::CatchUp(_) => cmd_catch_up(&ledger, &format).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_get(ledger: &Ledger, args: GetArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let record: StateRecord = ledger.state.get(&args.object_id).await?;
    match format {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            println!("{} {}", "Object".bold(), args.object_id.yellow());
            println!("  Block height: {}", record.meta.block_height.to_string().cyan());
            println!("  Created: {}", record.meta.created.to_rfc3339());
            println!("  Updated: {}", record.meta.updated.to_rfc3339());
            println!("{}", serde_json::to_string_pretty(&record.object)?);
            Ok(())
        }
    }
}

async fn cmd_history(
    ledger: &Ledger,
    args: HistoryArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let record_id = RecordId::parse(&args.record_id)?;
    let history: Vec<HistoryEntry> = ledger
        .operations
        .get_record_history(&record_id, args.max_block_height)
        .await?;
    match format {
        OutputFormat::Json => print_json(&history),
        OutputFormat::Text => {
            println!(
                "History of {} in {} ({} operations)",
                record_id.as_str().yellow(),
                ledger.operations.ledger_id().as_str().cyan(),
                history.len()
            );
            for entry in &history {
                let order = entry
                    .operation
                    .event_order
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "  {}  {}  {}",
                    format!("{}.{}.{}", entry.block_height, entry.block_order, order).cyan(),
                    entry.operation.operation_type.to_string().green(),
                    entry.operation.operation_hash.as_str().dimmed(),
                );
            }
            Ok(())
        }
    }
}

async fn cmd_exists(ledger: &Ledger, args: ExistsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let event_hash = EventHash::parse(&args.event_hash)?;
    let exists = ledger
        .operations
        .exists(&event_hash, args.operation_hashes.iter().map(String::as_str))
        .await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "exists": exists })),
        OutputFormat::Text => {
            if exists {
                println!("{} all operations stored and ordered", "✓".green().bold());
            } else {
                println!("{} missing or unordered operations", "✗".red().bold());
            }
            Ok(())
        }
    }
}

async fn cmd_catch_up(ledger: &Ledger, format: &OutputFormat) -> anyhow::Result<()> {
    let report: CatchUpReport = ledger.state.catch_up().await?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            let ledger_id = ledger.state.config().ledger_id.as_str().cyan();
            if report.is_noop() {
                println!("{} {} already at height {}", "✓".green(), ledger_id, report.to);
            } else {
                println!(
                    "{} {} replayed blocks {}..={} ({} events, {} objects written, {} deleted)",
                    "✓".green().bold(),
                    ledger_id,
                    report.from + 1,
                    report.to.to_string().bold(),
                    report.applied_events,
                    report.upserted_objects,
                    report.deleted_objects,
                );
            }
            Ok(())
        }
    }
}
