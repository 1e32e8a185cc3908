#![forbid(unsafe_code)]
//! Inspect a ledger snapshot: integrity report, transaction feed, block lookup

use chainview::blockchain::{ChainValidator, IssueKind, LedgerSnapshot, ValidationPolicy};
use chainview::config::{load_config, Config};
use chainview::index::LedgerIndex;
use chainview::source::{JsonFileSource, SnapshotSource};
use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chainview", version, about = "Ledger integrity verifier and viewer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check hash linkage and proof-of-work for every block
    Validate {
        /// Snapshot file (defaults to source.path from chainview.toml)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Turn on every optional check
        #[arg(long)]
        strict: bool,
        /// Require the genesis block to meet its own difficulty
        #[arg(long)]
        strict_genesis: bool,
        /// Require block indices to match chain positions
        #[arg(long)]
        check_sequence: bool,
        /// Recompute each block digest and compare with the stored hash
        #[arg(long)]
        recompute_hashes: bool,
    },
    /// List every transaction, most recent first
    Transactions {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Find the block that contains a transaction (exit code 1 when absent)
    Locate {
        id: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Serve the read-only API
    #[cfg(feature = "api")]
    Serve {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_snapshot(config: &Config, file: Option<PathBuf>) -> Result<LedgerSnapshot, Box<dyn std::error::Error>> {
    let path = file.unwrap_or_else(|| PathBuf::from(&config.source.path));
    let snapshot = JsonFileSource::new(path).fetch()?;
    Ok(snapshot)
}

fn short(value: &str, keep: usize) -> String {
    if value.chars().count() > keep * 2 + 3 {
        let head: String = value.chars().take(keep).collect();
        let tail: String = value.chars().skip(value.chars().count() - keep).collect();
        format!("{}...{}", head, tail)
    } else {
        value.to_string()
    }
}

fn format_time(timestamp: i64) -> String {
    match chrono::DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp.to_string(),
    }
}

fn resolve_policy(
    configured: ValidationPolicy,
    strict: bool,
    strict_genesis: bool,
    check_sequence: bool,
    recompute_hashes: bool,
) -> ValidationPolicy {
    if strict {
        return ValidationPolicy::strict();
    }
    ValidationPolicy {
        genesis_proof_of_work: configured.genesis_proof_of_work || strict_genesis,
        check_index_sequence: configured.check_index_sequence || check_sequence,
        recompute_hashes: configured.recompute_hashes || recompute_hashes,
    }
}

fn run_validate(snapshot: &LedgerSnapshot, policy: ValidationPolicy) -> bool {
    let report = ChainValidator::new(policy).validate(snapshot);

    println!(
        "{}",
        format!("🔗 {} blocks, {} transactions", snapshot.len(), snapshot.transaction_count()).cyan()
    );
    println!();

    if report.valid {
        println!("{}", report.message().green().bold());
        return true;
    }

    println!("{}", report.message().red().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Block").add_attribute(Attribute::Bold),
            Cell::new("Kind").add_attribute(Attribute::Bold),
            Cell::new("Issue").add_attribute(Attribute::Bold),
        ]);

    for issue in &report.issues {
        let (kind, color) = match issue.kind {
            IssueKind::BrokenLink { .. } => ("BrokenLink", TableColor::Red),
            IssueKind::DifficultyNotMet { .. } => ("DifficultyNotMet", TableColor::Yellow),
            IssueKind::IndexOutOfSequence { .. } => ("IndexOutOfSequence", TableColor::Magenta),
            IssueKind::HashMismatch { .. } => ("HashMismatch", TableColor::Red),
        };
        table.add_row(vec![
            Cell::new(format!("#{}", issue.block_index)),
            Cell::new(kind).fg(color),
            Cell::new(issue.describe()),
        ]);
    }

    println!("{table}");
    false
}

fn run_transactions(snapshot: &LedgerSnapshot, limit: Option<usize>) {
    let index = LedgerIndex::build(snapshot);
    let feed = index.all_transactions();

    println!(
        "{}",
        format!("📜 {} transactions found", feed.len()).bright_cyan().bold()
    );
    if feed.is_empty() {
        println!("{}", "No transactions found in the blockchain.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Block").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("From").add_attribute(Attribute::Bold),
            Cell::new("To").add_attribute(Attribute::Bold),
            Cell::new("Amount").add_attribute(Attribute::Bold),
        ]);

    for entry in feed.iter().take(limit.unwrap_or(feed.len())) {
        let tx = &entry.transaction;
        let color = if tx.is_reward() {
            TableColor::Yellow
        } else {
            TableColor::Green
        };
        table.add_row(vec![
            Cell::new(format!("#{}", entry.block_index)),
            Cell::new(format_time(tx.timestamp)),
            Cell::new(short(&tx.id, 8)),
            Cell::new(short(&tx.sender, 8)),
            Cell::new(short(&tx.recipient, 8)),
            Cell::new(format!("{}", tx.amount)).fg(color),
        ]);
    }

    println!("{table}");

    if !index.duplicate_ids().is_empty() {
        println!(
            "{}",
            format!(
                "⚠️  {} duplicate transaction id(s) ignored; first occurrence kept",
                index.duplicate_ids().len()
            )
            .yellow()
        );
    }
}

fn run_locate(snapshot: &LedgerSnapshot, id: &str) -> bool {
    let index = LedgerIndex::build(snapshot);
    match index.find_block_of(id) {
        Ok(block_index) => {
            println!(
                "{}",
                format!("📦 Transaction {} is included in block #{}", short(id, 8), block_index).green()
            );
            true
        }
        Err(_) => {
            println!(
                "{}",
                format!("⏳ Transaction {} is not in any block (still pending?)", short(id, 8)).yellow()
            );
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command {
        Command::Validate {
            file,
            strict,
            strict_genesis,
            check_sequence,
            recompute_hashes,
        } => {
            let snapshot = load_snapshot(&config, file)?;
            let policy = resolve_policy(
                config.validation,
                strict,
                strict_genesis,
                check_sequence,
                recompute_hashes,
            );
            if !run_validate(&snapshot, policy) {
                std::process::exit(2);
            }
        }
        Command::Transactions { file, limit } => {
            let snapshot = load_snapshot(&config, file)?;
            run_transactions(&snapshot, limit);
        }
        Command::Locate { id, file } => {
            let snapshot = load_snapshot(&config, file)?;
            if !run_locate(&snapshot, &id) {
                std::process::exit(1);
            }
        }
        #[cfg(feature = "api")]
        Command::Serve { file, port } => {
            use chainview::cache::ViewCache;
            use chainview::session::LedgerSession;
            use std::sync::Arc;

            let path = file.unwrap_or_else(|| PathBuf::from(&config.source.path));
            let session = Arc::new(LedgerSession::new(
                Arc::new(JsonFileSource::new(path)),
                config.validation,
                ViewCache::new(config.cache.capacity),
            ));

            if let Err(e) = session.refresh().await {
                tracing::warn!("Initial snapshot load failed: {}. Serving until a refresh succeeds.", e);
            }

            chainview::api::run_api_server(session, port.unwrap_or(config.api.port)).await?;
        }
    }

    Ok(())
}
