//! Casebook command line: a thin presentation surface over the pipeline.
//!
//! The CLI owns display formatting and nothing else — every trust decision
//! happens in the validator, every storage concern in the store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use casebook_ingest::DirSource;
use casebook_llm::{Gateway, GatewayConfig, IngestionLoop, Pipeline};
use casebook_schema::{SchemaRegistry, TABLE_NAME};
use casebook_store::{FactStore, QueryRows};

#[derive(Parser)]
#[command(
    name = "casebook",
    about = "Natural-language front door to a customer-service fact store",
    version
)]
struct Cli {
    /// SQLite database path.
    #[arg(long, global = true, default_value = "casebook.db")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a natural-language question over the stored records.
    Ask {
        /// The question, in plain language.
        question: Vec<String>,
    },
    /// Extract records from a directory of `.txt` transcripts.
    Ingest {
        /// Directory to walk for transcripts.
        dir: PathBuf,
        /// Transcripts to process in this run.
        #[arg(long, default_value_t = 10)]
        batch: usize,
    },
    /// Dump stored rows without involving the model.
    Rows {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let store = Arc::new(FactStore::open(&cli.store)?);

    match cli.command {
        Command::Ask { question } => {
            let question = question.join(" ");
            let pipeline = build_pipeline(Arc::clone(&store))?;
            match pipeline.ask(&question).await {
                Ok(rows) => print_rows(&rows),
                Err(err) => {
                    // Surface the specific rejection kind, not just "failed".
                    eprintln!("{} {err}", "rejected:".red().bold());
                    std::process::exit(1);
                }
            }
        }
        Command::Ingest { dir, batch } => {
            let pipeline = build_pipeline(Arc::clone(&store))?;
            let mut source = DirSource::new(&dir)?;
            let report = IngestionLoop::new(&pipeline)
                .with_batch_size(batch)
                .run(&mut source)
                .await?;

            println!(
                "{} {} transcript(s), {} record(s) stored",
                "ok:".green().bold(),
                report.stored_transcripts(),
                report.stored_records()
            );
            for (index, error) in report.failures() {
                println!("{} transcript #{}: {error}", "failed:".red().bold(), index + 1);
            }
        }
        Command::Rows { limit } => {
            let rows = store.query(&format!(
                "SELECT * FROM {TABLE_NAME} ORDER BY id LIMIT {limit}"
            ))?;
            print_rows(&rows);
        }
    }

    Ok(())
}

fn build_pipeline(store: Arc<FactStore>) -> Result<Pipeline> {
    let config = GatewayConfig::from_env()?;
    tracing::debug!(provider = ?config.provider, model = %config.model, "gateway configured");
    Ok(Pipeline::new(
        Arc::new(SchemaRegistry::new()),
        Gateway::from_config(&config),
        store,
    ))
}

fn print_rows(rows: &QueryRows) {
    if rows.is_empty() {
        println!("{}", "no matching records".yellow());
        return;
    }
    println!("{}", rows.columns.join(" | ").bold());
    for row in &rows.rows {
        println!("{}", row.join(" | "));
    }
    println!("{} row(s)", rows.len());
}
