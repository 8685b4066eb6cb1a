use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fact_reconciliation::{export_csv, load_entities, EntityEntry, EngineConfig, ReconciliationEngine};

/// Reconcile downloaded companyfacts files into quarterly/annual revenue tables
#[derive(Parser, Debug)]
#[command(name = "fact-reconcile", version)]
struct Args {
    /// JSON list of entities: [{"ticker": "...", "sector": "..."}]
    #[arg(long)]
    entities: PathBuf,

    /// Directory holding one `{ticker}.json` companyfacts file per entity
    #[arg(long, env = "FACTS_DIR")]
    facts_dir: PathBuf,

    /// Write one `{ticker}.csv` per reconciled entity here
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Engine configuration JSON (alias tags, tolerances, year range)
    #[arg(long)]
    config: Option<PathBuf>,

    /// First output year (inclusive), overrides the config
    #[arg(long)]
    start_year: Option<i32>,

    /// Last output year (exclusive), overrides the config
    #[arg(long)]
    end_year: Option<i32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(start) = args.start_year {
        config.start_year = start;
    }
    if let Some(end) = args.end_year {
        config.end_year = end;
    }

    let engine = ReconciliationEngine::new(config)?;
    let content = fs::read_to_string(&args.entities)
        .with_context(|| format!("Failed to read entities file: {:?}", args.entities))?;
    let entries: Vec<EntityEntry> =
        serde_json::from_str(&content).context("Failed to parse entities JSON")?;
    let (entities, load_skips) = load_entities(&args.facts_dir, &entries, engine.config());

    let mut report = engine.run_batch(&entities);
    report.add_skipped(load_skips);

    if let Some(out_dir) = &args.out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;
        for run in &report.runs {
            let path = out_dir.join(format!("{}.csv", run.symbol));
            let rows = export_csv(&path, &run.records)?;
            info!(symbol = %run.symbol, rows, path = ?path, "Wrote CSV");
        }
    }

    println!("{}", report.summary());
    for run in &report.runs {
        println!("  ✓ {}", run.summary());
    }
    for skip in &report.skipped {
        println!("  ✗ {}: {}", skip.symbol, skip.reason);
    }

    Ok(())
}
