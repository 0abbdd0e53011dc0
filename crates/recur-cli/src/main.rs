//! recur - recurring task trigger and tools.
//!
//! - `recur run`: poll and materialize due occurrences until Ctrl-C
//! - `recur preview`: upcoming dates and summary for a rule
//! - `recur simulate`: replay passes day by day on an in-memory store

mod rule_args;
mod simulate;
mod trigger;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use recur_core::RecurConfig;
use recur_core::config::load_dotenv;
use recur_core::impls::{InMemoryTemplateStore, MemoryNoteSink, TracingNoteSink};
use recur_core::ports::{IdGenerator, NoteSink, SystemClock, TemplateStore, UlidGenerator};
use recur_core::recurrence::{describe, preview_limit, preview_upcoming, validate};

use crate::rule_args::RuleArgs;
use crate::simulate::{Simulation, load_drafts, seed};
use crate::trigger::TriggerGroup;

// ── CLI ─────────────────────────────────────────────────────────────

/// Recurring task generator.
#[derive(Parser, Debug)]
#[command(name = "recur", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the periodic trigger until interrupted.
    Run(RunArgs),
    /// Print upcoming dates for a rule.
    Preview(PreviewArgs),
    /// Replay passes over a date range against templates from a JSON file.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Seconds between passes.
    #[arg(long, env = "RECUR_POLL_INTERVAL_SECS")]
    interval: Option<u64>,

    /// Concurrent trigger workers.
    #[arg(long, env = "RECUR_WORKERS")]
    workers: Option<usize>,

    /// Template drafts to load into the in-memory store at startup.
    #[arg(long)]
    templates: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    rule: RuleArgs,

    /// Number of dates to show (defaults to RECUR_PREVIEW_LIMIT).
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// JSON array of template drafts.
    #[arg(long)]
    templates: PathBuf,

    #[arg(long)]
    from: NaiveDate,

    #[arg(long)]
    to: NaiveDate,

    /// Engines racing on every simulated day.
    #[arg(long, default_value_t = 2)]
    engines: usize,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RecurConfig::from_env();

    match cli.command {
        Command::Run(args) => run(config, args).await,
        Command::Preview(args) => preview(&config, &args),
        Command::Simulate(args) => simulate(&config, args).await,
    }
}

fn id_generator() -> Arc<dyn IdGenerator> {
    Arc::new(UlidGenerator::new(SystemClock))
}

async fn run(mut config: RecurConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }

    let notes: Arc<dyn NoteSink> = Arc::new(TracingNoteSink);
    let store = open_store(&config).await?;
    if let Some(path) = &args.templates {
        let loaded = seed(
            Arc::clone(&store),
            Arc::clone(&notes),
            id_generator(),
            config.preview_limit,
            load_drafts(path)?,
        )
        .await?;
        info!(count = loaded, path = %path.display(), "templates loaded");
    }

    info!(
        interval_secs = config.poll_interval.as_secs(),
        workers = config.workers,
        "recur trigger starting"
    );
    let group = TriggerGroup::spawn(
        config.workers,
        config.poll_interval,
        store,
        notes,
        Arc::new(SystemClock),
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    group.shutdown_and_join().await;
    info!("recur trigger exited cleanly");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn open_store(config: &RecurConfig) -> anyhow::Result<Arc<dyn TemplateStore>> {
    use recur_core::impls::PgTemplateStore;

    match &config.database_url {
        Some(url) => {
            let store = PgTemplateStore::connect(url).await?;
            store.migrate().await?;
            info!("using postgres template store");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryTemplateStore::new())),
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &RecurConfig) -> anyhow::Result<Arc<dyn TemplateStore>> {
    if config.database_url.is_some() {
        tracing::warn!(
            "DATABASE_URL set but built without the postgres feature, using in-memory store"
        );
    }
    Ok(Arc::new(InMemoryTemplateStore::new()))
}

fn preview(config: &RecurConfig, args: &PreviewArgs) -> anyhow::Result<()> {
    let rule = args.rule.to_rule();
    if let Err(err) = validate(&rule) {
        anyhow::bail!("invalid rule: {err}");
    }

    let limit = args
        .limit
        .unwrap_or_else(|| preview_limit(&rule, None, config.preview_limit));
    let first = recur_core::recurrence::first_occurrence(&rule);

    println!("{}", describe(&rule));
    println!();
    for date in preview_upcoming(&rule, first, limit) {
        println!("{date}");
    }
    Ok(())
}

async fn simulate(config: &RecurConfig, args: SimulateArgs) -> anyhow::Result<()> {
    let sim = Simulation {
        store: InMemoryTemplateStore::new(),
        notes: MemoryNoteSink::new(),
        engines: args.engines,
    };
    seed(
        Arc::new(sim.store.clone()),
        Arc::new(sim.notes.clone()),
        id_generator(),
        config.preview_limit,
        load_drafts(&args.templates)?,
    )
    .await?;

    for (day, report) in sim.run(args.from, args.to).await? {
        println!("{day} {}", serde_json::to_string(&report)?);
    }
    println!();
    for occurrence in sim.occurrences().await {
        println!("{}", serde_json::to_string(&occurrence)?);
    }
    Ok(())
}
