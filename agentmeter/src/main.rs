//! agentmeter - cost and usage dashboard for OpenCode agents
//!
//! Reads the OpenCode session database, aggregates it and prints the
//! dashboard, a session drill-down, hourly activity or Codex rate limits.

mod render;

use std::path::PathBuf;

use agentmeter_core::analytics::{aggregate, session_detail};
use agentmeter_core::config::UsageConfig;
use agentmeter_core::{load_corpus, Config, ProviderCatalog, UsageClient, UsageSnapshot};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agentmeter")]
#[command(about = "Cost and usage dashboard for OpenCode agents")]
#[command(version)]
struct Args {
    /// Path to the OpenCode database (overrides config and OPENCODE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Skip fetching the Codex usage snapshot
    #[arg(long, global = true)]
    no_usage: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Summary cards, agents, providers and recent sessions (default)
    Dashboard {
        /// Emit the full dashboard as JSON
        #[arg(long)]
        json: bool,
    },
    /// Provider and agent breakdown for one session
    Session {
        /// Session ID (prefix match supported)
        id: String,

        /// Emit the breakdown as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hourly activity for recent days
    Timeline {
        /// Number of days to show, ending today
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Codex rate-limit snapshot
    Usage,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        agentmeter_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let catalog = ProviderCatalog::with_overrides(&config.providers);
    let db_path = args.db.clone().unwrap_or_else(|| config.database_path());
    let fetch_usage = config.usage.enabled && !args.no_usage;

    tracing::info!(path = %db_path.display(), "agentmeter starting up");

    match args.command.unwrap_or(Command::Dashboard { json: false }) {
        Command::Dashboard { json } => {
            let corpus = load_corpus(&db_path)
                .with_context(|| format!("failed to read database {}", db_path.display()))?;
            let usage = if fetch_usage {
                fetch_snapshot(&config.usage)?
            } else {
                None
            };
            let data = aggregate(&corpus.sessions, &corpus.messages, &catalog).with_usage(usage);

            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                render::print_dashboard(&data, &catalog);
            }
        }
        Command::Session { id, json } => {
            let corpus = load_corpus(&db_path)
                .with_context(|| format!("failed to read database {}", db_path.display()))?;
            let session = corpus
                .find_session(&id)
                .with_context(|| format!("no session matching '{}'", id))?;
            let messages = corpus.session_tree_messages(&session.id);
            let detail = session_detail(session, messages, &catalog);

            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                render::print_session(&detail, &catalog);
            }
        }
        Command::Timeline { days } => {
            let corpus = load_corpus(&db_path)
                .with_context(|| format!("failed to read database {}", db_path.display()))?;
            let data = aggregate(&corpus.sessions, &corpus.messages, &catalog);
            render::print_timeline(&data.timeline, days.max(1), chrono::Local::now().date_naive());
        }
        Command::Usage => {
            let usage = if fetch_usage {
                fetch_snapshot(&config.usage)?
            } else {
                None
            };
            render::print_usage(usage.as_ref());
        }
    }

    tracing::info!("agentmeter done");
    Ok(())
}

/// Fetch the usage snapshot on a one-off runtime. Endpoint failures yield `None`.
fn fetch_snapshot(config: &UsageConfig) -> Result<Option<UsageSnapshot>> {
    let client = UsageClient::new(config).context("failed to create usage client")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;
    Ok(runtime.block_on(client.fetch_snapshot()))
}
