//! Plan Timeline - CLI
//!
//! Renders the Division → PIC → Plan timeline from a JSON plan file and
//! applies drag / end-date edits through the reconciler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use plan_timeline::events::EventBus;
use plan_timeline::repository::{InMemoryPlanRepository, PlanRepository};
use plan_timeline::timeline::dates::parse_timestamp;
use plan_timeline::timeline::{
    EditReconciler, EditState, MonthFilter, RowLevel, TimelineManager, TimelineRow,
};
use plan_timeline::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "timeline")]
#[command(about = "Division / PIC / Plan timeline")]
struct Cli {
    /// Path to the YAML config file (default: ./timeline.yaml)
    #[arg(long, global = true, env = "TIMELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Plan file (JSON array), overrides config
    #[arg(long, global = true)]
    plans: Option<String>,

    /// Filter year, overrides config
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Filter month (1-12 or "all"), overrides config
    #[arg(long, global = true)]
    month: Option<MonthFilter>,

    /// Expand every division and PIC
    #[arg(long, global = true)]
    expand_all: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TIMELINE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the visible timeline rows
    Show,

    /// Move both ends of a plan bar
    Reschedule {
        /// Row id (plan id)
        #[arg(long)]
        id: String,

        #[arg(long, value_parser = parse_ts)]
        start: DateTime<Utc>,

        #[arg(long, value_parser = parse_ts)]
        end: DateTime<Utc>,

        /// Write the updated plan list back to the plan file
        #[arg(long)]
        write: bool,
    },

    /// Change a plan's end date
    SetEnd {
        /// Row id (plan id)
        #[arg(long)]
        id: String,

        #[arg(long, value_parser = parse_ts)]
        end: DateTime<Utc>,

        /// Write the updated plan list back to the plan file
        #[arg(long)]
        write: bool,
    },
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("invalid timestamp '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing (stderr, so rows on stdout stay clean)
    let json = cli.log_json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,plan_timeline=debug".into()),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
    if let Some(plans) = cli.plans {
        config.plans_path = plans;
    }
    if let Some(year) = cli.year {
        config.year = Some(year);
    }
    if let Some(month) = cli.month {
        config.month = month;
    }
    config.expand_all |= cli.expand_all;

    let repo = Arc::new(load_plans(Path::new(&config.plans_path))?);
    let bus = EventBus::new(config.event_capacity);
    let mut manager = TimelineManager::new(repo.clone(), &bus, config.period_filter(Utc::now()));
    manager.refresh().await?;
    if config.expand_all {
        manager.expand_all();
    }

    let (state, write) = match cli.command {
        Commands::Show => {
            print_rows(manager.rows());
            return Ok(());
        }
        Commands::Reschedule {
            id,
            start,
            end,
            write,
        } => {
            let reconciler = EditReconciler::new(repo.clone(), Arc::new(bus.clone()));
            (reconciler.drag(&id, start, end).await, write)
        }
        Commands::SetEnd { id, end, write } => {
            let reconciler = EditReconciler::new(repo.clone(), Arc::new(bus.clone()));
            (reconciler.edit_end_date(&id, end).await, write)
        }
    };

    let committed = report(&state);
    manager.sync_invalidations().await?;
    if config.expand_all {
        manager.expand_all();
    }
    print_rows(manager.rows());

    if committed && write {
        save_plans(repo.as_ref(), Path::new(&config.plans_path)).await?;
    }
    if let Some(error) = state.error() {
        anyhow::bail!("edit failed: {}", error);
    }
    Ok(())
}

fn load_plans(path: &Path) -> Result<InMemoryPlanRepository> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    let repo = InMemoryPlanRepository::from_json(&json)
        .with_context(|| format!("Failed to parse plan file {}", path.display()))?;
    Ok(repo)
}

async fn save_plans(repo: &InMemoryPlanRepository, path: &Path) -> Result<()> {
    let plans = repo.list().await?;
    let json = serde_json::to_string_pretty(&plans)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write plan file {}", path.display()))?;
    tracing::info!("Wrote {} plans to {}", plans.len(), path.display());
    Ok(())
}

/// Print the edit outcome; returns whether it committed
fn report(state: &EditState) -> bool {
    match state {
        EditState::Idle => {
            println!("Not a plan row; nothing to update.");
            false
        }
        EditState::Pending(command) => {
            println!("Plan {} update still pending.", command.id);
            false
        }
        EditState::Committed { plan, .. } => {
            println!("Plan {} updated.", plan.id);
            true
        }
        EditState::Failed { command, error } => {
            println!("Plan {} update failed: {}", command.id, error);
            false
        }
    }
}

fn print_rows(rows: &[TimelineRow]) {
    if rows.is_empty() {
        println!("(no plans in the selected period)");
        return;
    }

    for row in rows {
        let indent = match row.level {
            RowLevel::Division => "",
            RowLevel::Pic => "  ",
            RowLevel::Plan => "    ",
        };
        let marker = match row.expanded {
            Some(true) => "▾ ",
            Some(false) => "▸ ",
            None => "• ",
        };
        let id = match row.level {
            RowLevel::Plan => format!(" #{}", row.id),
            _ => String::new(),
        };
        println!(
            "{:>4} {}{}{}{}  {} → {}  {:>3}% {}",
            row.display_order,
            indent,
            marker,
            row.label,
            id,
            row.span.start.format("%Y-%m-%d"),
            row.span.end.format("%Y-%m-%d"),
            row.progress,
            row.color.hex(),
        );
    }
}
