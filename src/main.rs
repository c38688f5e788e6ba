use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

mod config;
mod db;
mod error;
mod models;
mod pool;
mod report;
mod sampler;
mod score;
mod slot;
mod totals;

use config::SelectionArgs;
use models::{StoredSlot, UserTotals};

#[derive(Parser)]
#[command(name = "assessor-slots")]
#[command(about = "Weighted random assignment of users to assessor slots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo activity snapshots
    Seed {
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
    },
    /// Import activity snapshots from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
    },
    /// Compute (if missing) and print the week's totals
    Totals {
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
        /// Supersede stored totals with a fresh aggregation
        #[arg(long)]
        recompute: bool,
    },
    /// Print normalized scores and pool entries without drawing
    Scores {
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Randomize and store a slot for an assessor
    Assign {
        #[arg(long)]
        assessor: String,
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
        /// Seed for the draw; a random one is used and logged when absent
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// List the week's slots
    Slots {
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
    },
    /// Generate a markdown report for an assessor's slot
    Report {
        #[arg(long)]
        assessor: String,
        #[arg(long, env = "CURRENT_WEEK")]
        week: i32,
        #[arg(long, default_value = "slot-report.md")]
        out: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { week } => {
            let inserted = db::seed(&pool, week).await?;
            println!("Inserted {inserted} seed snapshots for week {week}.");
        }
        Commands::Import { csv, week } => {
            let inserted = db::import_csv(&pool, &csv, week).await?;
            println!("Inserted {inserted} snapshots from {}.", csv.display());
        }
        Commands::Totals { week, recompute } => {
            let totals = load_totals(&pool, week, recompute).await?;
            if totals.is_empty() {
                println!("No activity recorded for week {week}.");
                return Ok(());
            }

            println!("Totals for week {week}:");
            for user in totals.iter() {
                let volumes = user
                    .volumes
                    .iter()
                    .map(|(pool_type, volume)| format!("{pool_type} {volume:.2}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "- {}: {:.0} actions, volume [{}]",
                    user.user_address, user.total_actions, volumes
                );
            }
        }
        Commands::Scores {
            week,
            limit,
            selection,
        } => {
            let config = selection.to_config()?;
            let totals = load_totals(&pool, week, false).await?;
            let mut scores = score::normalize_scores(&totals, &config.weights)?;
            scores.sort_by(|a, b| b.score.total_cmp(&a.score));

            println!("Top users by normalized score:");
            for scored in scores.iter().take(limit) {
                println!(
                    "- {} score {:.2} ({} pool entries)",
                    scored.user_address,
                    scored.score,
                    pool::entry_count(scored.score)
                );
            }

            let weighted = pool::build_pool(&scores);
            if weighted.is_empty() {
                println!("Pool is empty; no user reaches one entry.");
                return Ok(());
            }
            println!(
                "Pool holds {} entries over {} users; {} users cannot be drawn.",
                weighted.len(),
                weighted.distinct_users(),
                weighted.zero_weight().len()
            );
        }
        Commands::Assign {
            assessor,
            week,
            seed,
            json,
            selection,
        } => {
            let config = selection.to_config()?;
            let open_week = db::open_slot_week(&pool, &assessor).await?;
            let totals = load_totals(&pool, week, false).await?;

            let seed = seed.unwrap_or_else(rand::random);
            info!(%assessor, week, seed, "randomizing assessor slot");
            let mut rng = StdRng::seed_from_u64(seed);

            let assignment =
                slot::randomize_assessor_slot(&assessor, week, &totals, &config, open_week, &mut rng)?;
            info!(
                pool_size = assignment.pool_size,
                undrawable = assignment.zero_weight.len(),
                "pool built"
            );
            let id = db::insert_slot(&pool, &assignment.slot).await?;
            let stored = StoredSlot {
                id,
                slot: assignment.slot,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&stored)?);
            } else {
                print_slot(&stored);
            }
        }
        Commands::Slots { week } => {
            let slots = db::list_slots(&pool, week).await?;
            if slots.is_empty() {
                println!("No slots assigned for week {week}.");
                return Ok(());
            }
            for stored in slots.iter() {
                print_slot(stored);
            }
        }
        Commands::Report {
            assessor,
            week,
            out,
            selection,
        } => {
            let config = selection.to_config()?;
            let stored = db::fetch_slot(&pool, &assessor, week)
                .await?
                .with_context(|| format!("no slot for {assessor} in week {week}"))?;
            let totals = db::fetch_totals(&pool, week).await?;
            let report = report::build_report(&stored, &totals, &config.weights);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Stored totals for the week, aggregating snapshots when none exist yet.
async fn load_totals(pool: &PgPool, week: i32, recompute: bool) -> anyhow::Result<Vec<UserTotals>> {
    if !recompute {
        let stored = db::fetch_totals(pool, week).await?;
        if !stored.is_empty() {
            return Ok(stored);
        }
    }

    let snapshots = db::fetch_snapshots(pool, week).await?;
    let totals = totals::aggregate_totals(&snapshots, week)?;
    db::replace_totals(pool, week, &totals).await?;
    info!(week, users = totals.len(), snapshots = snapshots.len(), "totals stored");
    Ok(totals)
}

fn print_slot(stored: &StoredSlot) {
    let status = if stored.slot.done { "done" } else { "open" };
    println!(
        "Slot {} for {} (week {}, {}):",
        stored.id, stored.slot.assessor, stored.slot.week, status
    );
    for user in stored.slot.users.iter() {
        println!("- {user}");
    }
}
