use app::{build_executor, calendar, open_db, pending};
use clap::{Parser, Subcommand};
use ql_config::Config;
use ql_core::{local_now, parse_datetime, telemetry};
use ql_scheduler::CronRunner;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quill", about = "AI post scheduler", version)]
struct Cli {
    /// Runtime environment; "production" switches logs to JSON
    #[arg(long, global = true, default_value = "development")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the executors on the configured cron until interrupted
    Run,
    /// Process one batch of due schedules and authors now
    Tick {
        /// Pretend the current time is this (YYYY-MM-DD HH:MM:SS)
        #[arg(long)]
        at: Option<String>,
    },
    /// Print the projected firings of a month as JSON
    Calendar {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Print projected firings per template for today, the week and the month
    PendingStats {
        #[arg(long)]
        template: Option<String>,
    },
    /// Run one schedule by hand without moving its next run
    RunSchedule { id: String },
    /// Generate a post from one author topic by hand
    GenerateTopic { topic_id: String },
    /// List the recognised frequencies
    Frequencies,
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!("{}: {}", context, err);
    process::exit(1);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail("Failed to render output", e),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.env, "quill");

    // Load configuration - exit with non-zero if invalid
    let config = match Config::load() {
        Ok(config) => {
            tracing::debug!(?config, "Configuration loaded successfully");
            config
        }
        Err(e) => fail("Failed to load configuration", e),
    };

    let db = match open_db(&config).await {
        Ok(db) => db,
        Err(e) => fail("Failed to initialize database", e),
    };

    match cli.command {
        Command::Run => {
            let executor = match build_executor(&config, &db) {
                Ok(executor) => Arc::new(executor),
                Err(e) => fail("Failed to build executor", e),
            };
            let mut runner = match CronRunner::new(config.scheduler.tick_cron.clone(), executor).await {
                Ok(runner) => runner,
                Err(e) => fail("Failed to create cron runner", e),
            };
            if let Err(e) = runner.start().await {
                fail("Failed to start cron runner", e);
            }

            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
            if let Err(e) = runner.stop().await {
                fail("Failed to stop cron runner", e);
            }
        }
        Command::Tick { at } => {
            let now = match at.as_deref().map(parse_datetime).transpose() {
                Ok(at) => at.unwrap_or_else(local_now),
                Err(e) => fail("Invalid --at", e),
            };
            let executor = match build_executor(&config, &db) {
                Ok(executor) => executor,
                Err(e) => fail("Failed to build executor", e),
            };
            match executor.tick(now).await {
                Ok(report) => print_json(&report),
                Err(e) => fail("Tick failed", e),
            }
        }
        Command::Calendar { year, month } => match calendar(&db, year, month).await {
            Ok(events) => print_json(&events),
            Err(e) => fail("Failed to build calendar", e),
        },
        Command::PendingStats { template } => {
            match pending(&db, template.as_deref(), local_now()).await {
                Ok(stats) => print_json(&stats),
                Err(e) => fail("Failed to compute pending stats", e),
            }
        }
        Command::RunSchedule { id } => {
            let executor = match build_executor(&config, &db) {
                Ok(executor) => executor,
                Err(e) => fail("Failed to build executor", e),
            };
            match executor.schedules().process_single_schedule(&id, local_now()).await {
                Ok(post_id) => println!("{}", post_id),
                Err(e) => fail("Schedule run failed", e),
            }
        }
        Command::Frequencies => print_json(&ql_sched::intervals()),
        Command::GenerateTopic { topic_id } => {
            let executor = match build_executor(&config, &db) {
                Ok(executor) => executor,
                Err(e) => fail("Failed to build executor", e),
            };
            let Some(authors) = executor.authors() else {
                fail("Topic generation is disabled", "scheduler.enable_author_posts is false");
            };
            match authors.generate_for_topic(&topic_id, local_now()).await {
                Ok(post_id) => println!("{}", post_id),
                Err(e) => fail("Topic generation failed", e),
            }
        }
    }
}
