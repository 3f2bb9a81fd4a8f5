use std::env;
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use sqlx::postgres::PgPoolOptions;
use trend_detector::config::Config;
use trend_detector::detection::orchestrator::Orchestrator;
use trend_detector::pipeline::embedding::EmbeddingService;
use trend_detector::store::dao_impl::TrendDaoImpl;

struct ReplayArgs {
    dsn: Option<String>,
    window_hours: Option<u32>,
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let config = Config::from_env().context("failed to load configuration")?;
    let dsn = args.dsn.unwrap_or_else(|| config.trend_db_dsn().to_string());
    let config = match args.window_hours {
        Some(hours) => config.with_overrides(Some(hours), None, None, None),
        None => config,
    };

    if args.dry_run {
        println!("dry run: would connect to {dsn} and replay a {}h window", config.window_hours());
        return Ok(());
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.trend_db_max_connections())
        .connect(&dsn)
        .await
        .with_context(|| format!("failed to connect to {dsn}"))?;
    let dao = TrendDaoImpl::new(pool);
    let embeddings = EmbeddingService::new().ok();

    let orchestrator = Orchestrator::new(&dao, embeddings.as_ref(), &config, None);
    let report = orchestrator.run().await.map_err(|error| anyhow!("replay run failed: {error}"))?;

    println!("{}", serde_json::to_string_pretty(&report).context("failed to serialize report")?);
    Ok(())
}

fn parse_args() -> Result<ReplayArgs> {
    let mut dsn = None;
    let mut window_hours = None;
    let mut dry_run = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dsn" => {
                let value = args.next().context("--dsn requires a connection string")?;
                dsn = Some(value);
            }
            "--window-hours" => {
                let value = args.next().context("--window-hours requires an integer")?;
                window_hours = Some(value.parse::<u32>().context("--window-hours must be an integer")?);
            }
            "--dry-run" => {
                dry_run = true;
            }
            "--help" => {
                print_usage();
                process::exit(0);
            }
            _ => bail!("unknown argument: {arg}"),
        }
    }

    Ok(ReplayArgs { dsn, window_hours, dry_run })
}

fn print_usage() {
    eprintln!("Usage: replay_detection_window [--dsn <dsn>] [--window-hours 24] [--dry-run]");
}
