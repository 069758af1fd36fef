//! Run the factual-docs schema migration once against the database
//! described by `DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD` and
//! `DB_DATABASE` (a `.env` file in the working directory is honored).
//!
//! stdout gets a start line and a completion line; logs go to stderr and
//! are filtered with `RUST_LOG` (default `info`).

use std::process::ExitCode;
use std::time::Instant;

use factual_migrate::{DbConfig, MigrationRunner};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", "caused by:".dimmed(), cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    println!("{}", "Migration started...".cyan());
    let started = Instant::now();

    let mut client = factual_migrate::connect(&config).await?;
    let report = MigrationRunner::new(&mut client)
        .with_related_source(config.related_source)
        .run()
        .await?;

    for step in &report.steps {
        tracing::debug!(step = step.name, rows = step.rows, elapsed = ?step.elapsed, "summary");
    }

    println!(
        "{} {:.3}s",
        "Migration done in:".green().bold(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
