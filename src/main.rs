mod config;
mod job;
mod notify;
mod webhook;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use job::{JobInput, LocationJob};
use notify::{LogNotifier, Notifier};
use webhook::{SubmissionExecutor, SubmissionOutcome};

#[derive(Parser)]
#[command(name = "location-setter")]
#[command(about = "Submits device coordinates to a map service webhook")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Make a single submission attempt and print the outcome
    Submit {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Run the location job, retrying with backoff until it finishes (Ctrl+C cancels)
    Job {
        /// JSON file with stored job input (`latitude`, `longitude`)
        #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
        input: Option<PathBuf>,
        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from {:?}: {}", cli.config, e);
        eprintln!("Using default configuration");
        config::Config::default()
    });

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("location-setter v{}", env!("CARGO_PKG_VERSION"));
    info!("Map service: {}", config.service.url);

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let executor = SubmissionExecutor::new(&config.service, notifier)?;

    match cli.command {
        Command::Submit {
            latitude,
            longitude,
        } => {
            let job = LocationJob::new(executor, config.service.url.clone(), config.retry.policy());
            let outcome = job.run_attempt(&JobInput::new(latitude, longitude)).await;
            report(outcome)
        }
        Command::Job {
            input,
            latitude,
            longitude,
        } => {
            // Unset values stay NaN and are rejected before any request goes out
            let input = match input {
                Some(path) => JobInput::load(&path)?,
                None => JobInput::new(
                    latitude.unwrap_or(f64::NAN),
                    longitude.unwrap_or(f64::NAN),
                ),
            };

            let job = LocationJob::new(executor, config.service.url.clone(), config.retry.policy());
            let cancel = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            match job.run(&input, cancel).await {
                Some(outcome) => report(outcome),
                None => {
                    info!("Job cancelled, nothing recorded");
                    Ok(())
                }
            }
        }
    }
}

fn report(outcome: SubmissionOutcome) -> anyhow::Result<()> {
    println!("{}", outcome);
    if outcome.is_success() {
        return Ok(());
    }
    anyhow::bail!(
        "location update failed ({}): {}",
        if outcome.is_permanent() { "permanent" } else { "retryable" },
        outcome.reason().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use webhook::Coordinate;

    #[test]
    fn test_report_exit_status_follows_outcome() {
        assert!(report(SubmissionOutcome::Success(Coordinate::new(1.0, 2.0))).is_ok());

        let err = report(SubmissionOutcome::PermanentFailure("session expired".into())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "location update failed (permanent): session expired"
        );

        let err = report(SubmissionOutcome::RetryableFailure("db down".into())).unwrap_err();
        assert_eq!(err.to_string(), "location update failed (retryable): db down");
    }
}
