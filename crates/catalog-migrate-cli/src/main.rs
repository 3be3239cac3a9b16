//! catalog-migrate CLI - WooCommerce to Shopify product migration.

use catalog_migrate::{Config, MigrateError, MigrationResult, Orchestrator, ProgressSnapshot};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "catalog-migrate")]
#[command(about = "Migrate WooCommerce products into a Shopify store")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// WooCommerce consumer key (overrides config)
    #[arg(long, env = "WOO_CONSUMER_KEY", hide_env_values = true)]
    consumer_key: Option<String>,

    /// WooCommerce consumer secret (overrides config)
    #[arg(long, env = "WOO_CONSUMER_SECRET", hide_env_values = true)]
    consumer_secret: Option<String>,

    /// Shopify Admin API access token (overrides config)
    #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new migration from the first source page
    Run {
        /// Override source store URL
        #[arg(long)]
        source_url: Option<String>,

        /// Override products per source page
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Test connectivity to both stores
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = load_config(&cli)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            source_url,
            page_size,
        } => {
            // Apply overrides
            if let Some(url) = source_url {
                config.source.url = url;
            }
            if let Some(size) = page_size {
                config.migration.page_size = size;
            }

            let mut orchestrator = Orchestrator::new(config)?;
            let cancel_token = setup_signal_handler()?;

            let reporter = cli.progress.then(|| {
                tokio::spawn(report_progress(orchestrator.subscribe(), std::io::stderr()))
            });

            let outcome = orchestrator.run(cancel_token).await;
            let snapshot = orchestrator.progress();

            // The reporter returns once the progress sender, owned by the orchestrator, is gone.
            drop(orchestrator);
            if let Some(handle) = reporter {
                let _ = handle.await;
            }

            match outcome {
                Ok(result) => {
                    if cli.output_json {
                        println!("{}", result.to_json()?);
                    } else {
                        print_summary(&result);
                    }
                    if let Some(e) = result.status_error() {
                        return Err(e);
                    }
                }
                Err(e) => {
                    eprintln!(
                        "Run stopped on page {}/{}: {} created, {} updated, {} failed",
                        snapshot.current_page,
                        snapshot.total_pages,
                        snapshot.stats.created,
                        snapshot.stats.updated,
                        snapshot.stats.failed
                    );
                    return Err(e);
                }
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config)?;
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source (WooCommerce): {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(total) = result.source_total_count {
                    println!("    Products: {}", total);
                }
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target (Shopify): {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

/// Load the config file and apply credential overrides from flags/env.
fn load_config(cli: &Cli) -> Result<Config, MigrateError> {
    let content = std::fs::read_to_string(&cli.config).map_err(|e| {
        MigrateError::Config(format!("cannot read {}: {}", cli.config.display(), e))
    })?;
    // Validate only after overrides, so credentials may come from flags or env.
    let mut config = Config::from_yaml_unvalidated(&content)?;

    if let Some(ref key) = cli.consumer_key {
        config.source.consumer_key = key.clone();
    }
    if let Some(ref secret) = cli.consumer_secret {
        config.source.consumer_secret = secret.clone();
    }
    if let Some(ref token) = cli.access_token {
        config.target.access_token = token.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(result: &MigrationResult) {
    let status_msg = match result.status {
        catalog_migrate::RunStatus::Completed => "Migration completed!",
        catalog_migrate::RunStatus::Cancelled => "Migration cancelled.",
        catalog_migrate::RunStatus::Failed => "Migration failed.",
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Pages: {}/{}", result.pages_fetched, result.total_pages);
    println!(
        "  Created: {} | Updated: {} | Failed: {} | Total: {}",
        result.created, result.updated, result.failed, result.total_count
    );
    if let Some(ref err) = result.error {
        println!("  Error: {}", err);
    }
}

/// Write each snapshot as a JSON line until the sender goes away. The last
/// snapshot published before the sender is dropped is always written.
async fn report_progress<W: Write>(mut rx: watch::Receiver<ProgressSnapshot>, mut out: W) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        let line = serde_json::json!({
            "phase": snapshot.phase,
            "page": snapshot.current_page,
            "total_pages": snapshot.total_pages,
            "created": snapshot.stats.created,
            "updated": snapshot.stats.updated,
            "failed": snapshot.stats.failed,
            "total": snapshot.total_count,
            "progress": snapshot.overall_progress(),
        });
        if writeln!(out, "{}", line).is_err() {
            break;
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().try_init().map_err(|e| e.to_string())
    } else {
        subscriber.try_init().map_err(|e| e.to_string())
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Stopping after the current product..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Stopping after the current product..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current product...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
