use signal_extractor::config::AppConfig;
use signal_extractor::feed;
use signal_extractor::pipeline;
use signal_extractor::storage::{CsvSignalWriter, JsonlFailureLog};
use signal_extractor::SignalExtractor;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Extract trade signals from a JSON-lines message feed
#[derive(Debug, Parser)]
#[command(name = "signal-extractor", version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Message feed (JSON lines); `-` reads stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Drop CSV rows older than this many hours before processing
    #[arg(long)]
    retain_hours: Option<i64>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", AppConfig::default_config_json()?);
        return Ok(());
    }

    let config = AppConfig::load_from_file(&args.config)?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    info!("Starting Signal Extractor");
    if Path::new(&args.config).exists() {
        info!("Loaded configuration from: {}", args.config);
    } else {
        warn!("Config file {} not found, running with defaults", args.config);
    }

    let extractor = Arc::new(SignalExtractor::with_config(config.extraction.clone())?);

    let mut signal_sink = CsvSignalWriter::new(&config.output.csv_path)?;
    let mut failure_sink = JsonlFailureLog::new(&config.output.error_log_path)?;

    if let Some(hours) = args.retain_hours {
        signal_sink.cleanup_old_records(chrono::Duration::hours(hours), chrono::Utc::now())?;
    }

    let messages = feed::read_messages_from(&args.input)?;
    let stats = pipeline::run_messages(
        extractor,
        messages,
        config.runtime.concurrency,
        &mut signal_sink,
        &mut failure_sink,
    )
    .await?;

    stats.log_summary();
    info!(
        "CSV now holds {} signals, failure log {} entries",
        signal_sink.signal_count()?,
        failure_sink.failure_count()?
    );
    for (kind, count) in failure_sink.counts_by_kind()? {
        info!("  logged {}: {}", kind, count);
    }
    Ok(())
}
