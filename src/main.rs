use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use spoofwatch::analysis::Detector;
use spoofwatch::config::{Config, LoggingConfig};
use spoofwatch::sink::{CsvDirOutlierSink, FanOutSink};
use spoofwatch::{batch, ingest, report, storage};

#[derive(Parser)]
#[command(
    name = "spoofwatch",
    about = "AIS trajectory analysis for vessel identity and location spoofing",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file [default: $SPOOFWATCH_CONFIG, then ./spoofwatch.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, cluster and classify every vessel in an AIS CSV file
    Classify {
        /// Input CSV (columns t, shipid, lon, lat, speed[, course, ...])
        #[arg(long)]
        input: PathBuf,

        /// Status table output
        #[arg(long, default_value = "spoof_status.csv")]
        output: PathBuf,

        /// Directory for per-vessel outlier CSV files
        #[arg(long)]
        outlier_dir: Option<PathBuf>,

        /// Skip writing outlier CSV files
        #[arg(long)]
        no_outlier_files: bool,

        /// SQLite database for results and outliers
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Drop incomplete and invalid AIS records
    Clean {
        /// Input CSV
        #[arg(long)]
        input: PathBuf,

        /// Cleaned CSV output
        #[arg(long, default_value = "cleaned_data.csv")]
        output: PathBuf,
    },

    /// Start the HTTP API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Classify {
            input,
            output,
            outlier_dir,
            no_outlier_files,
            db,
            json,
        } => {
            tracing::info!(input = %input.display(), "Classifying vessels");

            let records = ingest::read_records_from_path(&input)?;
            let (records, _) = ingest::clean::clean(records, &config.ingest);
            let trajectories = ingest::group_trajectories(&records)?;

            let mut sinks = FanOutSink::new();
            if !no_outlier_files {
                let dir = outlier_dir.unwrap_or_else(|| config.output.outlier_dir.clone());
                sinks.push(Arc::new(CsvDirOutlierSink::new(&dir).with_context(|| {
                    format!("failed to prepare outlier directory {}", dir.display())
                })?));
            }
            let run = match db.or_else(|| config.output.database.clone()) {
                Some(path) => {
                    let pool = storage::open_pool(&path.to_string_lossy())?;
                    let run_id = storage::begin_run(&pool, &input.to_string_lossy(), &config.detector)?;
                    sinks.push(Arc::new(storage::SqliteOutlierSink::new(pool.clone(), run_id)));
                    Some((pool, run_id))
                }
                None => None,
            };

            let mut detector = Detector::new(config.detector.clone());
            if !sinks.is_empty() {
                detector = detector.with_sink(Arc::new(sinks));
            }

            let cancel = Arc::new(AtomicBool::new(false));
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, finishing vessels in flight");
                    on_signal.store(true, Ordering::Relaxed);
                }
            });

            let workers = config.batch.workers;
            let outcome = tokio::task::spawn_blocking(move || {
                batch::classify_fleet(&trajectories, &detector, workers, &cancel)
            })
            .await??;

            let file = std::fs::File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            report::write_status_csv(file, &outcome.results)?;

            if let Some((pool, run_id)) = run {
                storage::save_classifications(&pool, run_id, &outcome.results)?;
                tracing::info!(%run_id, "Stored classification run");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report::status_rows(&outcome.results))?);
            } else {
                println!("\nspoofwatch classification ({} vessels)", outcome.results.len());
                print!("{}", report::render_table(&outcome.results));
                println!(
                    "\nFlagged: {}  Not applicable: {}  Cancelled: {}",
                    outcome.flagged, outcome.skipped, outcome.cancelled
                );
                println!("Status table written to {}\n", output.display());
            }
        }
        Commands::Clean { input, output } => {
            tracing::info!(input = %input.display(), "Cleaning AIS records");
            let records = ingest::read_records_from_path(&input)?;
            let (kept, summary) = ingest::clean::clean(records, &config.ingest);
            let file = std::fs::File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            ingest::write_records(file, &kept)?;
            println!(
                "Kept {} of {} records ({} incomplete, {} invalid movement, {} invalid MMSI) -> {}",
                summary.kept,
                summary.input,
                summary.incomplete,
                summary.invalid_movement,
                summary.invalid_vessel_id,
                output.display()
            );
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            tracing::info!(%bind, "Starting spoofwatch API");
            spoofwatch::serve(&bind, config.detector.clone()).await?;
        }
    }

    Ok(())
}
