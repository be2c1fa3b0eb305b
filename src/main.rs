//! Classroom Comfort CLI
//!
//! Environmental forecasting and comfort classification for classrooms.

use clap::{Parser, Subcommand};
use classroom_comfort::{
    collector::{CollectorConfig, EngagementHandle, LineCollector},
    config::Config,
    core::{comfort_score, level_for_score},
    prediction::ForecastSummary,
    stats::PipelineStats,
    Engagement, EnvironmentalValues, PredictionService, RawReading, COMFORT_SCALE, VERSION,
};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "classroom-comfort")]
#[command(version = VERSION)]
#[command(about = "Classroom environment forecasting and comfort classification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read sensor lines and print forecasts as readings arrive
    Run {
        /// File with sensor board output (reads stdin if omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Print a forecast after every N accepted readings
        #[arg(long, default_value = "10")]
        every: usize,

        /// Fixed occupancy when no camera is attached
        #[arg(long)]
        occupancy: Option<u32>,

        /// Fixed high-engagement count when no camera is attached
        #[arg(long)]
        high_engagement: Option<u32>,

        /// Fixed low-engagement count when no camera is attached
        #[arg(long)]
        low_engagement: Option<u32>,

        /// Forecast signals, comma separated (overrides config)
        #[arg(long)]
        environmental: Option<String>,

        /// Complementing signals, comma separated (overrides config)
        #[arg(long)]
        complementing: Option<String>,
    },

    /// Forecast from a JSON array of readings
    Forecast {
        /// JSON file containing an array of readings, oldest first
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rule-based comfort score of five sensor values
    Score {
        temperature: f64,
        humidity: f64,
        gas: f64,
        light: f64,
        sound: f64,
    },

    /// Show model and statistics status
    Status,

    /// Display the comfort level scale
    Scale,

    /// Show configuration
    Config,

    /// Serve the HTTP API (requires the server feature)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Refuse to start without valid model artifacts
        #[arg(long)]
        require_models: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            every,
            occupancy,
            high_engagement,
            low_engagement,
            environmental,
            complementing,
        } => {
            let engagement = match (occupancy, high_engagement, low_engagement) {
                (Some(occupancy), Some(high_engagement), Some(low_engagement)) => Some(Engagement {
                    occupancy,
                    high_engagement,
                    low_engagement,
                }),
                (None, None, None) => None,
                _ => {
                    eprintln!(
                        "Error: --occupancy, --high-engagement and --low-engagement must be given together"
                    );
                    std::process::exit(1);
                }
            };
            cmd_run(
                input,
                every,
                engagement,
                environmental.as_deref(),
                complementing.as_deref(),
            );
        }
        Commands::Forecast { input, json } => {
            cmd_forecast(&input, json);
        }
        Commands::Score {
            temperature,
            humidity,
            gas,
            light,
            sound,
        } => {
            cmd_score(EnvironmentalValues {
                temperature,
                humidity,
                gas,
                light,
                sound,
            });
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Scale => {
            println!("{COMFORT_SCALE}");
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Serve {
            port,
            require_models,
        } => {
            cmd_serve(port, require_models);
        }
    }
}

fn cmd_run(
    input: Option<PathBuf>,
    every: usize,
    engagement: Option<Engagement>,
    environmental: Option<&str>,
    complementing: Option<&str>,
) {
    println!("Classroom Comfort v{VERSION}");
    println!();

    let config = Config::load()
        .unwrap_or_default()
        .with_signals(environmental, complementing);
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let stats = Arc::new(PipelineStats::with_persistence(config.stats_path()));
    let service = PredictionService::from_config(&config).with_stats(stats.clone());

    let status = service.status();
    println!("Instance ID: {}", status.instance_id);
    println!(
        "  Models: {}",
        if status.models_loaded {
            "loaded"
        } else {
            "not loaded (rule-based scoring only)"
        }
    );
    println!("  Readings needed for a forecast: {}", service.readings_needed());
    println!();

    let source: Box<dyn BufRead + Send> = match input {
        Some(path) => match std::fs::File::open(&path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("Error opening {path:?}: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("Reading sensor lines from stdin. Press Ctrl+C to stop");
            Box::new(BufReader::new(std::io::stdin()))
        }
    };

    let handle = EngagementHandle::new();
    match engagement {
        Some(engagement) => handle.set(engagement),
        None => eprintln!(
            "Warning: No engagement counts given; readings will be rejected as incomplete"
        ),
    }
    let mut collector = LineCollector::new(CollectorConfig::default(), handle);
    if let Err(e) = collector.start(source) {
        eprintln!("Error starting collector: {e}");
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let receiver = collector.receiver().clone();
    let every = every.max(1);
    let mut accepted = 0usize;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(raw) => {
                let reading = match service.submit_reading(raw) {
                    Ok(reading) => reading,
                    Err(e) => {
                        eprintln!("Skipping reading: {e}");
                        continue;
                    }
                };
                accepted += 1;

                let level = level_for_score(comfort_score(&reading.environment()));
                println!(
                    "[{}] T={:.1}°C H={:.1}% G={:.0} L={:.1} S={:.0} | rule-based: {}",
                    reading.timestamp.format("%H:%M:%S"),
                    reading.temperature,
                    reading.humidity,
                    reading.gas,
                    reading.light,
                    reading.sound,
                    level
                );

                if accepted % every == 0 && service.models_loaded() {
                    match service.get_forecast_summary() {
                        Ok(summary) => print_summary(&summary),
                        Err(e) => println!("  Forecast unavailable: {e}"),
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if !collector.is_running() && receiver.is_empty() {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Collector disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping...");
    // A reader blocked on stdin only returns on the next line
    if !collector.is_running() {
        collector.stop();
    }
    if collector.dropped_count() > 0 {
        eprintln!(
            "Warning: {} readings dropped (consumer too slow)",
            collector.dropped_count()
        );
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

fn cmd_forecast(input: &Path, json: bool) {
    let config = Config::load().unwrap_or_default();
    let service = PredictionService::from_config(&config);

    let content = match std::fs::read_to_string(input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {input:?}: {e}");
            std::process::exit(1);
        }
    };
    let readings: Vec<RawReading> = match serde_json::from_str(&content) {
        Ok(readings) => readings,
        Err(e) => {
            eprintln!("Error parsing {input:?}: {e}");
            std::process::exit(1);
        }
    };

    let total = readings.len();
    let mut rejected = 0;
    for raw in readings {
        if service.submit_reading(raw).is_err() {
            rejected += 1;
        }
    }
    if rejected > 0 {
        eprintln!("Warning: {rejected} of {total} readings were incomplete and skipped");
    }

    match service.get_forecast_summary() {
        Ok(summary) if json => match serde_json::to_string_pretty(&summary) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error serializing summary: {e}");
                std::process::exit(1);
            }
        },
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            eprintln!("Forecast unavailable: {e}");
            std::process::exit(if e.is_recoverable() { 2 } else { 1 });
        }
    }
}

fn cmd_score(values: EnvironmentalValues) {
    let score = comfort_score(&values);
    let level = level_for_score(score);
    println!("Score: {score:.1} / 5.0");
    println!("Comfort level: {} ({})", level, level.code());
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Classroom Comfort Status");
    println!("========================");
    println!();

    let service = PredictionService::from_config(&config);
    let status = service.status();
    println!(
        "Models: {}",
        if status.models_loaded {
            "Loaded ✓"
        } else {
            "Not loaded ✗"
        }
    );
    if let Some(reason) = &status.degraded_reason {
        println!("  Reason: {reason}");
    }
    println!("  Model directory: {:?}", config.model_dir);
    println!();

    println!("Configuration:");
    println!("  Timezone: {}", config.timezone.name());
    println!("  Buffer capacity: {}", config.buffer_capacity);
    println!("  History window: {}", config.history_window);
    println!("  Readings needed: {}", service.readings_needed());
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        let stats = PipelineStats::with_persistence(stats_path);
        let snap = stats.snapshot();
        println!("Cumulative Statistics:");
        println!("  Readings accepted: {}", snap.readings_accepted);
        println!("  Readings rejected: {}", snap.readings_rejected);
        println!("  Forecasts served: {}", snap.forecasts_served);
        println!("  Alerts raised: {}", snap.alerts_raised);
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

#[cfg(feature = "server")]
fn cmd_serve(port: Option<u16>, require_models: bool) {
    use classroom_comfort::server::{run, ServerConfig, ServerState};

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let service = if require_models {
        match PredictionService::from_config_strict(&config) {
            Ok(service) => service,
            Err(e) => {
                eprintln!("Error loading models: {e}");
                std::process::exit(1);
            }
        }
    } else {
        PredictionService::from_config(&config)
    };
    let stats = Arc::new(PipelineStats::with_persistence(config.stats_path()));
    let service = Arc::new(service.with_stats(stats.clone()));
    let state = Arc::new(ServerState::new(service, EngagementHandle::new()));
    let server_config = ServerConfig::new(port.unwrap_or(config.server_port));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };

    let result: anyhow::Result<()> = runtime.block_on(async move {
        let (addr, shutdown_tx) = run(server_config, state).await?;
        println!("Listening on http://{addr}");
        println!("Press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(());
        Ok(())
    });

    if let Err(e) = result {
        eprintln!("Server error: {e}");
    }
    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }
    println!("{}", stats.summary());
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: Option<u16>, _require_models: bool) {
    eprintln!("Error: this build does not include the HTTP server (enable the server feature)");
    std::process::exit(1);
}

fn print_summary(summary: &ForecastSummary) {
    println!();
    println!(
        "Forecast ({} readings) | comfort: {} ({:.1}% confidence)",
        summary.data_points_used, summary.comfort.level, summary.comfort.confidence
    );
    let p = &summary.predicted;
    let d = &summary.deltas;
    println!("  Temperature: {:.1}°C ({:+.1})", p.temperature, d.temperature);
    println!("  Humidity:    {:.1}% ({:+.1})", p.humidity, d.humidity);
    println!("  Gas:         {:.0} ({:+.0})", p.gas, d.gas);
    println!("  Light:       {:.1} lux ({:+.1})", p.light, d.light);
    println!("  Sound:       {:.0} ({:+.0})", p.sound, d.sound);
    for rec in &summary.recommendations {
        println!("  [{:?}] {}", rec.severity, rec.message);
    }
    println!();
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
