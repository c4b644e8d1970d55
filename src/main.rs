//! Ambient Sensor Agent CLI
//!
//! Indoor sensor and outdoor weather aggregation with comfort advice.

use ambient_sensor_agent::{
    config::Config,
    core::clock::format_report_time,
    core::metrics::{describe_dew_point, describe_rain_probability},
    history::{FileHistoryStore, HistoryPruner, PressureHistoryStore, PressureTrendAnalyzer},
    stats::create_shared_stats,
    weather::{OwmClient, WeatherCache, WeatherError},
    ControllerEvent, DataController, ReplayFeed, VERSION,
};
use anyhow::Context;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ambient-sensor")]
#[command(version = VERSION)]
#[command(about = "Indoor sensor and outdoor weather aggregation with comfort advice", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the data controller against a recorded sensor feed
    Run {
        /// JSON Lines file with one sensor payload per line
        #[arg(long)]
        feed: PathBuf,

        /// Seconds between replayed pushes
        #[arg(long, default_value = "5")]
        interval_secs: u64,

        /// Start over after the last payload
        #[arg(long)]
        repeat: bool,

        /// Stamp each payload with the replay time
        #[arg(long)]
        restamp: bool,

        /// Sensor identifier (overrides the configuration)
        #[arg(long)]
        sensor_id: Option<String>,

        /// Serve the latest state over HTTP on this port (requires server feature)
        #[arg(long)]
        serve_port: Option<u16>,
    },

    /// Run one pressure trend analysis over the stored history
    Analyze {
        /// Number of most recent records to compare (defaults to the configuration)
        #[arg(long)]
        window: Option<usize>,
    },

    /// Prune the stored pressure history once
    Prune {
        /// Records to keep (defaults to the configuration)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Append a pressure reading (hPa) to the stored history
    Record {
        pressure: f64,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Run {
            feed,
            interval_secs,
            repeat,
            restamp,
            sensor_id,
            serve_port,
        } => cmd_run(feed, interval_secs, repeat, restamp, sensor_id, serve_port).await,
        Commands::Analyze { window } => cmd_analyze(window).await,
        Commands::Prune { limit } => cmd_prune(limit).await,
        Commands::Record { pressure } => cmd_record(pressure).await,
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ambient_sensor_agent=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn history_store(config: &Config) -> Arc<dyn PressureHistoryStore> {
    Arc::new(FileHistoryStore::in_dir(&config.data_path))
}

async fn cmd_run(
    feed_path: PathBuf,
    interval_secs: u64,
    repeat: bool,
    restamp: bool,
    sensor_id: Option<String>,
    serve_port: Option<u16>,
) -> anyhow::Result<()> {
    println!("Ambient Sensor Agent v{VERSION}");
    println!();

    let mut config = Config::load().context("loading configuration")?;
    if let Some(id) = sensor_id {
        config.sensor_id = id;
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    let tz = config.timezone()?;

    println!("Configuration:");
    println!("  Sensor: {}", config.sensor_path());
    println!("  Feed file: {}", feed_path.display());
    println!("  History: {}", config.data_path.display());
    println!("  Timezone: {tz}");

    let stats = create_shared_stats();
    let feed = ReplayFeed::new(feed_path.clone(), Duration::from_secs(interval_secs))
        .repeat(repeat)
        .restamp(restamp);

    let mut controller =
        DataController::new(config.clone(), Arc::new(feed), history_store(&config))?
            .with_stats(stats.clone());

    match OwmClient::new(config.owm.clone()) {
        Ok(client) => {
            let cache = WeatherCache::new(Arc::new(client), config.weather_ttl)
                .with_stats(stats.clone());
            controller = controller.with_weather(Arc::new(cache));
            println!("  Weather: enabled (TTL {}s)", config.weather_ttl.as_secs());
        }
        Err(WeatherError::MissingApiKey) => {
            println!("  Weather: disabled (set OWM_API_KEY to enable)");
        }
        Err(e) => return Err(e.into()),
    }

    #[cfg(feature = "server")]
    let server = match serve_port {
        Some(port) => {
            use ambient_sensor_agent::server::{run, ServerConfig, ServerState};
            let state = Arc::new(ServerState::new().with_stats(stats.clone()));
            let (addr, shutdown) = run(ServerConfig::new(port), state.clone()).await?;
            println!("  Display bridge: http://{addr}/state");
            Some((state, shutdown))
        }
        None => None,
    };

    #[cfg(not(feature = "server"))]
    if serve_port.is_some() {
        eprintln!("Warning: --serve-port ignored (server feature not enabled at compile time)");
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let (mut subscription, mut events) = controller.start()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopping...");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, tz);
                #[cfg(feature = "server")]
                if let Some((state, _)) = &server {
                    state.apply(&event).await;
                }
            }
        }
    }

    subscription.dispose();

    #[cfg(feature = "server")]
    if let Some((_, shutdown)) = server {
        let _ = shutdown.send(());
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn print_event(event: &ControllerEvent, tz: Tz) {
    match event {
        ControllerEvent::SensorUpdate { snapshot, report } => {
            let current = &snapshot.current;
            println!(
                "[{}] Indoor {:.1}°C {} | {:.0}% {} | {:.1} hPa (sea level {:.1} {})",
                format_report_time(current.timestamp_ms, tz),
                current.temperature,
                report.trends.temperature.icon,
                current.humidity,
                report.trends.humidity.icon,
                current.pressure,
                report.sea_level_pressure,
                report.trends.sea_level_pressure.icon,
            );
            if let Some(dew) = report.dew_point {
                println!("    Dew point {dew:.1}°C: {}", describe_dew_point(dew));
            }
        }
        ControllerEvent::WeatherUpdate { entry, trends } => {
            let now = &entry.current.current;
            let temperature = now
                .temperature
                .map(|t| format!("{t:.1}°C"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "[weather] {} | {} | {} | air quality: {}",
                now.city, now.condition, temperature, entry.current.air_quality.label
            );
            println!(
                "    Rain: next 3h {} | next 6h {} | tomorrow {}",
                describe_rain_probability(now.forecast.next_3h),
                describe_rain_probability(now.forecast.next_6h),
                describe_rain_probability(now.forecast.tomorrow),
            );
            if let Some(trends) = trends {
                println!(
                    "    Since last fetch: temperature {} | pressure {}",
                    trends.temperature.message, trends.pressure.message
                );
            }
        }
        ControllerEvent::Connectivity(status) => {
            if status.is_offline {
                println!("[status] Sensor offline (last update {})", status.last_update);
            }
        }
        ControllerEvent::Recommendations(cards) => {
            for card in cards {
                println!("    {} [{}] {}", card.icon, card.level, card.message);
            }
        }
        ControllerEvent::PressureTrend(result) => {
            println!("[pressure] [{}] {}", result.level, result.message);
        }
    }
}

async fn cmd_analyze(window: Option<usize>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let window = window.unwrap_or(config.pressure_window_hours);

    let analyzer = PressureTrendAnalyzer::new(history_store(&config));
    let result = analyzer.analyze(window).await;

    println!("Pressure trend over the last {window} records");
    match result.delta {
        Some(delta) => println!("  Change: {delta:+.2} hPa"),
        None => println!("  Change: -"),
    }
    println!("  Level: {}", result.level);
    println!("  {} {}", result.icon, result.message);
    Ok(())
}

async fn cmd_prune(limit: Option<usize>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let limit = limit.unwrap_or(config.pressure_retention_limit);
    let store = history_store(&config);

    let pruner = HistoryPruner::new(Arc::clone(&store));
    let deleted = pruner.prune(limit).await?;
    let remaining = store.count().await?;

    println!("Removed {deleted} records, {remaining} remaining (limit {limit}).");
    Ok(())
}

async fn cmd_record(pressure: f64) -> anyhow::Result<()> {
    if !pressure.is_finite() || pressure <= 0.0 {
        anyhow::bail!("pressure must be a positive number of hPa");
    }
    let config = Config::load()?;
    let store = history_store(&config);
    let key = store.append(pressure).await?;
    println!("Recorded {pressure:.2} hPa (record {key}).");
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration file: {:?}", Config::config_path());
    println!();
    println!("  Sensor: {}", config.sensor_path());
    println!("  Disconnect threshold: {}s", config.disconnect_threshold.as_secs());
    println!("  Weather TTL: {}s", config.weather_ttl.as_secs());
    println!("  Weather refresh: {}s", config.weather_refresh_interval.as_secs());
    println!("  Pressure retention: {} records", config.pressure_retention_limit);
    println!("  Pressure window: {} hours", config.pressure_window_hours);
    println!("  Default altitude: {} m", config.default_altitude_m);
    println!("  Timezone: {}", config.timezone);
    println!("  Weather API: {}", config.owm.base_url);
    println!(
        "  API key: {}",
        if config.owm.api_key.is_some() { "set" } else { "not set" }
    );
    println!("  Data path: {:?}", config.data_path);
    Ok(())
}
