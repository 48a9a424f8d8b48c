//! Pressplay - GPIO play/pause button for Spotify Connect
//!
//! One press toggles playback on a designated Connect device; a JSON web API
//! drives the same controls from a dashboard.

use anyhow::Result;
use clap::Parser;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pressplay::api::{self, ApiState};
use pressplay::config::AppConfig;
use pressplay::dispatcher::TriggerDispatcher;
use pressplay::input::{select_pin_reader, PinMonitor, TriggerCallback};
use pressplay::schedule::PlaylistSchedule;
use pressplay::spotify::{PlaybackService, SpotifyClient};

/// Pressplay - control Spotify playback from a GPIO button and a web API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,

    /// List available Spotify Connect devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Pressplay v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load(&args.config).await?;

    if args.check_config {
        print_config_report(&config);
        return Ok(());
    }

    // Invalid values are warnings, never fatal
    for warning in config.validate() {
        warn!("Config: {}", warning);
    }

    let spotify = Arc::new(SpotifyClient::new(&config.spotify)?);

    if args.list_devices {
        list_devices_formatted(&spotify).await;
        return Ok(());
    }

    run_app(config, spotify).await
}

async fn run_app(config: AppConfig, spotify: Arc<SpotifyClient>) -> Result<()> {
    // Resolve the configured device up front; failures are logged and the
    // first playback call retries discovery
    if spotify.is_configured() {
        if let Err(e) = spotify.discover_device().await {
            warn!("Device discovery failed: {}", e);
        }
    } else {
        warn!("Spotify not configured - playback commands will fail until credentials are set");
    }

    let playback: Arc<dyn PlaybackService> = spotify;
    let schedule = Arc::new(RwLock::new(PlaylistSchedule::new(config.schedule.clone())));
    let dispatcher = Arc::new(TriggerDispatcher::new(
        Arc::clone(&playback),
        Arc::clone(&schedule),
    ));

    // The monitor thread blocks on each dispatch, serializing trigger
    // handling relative to itself
    let runtime = tokio::runtime::Handle::current();
    let trigger_dispatcher = Arc::clone(&dispatcher);
    let on_trigger: TriggerCallback = Arc::new(move || {
        if let Err(e) = runtime.block_on(trigger_dispatcher.handle_trigger()) {
            warn!("Trigger dispatch failed: {}", e);
        }
    });

    let reader = select_pin_reader(config.gpio.pin);
    let monitor = Arc::new(PinMonitor::new(
        reader,
        std::time::Duration::from_secs_f64(config.gpio.debounce_secs.max(0.0)),
        on_trigger,
    ));
    monitor.start();

    let state = Arc::new(ApiState {
        playback,
        monitor: Arc::clone(&monitor),
        dispatcher,
        schedule,
        pin: config.gpio.pin,
    });

    info!("System started successfully");

    tokio::select! {
        result = api::start_server(state, &config.web.host, config.web.port) => {
            result?;
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutting down...");
    let monitor_stop = Arc::clone(&monitor);
    tokio::task::spawn_blocking(move || monitor_stop.stop()).await?;
    info!("Pressplay shutdown complete");

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

fn print_config_report(config: &AppConfig) {
    use colored::*;

    println!("\n{}", "=== Pressplay Configuration ===".bold().cyan());
    println!("  GPIO pin: {}", config.gpio.pin.to_string().green());
    println!(
        "  Debounce: {}s",
        config.gpio.debounce_secs.to_string().green()
    );
    println!(
        "  Web API: {}",
        format!("{}:{}", config.web.host, config.web.port).green()
    );
    println!(
        "  Device: {}",
        config.spotify.device_name.green()
    );
    println!(
        "  Default volume: {}%",
        config.spotify.volume.to_string().green()
    );
    println!(
        "  Default playlist: {}",
        config
            .spotify
            .default_playlist
            .as_deref()
            .unwrap_or("(none)")
            .green()
    );
    println!(
        "  Schedule periods: {}",
        config.schedule.len().to_string().green()
    );

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("\n{}", "✅ Configuration looks valid".green().bold());
    } else {
        println!("\n{}", "⚠️  Warnings:".yellow().bold());
        for warning in &warnings {
            println!("  - {}", warning.yellow());
        }
    }
}

async fn list_devices_formatted(spotify: &SpotifyClient) {
    use colored::*;

    match spotify.devices().await {
        Ok(devices) if devices.is_empty() => {
            println!(
                "{}",
                "No Spotify devices found. Open a Spotify app somewhere and retry.".yellow()
            );
        }
        Ok(devices) => {
            println!("\n{}", "Available Spotify Connect devices:".bold());
            for device in devices {
                let marker = if device.is_active { "▶" } else { " " };
                println!(
                    "  {} {} ({}) id={}",
                    marker,
                    device.name.green(),
                    device.kind,
                    device.id.as_deref().unwrap_or("restricted").dimmed()
                );
            }
        }
        Err(e) => {
            eprintln!("{} {}", "Failed to list devices:".red(), e);
        }
    }
}
