// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! CityGrid - Smart-City IoT Network Simulator
//!
//! Headless runner: builds the city from the configuration, starts the
//! periodic ticks and logs what the simulation publishes until Ctrl+C or the
//! requested duration elapses.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use citygrid::{CityEvent, CitySimulation, Config, ScenarioResult, NAME, VERSION};

/// CityGrid - Smart-City IoT Network Simulator
#[derive(Parser, Debug)]
#[command(name = "citygrid")]
#[command(author = "CityGrid Project")]
#[command(version = VERSION)]
#[command(about = "Smart-city IoT network simulation with edge processing and security screening")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Fixed seed for a reproducible city
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    duration: Option<u64>,

    /// Scenario to trigger once the simulation is running
    #[arg(long)]
    scenario: Option<String>,

    /// Print this department's dashboard as JSON on shutdown
    #[arg(long)]
    department: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::from_str(&config.log_level).unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} - Smart-City IoT Network Simulator", NAME, VERSION);
    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config, args))
}

/// Run the simulation without any presentation layer
async fn run_headless(config: Config, args: Args) -> Result<()> {
    let simulation = CitySimulation::new(config);
    let mut events = simulation.subscribe();
    simulation.start()?;

    if let Some(name) = args.scenario.as_deref() {
        match simulation.trigger_scenario(name) {
            ScenarioResult::Emergency(alert) => info!(alert_id = %alert.id, "Scenario fired: {}", alert.description),
            ScenarioResult::Security(alert) => info!(alert_id = %alert.id, "Scenario fired: {}", alert.message),
            ScenarioResult::NoTarget(kind) => warn!("No device qualified for scenario {}", kind),
            ScenarioResult::Unknown(_) => {}
        }
    }

    info!("City simulation running");
    info!("   Press Ctrl+C to shutdown");

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown signal received, cleaning up...");
                break;
            }
            _ = &mut deadline => {
                info!("Run duration elapsed");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => log_event(&event.payload),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    simulation.stop();

    let status = simulation.get_city_status();
    info!(
        devices = status.devices,
        online = status.online_devices,
        active_alerts = status.active_alerts,
        threat = ?status.security_status.overall_threat_level,
        "Final city status"
    );
    info!(
        watts = status.energy_stats.total_consumption_watts,
        cloud_saved_mb = status.energy_stats.cloud_data_saved_mb,
        co2_kg_per_hour = status.energy_stats.co2_reduction_kg_per_hour,
        "Energy"
    );

    if let Some(department) = args.department.as_deref() {
        let dashboard = simulation.department_view(department)?;
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    }

    info!("{} shutdown complete", NAME);
    Ok(())
}

fn log_event(event: &CityEvent) {
    match event {
        CityEvent::CityInitialized(snapshot) => info!(
            devices = snapshot.devices.len(),
            edge_nodes = snapshot.edge_nodes.len(),
            "City initialized"
        ),
        CityEvent::EmergencyAlert(alert) => warn!(
            alert_id = %alert.id,
            device_id = %alert.device_id,
            severity = ?alert.severity,
            "{}",
            alert.description
        ),
        CityEvent::AlertCleared { alert_id } => info!(alert_id = %alert_id, "Alert cleared"),
        CityEvent::DeviceRepaired { device_id } => info!(device_id = %device_id, "Device repaired"),
        CityEvent::EnergyStats(stats) => debug!(
            watts = stats.total_consumption_watts,
            cloud_saved_mb = stats.cloud_data_saved_mb,
            "Energy stats"
        ),
        CityEvent::SecurityStatus(status) => debug!(
            total_alerts = status.total_alerts,
            threat = ?status.overall_threat_level,
            "Security status"
        ),
        CityEvent::DeviceData(_) | CityEvent::EdgeNodesStatus(_) => {}
    }
}
