//! Entry point for the incubator control core.
//!
//! Two subcommands: `run` against the real CO2 serial sensor (every other
//! probe/relay slot is chip-specific and out of scope, so it is filled from
//! `incubator-sim`'s scripted stand-ins, per `hal/mod.rs`'s doc comment),
//! and `sim` against fully scripted, in-memory hardware for smoke-testing
//! the supervisor without any physical sensor attached.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use incubator_host::hal::co2_serial::SerialCo2Probe;
use incubator_host::hal::HalBundle;
use incubator_host::{IncubatorConfig, Supervisor};
use incubator_sim::{
    RecordingRelay, ScriptedCo2Probe, ScriptedHumidityProbe, ScriptedOxygenProbe,
    ScriptedTemperatureProbe,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// A Rust-based incubator control core: five periodic environmental control
/// loops, a persisted setpoint document, and a sample historian.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control core against the real CO2 sensor and scripted stand-ins
    /// for every other probe/relay.
    Run(RunArgs),
    /// Run entirely against scripted, in-memory hardware for a fixed number
    /// of ticks, then print a final snapshot and exit.
    Sim(SimArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the incubator configuration file.
    #[arg(short, long, default_value = "incubator.cfg")]
    config_path: PathBuf,
}

#[derive(Parser, Debug)]
struct SimArgs {
    /// Number of control ticks to run before exiting.
    #[arg(short, long, default_value_t = 10)]
    ticks: u64,

    /// Tick interval in seconds.
    #[arg(long, default_value_t = 1.0)]
    tick_interval_s: f64,

    /// Constant temperature reading (°C) the scripted probe reports.
    #[arg(long, default_value_t = 36.0)]
    temperature: f64,

    /// Constant humidity reading (%) the scripted probe reports.
    #[arg(long, default_value_t = 55.0)]
    humidity: f64,

    /// Constant O2 reading (%) the scripted probe reports.
    #[arg(long, default_value_t = 6.0)]
    o2: f64,

    /// Constant CO2 reading (ppm) the scripted probe reports.
    #[arg(long, default_value_t = 1100.0)]
    co2: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_real(args).await,
        Commands::Sim(args) => run_sim(args).await,
    }
}

/// Loads configuration, opens the real CO2 serial probe, and runs until a
/// shutdown signal arrives.
async fn run_real(args: RunArgs) -> Result<()> {
    info!(path = ?args.config_path, "loading configuration");
    let cfg = IncubatorConfig::load(&args.config_path)?;

    let hal = HalBundle {
        temperature_probe: Box::new(ScriptedTemperatureProbe::constant(37.0)),
        humidity_probe: Box::new(ScriptedHumidityProbe::constant(60.0)),
        oxygen_probe: Box::new(ScriptedOxygenProbe::constant(5.0)),
        co2_probe: Box::new(SerialCo2Probe::new(cfg.co2.port.clone(), cfg.co2.baud_rate)),
        heater_relay: Box::new(RecordingRelay::new("heater")),
        humidifier_relay: Box::new(RecordingRelay::new("humidifier")),
        argon_relay: Box::new(RecordingRelay::new("argon")),
        co2_primary_relay: Box::new(RecordingRelay::new("co2_primary")),
        co2_secondary_relay: Box::new(RecordingRelay::new("co2_secondary")),
        air_pump_relay: Box::new(RecordingRelay::new("air_pump")),
    };

    let supervisor = Supervisor::new(&cfg, hal).await?;
    let handle = supervisor.run();

    info!("incubator control core started");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.shutdown().await;

    Ok(())
}

/// Runs the supervisor entirely against scripted, in-memory hardware: a
/// fresh temp directory backs the state document and historian database so
/// nothing outlives the process.
async fn run_sim(args: SimArgs) -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = IncubatorConfig {
        co2: incubator_host::config::Co2SerialConfig {
            port: String::new(),
            baud_rate: 9600,
        },
        temperature: incubator_host::config::TemperatureConfig {
            kp: 5.0,
            ki: 0.1,
            kd: 0.0,
            safety_limits: None,
        },
        humidity: incubator_host::config::HumidityConfig {
            hysteresis_width: 4.0,
        },
        store: incubator_host::config::StoreConfig {
            state_path: dir.path().join("state.json"),
            historian_db_path: dir.path().join("history.db"),
        },
        log_interval: Duration::from_secs_f64(args.tick_interval_s),
        tick_interval: Duration::from_secs_f64(args.tick_interval_s),
    };

    let hal = HalBundle {
        temperature_probe: Box::new(ScriptedTemperatureProbe::constant(args.temperature)),
        humidity_probe: Box::new(ScriptedHumidityProbe::constant(args.humidity)),
        oxygen_probe: Box::new(ScriptedOxygenProbe::constant(args.o2)),
        co2_probe: Box::new(ScriptedCo2Probe::constant(args.co2)),
        heater_relay: Box::new(RecordingRelay::new("heater")),
        humidifier_relay: Box::new(RecordingRelay::new("humidifier")),
        argon_relay: Box::new(RecordingRelay::new("argon")),
        co2_primary_relay: Box::new(RecordingRelay::new("co2_primary")),
        co2_secondary_relay: Box::new(RecordingRelay::new("co2_secondary")),
        air_pump_relay: Box::new(RecordingRelay::new("air_pump")),
    };

    let supervisor = Supervisor::new(&cfg, hal).await?;
    let handle = supervisor.run();
    handle.set_global_running(true).await;

    for tick in 0..args.ticks {
        tokio::time::sleep(Duration::from_secs_f64(args.tick_interval_s)).await;
        let snapshot = handle.get_snapshot();
        info!(tick, ?snapshot, "sim tick");
    }

    let snapshot = handle.get_snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    handle.shutdown().await;
    Ok(())
}
