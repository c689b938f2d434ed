//! pv_daq command line
//!
//! ```bash
//! # Identify the connected board
//! pv_daq --port /dev/ttyACM0 identify
//!
//! # LED sweep from 0 to 3.3 V, 10 repeats per level, live plot
//! pv_daq scan --start 0 --stop 3.3 --count 10 --plot
//!
//! # Solar cell resistance sweep against the simulated board
//! pv_daq --simulate resistances --start 0 --stop 1023
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pv_daq::adapters::SimulatedArduino;
use pv_daq::config::{check_output_volts, Settings, DEFAULT_CONFIG_PATH};
use pv_daq::data::{default_export_path, write_csv};
use pv_daq::experiment::{DiodeExperiment, ResistanceSweep, SweepResult};
use pv_daq::instrument::{ArduinoInstrument, ArduinoVisaDevice};
use pv_daq::measurement::{volts_to_code, AdcCode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Device = Box<dyn ArduinoInstrument>;

/// Jitter of the simulated board, in ADC codes.
const SIMULATED_JITTER_CODES: u16 = 2;

/// Current-voltage sweeps through an Arduino VISA instrument
#[derive(Parser, Debug)]
#[command(name = "pv_daq", version)]
#[command(about = "Record LED and solar cell current-voltage curves")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overrides instrument.port
    #[arg(long, global = true)]
    port: Option<String>,

    /// Use the simulated board instead of a serial port
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the identification string of the board
    Identify,

    /// LED current-voltage sweep with uncertainties
    Scan {
        /// First output voltage (V)
        #[arg(long)]
        start: Option<f64>,

        /// Last output voltage (V), inclusive
        #[arg(long)]
        stop: Option<f64>,

        /// Repeat count per level; one less sample is taken
        #[arg(long)]
        count: Option<u32>,

        /// CSV file to write, a timestamped file in storage.output_dir otherwise
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show the live plot window
        #[arg(long)]
        plot: bool,
    },

    /// Solar cell sweep selecting points above 100 kOhm MOSFET resistance
    Resistances {
        /// First output code
        #[arg(long)]
        start: Option<u16>,

        /// Output code to stop before
        #[arg(long)]
        stop: Option<u16>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_unvalidated(&cli.config)
        .with_context(|| format!("loading configuration from '{}'", cli.config.display()))?;
    if let Some(port) = &cli.port {
        settings.instrument.port = port.clone();
    }
    if cli.simulate {
        settings.instrument.simulate = true;
    }
    settings.validate()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.application.log_level)),
        )
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;

    match cli.command {
        Commands::Identify => runtime.block_on(identify(&settings)),
        Commands::Scan {
            start,
            stop,
            count,
            output,
            plot,
        } => {
            let start =
                check_output_volts("--start", start.unwrap_or(settings.sweep.start_volts))?;
            let stop = check_output_volts("--stop", stop.unwrap_or(settings.sweep.stop_volts))?;
            let (start, stop) = (volts_to_code(start), volts_to_code(stop));
            let count = count.unwrap_or(settings.sweep.count);
            let output =
                output.unwrap_or_else(|| default_export_path(&settings.storage.output_dir));

            if plot {
                scan_with_plot(&runtime, &settings, start, stop, count, output)
            } else {
                runtime.block_on(scan(&settings, start, stop, count, output))
            }
        }
        Commands::Resistances { start, stop } => {
            let start = start.unwrap_or(settings.resistance_sweep.start);
            let stop = stop.unwrap_or(settings.resistance_sweep.stop);
            runtime.block_on(resistances(&settings, start, stop))
        }
        Commands::Config => {
            let text = toml::to_string_pretty(&settings).context("serializing configuration")?;
            println!("{}", text);
            Ok(())
        }
    }
}

async fn open_device(settings: &Settings) -> Result<Device> {
    if settings.instrument.simulate {
        info!("Using simulated Arduino");
        let board = SimulatedArduino::with_jitter(SIMULATED_JITTER_CODES, rand::random());
        let device = ArduinoVisaDevice::with_adapter(board).await?;
        return Ok(Box::new(device));
    }

    let device = ArduinoVisaDevice::open(&settings.instrument)
        .await
        .with_context(|| format!("opening '{}'", settings.instrument.port))?;
    Ok(Box::new(device))
}

async fn identify(settings: &Settings) -> Result<()> {
    let mut experiment = DiodeExperiment::new(open_device(settings).await?);
    println!("{}", experiment.identification().await?);
    experiment.close().await?;
    Ok(())
}

async fn scan(
    settings: &Settings,
    start: AdcCode,
    stop: AdcCode,
    count: u32,
    output: PathBuf,
) -> Result<()> {
    let mut experiment = DiodeExperiment::new(open_device(settings).await?);
    let result = experiment
        .scan_and_calculate_uncertainty(start, stop, count)
        .await;

    let shutdown = shut_down(&mut experiment).await;
    let result = result.context("LED sweep failed")?;
    shutdown?;

    print_sweep(&result);
    save(&output, &result)
}

#[cfg(feature = "gui_egui")]
fn scan_with_plot(
    runtime: &tokio::runtime::Runtime,
    settings: &Settings,
    start: AdcCode,
    stop: AdcCode,
    count: u32,
    output: PathBuf,
) -> Result<()> {
    let experiment = DiodeExperiment::new(runtime.block_on(open_device(settings))?);

    let handle = {
        let _guard = runtime.enter();
        experiment.start_scan(start, stop, count)
    };

    // The window owns the main thread until it is closed.
    if let Err(e) = pv_daq::gui::run_viewer(handle.monitor(), settings.plot.clone(), output.clone())
    {
        tracing::warn!("Plot window failed: {}", e);
    }
    handle.cancel();

    let outcome = runtime.block_on(handle.join())?;
    let mut experiment = outcome.experiment;
    let shutdown = runtime.block_on(shut_down(&mut experiment));
    let result = outcome.result.context("LED sweep failed")?;
    shutdown?;

    if outcome.cancelled {
        tracing::warn!("Sweep stopped early after {} levels", result.len());
    }
    print_sweep(&result);
    save(&output, &result)
}

#[cfg(not(feature = "gui_egui"))]
fn scan_with_plot(
    _runtime: &tokio::runtime::Runtime,
    _settings: &Settings,
    _start: AdcCode,
    _stop: AdcCode,
    _count: u32,
    _output: PathBuf,
) -> Result<()> {
    bail!("--plot needs a build with the 'gui_egui' feature")
}

async fn resistances(settings: &Settings, start: u16, stop: u16) -> Result<()> {
    let mut experiment = DiodeExperiment::new(open_device(settings).await?);
    let sweep = experiment.variable_resistances(start, stop).await;

    let shutdown = shut_down(&mut experiment).await;
    let sweep = sweep.context("resistance sweep failed")?;
    shutdown?;

    print_resistances(&sweep);
    Ok(())
}

/// LED off, then release the port.
async fn shut_down(experiment: &mut DiodeExperiment<Device>) -> Result<()> {
    experiment
        .set_output_to_zero()
        .await
        .context("switching output off")?;
    experiment.close().await.context("closing instrument")?;
    Ok(())
}

fn save(output: &std::path::Path, result: &SweepResult) -> Result<()> {
    if result.is_empty() {
        bail!("sweep produced no points, nothing written");
    }
    write_csv(output, result).with_context(|| format!("writing '{}'", output.display()))?;
    println!("Saved {} points to {}", result.len(), output.display());
    Ok(())
}

fn print_sweep(result: &SweepResult) {
    println!(
        "{:>6} {:>10} {:>12} {:>10} {:>12}",
        "level", "U (V)", "I (A)", "dU (V)", "dI (A)"
    );
    for point in result.points() {
        println!(
            "{:>6} {:>10.4} {:>12.6e} {:>10.4} {:>12.3e}",
            point.level, point.mean_voltage, point.mean_current, point.std_voltage, point.std_current
        );
    }
}

fn print_resistances(sweep: &ResistanceSweep) {
    println!(
        "{} of {} levels above 100 kOhm",
        sweep.selected.len(),
        sweep.resistances.len()
    );
    println!(
        "{:>6} {:>10} {:>12} {:>14}",
        "level", "U (V)", "I (A)", "R (Ohm)"
    );
    for point in &sweep.selected {
        println!(
            "{:>6} {:>10.4} {:>12.6e} {:>14.1}",
            point.level, point.voltage, point.current, point.resistance
        );
    }
}
