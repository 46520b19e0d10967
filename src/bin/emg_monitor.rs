//! emg-monitor: run a synthetic calibration pass and a monitored session

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use emg_pipeline::config::loader::export_config;
use emg_pipeline::hal::{SignalProfile, SimulatorConfig, SyntheticSource};
use emg_pipeline::processing::format_duration;
use emg_pipeline::{CalibrationStep, ConfigLoader, EmgPipeline, PipelineConfig, PipelineError, PipelineResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("emg-monitor error: {err}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "emg-monitor", about = "Synthetic EMG calibration and session monitor")]
struct Cli {
    /// TOML configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calibrate one muscle from the synthetic source, then record a session
    Run(RunArgs),
    /// Write the effective configuration as TOML
    ExportConfig {
        /// Destination file
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Muscle to calibrate and monitor
    #[arg(long, default_value = "bicep-left")]
    muscle: String,

    /// Seed for the synthetic generator
    #[arg(long)]
    seed: Option<u64>,

    /// Samples to collect per calibration step and for the session
    #[arg(long, default_value_t = 10)]
    ticks: u32,
}

impl Cli {
    fn execute(self) -> Result<(), Box<dyn std::error::Error>> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.with_file(path);
        }
        let config = loader.load()?;

        match self.command {
            Command::Run(args) => run(config, args),
            Command::ExportConfig { path } => {
                export_config(&config, &path)?;
                info!(path = %path.display(), "configuration exported");
                Ok(())
            }
        }
    }
}

fn run(mut config: PipelineConfig, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(seed) = args.seed {
        config.simulator.seed = seed;
    }
    let calibration_interval = Duration::from_millis(config.sampling.calibration_interval_ms);
    let session_interval = Duration::from_millis(config.sampling.session_interval_ms);
    let seed = config.simulator.seed;

    let mut pipeline = EmgPipeline::new(config)?;
    let muscle = args.muscle.as_str();

    // calibration pass
    pipeline.begin_placement(muscle)?;
    pipeline.confirm_placement(muscle)?;

    let mut calibration_source = SyntheticSource::new(SimulatorConfig {
        profile: SignalProfile::CalibrationRelaxed,
        interval_ms: calibration_interval.as_millis() as u64,
        seed,
    })?;
    let controls = calibration_source.controls();
    pipeline.attach_source(muscle, &mut calibration_source)?;

    thread::sleep(calibration_interval * args.ticks);
    pipeline.record_relaxed(muscle)?;
    let step = finish_after_hold(&pipeline, muscle)?;
    info!(muscle, ?step, "relaxed baseline captured");

    controls.set_profile(SignalProfile::CalibrationFlexed);
    thread::sleep(calibration_interval * args.ticks);
    pipeline.record_flexed(muscle)?;
    let step = finish_after_hold(&pipeline, muscle)?;
    info!(muscle, ?step, progress = pipeline.calibration_progress(), "flexed baseline captured");
    pipeline.detach_source(muscle);

    let entry = pipeline.get_calibration(muscle)?;
    println!("{}", serde_json::to_string_pretty(&entry)?);

    // monitored session
    pipeline.reset_stats(muscle)?;
    let mut session_source = SyntheticSource::new(SimulatorConfig {
        profile: SignalProfile::Session,
        interval_ms: session_interval.as_millis() as u64,
        seed,
    })?;
    session_source.controls().set_boost(true);

    let (_subscription, readings) = pipeline.subscribe_channel(muscle, args.ticks as usize + 1)?;
    pipeline.start_session(muscle)?;
    pipeline.attach_source(muscle, &mut session_source)?;

    for _ in 0..args.ticks {
        match readings.recv_timeout(session_interval * 4) {
            Ok(reading) => info!(
                muscle,
                raw = reading.raw_value,
                volts = reading.voltage,
                activation = ?reading.activation,
                "reading"
            ),
            Err(_) => break,
        }
    }

    pipeline.stop_session(muscle)?;
    pipeline.shutdown();

    let stats = pipeline.get_stats(muscle)?;
    let zone = pipeline.alert_zone(muscle)?;
    info!(
        muscle,
        duration = %format_duration(stats.duration_seconds as u64),
        peak = stats.peak,
        average = stats.rounded_average(),
        ?zone,
        "session finished"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Wait out the hold window while the source keeps feeding the capture,
/// then commit the captured baseline
fn finish_after_hold(pipeline: &EmgPipeline, muscle: &str) -> PipelineResult<CalibrationStep> {
    loop {
        match pipeline.finish_recording(muscle) {
            Err(PipelineError::RecordingInProgress { remaining_ms, .. }) => {
                thread::sleep(Duration::from_millis(remaining_ms));
            }
            other => return other,
        }
    }
}
