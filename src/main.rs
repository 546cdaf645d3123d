//! rtspice - real-time circuit simulator
//!
//! Streams raw interleaved f32le audio through a circuit, one channel per
//! input port and one per output port.
//!
//! # Usage
//!
//! ```bash
//! ffmpeg -i input.wav -f f32le -ac 1 -ar 48000 - | rtspice fuzz.json | ffmpeg -f f32le -ac 1 -ar 48000 -i - output.wav
//! ```

use std::path::PathBuf;

use clap::Parser;
use rtspice_core::{
    analysis,
    audio::process_audio,
    circuit::{descriptor::CircuitDescriptor, Circuit},
    diagnostics::TracingDiagnostics,
    error::{Error, Result},
    solver::{FallbackPolicy, Integration, DEFAULT_ABS_TOLERANCE, MAX_ITERATIONS},
    Simulator, SimulatorConfig, DEFAULT_SAMPLE_RATE,
};
use tracing_subscriber::EnvFilter;

/// Real-time circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Circuit descriptor (JSON)
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Sample rate in Hz
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Newton-Raphson iteration limit per sample
    #[arg(long, default_value_t = MAX_ITERATIONS)]
    max_iterations: usize,

    /// Absolute convergence tolerance
    #[arg(long, default_value_t = DEFAULT_ABS_TOLERANCE)]
    tolerance: f64,

    /// Integration rule: trapezoidal or backward-euler
    #[arg(long, default_value = "trapezoidal")]
    integration: Integration,

    /// Output on a failed step: hold or silence
    #[arg(long, default_value = "hold")]
    fallback: FallbackPolicy,

    /// Give each sample at most MARGIN sample periods of solve time
    #[arg(long, value_name = "MARGIN")]
    realtime: Option<f64>,

    /// Start from the zero state instead of the DC operating point
    #[arg(long)]
    no_dc: bool,

    /// Fail unless the circuit has exactly this many input ports
    #[arg(long, value_name = "N")]
    inputs: Option<usize>,

    /// Fail unless the circuit has exactly this many output ports
    #[arg(long, value_name = "N")]
    outputs: Option<usize>,

    /// Print the assembled equations and exit
    #[arg(long)]
    describe: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn check_channels(what: &str, expected: Option<usize>, actual: usize) -> Result<()> {
    match expected {
        Some(n) if n != actual => Err(Error::InvalidSimulationParam {
            message: format!("circuit has {actual} {what} ports, {n} expected"),
        }),
        _ => Ok(()),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let circuit = Circuit::from_descriptor(&CircuitDescriptor::from_file(&args.circuit_file)?)?;

    if args.describe {
        let assembly = analysis::assemble(&circuit, &mut TracingDiagnostics)?;
        print!("{assembly}");
        return Ok(());
    }

    let mut config = SimulatorConfig::new()
        .with_max_iterations(args.max_iterations)
        .with_tolerance(args.tolerance)
        .with_integration(args.integration)
        .with_fallback(args.fallback)
        .with_dc_initialize(!args.no_dc);
    if let Some(margin) = args.realtime {
        config = config.with_deadline_margin(margin);
    }

    let mut simulator = Simulator::with_config(&circuit, args.sample_rate, config)?;
    check_channels("input", args.inputs, simulator.input_count())?;
    check_channels("output", args.outputs, simulator.output_count())?;
    tracing::info!(
        circuit = circuit.name(),
        unknowns = simulator.system().size(),
        inputs = simulator.input_count(),
        outputs = simulator.output_count(),
        "simulation ready"
    );

    let frames = process_audio(&mut simulator)?;
    tracing::info!(frames, "done");
    Ok(())
}
