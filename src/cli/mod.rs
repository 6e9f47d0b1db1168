//! Command-line parsing for the profile acquisition and fitting tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! negotiation and fitting code.

use clap::{Args, Parser, Subcommand};

use crate::domain::{BaudRate, InterfaceMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pfit",
    version,
    about = "Acquire distance samples over a serial link and fit a polynomial profile"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Negotiate a link with a sensor on a serial port, acquire samples and fit them.
    Acquire(AcquireArgs),
    /// Run the same pipeline against a simulated sensor.
    Simulate(SimulateArgs),
}

/// Options shared by every acquisition source.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Link-layer interface mode of the sensor.
    #[arg(long, value_enum, default_value_t = InterfaceMode::Rs422)]
    pub interface: InterfaceMode,

    /// Candidate speeds tried in order, comma-separated
    /// (default: 9600,19200,38400,57600,115200,230400,460800,921600,1000000).
    #[arg(long, value_delimiter = ',')]
    pub speeds: Vec<BaudRate>,

    /// Number of samples to acquire.
    #[arg(short = 'n', long, default_value_t = 24)]
    pub samples: usize,

    /// Degree of the fitted polynomial.
    #[arg(short = 'd', long, default_value_t = 4)]
    pub degree: usize,

    /// Extra sample positions at which to evaluate the fitted curve, comma-separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub eval: Vec<f64>,

    /// Draw the terminal plot (the default).
    #[arg(long, overrides_with = "no_plot")]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long, overrides_with = "plot")]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for a sensor on a serial port.
#[derive(Debug, Args, Clone)]
pub struct AcquireArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Serial port (e.g. /dev/ttyUSB0 or COM3). Falls back to `PFIT_PORT`.
    #[arg(short = 'p', long)]
    pub port: Option<String>,

    /// Deadline for one poll, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Raw count mapped to `--scaled-min`.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub raw_min: f64,

    /// Raw count mapped to `--scaled-max`.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub raw_max: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub scaled_min: f64,

    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub scaled_max: f64,
}

/// Options for the simulated sensor.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Port name to configure (the simulated sensor only answers on `SIM0`).
    #[arg(short = 'p', long, default_value = "SIM0")]
    pub port: String,

    /// Speed the simulated sensor actually transmits at.
    #[arg(long, default_value = "115200")]
    pub device_speed: BaudRate,

    /// Highest speed the simulated sensor accepts.
    #[arg(long, default_value = "921600")]
    pub max_speed: BaudRate,

    /// Speeds at which the simulated sensor does not answer on open, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub open_fail: Vec<BaudRate>,

    /// Profile coefficients (c0,c1,...) in scaled units per power of the sample index.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub profile: Vec<f64>,

    /// Standard deviation of the measurement noise.
    #[arg(long, default_value_t = 0.002)]
    pub noise: f64,

    /// Random seed for the measurement noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_with_lists() {
        let cli = Cli::parse_from([
            "pfit",
            "simulate",
            "--speeds",
            "9600,115200",
            "--profile",
            "1.5,-0.25",
            "--eval=-1,30",
            "-d",
            "1",
        ]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(
            args.run.speeds,
            vec![BaudRate::new(9_600), BaudRate::new(115_200)]
        );
        assert_eq!(args.profile, vec![1.5, -0.25]);
        assert_eq!(args.run.eval, vec![-1.0, 30.0]);
        assert_eq!(args.run.degree, 1);
        assert_eq!(args.run.samples, 24);
        assert_eq!(args.device_speed, BaudRate::new(115_200));
    }

    #[test]
    fn last_plot_flag_wins() {
        let cli = Cli::parse_from(["pfit", "simulate", "--no-plot", "--plot"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert!(args.run.plot);
        assert!(!args.run.no_plot);

        let cli = Cli::parse_from(["pfit", "simulate", "--plot", "--no-plot"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert!(!args.run.plot);
        assert!(args.run.no_plot);
    }

    #[test]
    fn parses_acquire_defaults() {
        let cli = Cli::parse_from(["pfit", "acquire", "--port", "/dev/ttyUSB0"]);
        let Command::Acquire(args) = cli.command else {
            panic!("expected acquire");
        };
        assert_eq!(args.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(args.run.interface, InterfaceMode::Rs422);
        assert!(args.run.speeds.is_empty());
        assert_eq!(args.timeout_ms, 2000);
    }
}
