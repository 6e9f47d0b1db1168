//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (plus `.env` defaults)
//! - constructs the sensor device
//! - runs negotiation + fitting
//! - prints reports/plots

use std::time::Duration;

use clap::Parser;
use log::debug;

use crate::cli::{AcquireArgs, Command, RunArgs, SimulateArgs};
use crate::device::{RangeScale, SerialSensor, SimulatedConfig, SimulatedSensor};
use crate::domain::{BaudRate, RunConfig};
use crate::error::{AppError, EXIT_CONFIG};

pub mod pipeline;

/// Environment variable consulted when `acquire` is run without `--port`.
pub const PORT_ENV: &str = "PFIT_PORT";

/// Entry point for the `pfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Acquire(args) => handle_acquire(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_acquire(args: AcquireArgs) -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let port = match args.port {
        Some(port) => port,
        None => std::env::var(PORT_ENV).map_err(|_| {
            AppError::new(
                EXIT_CONFIG,
                format!("No serial port given (use --port or set {PORT_ENV} in the environment/.env)."),
            )
        })?,
    };

    let config = run_config_from_args(&args.run, port);
    let scale = RangeScale::new(
        [args.raw_min, args.raw_max],
        [args.scaled_min, args.scaled_max],
    )?;

    // The device is released when `device` goes out of scope, on every path.
    let mut device = SerialSensor::new(scale, Duration::from_millis(args.timeout_ms));
    let output = pipeline::run_pipeline(&mut device, &config)?;
    print_output(&output, &config);
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let defaults = SimulatedConfig::default();
    let sim = SimulatedConfig {
        line_speed: args.device_speed,
        max_speed: args.max_speed,
        open_failures: args.open_fail.clone(),
        profile: if args.profile.is_empty() {
            defaults.profile.clone()
        } else {
            args.profile.clone()
        },
        noise_sigma: args.noise,
        seed: args.seed,
        ..defaults
    };
    debug!("simulated sensor: {sim:?}");

    let config = run_config_from_args(&args.run, args.port.clone());
    let mut device = SimulatedSensor::new(sim);
    let output = pipeline::run_pipeline(&mut device, &config)?;
    print_output(&output, &config);
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs, port: String) -> RunConfig {
    let speeds = if args.speeds.is_empty() {
        BaudRate::DEFAULT_CANDIDATES.to_vec()
    } else {
        args.speeds.clone()
    };

    RunConfig {
        port,
        interface: args.interface,
        speeds,
        sample_count: args.samples,
        degree: args.degree,
        eval_points: args.eval.clone(),
        plot: args.plot || !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
    }
}

fn print_output(output: &pipeline::RunOutput, config: &RunConfig) {
    println!(
        "{}",
        crate::report::format_negotiation(&output.negotiation(), config)
    );
    println!(
        "{}",
        crate::report::format_fit_summary(&output.curve, &output.quality)
    );
    println!("{}", crate::report::format_residual_table(&output.rows));

    let evaluations = crate::report::format_evaluations(&output.curve, &config.eval_points);
    if !evaluations.is_empty() {
        println!("{evaluations}");
    }

    if config.plot {
        let residuals = output.curve.residuals(output.input.points());
        let plot = crate::plot::render_ascii_plot(
            &residuals,
            &output.curve,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }
}
