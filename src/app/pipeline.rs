//! Shared "acquire and fit" pipeline used by every acquisition source.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate config -> negotiate link + poll -> close channel -> fit -> residuals
//!
//! The front-ends (serial, simulated) only differ in which device they construct.

use log::info;

use crate::device::SensorDevice;
use crate::domain::{
    BaudRate, FailureEntry, NegotiationOutcome, NegotiationResult, RunConfig, SampleSet,
};
use crate::error::{AppError, EXIT_CONFIG, EXIT_NEGOTIATION};
use crate::fit::{FitInput, FitQuality, FittedCurve, fit_polynomial};
use crate::negotiate::{NegotiationPlan, negotiate};
use crate::report::{ResidualRow, format_negotiation, residual_rows};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub speed: BaudRate,
    pub samples: SampleSet,
    pub failures: Vec<FailureEntry>,
    pub input: FitInput,
    pub curve: FittedCurve,
    pub quality: FitQuality,
    pub rows: Vec<ResidualRow>,
}

impl RunOutput {
    /// The negotiation view of this run, for reporting.
    pub fn negotiation(&self) -> NegotiationResult {
        NegotiationResult {
            outcome: NegotiationOutcome::Succeeded {
                speed: self.speed,
                samples: self.samples.clone(),
            },
            failures: self.failures.clone(),
        }
    }
}

/// Reject configurations the negotiator or fitter cannot act on.
pub fn validate_config(config: &RunConfig) -> Result<(), AppError> {
    if config.port.trim().is_empty() {
        return Err(AppError::new(EXIT_CONFIG, "Port must not be empty."));
    }
    if config.speeds.is_empty() {
        return Err(AppError::new(EXIT_CONFIG, "At least one candidate speed is required."));
    }
    for (i, speed) in config.speeds.iter().enumerate() {
        if config.speeds[..i].contains(speed) {
            return Err(AppError::new(
                EXIT_CONFIG,
                format!("Candidate speed {speed} is listed more than once."),
            ));
        }
    }
    if config.sample_count == 0 {
        return Err(AppError::new(EXIT_CONFIG, "Sample count must be > 0."));
    }
    if config.sample_count < config.degree + 1 {
        return Err(AppError::new(
            EXIT_CONFIG,
            format!(
                "A degree-{} fit needs at least {} samples, got {}.",
                config.degree,
                config.degree + 1,
                config.sample_count
            ),
        ));
    }
    if let Some(x) = config.eval_points.iter().find(|x| !x.is_finite()) {
        return Err(AppError::new(EXIT_CONFIG, format!("Invalid evaluation point {x}.")));
    }
    Ok(())
}

/// Execute the full pipeline against `device` and return the computed outputs.
///
/// The channel is closed before returning on every path; releasing the device
/// itself is left to its owner.
pub fn run_pipeline<D: SensorDevice + ?Sized>(
    device: &mut D,
    config: &RunConfig,
) -> Result<RunOutput, AppError> {
    validate_config(config)?;

    // 1) Negotiate a working link speed and acquire one sample block.
    let plan = NegotiationPlan {
        port: &config.port,
        interface: config.interface,
        speeds: &config.speeds,
        sample_count: config.sample_count,
    };
    let result = negotiate(device, &plan);

    let report = format_negotiation(&result, config);
    let failures = result.failures.clone();
    let Some((speed, samples)) = result.into_samples() else {
        return Err(AppError::new(EXIT_NEGOTIATION, report.trim_end()));
    };

    // 2) Acquisition is done; nothing else needs the channel.
    device.close();
    info!("acquired {} samples at {speed}", samples.len());

    // 3) Fit the polynomial profile.
    let input = FitInput::from_samples(&samples);
    let curve = fit_polynomial(&input, config.degree)?;
    let quality = curve.quality(input.points());

    // 4) Per-sample residuals.
    let rows = residual_rows(&samples, &curve)?;

    Ok(RunOutput {
        speed,
        samples,
        failures,
        input,
        curve,
        quality,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InterfaceMode;

    fn config() -> RunConfig {
        RunConfig {
            port: "SIM0".to_string(),
            interface: InterfaceMode::Rs422,
            speeds: BaudRate::DEFAULT_CANDIDATES.to_vec(),
            sample_count: 24,
            degree: 4,
            eval_points: Vec::new(),
            plot: false,
            plot_width: 72,
            plot_height: 20,
        }
    }

    #[test]
    fn validate_accepts_reference_scenario() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn validate_rejects_bad_configs() {
        let cases = [
            RunConfig {
                speeds: Vec::new(),
                ..config()
            },
            RunConfig {
                speeds: vec![BaudRate::new(9_600), BaudRate::new(9_600)],
                ..config()
            },
            RunConfig {
                sample_count: 0,
                ..config()
            },
            RunConfig {
                sample_count: 3,
                degree: 5,
                ..config()
            },
            RunConfig {
                port: " ".to_string(),
                ..config()
            },
            RunConfig {
                eval_points: vec![f64::NAN],
                ..config()
            },
        ];
        for case in cases {
            let err = validate_config(&case).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_CONFIG, "{err}");
        }
    }
}
