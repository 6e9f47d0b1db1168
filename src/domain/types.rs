//! Shared domain types.
//!
//! These types are intentionally plain data so they can be:
//!
//! - produced by any device collaborator (serial, simulated)
//! - consumed by the fitter without knowing where samples came from
//! - formatted for terminal output

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use clap::ValueEnum;

/// A candidate link speed in baud (symbols per second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaudRate(u32);

impl BaudRate {
    /// Candidate list used when the caller does not supply one.
    pub const DEFAULT_CANDIDATES: [BaudRate; 9] = [
        BaudRate(9_600),
        BaudRate(19_200),
        BaudRate(38_400),
        BaudRate(57_600),
        BaudRate(115_200),
        BaudRate(230_400),
        BaudRate(460_800),
        BaudRate(921_600),
        BaudRate(1_000_000),
    ];

    pub const fn new(baud: u32) -> Self {
        Self(baud)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Bd", self.0)
    }
}

impl FromStr for BaudRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '_').collect();
        match digits.parse::<u32>() {
            Ok(0) => Err("baud rate must be > 0".to_string()),
            Ok(v) => Ok(BaudRate(v)),
            Err(e) => Err(format!("invalid baud rate `{s}`: {e}")),
        }
    }
}

/// Link-layer interface mode of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InterfaceMode {
    Rs232,
    Rs422,
    Usb,
}

impl InterfaceMode {
    pub fn display_name(self) -> &'static str {
        match self {
            InterfaceMode::Rs232 => "RS232",
            InterfaceMode::Rs422 => "RS422",
            InterfaceMode::Usb => "USB",
        }
    }
}

/// One sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Device counts as transferred on the wire.
    pub raw: i32,
    /// Reading in engineering units (e.g. mm).
    pub scaled: f64,
}

/// A block of readings from one successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
    acquired_at: DateTime<Local>,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            acquired_at: Local::now(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn acquired_at(&self) -> DateTime<Local> {
        self.acquired_at
    }
}

/// One observation fed to the fitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub x: f64,
    pub y: f64,
}

/// Polynomial coefficients, index `i` multiplies `x^i`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientVector(Vec<f64>);

impl CoefficientVector {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self(coefficients)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Polynomial degree (`len - 1`), `None` for an empty vector.
    pub fn degree(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }
}

/// Where in the per-candidate sequence a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Port or interface mode rejected. Aborts the whole negotiation.
    Configuration,
    SpeedRejected,
    OpenFailed,
    PollFailed,
}

impl FailureStage {
    pub fn display_name(self) -> &'static str {
        match self {
            FailureStage::Configuration => "configuration",
            FailureStage::SpeedRejected => "speed rejected",
            FailureStage::OpenFailed => "open failed",
            FailureStage::PollFailed => "poll failed",
        }
    }

    pub fn is_fatal(self) -> bool {
        matches!(self, FailureStage::Configuration)
    }
}

/// One line of the negotiation failure log.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureEntry {
    pub speed: BaudRate,
    pub stage: FailureStage,
    pub message: String,
}

/// Terminal state of a negotiation.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationOutcome {
    /// The channel is left open at `speed`.
    Succeeded { speed: BaudRate, samples: SampleSet },
    /// Every candidate was tried and none worked.
    Exhausted,
    /// Port/interface configuration failed; remaining candidates were skipped.
    Aborted,
}

/// Result of one negotiation attempt, always accompanied by the full log.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationResult {
    pub outcome: NegotiationOutcome,
    pub failures: Vec<FailureEntry>,
}

impl NegotiationResult {
    pub fn succeeded_speed(&self) -> Option<BaudRate> {
        match &self.outcome {
            NegotiationOutcome::Succeeded { speed, .. } => Some(*speed),
            _ => None,
        }
    }

    pub fn samples(&self) -> Option<&SampleSet> {
        match &self.outcome {
            NegotiationOutcome::Succeeded { samples, .. } => Some(samples),
            _ => None,
        }
    }

    pub fn into_samples(self) -> Option<(BaudRate, SampleSet)> {
        match self.outcome {
            NegotiationOutcome::Succeeded { speed, samples } => Some((speed, samples)),
            _ => None,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub port: String,
    pub interface: InterfaceMode,
    pub speeds: Vec<BaudRate>,
    pub sample_count: usize,
    pub degree: usize,

    /// Extra x positions at which to report the fitted curve.
    pub eval_points: Vec<f64>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baud_rate_parses_with_separators() {
        assert_eq!("115_200".parse::<BaudRate>(), Ok(BaudRate::new(115_200)));
        assert_eq!(" 9600 ".parse::<BaudRate>(), Ok(BaudRate::new(9_600)));
        assert!("0".parse::<BaudRate>().is_err());
        assert!("fast".parse::<BaudRate>().is_err());
    }

    #[test]
    fn negotiation_result_accessors_agree() {
        let ok = NegotiationResult {
            outcome: NegotiationOutcome::Succeeded {
                speed: BaudRate::new(115_200),
                samples: SampleSet::new(vec![Sample { raw: 1, scaled: 0.5 }]),
            },
            failures: Vec::new(),
        };
        assert_eq!(ok.succeeded_speed(), Some(BaudRate::new(115_200)));
        assert_eq!(ok.samples().map(SampleSet::len), Some(1));

        let none = NegotiationResult {
            outcome: NegotiationOutcome::Exhausted,
            failures: Vec::new(),
        };
        assert!(none.succeeded_speed().is_none());
        assert!(none.samples().is_none());
    }
}
