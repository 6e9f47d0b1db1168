//! Link-speed negotiation.
//!
//! The sensor's line speed is not known up front, so candidate speeds are tried
//! in order until one both opens and delivers a full sample block:
//!
//! ```text
//! Trying(0) -> Trying(1) -> ... -> Succeeded | Exhausted
//!      \____________________________/-> FatalAborted (port/interface rejected)
//! ```
//!
//! Per-candidate failures (speed rejected, open failed, poll failed) are logged
//! and the next candidate is tried. Port and interface configuration does not
//! depend on the speed, so a failure there aborts the whole negotiation.
//!
//! The channel is closed on every path out of a candidate except success, and
//! once more on the terminal failure states (closing is idempotent).

use log::{debug, info, warn};

use crate::device::{OpenChannel, SensorDevice, diagnostic};
use crate::domain::{
    BaudRate, FailureEntry, FailureStage, InterfaceMode, NegotiationOutcome, NegotiationResult,
    SampleSet,
};

/// What to negotiate: fixed link settings plus the ordered candidate speeds.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationPlan<'a> {
    pub port: &'a str,
    pub interface: InterfaceMode,
    pub speeds: &'a [BaudRate],
    pub sample_count: usize,
}

#[derive(Debug)]
enum State {
    Trying(usize),
    Succeeded { speed: BaudRate, samples: SampleSet },
    Exhausted,
    FatalAborted,
}

/// Find the first candidate speed at which the device opens and delivers
/// `plan.sample_count` samples.
///
/// Never fails: every outcome, including exhaustion and fatal configuration
/// errors, is reported through the returned [`NegotiationResult`]. On success
/// the channel is left open.
pub fn negotiate<D: SensorDevice + ?Sized>(
    device: &mut D,
    plan: &NegotiationPlan<'_>,
) -> NegotiationResult {
    let mut failures: Vec<FailureEntry> = Vec::new();
    let mut state = State::Trying(0);

    loop {
        state = match state {
            State::Trying(i) => {
                let Some(&speed) = plan.speeds.get(i) else {
                    state = State::Exhausted;
                    continue;
                };
                if plan.speeds[..i].contains(&speed) {
                    debug!("skipping repeated candidate {speed}");
                    state = State::Trying(i + 1);
                    continue;
                }

                info!("trying {speed} ({}/{})", i + 1, plan.speeds.len());
                match try_candidate(device, plan, speed) {
                    Ok(samples) => State::Succeeded { speed, samples },
                    Err(entry) => {
                        warn!(
                            "{}: {}: {}",
                            entry.speed,
                            entry.stage.display_name(),
                            entry.message
                        );
                        let fatal = entry.stage.is_fatal();
                        failures.push(entry);
                        if fatal {
                            State::FatalAborted
                        } else {
                            State::Trying(i + 1)
                        }
                    }
                }
            }
            State::Succeeded { speed, samples } => {
                info!("link established at {speed} ({} samples)", samples.len());
                return NegotiationResult {
                    outcome: NegotiationOutcome::Succeeded { speed, samples },
                    failures,
                };
            }
            State::Exhausted => {
                device.close();
                warn!("no candidate speed worked ({} failures)", failures.len());
                return NegotiationResult {
                    outcome: NegotiationOutcome::Exhausted,
                    failures,
                };
            }
            State::FatalAborted => {
                device.close();
                return NegotiationResult {
                    outcome: NegotiationOutcome::Aborted,
                    failures,
                };
            }
        };
    }
}

/// Run steps 1-4 for one candidate. The channel is open on `Ok` and closed on `Err`.
fn try_candidate<D: SensorDevice + ?Sized>(
    device: &mut D,
    plan: &NegotiationPlan<'_>,
    speed: BaudRate,
) -> Result<SampleSet, FailureEntry> {
    let failure = |stage: FailureStage, message: String| FailureEntry {
        speed,
        stage,
        message,
    };

    if let Err(e) = device.configure_port(plan.port) {
        let text = device.describe_last_error();
        return Err(failure(
            FailureStage::Configuration,
            format!("port {}: {}", plan.port, diagnostic(&e, &text)),
        ));
    }
    if let Err(e) = device.configure_interface_mode(plan.interface) {
        let text = device.describe_last_error();
        return Err(failure(
            FailureStage::Configuration,
            format!(
                "interface {}: {}",
                plan.interface.display_name(),
                diagnostic(&e, &text)
            ),
        ));
    }

    if let Err(e) = device.configure_speed(speed) {
        let text = device.describe_last_error();
        return Err(failure(FailureStage::SpeedRejected, diagnostic(&e, &text)));
    }

    if let Err(e) = device.open() {
        let text = device.describe_last_error();
        device.close();
        return Err(failure(FailureStage::OpenFailed, diagnostic(&e, &text)));
    }
    let mut channel = OpenChannel::adopt(device);

    let samples = match channel.poll(plan.sample_count) {
        Ok(samples) => samples,
        Err(e) => {
            let text = channel.describe_last_error();
            return Err(failure(FailureStage::PollFailed, diagnostic(&e, &text)));
        }
    };
    if samples.len() != plan.sample_count {
        return Err(failure(
            FailureStage::PollFailed,
            format!(
                "short read: {} of {} samples",
                samples.len(),
                plan.sample_count
            ),
        ));
    }

    channel.keep_open();
    Ok(samples)
}
