//! Simulated distance sensor.
//!
//! The simulated device behaves like a real serial sensor from the host's point of view:
//!
//! - it only exists on one port name and speaks one interface mode
//! - it rejects speeds above its maximum
//! - it opens at any accepted speed, but only transfers valid frames at its line speed
//!
//! Readings follow a polynomial profile in the sample index plus Gaussian noise and
//! are quantised to integer counts, so a fit of the right degree recovers the profile.

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::device::SensorDevice;
use crate::domain::{BaudRate, InterfaceMode, Sample, SampleSet};
use crate::error::DeviceError;

/// Behaviour of a [`SimulatedSensor`].
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// The only port name the device answers on.
    pub port: String,
    pub interface: InterfaceMode,
    /// Speed the device actually transmits at.
    pub line_speed: BaudRate,
    /// Speeds above this are rejected at configuration time.
    pub max_speed: BaudRate,
    /// Speeds at which opening the channel fails.
    pub open_failures: Vec<BaudRate>,
    /// Profile coefficients (index `i` multiplies `x^i`) in scaled units.
    pub profile: Vec<f64>,
    /// Standard deviation of the additive measurement noise.
    pub noise_sigma: f64,
    /// Scaled units per raw count.
    pub resolution: f64,
    pub seed: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            port: "SIM0".to_string(),
            interface: InterfaceMode::Rs422,
            line_speed: BaudRate::new(115_200),
            max_speed: BaudRate::new(921_600),
            open_failures: Vec::new(),
            profile: vec![25.0, 0.35, -0.04, 0.0015, -0.00002],
            noise_sigma: 0.002,
            resolution: 0.0001,
            seed: 42,
        }
    }
}

/// One call made against the simulated device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    ConfigurePort(String),
    ConfigureInterface(InterfaceMode),
    ConfigureSpeed(BaudRate),
    Open(BaudRate),
    Poll(usize),
    Close { was_open: bool },
}

pub struct SimulatedSensor {
    config: SimulatedConfig,
    rng: StdRng,
    port: Option<String>,
    speed: Option<BaudRate>,
    open: bool,
    last_error: String,
    events: Vec<DeviceEvent>,
}

impl SimulatedSensor {
    pub fn new(config: SimulatedConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            port: None,
            speed: None,
            open: false,
            last_error: String::new(),
            events: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Speed most recently accepted by `configure_speed`.
    pub fn speed(&self) -> Option<BaudRate> {
        self.speed
    }

    /// Every call made against this device, in order.
    pub fn events(&self) -> &[DeviceEvent] {
        &self.events
    }

    fn fail(&mut self, text: impl Into<String>) -> DeviceError {
        let text = text.into();
        self.last_error = text.clone();
        DeviceError::Rejected(text)
    }

    fn profile_at(&self, x: f64) -> f64 {
        self.config
            .profile
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }
}

impl SensorDevice for SimulatedSensor {
    fn configure_port(&mut self, port: &str) -> Result<(), DeviceError> {
        self.events.push(DeviceEvent::ConfigurePort(port.to_string()));
        if port != self.config.port {
            return Err(self.fail(format!("port {port} not found")));
        }
        self.port = Some(port.to_string());
        Ok(())
    }

    fn configure_interface_mode(&mut self, mode: InterfaceMode) -> Result<(), DeviceError> {
        self.events.push(DeviceEvent::ConfigureInterface(mode));
        if mode != self.config.interface {
            return Err(self.fail(format!(
                "interface {} not supported by this sensor",
                mode.display_name()
            )));
        }
        Ok(())
    }

    fn configure_speed(&mut self, speed: BaudRate) -> Result<(), DeviceError> {
        self.events.push(DeviceEvent::ConfigureSpeed(speed));
        if speed > self.config.max_speed {
            return Err(self.fail(format!(
                "{speed} exceeds the maximum of {}",
                self.config.max_speed
            )));
        }
        self.speed = Some(speed);
        Ok(())
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        let Some(speed) = self.speed else {
            return Err(self.fail("speed not configured"));
        };
        self.events.push(DeviceEvent::Open(speed));
        if self.port.is_none() {
            return Err(self.fail("port not configured"));
        }
        if self.config.open_failures.contains(&speed) {
            return Err(self.fail(format!("no response at {speed}")));
        }
        self.open = true;
        Ok(())
    }

    fn poll(&mut self, count: usize) -> Result<SampleSet, DeviceError> {
        self.events.push(DeviceEvent::Poll(count));
        if !self.open {
            self.last_error = "poll on closed channel".to_string();
            return Err(DeviceError::NotOpen);
        }
        if self.speed != Some(self.config.line_speed) {
            self.last_error = "frame checksum mismatch".to_string();
            return Err(DeviceError::Protocol(format!(
                "garbled frames at {}",
                self.speed.map(|s| s.to_string()).unwrap_or_default()
            )));
        }

        let noise = Normal::new(0.0, self.config.noise_sigma)
            .map_err(|e| self.fail(format!("noise model: {e}")))?;
        let resolution = self.config.resolution;

        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            let y = self.profile_at(i as f64) + noise.sample(&mut self.rng);
            let raw = (y / resolution)
                .round()
                .clamp(i32::MIN as f64, i32::MAX as f64) as i32;
            samples.push(Sample {
                raw,
                scaled: raw as f64 * resolution,
            });
        }
        Ok(SampleSet::new(samples))
    }

    fn close(&mut self) {
        self.events.push(DeviceEvent::Close {
            was_open: self.open,
        });
        self.open = false;
    }

    fn describe_last_error(&self) -> String {
        self.last_error.clone()
    }
}

impl Drop for SimulatedSensor {
    fn drop(&mut self) {
        if self.open {
            self.close();
        }
        debug!("released simulated sensor on {}", self.config.port);
    }
}
