//! Sensor device collaborators.
//!
//! The negotiator only talks to a device through [`SensorDevice`]. Two
//! collaborators are provided:
//!
//! - [`SerialSensor`]: a sensor streaming line-oriented readings over a serial port
//! - [`SimulatedSensor`]: a seeded, fault-injecting stand-in used by `pfit simulate`
//!   and by the tests
//!
//! Releasing the device instance is tied to `Drop`, so every exit path of the
//! caller releases it.

use crate::domain::{BaudRate, InterfaceMode, SampleSet};
use crate::error::DeviceError;

pub mod serial;
pub mod sim;

pub use serial::*;
pub use sim::*;

/// Capability set of a sensor device.
pub trait SensorDevice {
    fn configure_port(&mut self, port: &str) -> Result<(), DeviceError>;

    fn configure_interface_mode(&mut self, mode: InterfaceMode) -> Result<(), DeviceError>;

    fn configure_speed(&mut self, speed: BaudRate) -> Result<(), DeviceError>;

    fn open(&mut self) -> Result<(), DeviceError>;

    /// Read exactly `count` samples from an open channel.
    fn poll(&mut self, count: usize) -> Result<SampleSet, DeviceError>;

    /// Close the channel. Closing a channel that is not open is a no-op.
    fn close(&mut self);

    /// Device-side description of the most recent failure (may be empty).
    fn describe_last_error(&self) -> String;
}

/// An open channel that is closed again when dropped.
///
/// Only [`OpenChannel::keep_open`] leaves the channel open, which the
/// negotiator does once a poll has succeeded.
pub struct OpenChannel<'a, D: SensorDevice + ?Sized> {
    device: &'a mut D,
    keep_open: bool,
}

impl<'a, D: SensorDevice + ?Sized> OpenChannel<'a, D> {
    pub fn open(device: &'a mut D) -> Result<Self, DeviceError> {
        device.open()?;
        Ok(Self::adopt(device))
    }

    /// Take charge of a channel that `device.open()` has already opened.
    pub fn adopt(device: &'a mut D) -> Self {
        Self {
            device,
            keep_open: false,
        }
    }

    pub fn poll(&mut self, count: usize) -> Result<SampleSet, DeviceError> {
        self.device.poll(count)
    }

    pub fn describe_last_error(&self) -> String {
        self.device.describe_last_error()
    }

    pub fn keep_open(mut self) {
        self.keep_open = true;
    }
}

impl<D: SensorDevice + ?Sized> Drop for OpenChannel<'_, D> {
    fn drop(&mut self) {
        if !self.keep_open {
            self.device.close();
        }
    }
}

/// Combine an operation error with the device's own description of it.
pub fn diagnostic(err: &DeviceError, device_text: &str) -> String {
    let device_text = device_text.trim();
    if device_text.is_empty() {
        err.to_string()
    } else {
        format!("{err} ({device_text})")
    }
}
