//! Sensor attached to a serial port.
//!
//! The sensor streams one reading per line as a decimal integer (device counts).
//! Counts are mapped linearly from the configured raw range to engineering units.
//!
//! At the wrong speed the bytes still arrive, they just do not decode; a poll
//! that sees too many undecodable lines fails instead of returning garbage.

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use log::{debug, trace};
use serialport::{ClearBuffer, SerialPort};

use crate::device::SensorDevice;
use crate::domain::{BaudRate, InterfaceMode, Sample, SampleSet};
use crate::error::{AppError, DeviceError, EXIT_CONFIG};

/// Highest speed the host UART driver is asked to run at.
const MAX_HOST_SPEED: BaudRate = BaudRate::new(3_000_000);

/// Per-read timeout; the overall poll deadline is enforced separately.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// A line longer than this without a terminator cannot be a reading.
const MAX_LINE_LEN: usize = 64;

/// Linear mapping from device counts to engineering units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeScale {
    raw_min: f64,
    raw_max: f64,
    scaled_min: f64,
    scaled_max: f64,
}

impl RangeScale {
    pub fn new(raw: [f64; 2], scaled: [f64; 2]) -> Result<Self, AppError> {
        let all_finite = raw.iter().chain(scaled.iter()).all(|v| v.is_finite());
        if !all_finite || raw[0] == raw[1] {
            return Err(AppError::new(
                EXIT_CONFIG,
                format!("Invalid raw range {:?} for scaling.", raw),
            ));
        }
        Ok(Self {
            raw_min: raw[0],
            raw_max: raw[1],
            scaled_min: scaled[0],
            scaled_max: scaled[1],
        })
    }

    pub fn apply(&self, raw: i32) -> f64 {
        (raw as f64 - self.raw_min) / (self.raw_max - self.raw_min)
            * (self.scaled_max - self.scaled_min)
            + self.scaled_min
    }
}

pub struct SerialSensor {
    port_name: Option<String>,
    interface: Option<InterfaceMode>,
    speed: Option<BaudRate>,
    port: Option<Box<dyn SerialPort>>,
    scale: RangeScale,
    poll_timeout: Duration,
    last_error: String,
}

impl SerialSensor {
    pub fn new(scale: RangeScale, poll_timeout: Duration) -> Self {
        Self {
            port_name: None,
            interface: None,
            speed: None,
            port: None,
            scale,
            poll_timeout,
            last_error: String::new(),
        }
    }
}

impl SensorDevice for SerialSensor {
    fn configure_port(&mut self, port: &str) -> Result<(), DeviceError> {
        if port.trim().is_empty() {
            self.last_error = "empty port name".to_string();
            return Err(DeviceError::Rejected("port name is empty".to_string()));
        }
        self.port_name = Some(port.to_string());
        Ok(())
    }

    fn configure_interface_mode(&mut self, mode: InterfaceMode) -> Result<(), DeviceError> {
        // The electrical layer is handled by the adapter; the host only sees a UART.
        self.interface = Some(mode);
        Ok(())
    }

    fn configure_speed(&mut self, speed: BaudRate) -> Result<(), DeviceError> {
        if speed > MAX_HOST_SPEED {
            self.last_error = format!("host UART limit is {MAX_HOST_SPEED}");
            return Err(DeviceError::Rejected(format!("{speed} not supported")));
        }
        self.speed = Some(speed);
        Ok(())
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        if self.port.is_some() {
            return Ok(());
        }
        let (Some(name), Some(speed)) = (self.port_name.as_deref(), self.speed) else {
            self.last_error = "port and speed must be configured before open".to_string();
            return Err(DeviceError::Rejected("device not configured".to_string()));
        };

        match serialport::new(name, speed.get()).timeout(READ_TIMEOUT).open() {
            Ok(port) => {
                debug!(
                    "opened {name} at {speed} ({})",
                    self.interface.map_or("interface unset", InterfaceMode::display_name)
                );
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                self.last_error = e.description.clone();
                Err(DeviceError::Serial(e))
            }
        }
    }

    fn poll(&mut self, count: usize) -> Result<SampleSet, DeviceError> {
        let Some(port) = self.port.as_mut() else {
            self.last_error = "poll on closed channel".to_string();
            return Err(DeviceError::NotOpen);
        };

        // Whatever is buffered was sent before we asked.
        if let Err(e) = port.clear(ClearBuffer::Input) {
            self.last_error = e.description.clone();
            return Err(DeviceError::Serial(e));
        }

        let deadline = Instant::now() + self.poll_timeout;
        match read_readings(port, count, self.scale, deadline) {
            Ok(readings) => {
                if readings.undecodable > 0 {
                    debug!("skipped {} undecodable lines", readings.undecodable);
                }
                Ok(SampleSet::new(readings.samples))
            }
            Err(StreamFailure { error, detail }) => {
                self.last_error = detail;
                Err(error)
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(
                "closed {}",
                self.port_name.as_deref().unwrap_or("<unnamed port>")
            );
        }
    }

    fn describe_last_error(&self) -> String {
        self.last_error.clone()
    }
}

impl Drop for SerialSensor {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug)]
struct Readings {
    samples: Vec<Sample>,
    undecodable: usize,
}

#[derive(Debug)]
struct StreamFailure {
    error: DeviceError,
    detail: String,
}

impl StreamFailure {
    fn new(error: DeviceError, detail: impl Into<String>) -> Self {
        Self {
            error,
            detail: detail.into(),
        }
    }
}

/// Collect `count` readings from a freshly flushed line stream.
///
/// The first terminated line is dropped since it may have started before the
/// flush. Fails once more than `count` lines are undecodable, or when
/// `deadline` passes first.
fn read_readings<R: Read + ?Sized>(
    source: &mut R,
    count: usize,
    scale: RangeScale,
    deadline: Instant,
) -> Result<Readings, StreamFailure> {
    let mut skip_partial = true;
    let mut read_buf = [0u8; 64];
    let mut pending: Vec<u8> = Vec::new();
    let mut samples = Vec::with_capacity(count);
    let mut undecodable = 0usize;

    while samples.len() < count {
        if Instant::now() >= deadline {
            return Err(StreamFailure::new(
                DeviceError::Timeout,
                format!("received {} of {count} readings", samples.len()),
            ));
        }

        let n = match source.read(&mut read_buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => {
                let detail = e.to_string();
                return Err(StreamFailure::new(DeviceError::Io(e), detail));
            }
        };
        pending.extend_from_slice(&read_buf[..n]);

        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            if std::mem::take(&mut skip_partial) {
                continue;
            }
            match decode_line(&line) {
                LineKind::Reading(raw) => samples.push(Sample {
                    raw,
                    scaled: scale.apply(raw),
                }),
                LineKind::Blank => {}
                LineKind::Garbage => {
                    trace!("undecodable line: {:?}", String::from_utf8_lossy(&line));
                    undecodable += 1;
                }
            }
            if samples.len() == count {
                break;
            }
        }

        if pending.len() > MAX_LINE_LEN {
            pending.clear();
            undecodable += 1;
        }
        if undecodable > count {
            return Err(StreamFailure::new(
                DeviceError::Protocol("stream does not decode at this speed".to_string()),
                format!("{undecodable} undecodable lines"),
            ));
        }
    }

    Ok(Readings {
        samples,
        undecodable,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Reading(i32),
    Blank,
    Garbage,
}

fn decode_line(line: &[u8]) -> LineKind {
    let Ok(text) = std::str::from_utf8(line) else {
        return LineKind::Garbage;
    };
    let text = text.trim();
    if text.is_empty() {
        return LineKind::Blank;
    }
    match text.parse::<i32>() {
        Ok(v) => LineKind::Reading(v),
        Err(_) => LineKind::Garbage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Hands out one chunk per read and times out once drained.
    struct Chunks(VecDeque<Vec<u8>>);

    impl Chunks {
        fn new(chunks: &[&[u8]]) -> Self {
            Self(chunks.iter().map(|c| c.to_vec()).collect())
        }
    }

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(mut chunk) = self.0.pop_front() else {
                return Err(io::Error::new(ErrorKind::TimedOut, "no data"));
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.0.push_front(chunk.split_off(n));
            }
            Ok(n)
        }
    }

    fn unit_scale() -> RangeScale {
        RangeScale::new([0.0, 1.0], [0.0, 1.0]).unwrap()
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(50)
    }

    fn raws(readings: &Readings) -> Vec<i32> {
        readings.samples.iter().map(|s| s.raw).collect()
    }

    #[test]
    fn first_line_after_flush_is_discarded() {
        let mut stream = Chunks::new(&[b"7\n10\n2", b"0\n\r\n30\n40\n"]);
        let readings = read_readings(&mut stream, 3, unit_scale(), soon()).unwrap();
        assert_eq!(raws(&readings), vec![10, 20, 30]);
        assert_eq!(readings.undecodable, 0);
    }

    #[test]
    fn readings_are_scaled() {
        let scale = RangeScale::new([0.0, 1000.0], [20.0, 30.0]).unwrap();
        let mut stream = Chunks::new(&[b"\n500\n1000\n"]);
        let readings = read_readings(&mut stream, 2, scale, soon()).unwrap();
        assert!((readings.samples[0].scaled - 25.0).abs() < 1e-12);
        assert!((readings.samples[1].scaled - 30.0).abs() < 1e-12);
    }

    #[test]
    fn garbled_stream_is_a_protocol_failure() {
        let line = b"\x7f?~\n";
        let mut stream = Chunks::new(&[b"\n", line, line, line, line, line, line]);
        let failure = read_readings(&mut stream, 3, unit_scale(), soon()).unwrap_err();
        assert!(matches!(failure.error, DeviceError::Protocol(_)));
        assert_eq!(failure.detail, "4 undecodable lines");
    }

    #[test]
    fn overlong_line_counts_as_undecodable() {
        let long = [b'5'; 70];
        let mut stream = Chunks::new(&[b"\n", &long, b"1\n2\n"]);
        let readings = read_readings(&mut stream, 2, unit_scale(), soon()).unwrap();
        assert_eq!(raws(&readings), vec![1, 2]);
        assert_eq!(readings.undecodable, 1);

        let mut stream = Chunks::new(&[b"\n", &long, &long]);
        let failure = read_readings(&mut stream, 1, unit_scale(), soon()).unwrap_err();
        assert!(matches!(failure.error, DeviceError::Protocol(_)));
    }

    #[test]
    fn stalled_stream_times_out() {
        let mut stream = Chunks::new(&[b"\n1\n2\n"]);
        let failure = read_readings(&mut stream, 5, unit_scale(), soon()).unwrap_err();
        assert!(matches!(failure.error, DeviceError::Timeout));
        assert_eq!(failure.detail, "received 2 of 5 readings");
    }

    #[test]
    fn read_errors_other_than_timeout_fail_the_poll() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))
            }
        }
        let failure = read_readings(&mut Broken, 1, unit_scale(), soon()).unwrap_err();
        assert!(matches!(failure.error, DeviceError::Io(_)));
        assert_eq!(failure.detail, "unplugged");
    }

    #[test]
    fn decode_line_classifies_input() {
        assert_eq!(decode_line(b"  1234\r\n"), LineKind::Reading(1234));
        assert_eq!(decode_line(b"-17\n"), LineKind::Reading(-17));
        assert_eq!(decode_line(b"\r\n"), LineKind::Blank);
        assert_eq!(decode_line(b"1x3\n"), LineKind::Garbage);
        assert_eq!(decode_line(&[0xff, 0xfe, b'\n']), LineKind::Garbage);
    }

    #[test]
    fn range_scale_maps_endpoints() {
        let scale = RangeScale::new([0.0, 1000.0], [20.0, 30.0]).unwrap();
        assert!((scale.apply(0) - 20.0).abs() < 1e-12);
        assert!((scale.apply(1000) - 30.0).abs() < 1e-12);
        assert!((scale.apply(500) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn range_scale_rejects_empty_raw_range() {
        assert!(RangeScale::new([5.0, 5.0], [0.0, 1.0]).is_err());
        assert!(RangeScale::new([0.0, f64::NAN], [0.0, 1.0]).is_err());
    }

    #[test]
    fn poll_before_open_fails_and_close_is_idempotent() {
        let scale = RangeScale::new([0.0, 1.0], [0.0, 1.0]).unwrap();
        let mut sensor = SerialSensor::new(scale, Duration::from_millis(10));
        assert!(matches!(sensor.poll(1), Err(DeviceError::NotOpen)));
        sensor.close();
        sensor.close();
    }

    #[test]
    fn speed_above_host_limit_is_rejected() {
        let scale = RangeScale::new([0.0, 1.0], [0.0, 1.0]).unwrap();
        let mut sensor = SerialSensor::new(scale, Duration::from_millis(10));
        assert!(sensor.configure_speed(BaudRate::new(4_000_000)).is_err());
        assert!(sensor.configure_speed(BaudRate::new(115_200)).is_ok());
    }
}
