//! Error types.
//!
//! `AppError` is the top-level error carried out of `app::run` (it knows its own
//! process exit code). Component errors are typed so that callers can tell a
//! singular fit apart from a device that went away.

/// Exit code for invalid configuration or usage.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code when no candidate speed produced a sample set.
pub const EXIT_NEGOTIATION: u8 = 3;
/// Exit code when the polynomial fit could not be computed.
pub const EXIT_FIT: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure reported by a sensor device collaborator.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device refused a parameter or operation.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("channel is not open")]
    NotOpen,

    /// No complete reading arrived before the poll deadline.
    #[error("timed out waiting for data")]
    Timeout,

    /// Data arrived but could not be decoded (usually a speed mismatch).
    #[error("undecodable data: {0}")]
    Protocol(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Failure of a least-squares polynomial fit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// The normal equations have no unique solution.
    ///
    /// `column` is the elimination column at which no usable pivot exists.
    #[error("normal equations are singular at column {column} (|pivot| = {pivot:e})")]
    SingularSystem { column: usize, pivot: f64 },

    #[error("sample {index} is not a finite (x, y) pair")]
    NonFiniteInput { index: usize },

    #[error("coefficient {index} of the solution is not finite")]
    NonFiniteSolution { index: usize },
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(EXIT_FIT, format!("Polynomial fit failed: {err}"))
    }
}
