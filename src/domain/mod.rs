//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - link configuration (`BaudRate`, `InterfaceMode`)
//! - acquired readings (`Sample`, `SampleSet`)
//! - fit inputs/outputs (`FitPoint`, `CoefficientVector`)
//! - negotiation outputs (`NegotiationResult`, `FailureEntry`)

pub mod types;

pub use types::*;
