//! `profile-fit` library crate.
//!
//! The binary (`pfit`) is a thin wrapper around this library so that:
//!
//! - link negotiation and fitting are testable without a physical sensor
//! - the fitter can be reused on sample sets from any source
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod device;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod negotiate;
pub mod plot;
pub mod report;
