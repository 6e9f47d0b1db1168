//! Curve fitting.
//!
//! Responsibilities:
//!
//! - derive fit observations from an acquired sample set
//! - fit a least-squares polynomial of a fixed degree
//! - evaluate the fitted curve and summarise its residuals

pub mod input;
pub mod polynomial;

pub use input::*;
pub use polynomial::*;
