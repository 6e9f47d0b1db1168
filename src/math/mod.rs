//! Mathematical utilities: normal-equation assembly and a pivoting linear solver.

pub mod gauss;
pub mod normal;

pub use gauss::*;
pub use normal::*;
