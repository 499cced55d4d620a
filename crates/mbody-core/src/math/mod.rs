//! Mathematical utilities for mbody
//!
//! Implements the XYZ rotation parameterization with its analytic
//! derivatives, and the block helpers used for global assembly.

pub mod blocks;
pub mod rotation;

pub use blocks::*;
pub use rotation::*;
