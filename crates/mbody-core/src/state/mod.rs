//! Compact state storage
//!
//! A solver integrates only the active degrees of freedom. The
//! [`StateVector`] exposes that compact array through a fixed 12-slot view
//! per element, so elements never see which of their DOF are locked.

mod vector;

pub use vector::*;
