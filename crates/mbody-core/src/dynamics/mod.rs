//! Dynamics of the element tree
//!
//! - [`Element`]: one rigid body with its joint and per-step caches
//! - [`MultibodySystem`]: ordering, DOF bookkeeping and global assembly of
//!   mass matrix, Jacobian, force and Coriolis vectors

mod element;
mod system;

pub use element::*;
pub use system::*;
