//! Kinematic model of the element tree
//!
//! Degrees of freedom, coordinate frames, joints, and the propagation of
//! frame kinematics (rotation, position, Jacobians and their derivatives)
//! from a parent element to its children.

mod dof;
mod frame;
mod joint;
mod propagation;

pub use dof::*;
pub use frame::*;
pub use joint::*;
pub use propagation::*;
