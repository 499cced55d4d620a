//! # mbody Core
//!
//! Kinematics and dynamics of tree-structured multibody systems.
//!
//! Rigid bodies ([`dynamics::Element`]) are connected by joints whose six
//! degrees of freedom are individually free or locked. Each step, a compact
//! state of the free DOF is pushed through the tree and the system assembles
//! what an equation-of-motion solver needs: mass matrix, Jacobian and its
//! time derivative, applied forces and the Coriolis vector.
//!
//! ## Modules
//!
//! - [`math`]: XYZ rotations with analytic derivatives, block assembly helpers
//! - [`kinematics`]: DOF, frames, joints, parent-to-child propagation
//! - [`dynamics`]: elements and the multibody system
//! - [`state`]: compact state vector with per-element slot mappings
//!
//! ## Example
//!
//! ```
//! use mbody_core::dynamics::{Element, MultibodySystem};
//! use mbody_core::kinematics::{Dof, FrameId, Frames, Joint};
//! use nalgebra::{Matrix3, Vector3};
//!
//! let hinge = Joint::new(FrameId::ORIGIN, FrameId::ORIGIN, [Dof::Gamma]);
//! let rod = Element::new("rod", 1.0, Matrix3::from_diagonal(&Vector3::new(0.1, 0.1, 0.5)), Frames::new(), hinge);
//! let mut system = MultibodySystem::build(vec![rod], mbody_core::gravity_enu()).unwrap();
//!
//! let mut values = vec![0.0; system.state_len()];
//! let state = system.state_vector(&mut values);
//! system.update_elements(&state);
//!
//! assert_eq!(system.global_mass_matrix()[(0, 0)], 0.5);
//! ```

pub mod dynamics;
pub mod error;
pub mod kinematics;
pub mod math;
pub mod state;

pub use error::{Result, SystemError};

// Common type aliases
use nalgebra::{Matrix3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// Gravity constant [m/s²]
pub const GRAVITY: f64 = 9.81;

/// Gravity vector with z up
pub fn gravity_enu() -> Vec3 {
    Vec3::new(0.0, 0.0, -GRAVITY)
}
