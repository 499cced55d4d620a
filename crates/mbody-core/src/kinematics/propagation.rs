//! Parent-to-child propagation of frame kinematics
//!
//! A [`FrameState`] describes a frame moving with some element: its global
//! rotation `A`, position `r`, their time derivatives, and the Jacobians that
//! map the compact generalized velocities `u` onto its velocity and angular
//! velocity:
//!
//! ```text
//! ṙ = J_O · u        ω = J_R · u
//! ```
//!
//! States are composed down the tree. Rigidly attaching a point `v` (given
//! in the frame's coordinates) to a frame:
//!
//! ```text
//! r_v  = r + A·v
//! J_v  = J_O - [A·v]× · J_R
//! J̇_v  = J̇_O - [Ȧ·v]× · J_R - [A·v]× · J̇_R
//! ```
//!
//! A joint adds its translation `t` and local rotation `R(α, β, γ)` on top of
//! its base frame `B`, and contributes columns only for its own free DOF:
//!
//! ```text
//! A_F = A_B · R            ω_F = ω_B + A_B · G · θ̇
//! r_F = r_B + A_B · t
//! G   = [vee(∂R/∂α·Rᵀ), vee(∂R/∂β·Rᵀ), vee(∂R/∂γ·Rᵀ)]
//! ```

use nalgebra::{Matrix3, Matrix3xX, SVector, Vector3};

use crate::math::rotation::{self, skew, vee};

/// Number of slots of an element's local state (6 positions, 6 velocities)
pub const LOCAL_STATE_SIZE: usize = 12;

/// Local state of one element: DOF positions then DOF velocities
pub type LocalState = SVector<f64, LOCAL_STATE_SIZE>;

/// Cached local rotation of a joint and its derivatives
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRotation {
    /// Single-axis rotations Rx(α), Ry(β), Rz(γ)
    pub axes: [Matrix3<f64>; 3],
    /// R = Rx · Ry · Rz
    pub rotation: Matrix3<f64>,
    /// ∂R/∂α, ∂R/∂β, ∂R/∂γ
    pub partials: [Matrix3<f64>; 3],
    /// d/dt of each partial
    pub partial_derivatives: [Matrix3<f64>; 3],
    /// dR/dt
    pub derivative: Matrix3<f64>,
}

impl Default for LocalRotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl LocalRotation {
    pub fn identity() -> Self {
        Self::new(&Vector3::zeros(), &Vector3::zeros())
    }

    /// Evaluate at the given angles (α, β, γ) and rates
    pub fn new(angles: &Vector3<f64>, rates: &Vector3<f64>) -> Self {
        let axes = [
            rotation::rot_x(angles.x),
            rotation::rot_y(angles.y),
            rotation::rot_z(angles.z),
        ];
        let partials = [
            rotation::partial_alpha(angles),
            rotation::partial_beta(angles),
            rotation::partial_gamma(angles),
        ];
        let partial_derivatives = [
            rotation::partial_alpha_time_derivative(angles, rates),
            rotation::partial_beta_time_derivative(angles, rates),
            rotation::partial_gamma_time_derivative(angles, rates),
        ];
        let derivative = partials[0] * rates.x + partials[1] * rates.y + partials[2] * rates.z;

        Self {
            rotation: axes[0] * axes[1] * axes[2],
            axes,
            partials,
            partial_derivatives,
            derivative,
        }
    }

    /// Evaluate from the angle and rate slots of a local state
    pub fn from_local_state(local: &LocalState) -> Self {
        let angles = local.fixed_rows::<3>(3).into_owned();
        let rates = local.fixed_rows::<3>(9).into_owned();
        Self::new(&angles, &rates)
    }

    /// Euler-rate matrix G: relative angular velocity = G · θ̇ (parent coordinates)
    ///
    /// For a joint rotating about a single axis, the column of that axis is the
    /// unit axis itself, so G · θ̇ reduces to selecting the free angle rate.
    pub fn rate_matrix(&self) -> Matrix3<f64> {
        let rt = self.rotation.transpose();
        Matrix3::from_columns(&[
            vee(&(self.partials[0] * rt)),
            vee(&(self.partials[1] * rt)),
            vee(&(self.partials[2] * rt)),
        ])
    }

    /// dG/dt
    pub fn rate_matrix_derivative(&self) -> Matrix3<f64> {
        let rt = self.rotation.transpose();
        let rdt = self.derivative.transpose();
        Matrix3::from_columns(&[
            vee(&(self.partial_derivatives[0] * rt + self.partials[0] * rdt)),
            vee(&(self.partial_derivatives[1] * rt + self.partials[1] * rdt)),
            vee(&(self.partial_derivatives[2] * rt + self.partials[2] * rdt)),
        ])
    }
}

/// One free DOF of a joint and its column in the compact velocity vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DofColumn {
    /// Column in the system Jacobian (index into the compact velocities)
    pub column: usize,
    /// Unit selection of the translational axis, zero for a rotational DOF
    pub translation: Vector3<f64>,
    /// Unit selection of the rotational axis, zero for a translational DOF
    pub rotation: Vector3<f64>,
}

/// Kinematic state of a frame moving with the tree
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    /// A: frame coordinates → global coordinates
    pub rotation: Matrix3<f64>,
    /// dA/dt
    pub rotation_derivative: Matrix3<f64>,
    /// ω (global frame)
    pub angular_velocity: Vector3<f64>,
    /// r (global frame)
    pub position: Vector3<f64>,
    /// dr/dt
    pub velocity: Vector3<f64>,
    /// J_O: u → ṙ
    pub position_jacobian: Matrix3xX<f64>,
    /// J_R: u → ω
    pub rotational_jacobian: Matrix3xX<f64>,
    pub position_jacobian_derivative: Matrix3xX<f64>,
    pub rotational_jacobian_derivative: Matrix3xX<f64>,
}

impl FrameState {
    /// The fixed global frame, with `total_dof` Jacobian columns
    pub fn root(total_dof: usize) -> Self {
        Self {
            rotation: Matrix3::identity(),
            rotation_derivative: Matrix3::zeros(),
            angular_velocity: Vector3::zeros(),
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            position_jacobian: Matrix3xX::zeros(total_dof),
            rotational_jacobian: Matrix3xX::zeros(total_dof),
            position_jacobian_derivative: Matrix3xX::zeros(total_dof),
            rotational_jacobian_derivative: Matrix3xX::zeros(total_dof),
        }
    }

    /// Global position of a point given in frame coordinates
    pub fn point_position(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.rotation * offset
    }

    pub fn point_velocity(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.velocity + self.rotation_derivative * offset
    }

    pub fn point_jacobian(&self, offset: &Vector3<f64>) -> Matrix3xX<f64> {
        &self.position_jacobian - skew(&(self.rotation * offset)) * &self.rotational_jacobian
    }

    pub fn point_jacobian_derivative(&self, offset: &Vector3<f64>) -> Matrix3xX<f64> {
        &self.position_jacobian_derivative
            - skew(&(self.rotation_derivative * offset)) * &self.rotational_jacobian
            - skew(&(self.rotation * offset)) * &self.rotational_jacobian_derivative
    }

    /// State of a frame rigidly attached at `offset` with relative `rotation`
    pub fn attached(&self, offset: &Vector3<f64>, rotation: &Matrix3<f64>) -> FrameState {
        FrameState {
            rotation: self.rotation * rotation,
            rotation_derivative: self.rotation_derivative * rotation,
            angular_velocity: self.angular_velocity,
            position: self.point_position(offset),
            velocity: self.point_velocity(offset),
            position_jacobian: self.point_jacobian(offset),
            rotational_jacobian: self.rotational_jacobian.clone(),
            position_jacobian_derivative: self.point_jacobian_derivative(offset),
            rotational_jacobian_derivative: self.rotational_jacobian_derivative.clone(),
        }
    }

    /// State of the follower frame of a joint whose base frame is `self`
    ///
    /// `local` supplies the translation (slots 0..3), its rate (6..9) and the
    /// angle rates (9..12); `local_rotation` must be evaluated at the same state.
    pub fn joint_motion(
        &self,
        local: &LocalState,
        local_rotation: &LocalRotation,
        columns: &[DofColumn],
    ) -> FrameState {
        let translation = local.fixed_rows::<3>(0).into_owned();
        let translation_rate = local.fixed_rows::<3>(6).into_owned();
        let angle_rates = local.fixed_rows::<3>(9).into_owned();

        let base_rotation = &self.rotation;
        let base_rotation_derivative = &self.rotation_derivative;
        let g = local_rotation.rate_matrix();
        let g_dot = local_rotation.rate_matrix_derivative();

        // Joint translation is expressed in base frame coordinates
        let arm = base_rotation * translation;
        let arm_rate = base_rotation_derivative * translation + base_rotation * translation_rate;

        let mut position_jacobian =
            &self.position_jacobian - skew(&arm) * &self.rotational_jacobian;
        let mut position_jacobian_derivative = &self.position_jacobian_derivative
            - skew(&arm_rate) * &self.rotational_jacobian
            - skew(&arm) * &self.rotational_jacobian_derivative;
        let mut rotational_jacobian = self.rotational_jacobian.clone();
        let mut rotational_jacobian_derivative = self.rotational_jacobian_derivative.clone();

        let swing = base_rotation * g;
        let swing_rate = base_rotation_derivative * g + base_rotation * g_dot;

        for dof in columns {
            let mut col = position_jacobian.column_mut(dof.column);
            col += base_rotation * dof.translation;
            let mut col = position_jacobian_derivative.column_mut(dof.column);
            col += base_rotation_derivative * dof.translation;
            let mut col = rotational_jacobian.column_mut(dof.column);
            col += swing * dof.rotation;
            let mut col = rotational_jacobian_derivative.column_mut(dof.column);
            col += swing_rate * dof.rotation;
        }

        FrameState {
            rotation: base_rotation * local_rotation.rotation,
            rotation_derivative: base_rotation_derivative * local_rotation.rotation
                + base_rotation * local_rotation.derivative,
            angular_velocity: self.angular_velocity + swing * angle_rates,
            position: self.position + arm,
            velocity: self.velocity + arm_rate,
            position_jacobian,
            rotational_jacobian,
            position_jacobian_derivative,
            rotational_jacobian_derivative,
        }
    }
}
