//! Tree node of a multibody system
//!
//! An element is one rigid body: mass, inertia about its center of gravity,
//! a frame arena and the joint attaching it to its parent. During a step it
//! caches the local rotation of its joint and the composed kinematics of its
//! joint base frame and of its own origin.
//!
//! Locked DOF are removed by the keep matrix K (6×k, one 1 per column):
//!
//! ```text
//! M_local = Kᵀ · diag(m·I₃, I) · K
//! f_local = Kᵀ · [m·g; 0]
//! ```

use nalgebra::{DMatrix, DVector, Matrix3, Matrix3xX, Matrix6, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::kinematics::{
    DofColumn, FrameId, FrameState, Frames, Joint, LocalRotation, LocalState, NUM_DOF,
};
use crate::math::blocks::{add_segment, identity_blocks, insert_block, insert_diagonal_block};
use crate::math::rotation::skew;

/// Rigid body definition plus per-step caches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// Name, unique within a system
    pub name: String,
    /// Mass [kg]
    pub mass: f64,
    /// Inertia about the center of gravity, element frame [kg·m²]
    pub inertia: Matrix3<f64>,
    pub frames: Frames,
    /// Frame at the center of gravity
    pub cog_frame: FrameId,
    pub joint: Joint,

    parent: Option<usize>,
    #[serde(skip)]
    id: usize,
    #[serde(skip)]
    children: Vec<usize>,
    #[serde(skip)]
    cache: ElementCache,
}

/// Quantities derived at setup and refreshed every update
#[derive(Debug, Clone)]
struct ElementCache {
    dof_offset: usize,
    keep: DMatrix<f64>,
    keep_identity: DMatrix<f64>,
    columns: Vec<DofColumn>,

    base_offset: Vector3<f64>,
    base_rotation: Matrix3<f64>,
    /// Origin seen from the follower frame
    origin_offset: Vector3<f64>,
    origin_rotation: Matrix3<f64>,
    cog_offset: Vector3<f64>,

    local_state: LocalState,
    local_rotation: LocalRotation,
    base: FrameState,
    state: FrameState,
}

impl Default for ElementCache {
    fn default() -> Self {
        Self {
            dof_offset: 0,
            keep: DMatrix::zeros(NUM_DOF, 0),
            keep_identity: DMatrix::zeros(3 * NUM_DOF, 0),
            columns: Vec::new(),
            base_offset: Vector3::zeros(),
            base_rotation: Matrix3::identity(),
            origin_offset: Vector3::zeros(),
            origin_rotation: Matrix3::identity(),
            cog_offset: Vector3::zeros(),
            local_state: LocalState::zeros(),
            local_rotation: LocalRotation::identity(),
            base: FrameState::root(0),
            state: FrameState::root(0),
        }
    }
}

/// Stacked unit axes selecting the translational (or rotational) half of a 6-DOF block
fn selection(rotational: bool) -> DVector<f64> {
    DVector::from_fn(3 * NUM_DOF, |i, _| {
        let (block, component) = (i / 3, i % 3);
        let in_half = if rotational { block >= 3 } else { block < 3 };
        if in_half && block % 3 == component {
            1.0
        } else {
            0.0
        }
    })
}

impl Element {
    pub fn new(name: impl Into<String>, mass: f64, inertia: Matrix3<f64>, frames: Frames, joint: Joint) -> Self {
        Self {
            name: name.into(),
            mass,
            inertia,
            frames,
            cog_frame: FrameId::ORIGIN,
            joint,
            parent: None,
            id: 0,
            children: Vec::new(),
            cache: ElementCache::default(),
        }
    }

    /// Attach to the element at `parent` in the collection handed to the system
    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_cog_frame(mut self, cog_frame: FrameId) -> Self {
        self.cog_frame = cog_frame;
        self
    }

    /// Position in the ordered system
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub(crate) fn set_topology(&mut self, id: usize, parent: Option<usize>, children: Vec<usize>) {
        self.id = id;
        self.parent = parent;
        self.children = children;
    }

    pub(crate) fn set_dof_offset(&mut self, dof_offset: usize) {
        self.cache.dof_offset = dof_offset;
    }

    /// First column of this element's DOF in the compact vectors
    pub fn dof_offset(&self) -> usize {
        self.cache.dof_offset
    }

    pub fn num_free(&self) -> usize {
        self.joint.num_free()
    }

    /// 1 for every mapped slot of the local state, 0 for locked slots
    pub fn state_existence_vector(&self) -> LocalState {
        let flags = self.joint.active_flags();
        LocalState::from_fn(|i, _| if flags[i % NUM_DOF] { 1.0 } else { 0.0 })
    }

    /// Build the scalar (6×k) and identity-block (18×3k) keep matrices
    ///
    /// Only the position half of `existence` is read.
    pub fn create_keep_matrix(&mut self, existence: &LocalState) {
        let active: Vec<usize> = (0..NUM_DOF).filter(|&i| existence[i] != 0.0).collect();

        let mut keep = DMatrix::zeros(NUM_DOF, active.len());
        for (column, &dof) in active.iter().enumerate() {
            keep[(dof, column)] = 1.0;
        }

        self.cache.keep_identity = identity_blocks(&keep);
        self.cache.keep = keep;
    }

    pub fn keep_matrix(&self) -> &DMatrix<f64> {
        &self.cache.keep
    }

    pub fn keep_matrix_identity(&self) -> &DMatrix<f64> {
        &self.cache.keep_identity
    }

    /// Prepare caches for stepping
    ///
    /// `base_frames` is the parent's frame arena (or the system base),
    /// `system_keep` the 6N×n system keep matrix.
    pub(crate) fn setup(&mut self, base_frames: &Frames, system_keep: &DMatrix<f64>) {
        let existence = self.state_existence_vector();
        self.create_keep_matrix(&existence);

        let cache = &mut self.cache;
        cache.base_offset = base_frames.offset_origin(self.joint.base_frame);
        cache.base_rotation = base_frames.rotation_origin(self.joint.base_frame);

        let follower_offset = self.frames.offset_origin(self.joint.follower_frame);
        let follower_rotation = self.frames.rotation_origin(self.joint.follower_frame);
        cache.origin_rotation = follower_rotation.transpose();
        cache.origin_offset = -(cache.origin_rotation * follower_offset);
        cache.cog_offset = self.frames.offset_origin(self.cog_frame);

        let translation = cache.keep_identity.transpose() * selection(false);
        let rotation = cache.keep_identity.transpose() * selection(true);
        cache.columns = (0..self.joint.num_free())
            .map(|j| DofColumn {
                column: cache.dof_offset + j,
                translation: translation.fixed_rows::<3>(3 * j).into_owned(),
                rotation: rotation.fixed_rows::<3>(3 * j).into_owned(),
            })
            .collect();

        let total_dof = system_keep.ncols();
        cache.local_state = LocalState::zeros();
        cache.local_rotation = LocalRotation::identity();
        cache.base = FrameState::root(total_dof);
        cache.state = FrameState::root(total_dof);
    }

    /// Refresh the cached local rotation from a 12-slot local state
    pub fn update_local_rotation_matrices(&mut self, local: &LocalState) {
        self.cache.local_rotation = LocalRotation::from_local_state(local);
    }

    /// Recompute all caches for a new local state
    ///
    /// `parent` is the parent's origin state, or [`FrameState::root`] for a
    /// root element. Parents must be updated before their children.
    pub fn update(&mut self, local: &LocalState, parent: &FrameState) {
        self.cache.local_state = *local;
        self.update_local_rotation_matrices(local);

        let cache = &mut self.cache;
        cache.base = parent.attached(&cache.base_offset, &cache.base_rotation);
        let follower = cache
            .base
            .joint_motion(local, &cache.local_rotation, &cache.columns);
        cache.state = follower.attached(&cache.origin_offset, &cache.origin_rotation);
    }

    pub fn local_state(&self) -> &LocalState {
        &self.cache.local_state
    }

    pub fn local_rotation(&self) -> &LocalRotation {
        &self.cache.local_rotation
    }

    /// Kinematics of the element origin
    pub fn frame_state(&self) -> &FrameState {
        &self.cache.state
    }

    /// Kinematics of the joint base frame
    pub fn base_frame_state(&self) -> &FrameState {
        &self.cache.base
    }

    /// Rotation product of all ancestors up to the joint base frame
    pub fn parent_matrix_product(&self) -> &Matrix3<f64> {
        &self.cache.base.rotation
    }

    pub fn parent_matrix_product_derivative(&self) -> &Matrix3<f64> {
        &self.cache.base.rotation_derivative
    }

    /// Global position of the joint base frame
    pub fn parent_vector(&self) -> &Vector3<f64> {
        &self.cache.base.position
    }

    pub fn parent_vector_derivative(&self) -> &Vector3<f64> {
        &self.cache.base.velocity
    }

    /// Global rotation of the element, local rotation included
    pub fn rotation_product(&self) -> &Matrix3<f64> {
        &self.cache.state.rotation
    }

    pub fn rotation_product_derivative(&self) -> &Matrix3<f64> {
        &self.cache.state.rotation_derivative
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.cache.state.position
    }

    pub fn cog_position(&self) -> Vector3<f64> {
        self.cache.state.point_position(&self.cache.cog_offset)
    }

    pub fn cog_velocity(&self) -> Vector3<f64> {
        self.cache.state.point_velocity(&self.cache.cog_offset)
    }

    /// The joint's own angular velocity, global frame
    pub fn local_angular_velocity(&self) -> Vector3<f64> {
        let rates = self.cache.local_state.fixed_rows::<3>(9).into_owned();
        self.cache.base.rotation * self.cache.local_rotation.rate_matrix() * rates
    }

    /// Total angular velocity, global frame
    pub fn angular_velocity(&self) -> &Vector3<f64> {
        &self.cache.state.angular_velocity
    }

    /// Inertia about the center of gravity, global frame
    pub fn global_inertia(&self) -> Matrix3<f64> {
        let a = &self.cache.state.rotation;
        a * self.inertia * a.transpose()
    }

    /// ω × (I_g · ω)
    pub fn gyroscopic_moment(&self) -> Vector3<f64> {
        let omega = &self.cache.state.angular_velocity;
        skew(omega) * (self.global_inertia() * omega)
    }

    /// 3×n Jacobian of the center-of-gravity velocity
    pub fn translational_jacobian(&self) -> Matrix3xX<f64> {
        self.cache.state.point_jacobian(&self.cache.cog_offset)
    }

    pub fn translational_jacobian_derivative(&self) -> Matrix3xX<f64> {
        self.cache.state.point_jacobian_derivative(&self.cache.cog_offset)
    }

    /// 3×n Jacobian of the angular velocity
    pub fn rotational_jacobian(&self) -> &Matrix3xX<f64> {
        &self.cache.state.rotational_jacobian
    }

    pub fn rotational_jacobian_derivative(&self) -> &Matrix3xX<f64> {
        &self.cache.state.rotational_jacobian_derivative
    }

    /// Write this element's rows (6·id..6·id+6) of the global Jacobian
    pub fn insert_jacobian(&self, global: &mut DMatrix<f64>) {
        let row = NUM_DOF * self.id;
        insert_block(global, row, 0, &self.translational_jacobian());
        insert_block(global, row + 3, 0, self.rotational_jacobian());
    }

    pub fn insert_jacobian_derivative(&self, global: &mut DMatrix<f64>) {
        let row = NUM_DOF * self.id;
        insert_block(global, row, 0, &self.translational_jacobian_derivative());
        insert_block(global, row + 3, 0, self.rotational_jacobian_derivative());
    }

    /// diag(m·I₃, I) in the element frame
    pub fn body_mass_matrix(&self) -> Matrix6<f64> {
        let mut m = Matrix6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Matrix3::identity() * self.mass));
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&self.inertia);
        m
    }

    /// Kᵀ · diag(m·I₃, I) · K
    pub fn local_mass_matrix(&self) -> DMatrix<f64> {
        let keep = &self.cache.keep;
        keep.transpose() * self.body_mass_matrix() * keep
    }

    pub fn insert_mass_matrix(&self, global: &mut DMatrix<f64>) {
        insert_diagonal_block(global, self.cache.dof_offset, &self.local_mass_matrix());
    }

    /// Kᵀ · [m·g; 0]
    pub fn local_force_moment_vector(&self, gravity: &Vector3<f64>) -> DVector<f64> {
        self.project(&Self::weight(self.mass, gravity))
    }

    /// Add the element's weight at its own DOF and the reaction at the parent's
    pub fn insert_force_moment_vector(&self, global: &mut DVector<f64>, gravity: &Vector3<f64>, parent: Option<&Element>) {
        let weight = Self::weight(self.mass, gravity);
        add_segment(global, self.cache.dof_offset, &self.project(&weight));

        if let Some(parent) = parent {
            add_segment(global, parent.dof_offset(), &parent.project(&(-weight)));
        }
    }

    fn weight(mass: f64, gravity: &Vector3<f64>) -> Vector6<f64> {
        let mut f = Vector6::zeros();
        f.fixed_rows_mut::<3>(0).copy_from(&(gravity * mass));
        f
    }

    /// Kᵀ · v for a 6-vector over this element's DOF
    pub fn project(&self, v: &Vector6<f64>) -> DVector<f64> {
        self.cache.keep.transpose() * v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::Dof;
    use approx::assert_relative_eq;

    fn body(joint: Joint) -> Element {
        Element::new("body", 2.0, Matrix3::from_diagonal(&Vector3::new(0.1, 0.2, 0.3)), Frames::new(), joint)
    }

    #[test]
    fn test_keep_matrix_dimensions() {
        let mut element = body(Joint::new(FrameId::ORIGIN, FrameId::ORIGIN, [Dof::Y, Dof::Beta]));
        let existence = element.state_existence_vector();
        assert_eq!(existence.sum(), 4.0);

        element.create_keep_matrix(&existence);
        assert_eq!(element.keep_matrix().shape(), (6, 2));
        assert_eq!(element.keep_matrix_identity().shape(), (18, 6));
        assert_eq!(element.keep_matrix()[(1, 0)], 1.0);
        assert_eq!(element.keep_matrix()[(4, 1)], 1.0);
        assert_eq!(element.keep_matrix().sum(), 2.0);
    }

    #[test]
    fn test_local_mass_matrix_removes_locked_dof() {
        let mut element = body(Joint::new(FrameId::ORIGIN, FrameId::ORIGIN, [Dof::X, Dof::Gamma]));
        element.create_keep_matrix(&element.state_existence_vector());

        let m = element.local_mass_matrix();
        assert_eq!(m.shape(), (2, 2));
        assert_relative_eq!(m[(0, 0)], 2.0);
        assert_relative_eq!(m[(1, 1)], 0.3);
        assert_relative_eq!(m[(0, 1)], 0.0);
    }

    #[test]
    fn test_local_force_vector() {
        let mut element = body(Joint::new(FrameId::ORIGIN, FrameId::ORIGIN, [Dof::Z, Dof::Alpha]));
        element.create_keep_matrix(&element.state_existence_vector());

        let f = element.local_force_moment_vector(&Vector3::new(0.0, 0.0, -9.81));
        assert_eq!(f.len(), 2);
        assert_relative_eq!(f[0], -19.62, epsilon = 1e-12);
        assert_relative_eq!(f[1], 0.0);
    }

    #[test]
    fn test_setup_columns_follow_dof_offset() {
        let mut element = body(Joint::new(FrameId::ORIGIN, FrameId::ORIGIN, [Dof::Gamma, Dof::X]));
        element.set_dof_offset(3);
        element.setup(&Frames::new(), &DMatrix::zeros(12, 5));

        let columns = &element.cache.columns;
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].column, 3);
        assert_eq!(columns[1].column, 4);
        // free DOF are kept in ordinal order: x first, then gamma
        assert_eq!(columns[0].translation, Vector3::x());
        assert_eq!(columns[0].rotation, Vector3::zeros());
        assert_eq!(columns[1].translation, Vector3::zeros());
        assert_eq!(columns[1].rotation, Vector3::z());
    }

    #[test]
    fn test_fixed_element_has_empty_keep() {
        let mut element = body(Joint::fixed());
        element.create_keep_matrix(&element.state_existence_vector());
        assert_eq!(element.keep_matrix().ncols(), 0);
        assert_eq!(element.local_mass_matrix().shape(), (0, 0));
    }

    #[test]
    fn test_selection_vectors() {
        let t = selection(false);
        let r = selection(true);
        assert_eq!(t.sum(), 3.0);
        assert_eq!(r.sum(), 3.0);
        assert_eq!(t[0], 1.0);
        assert_eq!(t[4], 1.0);
        assert_eq!(t[8], 1.0);
        assert_eq!(r[9], 1.0);
        assert_eq!(r[13], 1.0);
        assert_eq!(r[17], 1.0);
    }
}
