//! Multibody system orchestration
//!
//! Owns the element tree and assembles the quantities an equation-of-motion
//! solver consumes. With N elements and n free DOF in total:
//!
//! | quantity                      | shape |
//! |-------------------------------|-------|
//! | mass matrix                   | n×n   |
//! | Jacobian, Jacobian derivative | 6N×n  |
//! | free force vector             | n     |
//! | Coriolis vector               | 6N    |
//!
//! Rows `6·id..6·id+3` of the Jacobian map the compact velocities u onto
//! the velocity of element `id`'s center of gravity, rows `6·id+3..6·id+6`
//! onto its angular velocity, both in the global frame.
//!
//! The Newton–Euler projection
//! ```text
//! Jᵀ·M̄·J · u̇ + Jᵀ·(M̄·J̇·u + g_ω) = Jᵀ·q_e
//! ```
//! is also available through the `generalized_*` methods.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::element::Element;
use crate::error::{Result, SystemError};
use crate::kinematics::{FrameState, Frames, LocalState, LOCAL_STATE_SIZE, NUM_DOF};
use crate::math::blocks::{add_segment, identity_blocks, insert_block, insert_segment};
use crate::state::{StateMapping, StateVector};

/// Lifecycle of a [`MultibodySystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemStage {
    /// Elements handed over, not yet ordered
    Loaded,
    /// Ordered, ids and DOF offsets assigned
    Initialized,
    /// Element caches prepared; ready for per-step updates
    Stepping,
}

/// Tree of elements plus system-wide DOF bookkeeping
#[derive(Debug, Clone)]
pub struct MultibodySystem {
    elements: Vec<Element>,
    gravity: Vector3<f64>,
    base_frames: Frames,
    total_degrees_of_freedom: usize,
    keep: DMatrix<f64>,
    stage: SystemStage,
}

impl MultibodySystem {
    /// Take ownership of an unordered element collection
    ///
    /// Element parents are indices into `elements`.
    pub fn new(elements: Vec<Element>, gravity: Vector3<f64>) -> Self {
        Self {
            elements,
            gravity,
            base_frames: Frames::new(),
            total_degrees_of_freedom: 0,
            keep: DMatrix::zeros(0, 0),
            stage: SystemStage::Loaded,
        }
    }

    /// Replace the frames root joints attach to (default: origin only)
    pub fn with_base_frames(mut self, base_frames: Frames) -> Self {
        self.base_frames = base_frames;
        self
    }

    /// `new`, `initialize_system` and `setup_elements` in one go
    pub fn build(elements: Vec<Element>, gravity: Vector3<f64>) -> Result<Self> {
        let mut system = Self::new(elements, gravity);
        system.initialize_system()?;
        system.setup_elements()?;
        Ok(system)
    }

    pub fn stage(&self) -> SystemStage {
        self.stage
    }

    pub fn gravity(&self) -> &Vector3<f64> {
        &self.gravity
    }

    pub fn base_frames(&self) -> &Frames {
        &self.base_frames
    }

    /// Elements in tree order (parent before child) once initialized
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: usize) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn find_element(&self, name: &str) -> Option<&Element> {
        self.elements
            .iter()
            .find(|element| element.name.eq_ignore_ascii_case(name))
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// n: number of free DOF over all elements
    pub fn total_degrees_of_freedom(&self) -> usize {
        self.total_degrees_of_freedom
    }

    /// System keep matrix (6N×n): a 1 at `(6·id + dof, column)` per free DOF
    pub fn keep_matrix(&self) -> &DMatrix<f64> {
        &self.keep
    }

    /// Identity-block form of the keep matrix (18N×3n)
    pub fn keep_matrix_identity(&self) -> DMatrix<f64> {
        identity_blocks(&self.keep)
    }

    /// Order elements parent-first and assign ids and DOF offsets
    pub fn initialize_system(&mut self) -> Result<()> {
        let count = self.elements.len();

        for (index, element) in self.elements.iter().enumerate() {
            match element.parent() {
                Some(parent) if parent == index => {
                    return Err(SystemError::SelfParent(element.name.clone()));
                }
                Some(parent) if parent >= count => {
                    return Err(SystemError::UnknownParent {
                        element: element.name.clone(),
                        parent,
                        count,
                    });
                }
                _ => {}
            }
        }

        // Repeated selection: place any element whose parent is already placed
        let mut order: Vec<usize> = Vec::with_capacity(count);
        let mut placed = vec![false; count];
        let mut remaining: Vec<usize> = (0..count).collect();
        while !remaining.is_empty() {
            let ready = remaining.iter().position(|&index| {
                self.elements[index]
                    .parent()
                    .map_or(true, |parent| placed[parent])
            });
            match ready {
                Some(position) => {
                    let index = remaining.remove(position);
                    placed[index] = true;
                    order.push(index);
                }
                None => {
                    let names = remaining
                        .iter()
                        .map(|&index| self.elements[index].name.clone())
                        .collect();
                    return Err(SystemError::CyclicTopology(names));
                }
            }
        }

        let mut new_id = vec![0; count];
        for (id, &index) in order.iter().enumerate() {
            new_id[index] = id;
        }

        let mut slots: Vec<Option<Element>> = std::mem::take(&mut self.elements)
            .into_iter()
            .map(Some)
            .collect();
        let mut ordered = Vec::with_capacity(count);
        for &index in &order {
            if let Some(element) = slots[index].take() {
                ordered.push(element);
            }
        }

        let parents: Vec<Option<usize>> = ordered
            .iter()
            .map(|element| element.parent().map(|parent| new_id[parent]))
            .collect();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (id, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(id);
            }
        }

        let mut dof_offset = 0;
        for (id, (element, children)) in ordered.iter_mut().zip(children).enumerate() {
            element.set_topology(id, parents[id], children);
            element.set_dof_offset(dof_offset);
            dof_offset += element.num_free();
        }
        self.elements = ordered;
        self.total_degrees_of_freedom = dof_offset;

        self.validate_frames()?;

        let mut keep = DMatrix::zeros(NUM_DOF * count, dof_offset);
        for element in &self.elements {
            for (j, dof) in element.joint.free_degrees_of_freedom().iter().enumerate() {
                keep[(NUM_DOF * element.id() + dof.index(), element.dof_offset() + j)] = 1.0;
            }
        }
        self.keep = keep;
        self.stage = SystemStage::Initialized;

        debug!(
            elements = count,
            total_dof = self.total_degrees_of_freedom,
            order = ?self.elements.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "initialized multibody system"
        );
        Ok(())
    }

    fn validate_frames(&self) -> Result<()> {
        for element in &self.elements {
            let base_frames = self.parent_frames(element);
            if !base_frames.contains(element.joint.base_frame) {
                return Err(SystemError::UnknownFrame {
                    element: element.name.clone(),
                    role: "base",
                    frame: element.joint.base_frame.index(),
                });
            }
            if !element.frames.contains(element.joint.follower_frame) {
                return Err(SystemError::UnknownFrame {
                    element: element.name.clone(),
                    role: "follower",
                    frame: element.joint.follower_frame.index(),
                });
            }
            if !element.frames.contains(element.cog_frame) {
                return Err(SystemError::UnknownFrame {
                    element: element.name.clone(),
                    role: "center of gravity",
                    frame: element.cog_frame.index(),
                });
            }
        }
        Ok(())
    }

    fn parent_frames(&self, element: &Element) -> &Frames {
        match element.parent() {
            Some(parent) => &self.elements[parent].frames,
            None => &self.base_frames,
        }
    }

    /// Prepare keep matrices, joint geometry and Jacobian columns of every element
    pub fn setup_elements(&mut self) -> Result<()> {
        if self.stage < SystemStage::Initialized {
            return Err(SystemError::InvalidStage {
                expected: SystemStage::Initialized,
                actual: self.stage,
            });
        }

        for id in 0..self.elements.len() {
            let (done, rest) = self.elements.split_at_mut(id);
            let element = &mut rest[0];
            let base_frames = match element.parent() {
                Some(parent) => &done[parent].frames,
                None => &self.base_frames,
            };
            element.setup(base_frames, &self.keep);
            debug!(element = %element.name, id, dof = element.num_free(), "element ready");
        }

        self.stage = SystemStage::Stepping;
        Ok(())
    }

    /// Length of the backing array for [`generate_mappings`](Self::generate_mappings)`(true)`
    pub fn state_len(&self) -> usize {
        2 * self.total_degrees_of_freedom
    }

    /// Per-element slot mappings into the compact state
    ///
    /// DOF slot `d` maps to the element's compact index; with
    /// `include_time_derivatives` slot `d + 6` maps to that index plus n.
    pub fn generate_mappings(&self, include_time_derivatives: bool) -> Vec<StateMapping> {
        let n = self.total_degrees_of_freedom;
        self.elements
            .iter()
            .map(|element| {
                let mut mapping: StateMapping = [None; LOCAL_STATE_SIZE];
                for (j, dof) in element.joint.free_degrees_of_freedom().iter().enumerate() {
                    let index = element.dof_offset() + j;
                    mapping[dof.index()] = Some(index);
                    if include_time_derivatives {
                        mapping[dof.index() + NUM_DOF] = Some(index + n);
                    }
                }
                mapping
            })
            .collect()
    }

    /// Wrap a caller-owned array of [`state_len`](Self::state_len) values
    pub fn state_vector<'a>(&self, values: &'a mut [f64]) -> StateVector<'a> {
        StateVector::new(values, self.generate_mappings(true))
    }

    pub fn state_existence_vector(&self, id: usize) -> LocalState {
        self.elements[id].state_existence_vector()
    }

    /// Existence vectors of all elements stacked (12N)
    pub fn system_state_existence_vector(&self) -> DVector<f64> {
        let mut existence = DVector::zeros(LOCAL_STATE_SIZE * self.elements.len());
        for element in &self.elements {
            insert_segment(&mut existence, LOCAL_STATE_SIZE * element.id(), &element.state_existence_vector());
        }
        existence
    }

    /// Push a new state through the tree, parents first
    ///
    /// Requires [`SystemStage::Stepping`]; the state must carry one mapping
    /// per element.
    pub fn update_elements(&mut self, state: &StateVector<'_>) {
        let root = FrameState::root(self.total_degrees_of_freedom);
        for id in 0..self.elements.len() {
            let local = state.local_state(id);
            let (done, rest) = self.elements.split_at_mut(id);
            let element = &mut rest[0];
            let parent = match element.parent() {
                Some(parent) => done[parent].frame_state(),
                None => &root,
            };
            element.update(&local, parent);
        }
    }

    /// Compact velocity vector u reassembled from the cached local states
    pub fn generalized_velocities(&self) -> DVector<f64> {
        let mut u = DVector::zeros(self.total_degrees_of_freedom);
        for element in &self.elements {
            for (j, dof) in element.joint.free_degrees_of_freedom().iter().enumerate() {
                u[element.dof_offset() + j] = element.local_state()[dof.index() + NUM_DOF];
            }
        }
        u
    }

    /// Block-diagonal n×n mass matrix of the local element mass matrices
    pub fn global_mass_matrix(&self) -> DMatrix<f64> {
        let n = self.total_degrees_of_freedom;
        let mut mass = DMatrix::zeros(n, n);
        self.global_mass_matrix_into(&mut mass);
        mass
    }

    /// Write the mass matrix blocks into a caller-supplied n×n matrix
    pub fn global_mass_matrix_into(&self, mass: &mut DMatrix<f64>) {
        for element in &self.elements {
            element.insert_mass_matrix(mass);
        }
    }

    /// 6N×n Jacobian
    pub fn global_jacobian(&self) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(NUM_DOF * self.elements.len(), self.total_degrees_of_freedom);
        self.global_jacobian_into(&mut jacobian);
        jacobian
    }

    pub fn global_jacobian_into(&self, jacobian: &mut DMatrix<f64>) {
        for element in &self.elements {
            element.insert_jacobian(jacobian);
        }
    }

    /// 6N×n time derivative of the Jacobian
    pub fn global_jacobian_derivative(&self) -> DMatrix<f64> {
        let mut derivative = DMatrix::zeros(NUM_DOF * self.elements.len(), self.total_degrees_of_freedom);
        self.global_jacobian_derivative_into(&mut derivative);
        derivative
    }

    pub fn global_jacobian_derivative_into(&self, derivative: &mut DMatrix<f64>) {
        for element in &self.elements {
            element.insert_jacobian_derivative(derivative);
        }
    }

    /// n-vector of element weights minus the reactions carried by their parents
    pub fn global_free_force_vector(&self) -> DVector<f64> {
        let mut force = DVector::zeros(self.total_degrees_of_freedom);
        self.global_free_force_vector_into(&mut force);
        force
    }

    /// Accumulate the free force vector into a caller-supplied n-vector
    pub fn global_free_force_vector_into(&self, force: &mut DVector<f64>) {
        for element in &self.elements {
            let parent = element.parent().map(|parent| &self.elements[parent]);
            element.insert_force_moment_vector(force, &self.gravity, parent);
        }
    }

    /// 6N Coriolis/centrifugal vector: J̇·u plus ω × (I_g·ω) on the rotational rows
    pub fn coriolis_vector(&self) -> DVector<f64> {
        let mut coriolis = self.global_jacobian_derivative() * self.generalized_velocities();
        for element in &self.elements {
            add_segment(&mut coriolis, NUM_DOF * element.id() + 3, &element.gyroscopic_moment());
        }
        coriolis
    }

    /// 6N×6N block-diagonal body mass matrix diag(m·I₃, I_g) in the global frame
    pub fn body_mass_matrix(&self) -> DMatrix<f64> {
        let size = NUM_DOF * self.elements.len();
        let mut mass = DMatrix::zeros(size, size);
        for element in &self.elements {
            let row = NUM_DOF * element.id();
            insert_block(&mut mass, row, row, &(Matrix3::identity() * element.mass));
            insert_block(&mut mass, row + 3, row + 3, &element.global_inertia());
        }
        mass
    }

    /// Jᵀ·M̄·J
    pub fn generalized_mass_matrix(&self) -> DMatrix<f64> {
        let jacobian = self.global_jacobian();
        jacobian.transpose() * self.body_mass_matrix() * &jacobian
    }

    /// Jᵀ·q_e with q_e the stacked weights [m·g; 0]
    pub fn generalized_force_vector(&self) -> DVector<f64> {
        let mut applied = DVector::zeros(NUM_DOF * self.elements.len());
        for element in &self.elements {
            insert_segment(&mut applied, NUM_DOF * element.id(), &(self.gravity * element.mass));
        }
        self.global_jacobian().transpose() * applied
    }

    /// Jᵀ·(M̄·J̇·u + g_ω)
    pub fn generalized_coriolis_vector(&self) -> DVector<f64> {
        let mut body = self.body_mass_matrix()
            * (self.global_jacobian_derivative() * self.generalized_velocities());
        for element in &self.elements {
            add_segment(&mut body, NUM_DOF * element.id() + 3, &element.gyroscopic_moment());
        }
        self.global_jacobian().transpose() * body
    }
}
