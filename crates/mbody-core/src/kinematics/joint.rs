//! Joints connecting an element to its parent
//!
//! A joint attaches the element's follower frame to a base frame on the
//! parent (or on the system base for root elements) and splits the six
//! degrees of freedom into free and locked sets. Locked DOF stay at zero.

use serde::{Deserialize, Serialize};

use super::dof::{Dof, NUM_DOF};
use super::frame::FrameId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joint {
    /// Frame on the parent element (or system base) the joint is attached to
    pub base_frame: FrameId,
    /// Frame on the owning element that follows the joint motion
    pub follower_frame: FrameId,
    free: Vec<Dof>,
    locked: Vec<Dof>,
}

impl Joint {
    /// Joint with the given free DOF; every other DOF is locked
    ///
    /// Duplicates in `free` are ignored.
    pub fn new(base_frame: FrameId, follower_frame: FrameId, free: impl IntoIterator<Item = Dof>) -> Self {
        let mut flags = [false; NUM_DOF];
        for dof in free {
            flags[dof.index()] = true;
        }
        Self::from_flags(base_frame, follower_frame, flags)
    }

    /// Joint from per-DOF free flags in ordinal order
    pub fn from_flags(base_frame: FrameId, follower_frame: FrameId, flags: [bool; NUM_DOF]) -> Self {
        let (free, locked): (Vec<Dof>, Vec<Dof>) = Dof::ALL.iter().partition(|dof| flags[dof.index()]);
        Self {
            base_frame,
            follower_frame,
            free,
            locked,
        }
    }

    /// Origin-to-origin joint with all six DOF free
    pub fn free_body() -> Self {
        Self::new(FrameId::ORIGIN, FrameId::ORIGIN, Dof::ALL)
    }

    /// Origin-to-origin joint with every DOF locked
    pub fn fixed() -> Self {
        Self::new(FrameId::ORIGIN, FrameId::ORIGIN, [])
    }

    /// Free DOF in ordinal order
    pub fn free_degrees_of_freedom(&self) -> &[Dof] {
        &self.free
    }

    /// Locked DOF in ordinal order
    pub fn locked_degrees_of_freedom(&self) -> &[Dof] {
        &self.locked
    }

    pub fn is_free(&self, dof: Dof) -> bool {
        self.free.contains(&dof)
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// Per-DOF free flags in ordinal order
    pub fn active_flags(&self) -> [bool; NUM_DOF] {
        let mut flags = [false; NUM_DOF];
        for dof in &self.free {
            flags[dof.index()] = true;
        }
        flags
    }
}
