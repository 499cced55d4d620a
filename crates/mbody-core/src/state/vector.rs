//! Compact state vector with per-element slot mappings
//!
//! Backing layout for a system with n free DOF:
//!
//! ```text
//! [ q_0 .. q_{n-1} | u_0 .. u_{n-1} ]
//! ```
//!
//! Slot `d` (0..6) of an element maps to its DOF position and slot `d + 6`
//! to the matching velocity. Slots of locked DOF have no mapping: they read
//! as zero and ignore writes.

use crate::kinematics::{LocalState, LOCAL_STATE_SIZE};

/// Local slot → backing index, `None` for locked slots
pub type StateMapping = [Option<usize>; LOCAL_STATE_SIZE];

/// View of a caller-owned compact state array
///
/// The backing slice is borrowed, not copied: writes through
/// [`StateVectorStorageMut`] land in the caller's array.
#[derive(Debug)]
pub struct StateVector<'a> {
    values: &'a mut [f64],
    mappings: Vec<StateMapping>,
}

impl<'a> StateVector<'a> {
    /// Wrap `values` with one mapping per element (indexed by element id)
    ///
    /// Mapped indices are not checked against `values.len()`.
    pub fn new(values: &'a mut [f64], mappings: Vec<StateMapping>) -> Self {
        Self { values, mappings }
    }

    pub fn values(&self) -> &[f64] {
        &*self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn num_elements(&self) -> usize {
        self.mappings.len()
    }

    pub fn mapping(&self, element: usize) -> &StateMapping {
        &self.mappings[element]
    }

    /// Read view of one element's 12 slots
    pub fn storage(&self, element: usize) -> StateVectorStorage<'_> {
        StateVectorStorage {
            values: &*self.values,
            mapping: &self.mappings[element],
        }
    }

    /// Write view of one element's 12 slots
    pub fn storage_mut(&mut self, element: usize) -> StateVectorStorageMut<'_> {
        StateVectorStorageMut {
            values: &mut *self.values,
            mapping: &self.mappings[element],
        }
    }

    /// One element's slots copied into a local state
    pub fn local_state(&self, element: usize) -> LocalState {
        self.storage(element).to_local()
    }
}

/// Read-only 12-slot view
#[derive(Debug, Clone, Copy)]
pub struct StateVectorStorage<'s> {
    values: &'s [f64],
    mapping: &'s StateMapping,
}

impl<'s> StateVectorStorage<'s> {
    /// Value of `slot`, or 0 when the slot is locked
    pub fn at(&self, slot: usize) -> f64 {
        match self.mapping[slot] {
            Some(index) => self.values[index],
            None => 0.0,
        }
    }

    pub fn is_mapped(&self, slot: usize) -> bool {
        self.mapping[slot].is_some()
    }

    pub fn to_local(&self) -> LocalState {
        LocalState::from_fn(|slot, _| self.at(slot))
    }
}

/// Mutable 12-slot view
#[derive(Debug)]
pub struct StateVectorStorageMut<'s> {
    values: &'s mut [f64],
    mapping: &'s StateMapping,
}

impl<'s> StateVectorStorageMut<'s> {
    /// Read view over the same slots
    pub fn view(&self) -> StateVectorStorage<'_> {
        StateVectorStorage {
            values: &*self.values,
            mapping: self.mapping,
        }
    }

    /// Write through to the backing array; no-op for a locked slot
    pub fn set_at(&mut self, slot: usize, value: f64) {
        if let Some(index) = self.mapping[slot] {
            self.values[index] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> StateMapping {
        // DOF 1 and 5 free, compact offsets 0 and 1 of a 2-DOF system
        let mut m = [None; LOCAL_STATE_SIZE];
        m[1] = Some(0);
        m[5] = Some(1);
        m[7] = Some(2);
        m[11] = Some(3);
        m
    }

    #[test]
    fn test_locked_slots_read_zero() {
        let mut values = [1.0, 2.0, 3.0, 4.0];
        let state = StateVector::new(&mut values, vec![mapping()]);
        let storage = state.storage(0);

        assert_eq!(storage.at(0), 0.0);
        assert_eq!(storage.at(1), 1.0);
        assert_eq!(storage.at(5), 2.0);
        assert_eq!(storage.at(11), 4.0);
        assert!(!storage.is_mapped(3));

        let local = state.local_state(0);
        assert_eq!(local.sum(), 10.0);
        assert_eq!(local[7], 3.0);
    }

    #[test]
    fn test_writes_alias_backing_array() {
        let mut values = [0.0; 4];
        {
            let mut state = StateVector::new(&mut values, vec![mapping()]);
            let mut storage = state.storage_mut(0);
            storage.set_at(5, 7.5);
            storage.set_at(2, 9.0);
            let view = storage.view();
            assert_eq!(view.at(5), 7.5);
            assert_eq!(view.at(2), 0.0);
            assert!(view.is_mapped(5));
            assert!(!view.is_mapped(2));
        }

        // The locked slot write left the array untouched
        assert_eq!(values, [0.0, 7.5, 0.0, 0.0]);
    }
}
