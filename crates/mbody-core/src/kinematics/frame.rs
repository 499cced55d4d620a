//! Coordinate frames attached to an element
//!
//! Each element owns a small arena of frames. Index 0 is always the origin
//! frame; every other frame is attached to a reference frame with a fixed
//! offset and rotation:
//!
//! ```text
//! offset_origin(f)   = offset_origin(ref) + rotation_origin(ref) · offset
//! rotation_origin(f) = rotation_origin(ref) · rotation
//! ```
//!
//! `offset` is expressed in the reference frame; `rotation` maps coordinates
//! of the frame into coordinates of the reference frame. A frame may only
//! reference a frame already in the arena, so chains always end at the
//! origin.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SystemError};

/// Name of the origin frame present in every frame set
pub const ORIGIN_FRAME: &str = "origin";

/// Index of a frame inside a [`Frames`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub usize);

impl FrameId {
    pub const ORIGIN: FrameId = FrameId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Root of the frame chain: zero offset, identity rotation
    Origin,
    /// Frame fixed relative to `reference`
    Attached {
        reference: FrameId,
        offset: Vector3<f64>,
        rotation: Matrix3<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub kind: FrameKind,
}

impl Frame {
    pub fn origin() -> Self {
        Self {
            name: ORIGIN_FRAME.to_string(),
            kind: FrameKind::Origin,
        }
    }

    pub fn reference(&self) -> Option<FrameId> {
        match self.kind {
            FrameKind::Origin => None,
            FrameKind::Attached { reference, .. } => Some(reference),
        }
    }

    /// Offset relative to the reference frame
    pub fn offset(&self) -> Vector3<f64> {
        match &self.kind {
            FrameKind::Origin => Vector3::zeros(),
            FrameKind::Attached { offset, .. } => *offset,
        }
    }

    /// Rotation relative to the reference frame
    pub fn rotation(&self) -> Matrix3<f64> {
        match &self.kind {
            FrameKind::Origin => Matrix3::identity(),
            FrameKind::Attached { rotation, .. } => *rotation,
        }
    }
}

/// Frame arena of one element (or of the system base)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frames {
    frames: Vec<Frame>,
}

impl Default for Frames {
    fn default() -> Self {
        Self::new()
    }
}

impl Frames {
    /// Frame set holding only the origin frame
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::origin()],
        }
    }

    /// Attach a new frame to an existing one
    pub fn add(
        &mut self,
        name: impl Into<String>,
        offset: Vector3<f64>,
        rotation: Matrix3<f64>,
        reference: FrameId,
    ) -> Result<FrameId> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(SystemError::DuplicateFrame(name));
        }
        if reference.0 >= self.frames.len() {
            return Err(SystemError::InvalidFrameReference {
                frame: name,
                reference: reference.0,
            });
        }

        self.frames.push(Frame {
            name,
            kind: FrameKind::Attached {
                reference,
                offset,
                rotation,
            },
        });
        Ok(FrameId(self.frames.len() - 1))
    }

    /// Case-insensitive lookup by name
    pub fn find(&self, name: &str) -> Option<FrameId> {
        self.frames
            .iter()
            .position(|frame| frame.name.eq_ignore_ascii_case(name))
            .map(FrameId)
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        id.0 < self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameId, &Frame)> {
        self.frames.iter().enumerate().map(|(i, frame)| (FrameId(i), frame))
    }

    /// Position of the frame expressed in the origin frame
    ///
    /// Panics if `id` is not in this arena.
    pub fn offset_origin(&self, id: FrameId) -> Vector3<f64> {
        let frame = &self.frames[id.0];
        match &frame.kind {
            FrameKind::Origin => Vector3::zeros(),
            FrameKind::Attached {
                reference, offset, ..
            } => self.offset_origin(*reference) + self.rotation_origin(*reference) * offset,
        }
    }

    /// Rotation from the frame's coordinates into the origin frame's
    ///
    /// Panics if `id` is not in this arena.
    pub fn rotation_origin(&self, id: FrameId) -> Matrix3<f64> {
        let frame = &self.frames[id.0];
        match &frame.kind {
            FrameKind::Origin => Matrix3::identity(),
            FrameKind::Attached {
                reference, rotation, ..
            } => self.rotation_origin(*reference) * rotation,
        }
    }
}
