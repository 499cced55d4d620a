//! Errors raised while assembling a multibody system
//!
//! All of these are detected before the first step. The per-step update and
//! assembly path does not validate and does not fail.

use thiserror::Error;

/// Errors that can occur while building frames or initializing a system
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    /// Element parent index does not name an element of the system
    #[error("element '{element}' references parent index {parent}, but the system has {count} elements")]
    UnknownParent {
        element: String,
        parent: usize,
        count: usize,
    },

    /// Element names itself as its parent
    #[error("element '{0}' is its own parent")]
    SelfParent(String),

    /// No element could be placed after its parent
    #[error("cyclic topology: elements {0:?} can never be placed after their parents")]
    CyclicTopology(Vec<String>),

    /// Joint frame id is not in the frame set it refers to
    #[error("element '{element}' joint references missing {role} frame #{frame}")]
    UnknownFrame {
        element: String,
        role: &'static str,
        frame: usize,
    },

    /// Frame reference points at a frame that does not exist yet
    #[error("frame '{frame}' references missing frame #{reference}")]
    InvalidFrameReference { frame: String, reference: usize },

    /// Two frames of one element share a name
    #[error("duplicate frame name '{0}'")]
    DuplicateFrame(String),

    /// Operation requires a later stage of the system lifecycle
    #[error("system is {actual:?}, expected {expected:?}")]
    InvalidStage {
        expected: crate::dynamics::SystemStage,
        actual: crate::dynamics::SystemStage,
    },
}

/// Result type for system construction
pub type Result<T> = std::result::Result<T, SystemError>;
