//! Error types for definition loading
//!
//! Four kinds of failure can occur while a system is loaded:
//! definition errors (malformed or incomplete XML), registry errors
//! (duplicate or missing definition names), parameter errors (an operation
//! names a parameter that is not defined) and topology errors (links to
//! bodies or frames that do not exist). All of them abort the load.

use mbody_core::SystemError;
use thiserror::Error;

/// Errors that can occur while loading definitions or systems
#[derive(Debug, Error)]
pub enum LoadError {
    /// XML could not be read
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Definition is missing data or has malformed content
    #[error("bad definition in {context}: {message}")]
    BadDefinition { context: String, message: String },

    /// A definition of that kind and name is already registered
    #[error("{kind} definition '{name}' already exists")]
    DuplicateDefinition { kind: &'static str, name: String },

    /// No definition of that kind and name is registered
    #[error("{kind} definition '{name}' not found")]
    DefinitionNotFound { kind: &'static str, name: String },

    /// Operation references an undefined parameter
    #[error("{kind} parameter '{name}' not found")]
    ParameterNotFound { kind: &'static str, name: String },

    /// Link names a body that is not part of the system
    #[error("body '{body}' links to unknown body '{remote}'")]
    UnknownBody { body: String, remote: String },

    /// Link names a frame that the body does not define
    #[error("body '{body}' references unknown frame '{frame}'")]
    UnknownFrame { body: String, frame: String },

    /// Body links to itself
    #[error("body '{0}' cannot link to itself")]
    SelfLink(String),

    /// Topology rejected while assembling the system
    #[error(transparent)]
    System(#[from] SystemError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Create a bad definition error
    pub fn bad_definition(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadDefinition {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn parameter_not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::ParameterNotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn unknown_frame(body: impl Into<String>, frame: impl Into<String>) -> Self {
        Self::UnknownFrame {
            body: body.into(),
            frame: frame.into(),
        }
    }

    /// True for errors caused by the system's topology
    pub fn is_topology(&self) -> bool {
        matches!(
            self,
            Self::UnknownBody { .. }
                | Self::UnknownFrame { .. }
                | Self::SelfLink(_)
                | Self::System(
                    SystemError::UnknownParent { .. }
                        | SystemError::SelfParent(_)
                        | SystemError::CyclicTopology(_)
                        | SystemError::UnknownFrame { .. }
                )
        )
    }
}

/// Result type for loading operations
pub type Result<T> = std::result::Result<T, LoadError>;
