//! mbody Loader
//!
//! Builds [`mbody_core::dynamics::MultibodySystem`]s from XML definitions.
//!
//! # Formats
//!
//! - element definitions (`.edf`): mass, inertia and named frames of a body
//! - joint definitions (`.jdf`): which of the six DOF a joint leaves free
//! - system definitions: gravity, parameters and the bodies with their links
//!
//! Numeric fields are operation trees (`<Number>`, `<Parameter>`, `<Add>`,
//! `<Sin>`, ...) resolved against global and per-body parameters.
//!
//! # Components
//!
//! - [`registry`]: element and joint definitions keyed by name
//! - [`loader`]: system definition to initialized system
//! - [`config`]: definition folders and default gravity
//! - [`operation`], [`parameter`]: value expressions and their inputs

pub mod config;
pub mod element_def;
pub mod error;
pub mod joint_def;
pub mod loader;
pub mod operation;
pub mod parameter;
pub mod registry;
pub mod system_def;
pub mod xml;

// Re-exports
pub use config::LoaderConfig;
pub use element_def::ElementDefinition;
pub use error::{LoadError, Result};
pub use joint_def::JointDefinition;
pub use loader::SystemLoader;
pub use parameter::{ParameterLookup, Parameters};
pub use registry::{Definition, ElementRegistry, JointRegistry, Registry};
pub use system_def::SystemDefinition;
