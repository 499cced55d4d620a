//! Loader configuration
//!
//! Where definition files live and what a system without `<Gravity>` uses.

use std::path::{Path, PathBuf};

use mbody_core::gravity_enu;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::element_def::ElementDefinition;
use crate::joint_def::JointDefinition;
use crate::registry::Definition;

/// Main loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Folder scanned for element definitions
    pub element_dir: PathBuf,
    /// Folder scanned for joint definitions
    pub joint_dir: PathBuf,
    /// Extension of element definition files (no dot)
    pub element_extension: String,
    /// Extension of joint definition files (no dot)
    pub joint_extension: String,
    /// Gravity for systems that do not declare one [m/s²]
    pub default_gravity: Vector3<f64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            element_dir: PathBuf::from("definitions/elements"),
            joint_dir: PathBuf::from("definitions/joints"),
            element_extension: ElementDefinition::EXTENSION.to_string(),
            joint_extension: JointDefinition::EXTENSION.to_string(),
            default_gravity: gravity_enu(),
        }
    }
}

impl LoaderConfig {
    /// `elements/` and `joints/` below `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            element_dir: root.join("elements"),
            joint_dir: root.join("joints"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.element_extension, "edf");
        assert_eq!(config.joint_extension, "jdf");
        assert_eq!(config.default_gravity, Vector3::new(0.0, 0.0, -9.81));
    }

    #[test]
    fn test_with_root() {
        let config = LoaderConfig::with_root("/data/mbody");
        assert_eq!(config.element_dir, PathBuf::from("/data/mbody/elements"));
        assert_eq!(config.joint_dir, PathBuf::from("/data/mbody/joints"));
        assert_eq!(config.joint_extension, "jdf");
    }
}
