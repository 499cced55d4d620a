//! Joint definitions (`.jdf`)
//!
//! ```xml
//! <JointDefinition>
//!   <Name>Revolute Z</Name>
//!   <Author>mbody</Author>
//!   <DegreesOfFreedom default="lock">
//!     <Free type="gamma"/>
//!   </DegreesOfFreedom>
//! </JointDefinition>
//! ```
//!
//! `default` applies to every DOF not listed; `Free` and `Locked` entries
//! override it.

use mbody_core::kinematics::{Dof, FrameId, Joint, NUM_DOF};
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::registry::Definition;
use crate::xml::XmlNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DofDefault {
    Free,
    Lock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointDefinition {
    pub name: String,
    pub author: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub default: DofDefault,
    pub free: Vec<Dof>,
    pub locked: Vec<Dof>,
}

impl JointDefinition {
    /// Free flags per DOF in ordinal order
    pub fn free_flags(&self) -> [bool; NUM_DOF] {
        let mut flags = [self.default == DofDefault::Free; NUM_DOF];
        for dof in &self.free {
            flags[dof.index()] = true;
        }
        for dof in &self.locked {
            flags[dof.index()] = false;
        }
        flags
    }

    /// Joint attaching `follower` on the child to `base` on the parent
    pub fn create_joint(&self, base: FrameId, follower: FrameId) -> Joint {
        Joint::from_flags(base, follower, self.free_flags())
    }
}

fn parse_dofs(node: &XmlNode, tag: &str, context: &str) -> Result<Vec<Dof>> {
    node.children_named(tag)
        .map(|entry| {
            let kind = entry.required_attribute("type")?;
            kind.parse::<Dof>()
                .map_err(|err| LoadError::bad_definition(context.to_string(), err.to_string()))
        })
        .collect()
}

impl Definition for JointDefinition {
    const KIND: &'static str = "joint";
    const EXTENSION: &'static str = "jdf";

    fn name(&self) -> &str {
        &self.name
    }

    fn from_xml(root: &XmlNode) -> Result<Self> {
        let name = root
            .child_text("Name")
            .ok_or_else(|| LoadError::bad_definition("joint definition", "missing <Name>"))?;
        let context = format!("joint definition '{name}'");
        let author = root
            .child_text("Author")
            .ok_or_else(|| LoadError::bad_definition(context.clone(), "missing <Author>"))?;

        let dofs = root.required_child("DegreesOfFreedom")?;
        let default = match dofs.attribute("default").map(str::to_ascii_lowercase).as_deref() {
            Some("free") => DofDefault::Free,
            Some("lock") | Some("locked") => DofDefault::Lock,
            Some(other) => {
                return Err(LoadError::bad_definition(
                    context,
                    format!("default must be 'free' or 'lock', not '{other}'"),
                ))
            }
            None => {
                return Err(LoadError::bad_definition(
                    context,
                    "<DegreesOfFreedom> needs a default attribute",
                ))
            }
        };

        let free = parse_dofs(dofs, "Free", &context)?;
        let locked = parse_dofs(dofs, "Locked", &context)?;
        if let Some(dof) = free.iter().find(|dof| locked.contains(*dof)) {
            return Err(LoadError::bad_definition(
                context,
                format!("'{dof}' is both free and locked"),
            ));
        }

        Ok(Self {
            description: root.child_text("Description"),
            url: root.child_text("URL"),
            name,
            author,
            default,
            free,
            locked,
        })
    }
}
