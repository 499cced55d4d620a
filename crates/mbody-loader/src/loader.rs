//! System assembly from definitions
//!
//! Every body of a system definition becomes one element: its element
//! definition is instantiated with the global parameters overlaid by the
//! body's own, and its link becomes the element's joint and parent. The
//! elements are then initialized on top of the loader's base frames.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use mbody_core::dynamics::{Element, MultibodySystem};
use mbody_core::gravity_enu;
use mbody_core::kinematics::{Frames, Joint};
use nalgebra::Vector3;
use tracing::info;

use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::operation::Operation;
use crate::registry::{ElementRegistry, JointRegistry};
use crate::system_def::{BodyDefinition, Remote, SystemDefinition, BASE_REMOTE};

/// Builds multibody systems from system definitions
#[derive(Debug, Clone)]
pub struct SystemLoader {
    elements: ElementRegistry,
    joints: JointRegistry,
    default_gravity: Vector3<f64>,
    base_frames: Frames,
}

impl SystemLoader {
    pub fn new(elements: ElementRegistry, joints: JointRegistry) -> Self {
        Self {
            elements,
            joints,
            default_gravity: gravity_enu(),
            base_frames: Frames::new(),
        }
    }

    /// Read both definition folders named by `config`
    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        let mut elements = ElementRegistry::new();
        elements.load_folder(&config.element_dir, &config.element_extension)?;
        let mut joints = JointRegistry::new();
        joints.load_folder(&config.joint_dir, &config.joint_extension)?;

        Ok(Self::new(elements, joints).with_default_gravity(config.default_gravity))
    }

    pub fn with_default_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.default_gravity = gravity;
        self
    }

    /// Frames that `remote="base/<frame>"` links resolve against (default: origin only)
    pub fn with_base_frames(mut self, base_frames: Frames) -> Self {
        self.base_frames = base_frames;
        self
    }

    pub fn base_frames(&self) -> &Frames {
        &self.base_frames
    }

    pub fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    pub fn joints(&self) -> &JointRegistry {
        &self.joints
    }

    /// Parse a system definition and build it
    pub fn parse(&self, xml: &str) -> Result<MultibodySystem> {
        self.build(&SystemDefinition::parse(xml)?)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<MultibodySystem> {
        let xml = fs::read_to_string(path.as_ref())?;
        self.parse(&xml)
    }

    /// Instantiate, link and initialize every body of `definition`
    pub fn build(&self, definition: &SystemDefinition) -> Result<MultibodySystem> {
        let global = definition.global_parameters()?;
        let gravity = match &definition.gravity {
            Some(gravity) => gravity.resolve(&global)?,
            None => self.default_gravity,
        };

        let mut indices = BTreeMap::new();
        for (index, body) in definition.bodies.iter().enumerate() {
            if indices.insert(body.name.to_lowercase(), index).is_some() {
                return Err(LoadError::bad_definition(
                    "system definition",
                    format!("body '{}' defined twice", body.name),
                ));
            }
        }

        let elements = definition
            .bodies
            .iter()
            .map(|body| {
                let parameters = body.resolve_parameters(&global)?;
                self.elements
                    .get(&body.element_type)?
                    .instantiate(&body.name, &parameters)
            })
            .collect::<Result<Vec<_>>>()?;

        let links = definition
            .bodies
            .iter()
            .zip(&elements)
            .map(|(body, element)| self.link(body, element, &elements, &indices))
            .collect::<Result<Vec<_>>>()?;

        let elements: Vec<Element> = elements
            .into_iter()
            .zip(links)
            .map(|(mut element, (joint, parent))| {
                element.joint = joint;
                match parent {
                    Some(parent) => element.with_parent(parent),
                    None => element,
                }
            })
            .collect();

        let mut system = MultibodySystem::new(elements, gravity).with_base_frames(self.base_frames.clone());
        system.initialize_system()?;
        system.setup_elements()?;
        info!(
            bodies = system.num_elements(),
            dof = system.total_degrees_of_freedom(),
            "loaded multibody system"
        );
        Ok(system)
    }

    /// Joint and parent index for one body
    fn link(
        &self,
        body: &BodyDefinition,
        element: &Element,
        elements: &[Element],
        indices: &BTreeMap<String, usize>,
    ) -> Result<(Joint, Option<usize>)> {
        let link = &body.link;
        let joint = self.joints.get(&link.joint_type)?;
        let follower = element
            .frames
            .find(&link.local_frame)
            .ok_or_else(|| LoadError::unknown_frame(&body.name, &link.local_frame))?;

        let (base, parent) = match &link.remote {
            Remote::Base { frame } => {
                let base = self
                    .base_frames
                    .find(frame)
                    .ok_or_else(|| LoadError::unknown_frame(BASE_REMOTE, frame))?;
                (base, None)
            }
            Remote::Body { body: remote, frame } => {
                if remote.eq_ignore_ascii_case(&body.name) {
                    return Err(LoadError::SelfLink(body.name.clone()));
                }
                let parent = *indices
                    .get(&remote.to_lowercase())
                    .ok_or_else(|| LoadError::UnknownBody {
                        body: body.name.clone(),
                        remote: remote.clone(),
                    })?;
                let base = elements[parent]
                    .frames
                    .find(frame)
                    .ok_or_else(|| LoadError::unknown_frame(remote, frame))?;
                (base, Some(parent))
            }
        };

        Ok((joint.create_joint(base, follower), parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mbody_core::kinematics::{Dof, FrameId};

    const ROD: &str = r#"
        <ElementDefinition>
            <Name>Rod</Name>
            <Author>mbody</Author>
            <Properties>
                <Mass><Number>1</Number></Mass>
                <Inertia><Identity/></Inertia>
            </Properties>
            <Frames>
                <Frame name="tip">
                    <Translation><Vector><Number>1</Number><Zero/><Zero/></Vector></Translation>
                </Frame>
            </Frames>
        </ElementDefinition>"#;

    const HINGE: &str = r#"
        <JointDefinition>
            <Name>Hinge</Name>
            <Author>mbody</Author>
            <DegreesOfFreedom default="lock"><Free type="gamma"/></DegreesOfFreedom>
        </JointDefinition>"#;

    fn loader() -> SystemLoader {
        let mut elements = ElementRegistry::new();
        elements.load_str(ROD).unwrap();
        let mut joints = JointRegistry::new();
        joints.load_str(HINGE).unwrap();
        SystemLoader::new(elements, joints)
    }

    fn chain(second_remote: &str) -> String {
        format!(
            r#"<System>
                <Bodies>
                    <Body name="b" type="rod"><Link type="hinge" remote="{second_remote}"/></Body>
                    <Body name="a" type="rod"><Link type="hinge" remote="base"/></Body>
                </Bodies>
            </System>"#
        )
    }

    #[test]
    fn test_build_orders_parents_first() {
        let system = loader().parse(&chain("a/tip")).unwrap();

        assert_eq!(system.num_elements(), 2);
        assert_eq!(system.total_degrees_of_freedom(), 2);
        assert_eq!(system.elements()[0].name, "a");
        assert_eq!(system.elements()[1].name, "b");
        assert_eq!(system.elements()[1].parent(), Some(0));
        assert_eq!(system.elements()[1].joint.free_degrees_of_freedom(), &[Dof::Gamma]);
        assert_eq!(*system.gravity(), gravity_enu());
    }

    #[test]
    fn test_link_errors() {
        let loader = loader();
        assert!(matches!(loader.parse(&chain("c")), Err(LoadError::UnknownBody { .. })));
        assert!(matches!(loader.parse(&chain("b/tip")), Err(LoadError::SelfLink(_))));
        assert!(matches!(loader.parse(&chain("a/elbow")), Err(LoadError::UnknownFrame { .. })));

        let unknown_joint = chain("a").replace(r#"type="hinge" remote="a""#, r#"type="slider" remote="a""#);
        assert!(matches!(
            loader.parse(&unknown_joint),
            Err(LoadError::DefinitionNotFound { kind: "joint", .. })
        ));
    }

    #[test]
    fn test_base_frame_remote() {
        let system = loader().parse(&chain("base/origin")).unwrap();
        assert_eq!(system.elements()[0].parent(), None);
        assert_eq!(system.elements()[1].parent(), None);

        let mut mount = Frames::new();
        mount
            .add("mount", Vector3::new(0.0, 0.0, 2.0), nalgebra::Matrix3::identity(), FrameId::ORIGIN)
            .unwrap();
        let loader = loader().with_base_frames(mount);
        let mut system = loader.parse(&chain("BASE/Mount")).unwrap();

        let mut values = vec![0.0; system.state_len()];
        let state = system.state_vector(&mut values);
        system.update_elements(&state);
        let b = system.find_element("b").unwrap();
        assert_relative_eq!(b.cog_position(), Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-12);

        assert!(matches!(
            loader.parse(&chain("base/shelf")),
            Err(LoadError::UnknownFrame { .. })
        ));
    }

    #[test]
    fn test_duplicate_body() {
        let xml = chain("a").replace(r#"name="b""#, r#"name="A""#);
        assert!(matches!(loader().parse(&xml), Err(LoadError::BadDefinition { .. })));
    }
}
