//! System definitions
//!
//! ```xml
//! <System>
//!   <Gravity><Vector><Zero/><Zero/><Number>-9.81</Number></Vector></Gravity>
//!   <Parameters>
//!     <ScalarParameter name="length"><Number>1</Number></ScalarParameter>
//!   </Parameters>
//!   <Bodies>
//!     <Body name="link1" type="rod">
//!       <Parameters> ... </Parameters>
//!       <Link type="revolute z" localframe="origin" remote="base"/>
//!     </Body>
//!     <Body name="link2" type="rod">
//!       <Link type="revolute z" remote="link1/tip"/>
//!     </Body>
//!   </Bodies>
//! </System>
//! ```

use mbody_core::kinematics::ORIGIN_FRAME;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LoadError, Result};
use crate::operation::{parse_matrix, parse_scalar, parse_vector, MatrixOperation, Operation, ScalarOperation, VectorOperation};
use crate::parameter::Parameters;
use crate::xml::{parse_document, XmlNode};

/// Keyword in a link's `remote` attribute naming the system base
pub const BASE_REMOTE: &str = "base";

/// A named parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterDefinition {
    Scalar(String, ScalarOperation),
    Vector(String, VectorOperation),
    Matrix(String, MatrixOperation),
}

impl ParameterDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(name, _) | Self::Vector(name, _) | Self::Matrix(name, _) => name,
        }
    }
}

/// Resolve declarations in order on top of `base`
///
/// Later declarations may reference earlier ones and parameters of `base`.
pub fn resolve_parameters(declarations: &[ParameterDefinition], base: &Parameters) -> Result<Parameters> {
    let mut resolved = base.clone();
    for declaration in declarations {
        match declaration {
            ParameterDefinition::Scalar(name, op) => {
                let value = op.resolve(&resolved)?;
                resolved.set_scalar(name, value);
            }
            ParameterDefinition::Vector(name, op) => {
                let value = op.resolve(&resolved)?;
                resolved.set_vector(name, value);
            }
            ParameterDefinition::Matrix(name, op) => {
                let value = op.resolve(&resolved)?;
                resolved.set_matrix(name, value);
            }
        }
    }
    Ok(resolved)
}

/// Where a link attaches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Remote {
    /// A frame among the system's base frames
    Base { frame: String },
    /// A frame on another body
    Body { body: String, frame: String },
}

impl Remote {
    /// Base origin
    pub fn base() -> Self {
        Self::Base {
            frame: ORIGIN_FRAME.to_string(),
        }
    }

    /// Parse `body` or `body/frame`; a first segment of `base` names the base
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim().to_lowercase();
        let (body, frame) = match value.split_once('/') {
            Some((body, frame)) => (body.trim(), frame.trim()),
            None => (value.as_str(), ORIGIN_FRAME),
        };
        if body.is_empty() || frame.is_empty() {
            return Err(LoadError::bad_definition("<Link>", format!("malformed remote '{value}'")));
        }
        if body == BASE_REMOTE {
            return Ok(Self::Base {
                frame: frame.to_string(),
            });
        }
        Ok(Self::Body {
            body: body.to_string(),
            frame: frame.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefinition {
    /// Joint definition name
    pub joint_type: String,
    /// Frame on this body that follows the joint
    pub local_frame: String,
    pub remote: Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDefinition {
    pub name: String,
    /// Element definition name
    pub element_type: String,
    pub parameters: Vec<ParameterDefinition>,
    pub link: LinkDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDefinition {
    /// `None` means the loader's default gravity
    pub gravity: Option<VectorOperation>,
    pub parameters: Vec<ParameterDefinition>,
    pub bodies: Vec<BodyDefinition>,
}

fn parse_parameters(node: Option<&XmlNode>) -> Result<Vec<ParameterDefinition>> {
    let Some(node) = node else {
        return Ok(Vec::new());
    };

    let mut parameters = Vec::new();
    for child in &node.children {
        let kind = child.name.to_ascii_lowercase();
        if !matches!(kind.as_str(), "scalarparameter" | "vectorparameter" | "matrixparameter") {
            warn!(node = %child.name, "ignoring unknown parameter node");
            continue;
        }

        let name = child.required_attribute("name")?.trim().to_lowercase();
        let value = child.only_child()?;
        let definition = match kind.as_str() {
            "scalarparameter" => ParameterDefinition::Scalar(name, parse_scalar(value)?),
            "vectorparameter" => ParameterDefinition::Vector(name, parse_vector(value)?),
            _ => ParameterDefinition::Matrix(name, parse_matrix(value)?),
        };
        parameters.push(definition);
    }
    Ok(parameters)
}

fn parse_link(node: &XmlNode, body: &str) -> Result<LinkDefinition> {
    let links: Vec<&XmlNode> = node.children_named("Link").collect();
    let [link] = links.as_slice() else {
        return Err(LoadError::bad_definition(
            format!("body '{body}'"),
            format!("expected exactly one <Link>, found {}", links.len()),
        ));
    };

    Ok(LinkDefinition {
        joint_type: link.required_attribute("type")?.trim().to_lowercase(),
        local_frame: link
            .attribute("localframe")
            .map(|frame| frame.trim().to_lowercase())
            .unwrap_or_else(|| ORIGIN_FRAME.to_string()),
        remote: Remote::parse(link.required_attribute("remote")?)?,
    })
}

fn parse_body(node: &XmlNode) -> Result<BodyDefinition> {
    let name = node.required_attribute("name")?.trim().to_lowercase();
    let element_type = node.required_attribute("type")?.trim().to_lowercase();
    Ok(BodyDefinition {
        parameters: parse_parameters(node.child("Parameters"))?,
        link: parse_link(node, &name)?,
        name,
        element_type,
    })
}

impl SystemDefinition {
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_xml(&parse_document(xml)?)
    }

    pub fn from_xml(root: &XmlNode) -> Result<Self> {
        let gravity = match root.child("Gravity") {
            Some(gravity) => Some(parse_vector(gravity.only_child()?)?),
            None => None,
        };
        let parameters = parse_parameters(root.child("Parameters"))?;

        let bodies = root
            .required_child("Bodies")?
            .children_named("Body")
            .map(parse_body)
            .collect::<Result<Vec<_>>>()?;
        if bodies.is_empty() {
            return Err(LoadError::bad_definition("system definition", "<Bodies> is empty"));
        }

        for child in &root.children {
            if !["Gravity", "Parameters", "Bodies"].iter().any(|known| child.is(known)) {
                warn!(node = %child.name, "ignoring unknown system node");
            }
        }

        Ok(Self {
            gravity,
            parameters,
            bodies,
        })
    }

    /// Global parameters with every declaration resolved
    pub fn global_parameters(&self) -> Result<Parameters> {
        resolve_parameters(&self.parameters, &Parameters::new())
    }

    pub fn body(&self, name: &str) -> Option<&BodyDefinition> {
        self.bodies.iter().find(|body| body.name.eq_ignore_ascii_case(name))
    }
}

impl BodyDefinition {
    /// Global parameters overlaid with this body's declarations
    pub fn resolve_parameters(&self, global: &Parameters) -> Result<Parameters> {
        resolve_parameters(&self.parameters, global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterLookup;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const PENDULUM: &str = r#"
        <System>
            <Parameters>
                <ScalarParameter name="Length"><Number>2</Number></ScalarParameter>
                <ScalarParameter name="half">
                    <Divide><Parameter name="length"/><Number>2</Number></Divide>
                </ScalarParameter>
            </Parameters>
            <Bodies>
                <Body name="Link1" type="Rod">
                    <Parameters>
                        <ScalarParameter name="length"><Number>3</Number></ScalarParameter>
                        <VectorParameter name="axis"><Vector><Zero/><Zero/><Number>1</Number></Vector></VectorParameter>
                    </Parameters>
                    <Link type="Revolute Z" localframe="Origin" remote="base"/>
                </Body>
                <Body name="link2" type="rod">
                    <Link type="revolute z" remote="LINK1/Tip"/>
                </Body>
            </Bodies>
        </System>"#;

    #[test]
    fn test_parse_system() {
        let system = SystemDefinition::parse(PENDULUM).unwrap();
        assert_eq!(system.gravity, None);
        assert_eq!(system.parameters.len(), 2);
        assert_eq!(system.bodies.len(), 2);

        let link1 = system.body("LINK1").unwrap();
        assert_eq!(link1.element_type, "rod");
        assert_eq!(link1.link.joint_type, "revolute z");
        assert_eq!(link1.link.local_frame, "origin");
        assert_eq!(link1.link.remote, Remote::base());

        let link2 = &system.bodies[1];
        assert_eq!(link2.link.local_frame, ORIGIN_FRAME);
        assert_eq!(
            link2.link.remote,
            Remote::Body {
                body: "link1".into(),
                frame: "tip".into()
            }
        );
    }

    #[test]
    fn test_sequential_and_local_parameters() {
        let system = SystemDefinition::parse(PENDULUM).unwrap();
        let global = system.global_parameters().unwrap();
        assert_relative_eq!(global.scalar("half").unwrap(), 1.0);

        let local = system.bodies[0].resolve_parameters(&global).unwrap();
        assert_relative_eq!(local.scalar("length").unwrap(), 3.0);
        // already resolved globals keep their value
        assert_relative_eq!(local.scalar("half").unwrap(), 1.0);
        assert_relative_eq!(local.vector("axis").unwrap(), Vector3::z());
        assert!(local.has_vector("AXIS"));
        assert!(!global.has_vector("axis"));
    }

    #[test]
    fn test_remote_parsing() {
        assert_eq!(Remote::parse(" Base ").unwrap(), Remote::base());
        assert_eq!(Remote::parse("base/origin").unwrap(), Remote::base());
        assert_eq!(
            Remote::parse("BASE/Mount").unwrap(),
            Remote::Base {
                frame: "mount".into()
            }
        );
        assert_eq!(
            Remote::parse("arm").unwrap(),
            Remote::Body {
                body: "arm".into(),
                frame: "origin".into()
            }
        );
        assert!(Remote::parse("").is_err());
        assert!(Remote::parse("arm/").is_err());
        assert!(Remote::parse("base/").is_err());
    }

    #[test]
    fn test_invalid_systems() {
        let empty = r#"<System><Bodies/></System>"#;
        assert!(matches!(SystemDefinition::parse(empty), Err(LoadError::BadDefinition { .. })));

        let no_bodies = r#"<System><Parameters/></System>"#;
        assert!(matches!(SystemDefinition::parse(no_bodies), Err(LoadError::BadDefinition { .. })));

        let two_links = PENDULUM.replace(
            r#"<Link type="revolute z" remote="LINK1/Tip"/>"#,
            r#"<Link type="a" remote="base"/><Link type="b" remote="base"/>"#,
        );
        assert!(matches!(SystemDefinition::parse(&two_links), Err(LoadError::BadDefinition { .. })));

        let forward = PENDULUM.replace(r#"<Parameter name="length"/>"#, r#"<Parameter name="later"/>"#);
        let system = SystemDefinition::parse(&forward).unwrap();
        assert!(matches!(
            system.global_parameters(),
            Err(LoadError::ParameterNotFound { .. })
        ));
    }
}
