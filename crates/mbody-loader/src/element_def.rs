//! Element definitions (`.edf`)
//!
//! ```xml
//! <ElementDefinition>
//!   <Name>Rod</Name>
//!   <Author>mbody</Author>
//!   <Description>Slender rod along x</Description>
//!   <Properties>
//!     <Mass><Parameter name="mass"/></Mass>
//!     <Inertia><Identity/></Inertia>
//!   </Properties>
//!   <Frames>
//!     <Frame name="tip">
//!       <Translation><Vector>...</Vector></Translation>
//!     </Frame>
//!     <Frame name="cog" reference="tip"> ... </Frame>
//!   </Frames>
//! </ElementDefinition>
//! ```
//!
//! Frames without `reference` hang off the origin; missing `Translation`
//! means zero offset and missing `Rotation` means identity. A frame named
//! `cog` becomes the element's center of gravity, otherwise the origin is.

use mbody_core::dynamics::Element;
use mbody_core::kinematics::{FrameId, Frames, Joint, ORIGIN_FRAME};
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::operation::{parse_matrix, parse_scalar, parse_vector, MatrixOperation, Operation, ScalarOperation, VectorOperation};
use crate::parameter::ParameterLookup;
use crate::registry::Definition;
use crate::xml::XmlNode;

/// Name of the frame taken as center of gravity
pub const COG_FRAME: &str = "cog";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDefinition {
    pub name: String,
    /// Name of the reference frame
    pub reference: String,
    pub translation: VectorOperation,
    pub rotation: MatrixOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub name: String,
    pub author: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub mass: ScalarOperation,
    pub inertia: MatrixOperation,
    pub frames: Vec<FrameDefinition>,
}

fn required_text(node: &XmlNode, name: &str, context: &str) -> Result<String> {
    node.child_text(name)
        .ok_or_else(|| LoadError::bad_definition(context.to_string(), format!("missing <{name}>")))
}

fn parse_frame(node: &XmlNode) -> Result<FrameDefinition> {
    let name = node.required_attribute("name")?.to_string();
    let reference = node.attribute("reference").unwrap_or(ORIGIN_FRAME).to_string();

    let translation = match node.child("Translation") {
        Some(translation) => parse_vector(translation.only_child()?)?,
        None => VectorOperation::Zero,
    };
    let rotation = match node.child("Rotation") {
        Some(rotation) => parse_matrix(rotation.only_child()?)?,
        None => MatrixOperation::Identity,
    };

    Ok(FrameDefinition {
        name,
        reference,
        translation,
        rotation,
    })
}

impl Definition for ElementDefinition {
    const KIND: &'static str = "element";
    const EXTENSION: &'static str = "edf";

    fn name(&self) -> &str {
        &self.name
    }

    fn from_xml(root: &XmlNode) -> Result<Self> {
        let context = "element definition";
        let name = required_text(root, "Name", context)?;
        let context = format!("element definition '{name}'");
        let author = required_text(root, "Author", &context)?;

        let properties = root.required_child("Properties")?;
        let mass = parse_scalar(properties.required_child("Mass")?.only_child()?)?;
        let inertia = parse_matrix(properties.required_child("Inertia")?.only_child()?)?;

        let frames = match root.child("Frames") {
            Some(frames) => frames
                .children_named("Frame")
                .map(parse_frame)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            description: root.child_text("Description"),
            url: root.child_text("URL"),
            name,
            author,
            mass,
            inertia,
            frames,
        })
    }
}

impl ElementDefinition {
    /// Resolve all operations and build the element's frame arena
    ///
    /// Frames may be declared in any order; a frame is added once its
    /// reference exists. The returned element has a fixed joint and no parent.
    pub fn instantiate(&self, body: &str, parameters: &dyn ParameterLookup) -> Result<Element> {
        let context = format!("element '{}' of body '{body}'", self.name);
        let mass = self.mass.resolve(parameters)?;
        let inertia = self.inertia.resolve(parameters)?;

        let mut frames = Frames::new();
        let mut remaining: Vec<&FrameDefinition> = self.frames.iter().collect();
        while !remaining.is_empty() {
            let ready = remaining
                .iter()
                .position(|frame| frames.find(&frame.reference).is_some());
            let Some(position) = ready else {
                let names: Vec<&str> = remaining.iter().map(|f| f.name.as_str()).collect();
                return Err(LoadError::bad_definition(
                    context,
                    format!("frames {names:?} reference unknown or cyclic frames"),
                ));
            };

            let frame = remaining.remove(position);
            let reference = frames.find(&frame.reference).unwrap_or(FrameId::ORIGIN);
            frames
                .add(
                    frame.name.clone(),
                    frame.translation.resolve(parameters)?,
                    frame.rotation.resolve(parameters)?,
                    reference,
                )
                .map_err(|err| LoadError::bad_definition(context.clone(), err.to_string()))?;
        }

        let cog = frames.find(COG_FRAME).unwrap_or(FrameId::ORIGIN);
        Ok(Element::new(body, mass, inertia, frames, Joint::fixed()).with_cog_frame(cog))
    }
}
