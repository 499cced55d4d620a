//! Registries of element and joint definitions
//!
//! A registry owns every definition of one kind, keyed by lower-cased name.
//! Registries are plain values passed to the loader; there is no global
//! state, so tests can build isolated registries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::element_def::ElementDefinition;
use crate::error::{LoadError, Result};
use crate::joint_def::JointDefinition;
use crate::xml::{parse_document, XmlNode};

/// A named definition read from one XML document
pub trait Definition: Sized {
    /// Kind used in error messages
    const KIND: &'static str;
    /// File extension of definition files, without the dot
    const EXTENSION: &'static str;

    fn name(&self) -> &str;

    fn from_xml(root: &XmlNode) -> Result<Self>;

    fn parse(xml: &str) -> Result<Self> {
        Self::from_xml(&parse_document(xml)?)
    }
}

/// Definitions of one kind, looked up case-insensitively
#[derive(Debug, Clone)]
pub struct Registry<D> {
    definitions: BTreeMap<String, D>,
}

pub type ElementRegistry = Registry<ElementDefinition>;
pub type JointRegistry = Registry<JointDefinition>;

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }
}

impl<D: Definition> Registry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; a second definition with the same name is rejected
    pub fn register(&mut self, definition: D) -> Result<()> {
        let key = definition.name().trim().to_lowercase();
        if self.definitions.contains_key(&key) {
            return Err(LoadError::DuplicateDefinition {
                kind: D::KIND,
                name: definition.name().to_string(),
            });
        }
        debug!(kind = D::KIND, name = definition.name(), "registered definition");
        self.definitions.insert(key, definition);
        Ok(())
    }

    /// Parse and register a definition from XML text
    pub fn load_str(&mut self, xml: &str) -> Result<()> {
        self.register(D::parse(xml)?)
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)?;
        let definition = D::parse(&xml).map_err(|err| match err {
            LoadError::BadDefinition { context, message } => {
                LoadError::bad_definition(format!("{} ({context})", path.display()), message)
            }
            other => other,
        })?;
        self.register(definition)
    }

    /// Register every file in `dir` whose extension matches
    ///
    /// Files are read in name order. Returns the number of definitions added.
    pub fn load_folder(&mut self, dir: impl AsRef<Path>, extension: &str) -> Result<usize> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if path.is_file() && matches {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            warn!(kind = D::KIND, dir = %dir.display(), extension, "no definition files found");
        }
        for path in &paths {
            self.load_file(path)?;
        }
        Ok(paths.len())
    }

    /// Load with the definition kind's default extension
    pub fn load_default_folder(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        self.load_folder(dir, D::EXTENSION)
    }

    pub fn get(&self, name: &str) -> Result<&D> {
        self.definitions
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| LoadError::DefinitionNotFound {
                kind: D::KIND,
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered names as written in their definitions
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.values().map(|d| d.name())
    }
}
