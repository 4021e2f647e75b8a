//! Block/attribute schema
//!
//! The shipped decoder knows which blocks and attributes are valid from a
//! TOML schema. A default core schema is embedded in the binary; a file
//! named in the configuration replaces it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

const CORE_SCHEMA: &str = include_str!("../../schemas/core.toml");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    /// Markdown description
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub labels: Vec<LabelSchema>,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSchema>,

    #[serde(default)]
    pub blocks: BTreeMap<String, BlockSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSchema {
    pub name: String,

    /// Known values offered as completions; empty means free-form
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    #[serde(rename = "type", default)]
    pub type_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,
}

impl AttributeSchema {
    pub fn detail(&self) -> String {
        let requirement = if self.required { "Required" } else { "Optional" };
        if self.type_name.is_empty() {
            requirement.to_string()
        } else {
            format!("{}, {}", requirement, self.type_name)
        }
    }
}

impl Schema {
    /// The schema embedded in the binary
    pub fn core() -> Result<Self, SchemaError> {
        Self::parse(CORE_SCHEMA)
    }

    pub fn parse(content: &str) -> Result<Self, SchemaError> {
        let schema: Schema =
            toml::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    pub async fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Schema of the innermost block in a chain of nested block types
    pub fn block<S: AsRef<str>>(&self, path: &[S]) -> Option<&BlockSchema> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get(first.as_ref())?;
        for name in rest {
            block = block.blocks.get(name.as_ref())?;
        }
        Some(block)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for (name, block) in &self.blocks {
            block.validate(name)?;
        }
        Ok(())
    }
}

impl BlockSchema {
    fn validate(&self, name: &str) -> Result<(), SchemaError> {
        for label in &self.labels {
            if label.name.trim().is_empty() {
                return Err(SchemaError::Invalid {
                    block: name.to_string(),
                    message: "label without a name".to_string(),
                });
            }
        }
        if let Some(attr) = self.attributes.keys().find(|a| self.blocks.contains_key(*a)) {
            return Err(SchemaError::Invalid {
                block: name.to_string(),
                message: format!("'{attr}' is declared as both attribute and block"),
            });
        }
        for (child, block) in &self.blocks {
            block.validate(&format!("{name}.{child}"))?;
        }
        Ok(())
    }
}
