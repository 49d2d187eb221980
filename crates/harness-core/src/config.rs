use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::designator::DEFAULT_SEPARATOR;
use crate::error::{Error, Result};
use crate::template::ComponentAttributes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessOptions {
    /// Character between template and designator in connection tokens.
    pub template_separator: char,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            template_separator: DEFAULT_SEPARATOR,
        }
    }
}

/// The sections of a harness document the engine consumes.
///
/// Connection sets and additional BOM lines are kept as raw YAML so that
/// malformed entries are reported with the set or line they came from.
/// Unrecognised top-level sections are ignored.
#[derive(Debug, Clone, Default)]
pub struct HarnessConfig {
    pub metadata: Mapping,
    pub options: HarnessOptions,
    pub connectors: IndexMap<String, ComponentAttributes>,
    pub cables: IndexMap<String, ComponentAttributes>,
    pub connections: Vec<Vec<Value>>,
    pub additional_bom_items: Vec<Value>,
}

impl HarnessConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::from_value(crate::yaml::from_str(yaml)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let root: Mapping = match value {
            Value::Null => Mapping::new(),
            other => serde_yaml::from_value(other).map_err(|source| Error::Config {
                section: "document",
                source,
            })?,
        };

        Ok(Self {
            metadata: section(&root, "metadata")?,
            options: section(&root, "options")?,
            connectors: section(&root, "connectors")?,
            cables: section(&root, "cables")?,
            connections: section(&root, "connections")?,
            additional_bom_items: section(&root, "additional_bom_items")?,
        })
    }
}

/// Deserialize a top-level section; absent or empty sections get their
/// default value.
fn section<T: DeserializeOwned + Default>(root: &Mapping, name: &'static str) -> Result<T> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_yaml::from_value(value.clone()).map_err(|source| Error::Config {
            section: name,
            source,
        }),
    }
}
