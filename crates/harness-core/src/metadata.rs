use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// Fields every harness document must end up with after all metadata
/// layers are merged.
pub const REQUIRED_FIELDS: &[&str] = &["title"];

/// Document metadata handed through to output formatters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Authors, revisions, template settings and anything else.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            output_name: None,
            description: None,
            pn: None,
            company: None,
            notes: None,
            extra: IndexMap::new(),
        }
    }

    /// Merge metadata layers key by key, later layers overriding earlier
    /// ones, and build the result.
    ///
    /// Typical layering is: defaults derived from the input file name, the
    /// document's `metadata` section, then metadata supplied by the caller.
    pub fn from_layers<'a>(layers: impl IntoIterator<Item = &'a Mapping>) -> Result<Self> {
        let mut merged = Mapping::new();
        for layer in layers {
            for (key, value) in layer {
                merged.insert(key.clone(), value.clone());
            }
        }

        for &field in REQUIRED_FIELDS {
            if merged.get(field).is_none_or(Value::is_null) {
                return Err(Error::MetadataConstruction { field });
            }
        }

        serde_yaml::from_value(Value::Mapping(merged)).map_err(|source| Error::Config {
            section: "metadata",
            source,
        })
    }
}
