//! Wiring harness assembly.
//!
//! Turns a YAML harness description (connector and cable templates plus
//! connection sets written in shorthand) into a resolved [`Harness`] and a
//! grouped bill of materials.
//!
//! * [`designator`] resolves `TEMPLATE:DESIGNATOR` tokens and names
//!   anonymous instances.
//! * [`connection_set`] expands shorthand sets into pin matrices.
//! * [`harness`] instantiates components, enforces connector/cable
//!   alternation and records every wire connection.
//! * [`bom`] groups identical parts into quantity-counted rows.
//!
//! ```
//! use harness_core::{Harness, HarnessConfig, Metadata};
//!
//! let config = HarnessConfig::from_yaml_str(
//!     r#"
//! connectors:
//!   DB9: {pincount: 9}
//! cables:
//!   CAB1: {wirecount: 3, length: 1}
//! connections:
//!   - [DB9:P1, {'CAB1:': '1-3'}, DB9:P2]
//! "#,
//! )?;
//! let harness = Harness::build(&config, Metadata::new("Example"))?;
//! assert_eq!(harness.connections.len(), 3);
//! # Ok::<(), harness_core::Error>(())
//! ```

pub mod bom;
pub mod config;
pub mod connection_set;
pub mod designator;
mod error;
pub mod harness;
pub mod metadata;
pub mod pins;
pub mod template;
pub mod yaml;

use serde::{Deserialize, Serialize};

pub use bom::{BomAggregator, BomTable, SharedBom};
pub use config::{HarnessConfig, HarnessOptions};
pub use connection_set::PinRef;
pub use error::{Error, Result};
pub use harness::{BuildSession, Component, Connection, Harness};
pub use metadata::Metadata;
pub use template::{ComponentAttributes, TemplateRegistry};

/// Discriminates connector and cable templates and instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Connector,
    Cable,
}

impl ComponentKind {
    /// The kind that must follow this one in a connection chain.
    pub const fn flip(self) -> Self {
        match self {
            ComponentKind::Connector => ComponentKind::Cable,
            ComponentKind::Cable => ComponentKind::Connector,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Connector => "connector",
            ComponentKind::Cable => "cable",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
