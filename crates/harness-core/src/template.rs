//! Named connector and cable blueprints.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::ComponentKind;
use crate::config::HarnessConfig;

/// Image attached to a connector or cable. The path is kept verbatim; it is
/// resolved by whoever renders the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Attribute bag shared by connector and cable templates.
///
/// The fields the engine understands are typed; anything else is carried in
/// [`ComponentAttributes::extra`] so formatters can still show it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentAttributes {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wirecount: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub gauge: Option<String>,
    /// Cable length in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Decimal>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shield: bool,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mpn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub spn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Exclude instances of this template from the BOM.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_in_bom: bool,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ComponentAttributes {
    /// Number of wires in a cable: `wirecount`, or the number of listed
    /// colors when no count is given.
    pub fn wire_count(&self) -> Option<u32> {
        self.wirecount
            .or_else(|| u32::try_from(self.colors.len()).ok().filter(|n| *n > 0))
    }
}

/// Part numbers and gauges are often written as bare YAML numbers.
pub(crate) fn scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {other:?}"
        ))),
    }
}

/// Name-keyed template storage, one namespace per [`ComponentKind`].
///
/// Filled once before any connection set is processed. Redefining a name
/// replaces the previous template.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    connectors: IndexMap<String, ComponentAttributes>,
    cables: IndexMap<String, ComponentAttributes>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut registry = Self::new();
        for (name, attributes) in &config.connectors {
            registry.define(ComponentKind::Connector, name.clone(), attributes.clone());
        }
        for (name, attributes) in &config.cables {
            registry.define(ComponentKind::Cable, name.clone(), attributes.clone());
        }
        log::debug!(
            "registered {} connector and {} cable template(s)",
            registry.connectors.len(),
            registry.cables.len()
        );
        registry
    }

    /// Store `attributes` under `name`, returning the template it replaced.
    pub fn define(
        &mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        attributes: ComponentAttributes,
    ) -> Option<ComponentAttributes> {
        let name = name.into();
        let previous = self.templates_mut(kind).insert(name.clone(), attributes);
        if previous.is_some() {
            log::warn!("{kind} template {name} redefined, keeping the last definition");
        }
        previous
    }

    pub fn lookup(&self, kind: ComponentKind, name: &str) -> Option<&ComponentAttributes> {
        self.templates(kind).get(name)
    }

    fn templates(&self, kind: ComponentKind) -> &IndexMap<String, ComponentAttributes> {
        match kind {
            ComponentKind::Connector => &self.connectors,
            ComponentKind::Cable => &self.cables,
        }
    }

    fn templates_mut(&mut self, kind: ComponentKind) -> &mut IndexMap<String, ComponentAttributes> {
        match kind {
            ComponentKind::Connector => &mut self.connectors,
            ComponentKind::Cable => &mut self.cables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(yaml: &str) -> ComponentAttributes {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn unknown_keys_are_kept_in_extra() {
        let attrs = attributes(
            r#"
type: D-Sub
pincount: 9
pn: 12345
pinlabels: [GND, TX, RX]
"#,
        );
        assert_eq!(attrs.type_.as_deref(), Some("D-Sub"));
        assert_eq!(attrs.pincount, Some(9));
        assert_eq!(attrs.pn.as_deref(), Some("12345"));
        assert_eq!(attrs.extra.keys().collect::<Vec<_>>(), vec!["pinlabels"]);
    }

    #[test]
    fn wire_count_falls_back_to_colors() {
        let attrs = attributes("colors: [BK, RD, GN, YE]");
        assert_eq!(attrs.wire_count(), Some(4));

        let attrs = attributes("wirecount: 2\ncolors: [BK, RD, GN]");
        assert_eq!(attrs.wire_count(), Some(2));

        assert_eq!(ComponentAttributes::default().wire_count(), None);
    }

    #[test]
    fn lookup_is_scoped_by_kind() {
        let mut registry = TemplateRegistry::new();
        registry.define(ComponentKind::Connector, "W1", attributes("pincount: 2"));
        registry.define(ComponentKind::Cable, "W1", attributes("wirecount: 3"));

        assert_eq!(
            registry
                .lookup(ComponentKind::Connector, "W1")
                .and_then(|t| t.pincount),
            Some(2)
        );
        assert_eq!(
            registry
                .lookup(ComponentKind::Cable, "W1")
                .and_then(|t| t.wirecount),
            Some(3)
        );
        assert!(registry.lookup(ComponentKind::Cable, "X1").is_none());
    }

    #[test]
    fn redefinition_keeps_last_template() {
        let mut registry = TemplateRegistry::new();
        assert!(
            registry
                .define(ComponentKind::Connector, "X", attributes("color: RD"))
                .is_none()
        );
        let previous = registry.define(ComponentKind::Connector, "X", attributes("color: BU"));
        assert_eq!(previous.and_then(|t| t.color).as_deref(), Some("RD"));
        assert_eq!(
            registry
                .lookup(ComponentKind::Connector, "X")
                .and_then(|t| t.color.as_deref()),
            Some("BU")
        );
    }
}
