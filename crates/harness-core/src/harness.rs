//! Harness graph construction.
//!
//! A [`BuildSession`] owns all state of one build: designator bindings,
//! instantiated components and the connector/cable alternation cursor. It is
//! fed connection sets one by one and finally turned into a [`Harness`].

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use crate::ComponentKind;
use crate::bom::{AdditionalBomItem, BomAggregator, BomTable, SharedBom};
use crate::config::HarnessConfig;
use crate::connection_set::{self, ConnectionEntry, PinRef};
use crate::designator::DesignatorResolver;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::template::{ComponentAttributes, TemplateRegistry};

/// A connector or cable instantiated from a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub designator: String,
    pub template: String,
    pub kind: ComponentKind,
    #[serde(flatten)]
    pub attributes: ComponentAttributes,
}

impl Component {
    pub fn new(
        designator: impl Into<String>,
        template: impl Into<String>,
        kind: ComponentKind,
        attributes: ComponentAttributes,
    ) -> Self {
        Self {
            designator: designator.into(),
            template: template.into(),
            kind,
            attributes,
        }
    }

    /// Highest valid pin number, when the template declares one.
    pub fn pin_count(&self) -> Option<u32> {
        match self.kind {
            ComponentKind::Connector => self.attributes.pincount,
            ComponentKind::Cable => self.attributes.wire_count(),
        }
    }
}

/// One wire of a cable and the connector pins on either end. An end is
/// `None` when the cable starts or ends its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub from: Option<PinRef>,
    pub via: PinRef,
    pub to: Option<PinRef>,
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = |pin: &Option<PinRef>| {
            pin.as_ref()
                .map_or_else(|| "-".to_owned(), ToString::to_string)
        };
        write!(f, "{} -- {} -- {}", end(&self.from), self.via, end(&self.to))
    }
}

/// The fully resolved harness: every instance and every wire connection.
#[derive(Debug, Clone, Serialize)]
pub struct Harness {
    pub metadata: Metadata,
    /// Connectors in order of first appearance.
    pub connectors: IndexMap<String, Component>,
    /// Cables in order of first appearance.
    pub cables: IndexMap<String, Component>,
    pub connections: Vec<Connection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_bom_items: Vec<AdditionalBomItem>,
}

impl Harness {
    /// Assemble a harness from a parsed document.
    ///
    /// Fails on the first structural problem; nothing of a failed build is
    /// returned.
    pub fn build(config: &HarnessConfig, metadata: Metadata) -> Result<Self> {
        let templates = TemplateRegistry::from_config(config);
        let mut session = BuildSession::new(&templates, config.options.template_separator);

        for (index, set) in config.connections.iter().enumerate() {
            session.add_connection_set(index + 1, set)?;
        }

        let additional_bom_items = config
            .additional_bom_items
            .iter()
            .map(AdditionalBomItem::from_value)
            .collect::<Result<Vec<_>>>()?;

        let harness = session.finish(metadata, additional_bom_items);
        log::info!(
            "built harness {:?}: {} connector(s), {} cable(s), {} connection(s)",
            harness.metadata.title,
            harness.connectors.len(),
            harness.cables.len(),
            harness.connections.len()
        );
        Ok(harness)
    }

    pub fn component(&self, designator: &str) -> Option<&Component> {
        self.connectors
            .get(designator)
            .or_else(|| self.cables.get(designator))
    }

    /// Collect this harness' parts: connectors, then cables, then the
    /// additional BOM lines.
    pub fn bom_aggregator(&self) -> BomAggregator {
        let mut bom = BomAggregator::new();
        for component in self.connectors.values().chain(self.cables.values()) {
            bom.add_component(component);
        }
        for item in &self.additional_bom_items {
            bom.add_item(item);
        }
        bom
    }

    pub fn bom(&self) -> BomTable {
        self.bom_aggregator().table()
    }

    /// Add this harness' parts to a BOM shared between several harnesses.
    pub fn merge_into(&self, shared: &SharedBom) {
        shared.merge(self.bom_aggregator());
    }
}

/// Mutable state of a single harness build.
pub struct BuildSession<'a> {
    templates: &'a TemplateRegistry,
    resolver: DesignatorResolver,
    connectors: IndexMap<String, Component>,
    cables: IndexMap<String, Component>,
    connections: Vec<Connection>,
    /// Kind the next chain position must have; unset at the start of a set.
    expected: Option<ComponentKind>,
}

impl<'a> BuildSession<'a> {
    pub fn new(templates: &'a TemplateRegistry, separator: char) -> Self {
        Self {
            templates,
            resolver: DesignatorResolver::new(separator),
            connectors: IndexMap::new(),
            cables: IndexMap::new(),
            connections: Vec::new(),
            expected: None,
        }
    }

    /// Process one connection set (1-based `set`): normalize it, instantiate
    /// every referenced component and record the wire connections.
    pub fn add_connection_set(&mut self, set: usize, entries: &[Value]) -> Result<()> {
        let entries = entries
            .iter()
            .map(|value| ConnectionEntry::from_value(set, value))
            .collect::<Result<Vec<_>>>()?;
        let rows = connection_set::normalize(set, &entries, &mut self.resolver)?;

        self.instantiate(&rows)?;
        self.connect(&rows);
        Ok(())
    }

    pub fn finish(
        self,
        metadata: Metadata,
        additional_bom_items: Vec<AdditionalBomItem>,
    ) -> Harness {
        Harness {
            metadata,
            connectors: self.connectors,
            cables: self.cables,
            connections: self.connections,
            additional_bom_items,
        }
    }

    /// Create components on first reference and check that chain positions
    /// alternate between connectors and cables.
    fn instantiate(&mut self, rows: &[Vec<PinRef>]) -> Result<()> {
        // Each set may start with either kind.
        self.expected = None;

        for row in rows {
            for pin_ref in row {
                let kind = self.instantiate_one(&pin_ref.designator)?;
                self.check_pin(kind, pin_ref)?;
            }
            self.expected = self.expected.map(ComponentKind::flip);
        }
        Ok(())
    }

    fn instantiate_one(&mut self, designator: &str) -> Result<ComponentKind> {
        let template = self
            .resolver
            .template_of(designator)
            .unwrap_or(designator)
            .to_owned();

        if let Some(kind) = self.existing_kind(designator) {
            self.check_type(designator, &template, kind)?;
            return Ok(kind);
        }

        let templates = self.templates;
        let (kind, attributes) = [ComponentKind::Connector, ComponentKind::Cable]
            .into_iter()
            .find_map(|kind| {
                templates
                    .lookup(kind, &template)
                    .map(|attributes| (kind, attributes))
            })
            .ok_or_else(|| Error::UnknownTemplate {
                template: template.clone(),
            })?;

        self.check_type(designator, &template, kind)?;

        log::debug!("instantiating {kind} {designator} from template {template}");
        let component = Component::new(designator, template, kind, attributes.clone());
        self.components_mut(kind)
            .insert(designator.to_owned(), component);
        Ok(kind)
    }

    fn existing_kind(&self, designator: &str) -> Option<ComponentKind> {
        if self.connectors.contains_key(designator) {
            Some(ComponentKind::Connector)
        } else if self.cables.contains_key(designator) {
            Some(ComponentKind::Cable)
        } else {
            None
        }
    }

    fn check_type(
        &mut self,
        designator: &str,
        template: &str,
        actual: ComponentKind,
    ) -> Result<()> {
        let expected = *self.expected.get_or_insert(actual);
        if expected != actual {
            return Err(Error::TypeAlternationViolation {
                designator: designator.to_owned(),
                template: template.to_owned(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn check_pin(&self, kind: ComponentKind, pin_ref: &PinRef) -> Result<()> {
        let count = self
            .components(kind)
            .get(&pin_ref.designator)
            .and_then(Component::pin_count);
        match count {
            Some(count) if pin_ref.pin > count => Err(Error::PinOutOfRange {
                kind,
                designator: pin_ref.designator.clone(),
                pin: pin_ref.pin,
                count,
            }),
            _ => Ok(()),
        }
    }

    /// Walk every parallel path of the set and emit one connection per cable
    /// position, joined to its neighbours.
    fn connect(&mut self, rows: &[Vec<PinRef>]) {
        let count = rows.first().map_or(0, Vec::len);

        for path in 0..count {
            let column: Vec<&PinRef> = rows.iter().map(|row| &row[path]).collect();

            for (position, via) in column.iter().enumerate() {
                if !self.cables.contains_key(&via.designator) {
                    continue;
                }
                let from = position
                    .checked_sub(1)
                    .map(|previous| column[previous].clone());
                let to = column.get(position + 1).map(|&next| next.clone());

                self.connections.push(Connection {
                    from,
                    via: (*via).clone(),
                    to,
                });
            }
        }
    }

    fn components(&self, kind: ComponentKind) -> &IndexMap<String, Component> {
        match kind {
            ComponentKind::Connector => &self.connectors,
            ComponentKind::Cable => &self.cables,
        }
    }

    fn components_mut(&mut self, kind: ComponentKind) -> &mut IndexMap<String, Component> {
        match kind {
            ComponentKind::Connector => &mut self.connectors,
            ComponentKind::Cable => &mut self.cables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(yaml: &str) -> Result<Harness> {
        let config = HarnessConfig::from_yaml_str(yaml)?;
        Harness::build(&config, Metadata::new("test"))
    }

    const TEMPLATES: &str = r#"
connectors:
  DB9:
    type: D-Sub
    pincount: 9
  F:
    type: ferrule
cables:
  W:
    wirecount: 2
    gauge: 0.25 mm2
"#;

    fn with_templates(connections: &str) -> String {
        format!("{TEMPLATES}connections:\n{connections}")
    }

    #[test]
    fn chain_with_cable_in_the_middle() {
        let harness = build(&with_templates(
            "  - [DB9:X1, {'W:': '1-2'}, {DB9:X2: [5, 4]}]\n",
        ))
        .unwrap();

        assert_eq!(
            harness.connectors.keys().collect::<Vec<_>>(),
            vec!["X1", "X2"]
        );
        assert_eq!(harness.cables.keys().collect::<Vec<_>>(), vec!["__W_1"]);
        assert_eq!(
            harness.connections,
            vec![
                Connection {
                    from: Some(PinRef::new("X1", 1)),
                    via: PinRef::new("__W_1", 1),
                    to: Some(PinRef::new("X2", 5)),
                },
                Connection {
                    from: Some(PinRef::new("X1", 1)),
                    via: PinRef::new("__W_1", 2),
                    to: Some(PinRef::new("X2", 4)),
                },
            ]
        );
    }

    #[test]
    fn chain_may_start_and_end_with_cables() {
        let harness = build(&with_templates(
            "  - [{W:W1: [1, 2]}, {DB9:X1: [1, 2]}, {W:W2: [2, 1]}]\n",
        ))
        .unwrap();

        assert_eq!(harness.connections.len(), 4);
        assert_eq!(
            harness.connections[0],
            Connection {
                from: None,
                via: PinRef::new("W1", 1),
                to: Some(PinRef::new("X1", 1)),
            }
        );
        assert_eq!(
            harness.connections[1],
            Connection {
                from: Some(PinRef::new("X1", 1)),
                via: PinRef::new("W2", 2),
                to: None,
            }
        );
    }

    #[test]
    fn instances_are_shared_across_sets() {
        let harness = build(&with_templates(
            "  - [DB9:X1, {W:W1: '1-2'}, ['F:', 'F:']]\n  - [X1, {W:W2: '1-2'}, DB9:X2]\n",
        ))
        .unwrap();

        assert_eq!(
            harness.connectors.keys().collect::<Vec<_>>(),
            vec!["X1", "__F_1", "__F_2", "X2"]
        );
        assert_eq!(harness.cables.len(), 2);
        assert_eq!(harness.connections.len(), 4);
        assert_eq!(harness.component("X1").map(|c| c.template.as_str()), Some("DB9"));
        assert_eq!(harness.component("W2").map(|c| c.kind), Some(ComponentKind::Cable));
    }

    #[test]
    fn template_name_as_designator() {
        let harness = build(&with_templates("  - [DB9, {W: [1]}, DB9]\n")).unwrap();
        assert_eq!(harness.connectors.keys().collect::<Vec<_>>(), vec!["DB9"]);
        assert_eq!(harness.cables.keys().collect::<Vec<_>>(), vec!["W"]);
        assert_eq!(harness.connections.len(), 1);
    }

    #[test]
    fn consecutive_connectors_violate_alternation() {
        let err = build(&with_templates("  - [{DB9:X1: [1]}, DB9:X2]\n")).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeAlternationViolation {
                ref designator,
                ref template,
                expected: ComponentKind::Cable,
                actual: ComponentKind::Connector,
            } if designator == "X2" && template == "DB9"
        ));
    }

    #[test]
    fn existing_instance_is_type_checked() {
        let err = build(&with_templates(
            "  - [DB9:X1, {W:W1: [1]}, DB9:X2]\n  - [X1, W1, X2, W1]\n",
        ));
        assert!(matches!(err, Err(Error::MissingConnectionCount { set: 2 })));

        let err = build(&with_templates(
            "  - [DB9:X1, {W:W1: [1]}, DB9:X2]\n  - [[X1], [X2]]\n",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::TypeAlternationViolation { ref designator, .. } if designator == "X2"
        ));
    }

    #[test]
    fn alternation_cursor_resets_per_set() {
        // The first set ends on a connector, the second starts on a cable.
        let harness = build(&with_templates(
            "  - [{DB9:X1: [1]}, W:W1, DB9:X2]\n  - [{W:W2: [2]}, X2]\n",
        ))
        .unwrap();
        assert_eq!(harness.cables.len(), 2);
    }

    #[test]
    fn hand_picked_names_cannot_shadow_generated_ones() {
        let err = build(&with_templates(
            "  - [DB9:X1, {W:__W_1: [1]}, DB9:X2]\n  - [X2, {'W:': [1]}, DB9:X3]\n",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ReservedDesignator { ref designator, .. } if designator == "__W_1"
        ));

        let harness = build(&with_templates(
            "  - [DB9:X1, {'W:': [1]}, DB9:X2]\n  - [X2, {'W:': [1]}, DB9:X3]\n",
        ))
        .unwrap();
        assert_eq!(
            harness.cables.keys().collect::<Vec<_>>(),
            vec!["__W_1", "__W_2"]
        );
    }

    #[test]
    fn template_defined_twice_uses_the_last_definition() {
        let harness = build(
            "connectors:\n  X: {pincount: 2}\n  X: {pincount: 4}\n\
             cables:\n  W: {wirecount: 1}\n\
             connections:\n  - [{X:J1: [3]}, W:W1]\n",
        )
        .unwrap();
        assert_eq!(harness.connectors["J1"].pin_count(), Some(4));
    }

    #[test]
    fn unknown_template() {
        let err = build(&with_templates("  - [{Nope:X1: [1]}]\n")).unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate { ref template } if template == "Nope"));
    }

    #[test]
    fn wire_beyond_wirecount() {
        let err = build(&with_templates("  - [DB9:X1, {'W:': '1-3'}]\n")).unwrap_err();
        assert!(matches!(
            err,
            Error::PinOutOfRange {
                kind: ComponentKind::Cable,
                pin: 3,
                count: 2,
                ..
            }
        ));
    }

    #[test]
    fn pin_beyond_pincount() {
        let err = build(&with_templates("  - [{DB9:X1: [10]}, W:W1]\n")).unwrap_err();
        assert!(matches!(
            err,
            Error::PinOutOfRange {
                kind: ComponentKind::Connector,
                ref designator,
                pin: 10,
                count: 9,
            } if designator == "X1"
        ));
    }

    #[test]
    fn malformed_additional_bom_item_fails_the_build() {
        let yaml = format!(
            "{}additional_bom_items:\n  - description: Label\n",
            with_templates("  - [DB9:X1, {W:W1: [1]}]\n")
        );
        assert!(matches!(
            build(&yaml),
            Err(Error::MalformedAdditionalBomItem { .. })
        ));
    }
}
