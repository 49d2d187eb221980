use std::io::Write;
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::ComponentKind;
use crate::error::{Error, Result};
use crate::harness::Component;
use crate::template::scalar_string;

/// Unit of cable lengths.
pub const LENGTH_UNIT: &str = "m";

/// Columns every BOM table starts with.
pub const BASE_COLUMNS: [&str; 5] = ["Id", "Description", "Qty", "Unit", "Designators"];

/// Everything that makes two parts interchangeable. Instances with equal
/// entries share one BOM row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BomEntry {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spn: Option<String>,
}

impl BomEntry {
    /// BOM entry and quantity contributed by one component instance.
    pub fn for_component(component: &Component) -> (Self, Decimal) {
        let attrs = &component.attributes;
        let (description, quantity, unit) = match component.kind {
            ComponentKind::Connector => (connector_description(component), Decimal::ONE, None),
            ComponentKind::Cable => match attrs.length {
                Some(length) => (
                    cable_description(component),
                    length,
                    Some(LENGTH_UNIT.to_owned()),
                ),
                None => (cable_description(component), Decimal::ONE, None),
            },
        };

        let entry = BomEntry {
            description,
            unit,
            pn: attrs.pn.clone(),
            manufacturer: attrs.manufacturer.clone(),
            mpn: attrs.mpn.clone(),
            supplier: attrs.supplier.clone(),
            spn: attrs.spn.clone(),
        };
        (entry, quantity)
    }
}

fn connector_description(component: &Component) -> String {
    let attrs = &component.attributes;
    let parts = [
        Some("Connector".to_owned()),
        attrs.type_.clone(),
        attrs.subtype.clone(),
        attrs.pincount.map(|n| format!("{n} pins")),
        attrs.color.clone(),
    ];
    parts.into_iter().flatten().collect::<Vec<_>>().join(", ")
}

fn cable_description(component: &Component) -> String {
    let attrs = &component.attributes;
    let wires = match (attrs.wire_count(), attrs.gauge.as_deref()) {
        (Some(count), Some(gauge)) => Some(format!("{count} x {gauge}")),
        (Some(count), None) => Some(format!("{count} wires")),
        (None, Some(gauge)) => Some(gauge.to_owned()),
        (None, None) => None,
    };
    let parts = [
        Some("Cable".to_owned()),
        attrs.type_.clone(),
        wires,
        attrs.shield.then(|| "shielded".to_owned()),
        attrs.color.clone(),
    ];
    parts.into_iter().flatten().collect::<Vec<_>>().join(", ")
}

/// A manually supplied BOM line (`additional_bom_items`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdditionalBomItem {
    pub description: String,
    #[serde(rename = "qty", alias = "quantity")]
    pub quantity: Decimal,
    pub unit: String,
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
}

impl AdditionalBomItem {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_yaml::from_value(value.clone()).map_err(|err| {
            log::error!("failed to add line {value:?} as an additional BOM item");
            Error::MalformedAdditionalBomItem {
                line: serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}")),
                reason: err.to_string(),
            }
        })
    }

    pub fn bom_entry(&self) -> BomEntry {
        BomEntry {
            description: self.description.clone(),
            unit: Some(self.unit.clone()),
            pn: self.pn.clone(),
            manufacturer: self.manufacturer.clone(),
            mpn: self.mpn.clone(),
            supplier: self.supplier.clone(),
            spn: self.spn.clone(),
        }
    }
}

/// One deduplicated BOM row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBomEntry {
    #[serde(flatten)]
    pub entry: BomEntry,
    pub quantity: Decimal,
    pub designators: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Group {
    quantity: Decimal,
    designators: Vec<String>,
}

/// Accumulates parts into quantity-counted rows.
///
/// Rows are kept in the order their entry was first seen, independent of
/// how many instances are added later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BomAggregator {
    groups: IndexMap<BomEntry, Group>,
}

impl BomAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn add(&mut self, entry: BomEntry, quantity: Decimal, designator: Option<&str>) {
        let group = self.groups.entry(entry).or_default();
        group.quantity += quantity;
        if let Some(designator) = designator {
            group.designators.push(designator.to_owned());
        }
    }

    /// Add a component instance unless its template opts out of the BOM.
    pub fn add_component(&mut self, component: &Component) {
        if component.attributes.ignore_in_bom {
            log::debug!("{} excluded from BOM", component.designator);
            return;
        }
        let (entry, quantity) = BomEntry::for_component(component);
        self.add(entry, quantity, Some(&component.designator));
    }

    pub fn add_item(&mut self, item: &AdditionalBomItem) {
        self.add(item.bom_entry(), item.quantity, None);
    }

    /// Fold another aggregator into this one, keeping this one's row order
    /// and appending rows it has not seen yet.
    pub fn extend(&mut self, other: BomAggregator) {
        for (entry, group) in other.groups {
            let target = self.groups.entry(entry).or_default();
            target.quantity += group.quantity;
            target.designators.extend(group.designators);
        }
    }

    pub fn entries(&self) -> Vec<GroupedBomEntry> {
        self.groups
            .iter()
            .map(|(entry, group)| GroupedBomEntry {
                entry: entry.clone(),
                quantity: group.quantity.normalize(),
                designators: group.designators.clone(),
            })
            .collect()
    }

    pub fn grouped_json(&self) -> String {
        serde_json::to_string_pretty(&self.entries()).unwrap_or_else(|_| "[]".to_owned())
    }

    /// Render the rows for tabular output. Part-number columns appear only
    /// if at least one row fills them.
    pub fn table(&self) -> BomTable {
        let entries = self.entries();
        let columns: Vec<PartColumn> = PartColumn::ALL
            .into_iter()
            .filter(|column| entries.iter().any(|e| column.value(&e.entry).is_some()))
            .collect();

        let header = BASE_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(columns.iter().map(|column| column.header().to_owned()))
            .collect();

        let rows = entries
            .iter()
            .enumerate()
            .map(|(index, grouped)| {
                let mut row = vec![
                    (index + 1).to_string(),
                    grouped.entry.description.clone(),
                    grouped.quantity.to_string(),
                    grouped.entry.unit.clone().unwrap_or_default(),
                    grouped.designators.join(", "),
                ];
                row.extend(
                    columns
                        .iter()
                        .map(|column| column.value(&grouped.entry).unwrap_or_default().to_owned()),
                );
                row
            })
            .collect();

        BomTable { header, rows }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartColumn {
    Pn,
    Manufacturer,
    Mpn,
    Supplier,
    Spn,
}

impl PartColumn {
    const ALL: [PartColumn; 5] = [
        PartColumn::Pn,
        PartColumn::Manufacturer,
        PartColumn::Mpn,
        PartColumn::Supplier,
        PartColumn::Spn,
    ];

    fn header(self) -> &'static str {
        match self {
            PartColumn::Pn => "P/N",
            PartColumn::Manufacturer => "Manufacturer",
            PartColumn::Mpn => "MPN",
            PartColumn::Supplier => "Supplier",
            PartColumn::Spn => "SPN",
        }
    }

    fn value(self, entry: &BomEntry) -> Option<&str> {
        match self {
            PartColumn::Pn => entry.pn.as_deref(),
            PartColumn::Manufacturer => entry.manufacturer.as_deref(),
            PartColumn::Mpn => entry.mpn.as_deref(),
            PartColumn::Supplier => entry.supplier.as_deref(),
            PartColumn::Spn => entry.spn.as_deref(),
        }
    }
}

/// A BOM ready for CSV/TSV/HTML writers: a header row plus positional rows
/// of rendered values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl BomTable {
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        self.write_delimited(writer, b',')
    }

    pub fn write_tsv<W: Write>(&self, writer: W) -> csv::Result<()> {
        self.write_delimited(writer, b'\t')
    }

    fn write_delimited<W: Write>(&self, writer: W, delimiter: u8) -> csv::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// BOM shared by several harness builds, e.g. the sheets of one document.
///
/// Each successful build merges its parts in a single locked step, so a
/// build that fails never leaves a partial contribution behind.
#[derive(Debug, Default)]
pub struct SharedBom {
    inner: Mutex<BomAggregator>,
}

impl SharedBom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, contribution: BomAggregator) {
        let mut bom = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        bom.extend(contribution);
    }

    /// Copy of the current merged state.
    pub fn snapshot(&self) -> BomAggregator {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_inner(self) -> BomAggregator {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
