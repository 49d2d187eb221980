//! Normalization of connection sets.
//!
//! A connection set is a chain of entries written in shorthand:
//!
//! * `"X1"`, `"DB9:X1"` or `"W:"`: a single token, repeated for every
//!   parallel connection of the set;
//! * `["X1", "X2", "X3"]`: one token per parallel connection, pin 1 each;
//! * `{"X1": "1-4"}`: one designator, one pin per parallel connection.
//!
//! [`normalize`] turns such a chain into a rectangular matrix of [`PinRef`]s
//! where every row is a chain position and every column a parallel path.

use serde::Serialize;
use serde_yaml::Value;

use crate::designator::DesignatorResolver;
use crate::error::{Error, Result};
use crate::pins::{self, Pin};

/// One pin of one component instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PinRef {
    pub designator: String,
    pub pin: Pin,
}

impl PinRef {
    pub fn new(designator: impl Into<String>, pin: Pin) -> Self {
        Self {
            designator: designator.into(),
            pin,
        }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.designator, self.pin)
    }
}

/// A single chain position as written in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEntry {
    Token(String),
    List(Vec<String>),
    Pins { key: String, pins: Vec<Pin> },
}

impl ConnectionEntry {
    /// Interpret one element of a connection set. `set` is the 1-based
    /// position of the set, used for error messages.
    pub fn from_value(set: usize, value: &Value) -> Result<Self> {
        let unsupported = || Error::InvalidConnectionEntry {
            set,
            entry: serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}")),
        };

        match value {
            Value::String(token) => Ok(Self::Token(token.clone())),
            Value::Sequence(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned).ok_or_else(unsupported))
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            Value::Mapping(mapping) if mapping.len() == 1 => {
                let Some((key, pins)) = mapping.iter().next() else {
                    return Err(unsupported());
                };
                let key = key.as_str().ok_or_else(unsupported)?.to_owned();
                let pins = pins::expand_value(pins)?;
                Ok(Self::Pins { key, pins })
            }
            _ => Err(unsupported()),
        }
    }

    /// Number of parallel connections this entry implies. Bare tokens adapt
    /// to the rest of the set and imply none.
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Self::Token(_) => None,
            Self::List(items) => Some(items.len()),
            Self::Pins { pins, .. } => Some(pins.len()),
        }
    }
}

/// Determine the common connection count of a set.
pub fn connection_count(set: usize, entries: &[ConnectionEntry]) -> Result<usize> {
    let counts: Vec<usize> = entries
        .iter()
        .filter_map(ConnectionEntry::cardinality)
        .collect();

    let Some(&count) = counts.first() else {
        return Err(Error::MissingConnectionCount { set });
    };
    if counts.iter().any(|&c| c != count) {
        return Err(Error::ConnectionCountMismatch { set, counts });
    }
    if count == 0 {
        return Err(Error::MissingConnectionCount { set });
    }
    Ok(count)
}

/// Expand a connection set into a `rows x count` matrix of resolved pins.
///
/// Tokens are resolved in chain order, so every copy of an auto-naming token
/// (`"W:"`) receives its own designator.
pub fn normalize(
    set: usize,
    entries: &[ConnectionEntry],
    resolver: &mut DesignatorResolver,
) -> Result<Vec<Vec<PinRef>>> {
    let count = connection_count(set, entries)?;
    log::debug!(
        "connection set {set}: {count} parallel connection(s) over {} entries",
        entries.len()
    );

    entries
        .iter()
        .map(|entry| normalize_entry(entry, count, resolver))
        .collect()
}

fn normalize_entry(
    entry: &ConnectionEntry,
    count: usize,
    resolver: &mut DesignatorResolver,
) -> Result<Vec<PinRef>> {
    match entry {
        ConnectionEntry::Token(token) => (0..count)
            .map(|_| resolver.resolve(token).map(|r| PinRef::new(r.designator, 1)))
            .collect(),
        ConnectionEntry::List(tokens) => tokens
            .iter()
            .map(|token| resolver.resolve(token).map(|r| PinRef::new(r.designator, 1)))
            .collect(),
        ConnectionEntry::Pins { key, pins } => {
            let designator = resolver.resolve(key)?.designator;
            Ok(pins
                .iter()
                .map(|&pin| PinRef::new(designator.clone(), pin))
                .collect())
        }
    }
}
