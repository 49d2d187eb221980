use thiserror::Error;

use crate::ComponentKind;
use crate::pins::Pin;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort a harness build.
///
/// Every variant is fatal to the build that produced it; nothing is retried
/// and no partial graph or BOM survives.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{token} - found more than one separator ({separator})")]
    AmbiguousSeparator { token: String, separator: char },

    #[error("trying to redefine {designator} from {existing} to {requested}")]
    DesignatorConflict {
        designator: String,
        existing: String,
        requested: String,
    },

    #[error("designator {designator} uses the reserved prefix `{prefix}`")]
    ReservedDesignator {
        designator: String,
        prefix: &'static str,
    },

    #[error("{template} is an unknown template/designator")]
    UnknownTemplate { template: String },

    #[error("no connection count found in connection set {set}")]
    MissingConnectionCount { set: usize },

    #[error(
        "all items in connection set {set} must reference the same number of connections \
         (found {})",
        join_counts(.counts)
    )]
    ConnectionCountMismatch { set: usize, counts: Vec<usize> },

    #[error("expected {expected}, but \"{designator}\" (\"{template}\") is {actual}")]
    TypeAlternationViolation {
        designator: String,
        template: String,
        expected: ComponentKind,
        actual: ComponentKind,
    },

    #[error("failed to add line {line} as an additional BOM item: {reason}")]
    MalformedAdditionalBomItem { line: String, reason: String },

    #[error("metadata definition is missing required field `{field}`")]
    MetadataConstruction { field: &'static str },

    #[error("invalid pin list `{input}`: {reason}")]
    InvalidPinList { input: String, reason: String },

    #[error("connection set {set} contains an unsupported entry: {entry}")]
    InvalidConnectionEntry { set: usize, entry: String },

    #[error("{kind} {designator} has no pin {pin} (it has {count})")]
    PinOutOfRange {
        kind: ComponentKind,
        designator: String,
        pin: Pin,
        count: u32,
    },

    #[error("invalid `{section}` section: {source}")]
    Config {
        section: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn join_counts(counts: &[usize]) -> String {
    counts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" vs ")
}
