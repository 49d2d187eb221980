use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use harness_core::{Harness, HarnessConfig, Metadata};
use serde_yaml::{Mapping, Value};

/// Input options shared by every command that builds a harness.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// YAML files merged in front of each input (shared templates, metadata)
    #[arg(
        short,
        long,
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath
    )]
    pub prepend: Vec<PathBuf>,
}

/// Read `file` and its prepended documents, then build the harness.
pub fn build_harness(file: &Path, input: &InputArgs) -> Result<Harness> {
    let mut document = Value::Null;
    for path in input.prepend.iter().map(PathBuf::as_path).chain([file]) {
        let layer = read_yaml(path)?;
        document = merge(document, layer);
    }

    let config = HarnessConfig::from_value(document)
        .with_context(|| format!("Invalid harness description {}", file.display()))?;
    let defaults = default_metadata(file);
    let metadata = Metadata::from_layers([&defaults, &config.metadata])
        .with_context(|| format!("Invalid metadata in {}", file.display()))?;

    Harness::build(&config, metadata)
        .with_context(|| format!("Failed to build {}", file.display()))
}

fn read_yaml(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    log::debug!("loaded {} ({} bytes)", path.display(), text.len());
    harness_core::yaml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge `overlay` into `base`: mappings are merged key by key, sequences
/// are concatenated, anything else is replaced.
fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => {
                        let current = std::mem::take(existing);
                        *existing = merge(current, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Mapping(base)
        }
        (Value::Sequence(mut base), Value::Sequence(overlay)) => {
            base.extend(overlay);
            Value::Sequence(base)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Title and output name fall back to the input file's stem.
fn default_metadata(file: &Path) -> Mapping {
    let mut defaults = Mapping::new();
    if let Some(stem) = file.file_stem() {
        let stem = Value::String(stem.to_string_lossy().into_owned());
        defaults.insert("title".into(), stem.clone());
        defaults.insert("output_name".into(), stem);
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn merge_combines_nested_sections() {
        let base = yaml(
            "connectors: {A: {pincount: 2}}\nconnections: [[A]]\nmetadata: {title: base}",
        );
        let overlay = yaml(
            "connectors: {B: {pincount: 3}}\nconnections: [[B]]\nmetadata: {title: top}",
        );

        let merged = merge(base, overlay);
        assert_eq!(
            merged,
            yaml(
                "connectors: {A: {pincount: 2}, B: {pincount: 3}}\n\
                 connections: [[A], [B]]\n\
                 metadata: {title: top}"
            )
        );
    }

    #[test]
    fn empty_document_keeps_base() {
        let base = yaml("cables: {W: {wirecount: 1}}");
        assert_eq!(merge(base.clone(), Value::Null), base);
        assert_eq!(merge(Value::Null, base.clone()), base);
    }

    #[test]
    fn metadata_defaults_use_file_stem() {
        let defaults = default_metadata(Path::new("dir/main-harness.yml"));
        assert_eq!(
            defaults.get("title").and_then(Value::as_str),
            Some("main-harness")
        );
        assert_eq!(
            defaults.get("output_name").and_then(Value::as_str),
            Some("main-harness")
        );
    }
}
