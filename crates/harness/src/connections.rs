use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::load::{self, InputArgs};

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ConnectionsFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for ConnectionsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionsFormat::Text => write!(f, "text"),
            ConnectionsFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionsArgs {
    /// Harness YAML file
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,

    #[command(flatten)]
    pub input: InputArgs,

    /// Output format; `json` dumps the whole resolved harness
    #[arg(short, long, default_value_t = ConnectionsFormat::Text)]
    pub format: ConnectionsFormat,
}

pub fn execute(args: ConnectionsArgs) -> Result<()> {
    let harness = load::build_harness(&args.file, &args.input)?;

    let mut writer = io::stdout().lock();
    match args.format {
        ConnectionsFormat::Text => {
            for connection in &harness.connections {
                writeln!(writer, "{connection}")?;
            }
        }
        ConnectionsFormat::Json => {
            writeln!(writer, "{}", serde_json::to_string_pretty(&harness)?)?;
        }
    }

    Ok(())
}
