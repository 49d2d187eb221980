use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use harness_core::SharedBom;

use crate::load::{self, InputArgs};

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum BomFormat {
    #[default]
    Table,
    Csv,
    Tsv,
    Json,
}

impl std::fmt::Display for BomFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BomFormat::Table => write!(f, "table"),
            BomFormat::Csv => write!(f, "csv"),
            BomFormat::Tsv => write!(f, "tsv"),
            BomFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Args, Debug, Clone)]
#[command(about = "Generate a Bill of Materials (BOM) from harness descriptions")]
pub struct BomArgs {
    /// Harness YAML files; parts of all files are combined into one BOM
    #[arg(value_name = "FILE", required = true, value_hint = clap::ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(short, long, default_value_t = BomFormat::Table)]
    pub format: BomFormat,
}

pub fn execute(args: BomArgs) -> Result<()> {
    let shared = SharedBom::new();
    for file in &args.files {
        let harness = load::build_harness(file, &args.input)?;
        harness.merge_into(&shared);
    }

    let bom = shared.into_inner();
    log::info!("BOM has {} row(s)", bom.len());

    let mut writer = io::stdout().lock();
    match args.format {
        BomFormat::Table => bom.table().write_table(&mut writer)?,
        BomFormat::Csv => bom.table().write_csv(&mut writer)?,
        BomFormat::Tsv => bom.table().write_tsv(&mut writer)?,
        BomFormat::Json => writeln!(writer, "{}", bom.grouped_json())?,
    };

    Ok(())
}
