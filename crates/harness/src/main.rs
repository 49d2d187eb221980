use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod bom;
mod connections;
mod load;

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Wiring harness assembly from YAML descriptions", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Bill of Materials for one or more harnesses
    Bom(bom::BomArgs),

    /// Build a harness and list its wire connections
    #[command(aliases = ["b", "build"])]
    Connections(connections::ConnectionsArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --debug only changes the default; RUST_LOG still wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Bom(args) => bom::execute(args),
        Commands::Connections(args) => connections::execute(args),
    }
}
