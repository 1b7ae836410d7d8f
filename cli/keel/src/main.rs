//! Keel CLI: C header import and symbol tools for the Keel compiler.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keel", version, about = "The Keel Programming Language")]
struct Cli {
    /// Log more (-v for progress, -vv for every skipped declaration)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import C headers and print the resulting declarations
    Import {
        /// Import configuration (keel-import.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Import these headers instead of the configured ones
        #[arg(long = "header", value_name = "FILE")]
        headers: Vec<PathBuf>,
        /// Output format (human, json)
        #[arg(long)]
        format: Option<String>,
        /// Also print the symbol each function links against
        #[arg(long)]
        symbols: bool,
    },
    /// Decode mangled symbols
    Demangle {
        /// Symbols to decode; anything not mangled is echoed back
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Print the import configuration as TOML
    Config {
        /// Validate and print this file instead of the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Import {
            config,
            headers,
            format,
            symbols,
        } => commands::import::run(config.as_deref(), &headers, format.as_deref(), symbols),

        Commands::Demangle { symbols } => commands::demangle::run(&symbols),

        Commands::Config { config } => commands::config::run(config.as_deref()),
    }
}
