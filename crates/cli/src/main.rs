// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # ioi-lc
//!
//! Operator tooling for the WASM light-client host: upload and prune modules,
//! inspect clients, and manage the host configuration against a local state file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ioi_lc_cli::commands::{client, code, config};
use ioi_lc_cli::util::HostArgs;
use ioi_lc_telemetry::{init_tracing, LogFormat};

#[derive(Parser, Debug)]
#[clap(
    name = "ioi-lc",
    version,
    about = "Operator tooling for the 08-wasm light-client host."
)]
struct Cli {
    #[clap(flatten)]
    host: HostArgs,

    /// Emit logs as JSON lines instead of human-readable text.
    #[clap(long, global = true)]
    json_logs: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the checksum a module file would be stored under.
    Checksum(code::ChecksumArgs),

    /// Upload a module as the governance authority.
    StoreCode(code::StoreCodeArgs),

    /// List the checksums of every stored module.
    Checksums,

    /// Prune a module no client runs anymore.
    RemoveChecksum(code::RemoveChecksumArgs),

    /// Inspect initialized clients.
    Client(client::ClientArgs),

    /// Generate and validate host configurations.
    Config(config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(format, "warn")?;

    match cli.command {
        Commands::Checksum(args) => println!("{}", code::checksum(args, &cli.host)?),
        Commands::StoreCode(args) => println!("{}", code::store_code(args, &cli.host)?),
        Commands::Checksums => {
            for checksum in code::checksums(&cli.host)? {
                println!("{}", checksum);
            }
        }
        Commands::RemoveChecksum(args) => {
            let checksum = args.checksum.clone();
            code::remove_checksum(args, &cli.host)?;
            println!("Removed {}", checksum);
        }
        Commands::Client(args) => client::run(args, &cli.host)?,
        Commands::Config(args) => config::run(args)?,
    }
    Ok(())
}
