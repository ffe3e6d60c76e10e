// Path: crates/cli/src/commands/config.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ioi_lc_types::config::WasmConfig;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Writes the default host configuration.
    New {
        #[clap(long, default_value = "wasm.toml")]
        out: PathBuf,
        /// Overwrite an existing file.
        #[clap(long)]
        force: bool,
    },
    /// Parses a configuration file and reports the first problem.
    Check { path: PathBuf },
}

pub fn default_toml() -> Result<String> {
    Ok(toml::to_string_pretty(&WasmConfig::default())?)
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::New { out, force } => {
            if out.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", out.display());
            }
            fs::write(&out, default_toml()?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        ConfigCommands::Check { path } => {
            let config = WasmConfig::load(&path)?;
            println!(
                "{}: ok (authority '{}', max_code_size {})",
                path.display(),
                config.authority,
                config.max_code_size
            );
        }
    }
    Ok(())
}
