// Path: crates/cli/src/commands/code.rs

use crate::util::{load_config, parse_checksum, Host, HostArgs};
use anyhow::{Context, Result};
use clap::Parser;
use ioi_lc_crypto::algorithms::hash::checksum_of;
use ioi_lc_services::ibc::light_clients::wasm::unpack_module;
use ioi_lc_types::app::Authority;
use ioi_lc_types::ibc::Checksum;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct ChecksumArgs {
    /// A module file, raw or zstd-compressed.
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct StoreCodeArgs {
    /// A module file, raw or zstd-compressed.
    pub file: PathBuf,
    /// The governance authority to act as.
    #[clap(long)]
    pub authority: String,
}

#[derive(Parser, Debug)]
pub struct RemoveChecksumArgs {
    /// The hex checksum of the module to prune.
    pub checksum: String,
    /// The governance authority to act as.
    #[clap(long)]
    pub authority: String,
}

fn read_module(path: &PathBuf) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Computes the checksum a module would be stored under, without touching state.
pub fn checksum(args: ChecksumArgs, host: &HostArgs) -> Result<Checksum> {
    let config = load_config(host.config.as_deref())?;
    let module = unpack_module(&read_module(&args.file)?, config.max_code_size)?;
    Ok(checksum_of(&module))
}

pub fn store_code(args: StoreCodeArgs, host: &HostArgs) -> Result<Checksum> {
    let code = read_module(&args.file)?;
    let mut host = Host::open(host)?;
    let checksum = host
        .gateway
        .store_code(&mut host.state, &code, &Authority::new(args.authority))?;
    Ok(checksum)
}

pub fn checksums(host: &HostArgs) -> Result<Vec<Checksum>> {
    let host = Host::open(host)?;
    Ok(host.gateway.module().code_store().checksums(&host.state)?)
}

pub fn remove_checksum(args: RemoveChecksumArgs, host: &HostArgs) -> Result<()> {
    let checksum = parse_checksum(&args.checksum)?;
    let mut host = Host::open(host)?;
    host.gateway
        .remove_checksum(&mut host.state, &checksum, &Authority::new(args.authority))?;
    Ok(())
}
