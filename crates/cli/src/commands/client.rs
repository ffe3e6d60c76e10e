// Path: crates/cli/src/commands/client.rs

use crate::util::{Host, HostArgs};
use anyhow::Result;
use clap::{Parser, Subcommand};
use ioi_lc_services::ibc::light_clients::wasm::client_state::load_checksum_history;
use ioi_lc_services::ibc::light_clients::wasm::{WasmClientState, WasmConsensusState};
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::ibc::{Checksum, ClientId, Height, Status};
use serde::Serialize;

#[derive(Parser, Debug)]
pub struct ClientArgs {
    #[clap(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Lists every initialized client with the checksum it runs.
    List,
    /// Prints the host-side records of one client and asks its module for its status.
    Show {
        client_id: ClientId,
        /// Block time (unix nanoseconds) the status is evaluated at.
        #[clap(long, default_value_t = 0)]
        block_time: u64,
        /// Block height the status is evaluated at.
        #[clap(long, default_value_t = 0)]
        block_height: u64,
    },
}

#[derive(Serialize, Debug)]
pub struct ClientListing {
    pub client_id: ClientId,
    pub checksum: Checksum,
}

#[derive(Serialize, Debug)]
pub struct ClientReport {
    pub client_id: ClientId,
    pub checksum: Checksum,
    pub latest_height: Height,
    pub checksum_history: Vec<Checksum>,
    pub consensus_heights: Vec<Height>,
    pub status: Status,
}

pub fn list(host: &HostArgs) -> Result<Vec<ClientListing>> {
    let host = Host::open(host)?;
    Ok(host
        .gateway
        .module()
        .clients(&host.state)?
        .into_iter()
        .map(|(client_id, checksum)| ClientListing { client_id, checksum })
        .collect())
}

pub fn show(client_id: &ClientId, env: BlockEnv, host: &HostArgs) -> Result<ClientReport> {
    let host = Host::open(host)?;
    let client = host.gateway.module().client(&host.state, client_id, env)?;
    let record = WasmClientState::load(&host.state, client_id)?;
    Ok(ClientReport {
        client_id: client_id.clone(),
        checksum: record.checksum,
        latest_height: record.latest_height,
        checksum_history: load_checksum_history(&host.state, client_id)?,
        consensus_heights: WasmConsensusState::heights(&host.state, client_id)?,
        status: client.status(&host.state)?,
    })
}

pub fn run(args: ClientArgs, host: &HostArgs) -> Result<()> {
    let out = match args.command {
        ClientCommands::List => serde_json::to_string_pretty(&list(host)?)?,
        ClientCommands::Show {
            client_id,
            block_time,
            block_height,
        } => serde_json::to_string_pretty(&show(&client_id, BlockEnv::new(block_height, block_time), host)?)?,
    };
    println!("{}", out);
    Ok(())
}
