// Path: crates/cli/src/util.rs

use anyhow::{Context, Result};
use clap::Args;
use ioi_lc_services::governance::WasmGovernanceGateway;
use ioi_lc_services::ibc::light_clients::wasm::WasmLightClientModule;
use ioi_lc_storage::RedbStore;
use ioi_lc_types::config::WasmConfig;
use ioi_lc_types::ibc::Checksum;
use ioi_lc_vm_wasm::WasmRuntime;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the host state and its configuration live.
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// The redb state file.
    #[clap(long, global = true, default_value = "state.redb")]
    pub state: PathBuf,

    /// A TOML `WasmConfig`; defaults apply when omitted.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
}

/// The host as an embedding chain would build it, over a redb state file.
pub struct Host {
    pub state: RedbStore,
    pub gateway: WasmGovernanceGateway,
    pub config: WasmConfig,
}

impl Host {
    pub fn open(args: &HostArgs) -> Result<Self> {
        let config = load_config(args.config.as_deref())?;
        let runtime = WasmRuntime::from_config(&config).context("failed to build the wasm runtime")?;
        let module = WasmLightClientModule::new(Arc::new(runtime), &config);
        let gateway = WasmGovernanceGateway::new(Arc::new(module), &config);
        let state = RedbStore::open(&args.state)
            .with_context(|| format!("failed to open state at {}", args.state.display()))?;
        tracing::debug!(target: "cli", state = %args.state.display(), authority = %config.authority, "host opened");
        Ok(Self {
            state,
            gateway,
            config,
        })
    }
}

pub fn load_config(path: Option<&Path>) -> Result<WasmConfig> {
    match path {
        Some(path) => Ok(WasmConfig::load(path)?),
        None => Ok(WasmConfig::default()),
    }
}

pub fn parse_checksum(s: &str) -> Result<Checksum> {
    s.parse::<Checksum>()
        .with_context(|| format!("'{}' is not a 32-byte hex checksum", s))
}
