// Path: crates/types/src/config/mod.rs

//! Configuration structures for the WASM light-client host.
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Defines the fuel (gas) costs for VM host function calls.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VmFuelCosts {
    /// Base cost for any host function call.
    #[serde(default = "default_fuel_base")]
    pub base_cost: u64,
    /// Per-byte cost for writing to state.
    #[serde(default = "default_fuel_state_set_per_byte")]
    pub state_set_per_byte: u64,
    /// Per-byte cost for reading from state.
    #[serde(default = "default_fuel_state_get_per_byte")]
    pub state_get_per_byte: u64,
}

fn default_fuel_base() -> u64 {
    1000
}
fn default_fuel_state_set_per_byte() -> u64 {
    10
}
fn default_fuel_state_get_per_byte() -> u64 {
    5
}

impl Default for VmFuelCosts {
    fn default() -> Self {
        Self {
            base_cost: default_fuel_base(),
            state_set_per_byte: default_fuel_state_set_per_byte(),
            state_get_per_byte: default_fuel_state_get_per_byte(),
        }
    }
}

/// Gas limits per module entry point.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GasLimits {
    /// Gas granted to `instantiate` calls.
    #[serde(default = "default_instantiate_gas")]
    pub instantiate: u64,
    /// Gas granted to `sudo` calls.
    #[serde(default = "default_sudo_gas")]
    pub sudo: u64,
    /// Gas granted to `query` calls.
    #[serde(default = "default_query_gas")]
    pub query: u64,
}

fn default_instantiate_gas() -> u64 {
    50_000_000
}
fn default_sudo_gas() -> u64 {
    100_000_000
}
fn default_query_gas() -> u64 {
    25_000_000
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            instantiate: default_instantiate_gas(),
            sudo: default_sudo_gas(),
            query: default_query_gas(),
        }
    }
}

/// Configuration of the WASM light-client host.
///
/// Loaded from TOML; every field has a default so an empty document is valid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WasmConfig {
    /// The governance authority permitted to upload code, migrate and recover clients.
    #[serde(default = "default_authority")]
    pub authority: String,
    /// Maximum size of an uncompressed module in bytes.
    #[serde(default = "default_max_code_size")]
    pub max_code_size: usize,
    /// Maximum linear memory a module instance may grow to, in bytes.
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: usize,
    /// Number of compiled modules kept in the runtime cache.
    #[serde(default = "default_module_cache_capacity")]
    pub module_cache_capacity: usize,
    /// Maximum key length a module may pass to a store host function.
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
    /// Maximum value length a module may pass to a store host function.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
    /// Whether a client may be migrated back to a checksum it previously ran.
    #[serde(default)]
    pub allow_checksum_reuse: bool,
    /// Gas limits per entry point.
    #[serde(default)]
    pub gas_limits: GasLimits,
    /// Defines the fuel costs for VM host function calls.
    #[serde(default)]
    pub fuel_costs: VmFuelCosts,
}

fn default_authority() -> String {
    "gov".to_string()
}
fn default_max_code_size() -> usize {
    crate::MAX_WASM_CODE_SIZE
}
fn default_memory_limit_bytes() -> usize {
    32 * 1024 * 1024
}
fn default_module_cache_capacity() -> usize {
    16
}
fn default_max_key_bytes() -> usize {
    1024
}
fn default_max_value_bytes() -> usize {
    crate::MAX_WASM_CODE_SIZE
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            max_code_size: default_max_code_size(),
            memory_limit_bytes: default_memory_limit_bytes(),
            module_cache_capacity: default_module_cache_capacity(),
            max_key_bytes: default_max_key_bytes(),
            max_value_bytes: default_max_value_bytes(),
            allow_checksum_reuse: false,
            gas_limits: GasLimits::default(),
            fuel_costs: VmFuelCosts::default(),
        }
    }
}

impl WasmConfig {
    /// Parses a configuration from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        toml::from_str(s).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WasmConfig::from_toml_str("").unwrap();
        assert_eq!(config, WasmConfig::default());
        assert_eq!(config.max_code_size, 3 * 1024 * 1024);
        assert!(!config.allow_checksum_reuse);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = WasmConfig::from_toml_str(
            r#"
            authority = "ioi1govmodule"
            allow_checksum_reuse = true

            [gas_limits]
            query = 1000

            [fuel_costs]
            base_cost = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.authority, "ioi1govmodule");
        assert!(config.allow_checksum_reuse);
        assert_eq!(config.gas_limits.query, 1000);
        assert_eq!(config.gas_limits.sudo, default_sudo_gas());
        assert_eq!(config.fuel_costs.base_cost, 7);
        assert_eq!(config.fuel_costs.state_get_per_byte, 5);
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = WasmConfig::from_toml_str("max_code_size = \"big\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
