//! Configuration management for the tournament shuffler
//!
//! Loads configuration from a TOML file with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file when `--config` is absent
pub const CONFIG_ENV: &str = "SHUFFLER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    pub contract: ContractConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub verify_chain_id: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key
    pub private_key_env: Option<String>,
    pub keystore_path: Option<PathBuf>,
    pub keystore_password_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    pub abi_path: PathBuf,
    #[serde(default = "default_method")]
    pub method: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_gas_limit")]
    pub limit: u64,
    #[serde(default)]
    pub price_strategy: GasPriceStrategy,
    pub fixed_gas_price_gwei: Option<u64>,
    #[serde(default = "default_priority_fee_gwei")]
    pub priority_fee_gwei: u64,
    pub max_gas_price_gwei: Option<u64>,
    #[serde(default)]
    pub price_buffer_percent: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            limit: default_gas_limit(),
            price_strategy: GasPriceStrategy::default(),
            fixed_gas_price_gwei: None,
            priority_fee_gwei: default_priority_fee_gwei(),
            max_gas_price_gwei: None,
            price_buffer_percent: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    /// Legacy transaction priced at the node's `eth_gasPrice`
    #[default]
    Node,
    /// Legacy transaction at `fixed_gas_price_gwei`
    Fixed,
    Eip1559,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    /// Estimate gas before signing to catch reverts and gas shortfalls
    #[serde(default = "default_true")]
    pub preflight: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self { preflight: true }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "playersShuffle".to_string()
}

fn default_gas_limit() -> u64 {
    500_000
}

fn default_priority_fee_gwei() -> u64 {
    30
}

impl Settings {
    /// Load settings from `path`, falling back to `SHUFFLER_CONFIG` and then
    /// `config/default.toml`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let mut settings = Self::from_toml(&config_str)?;

        // Relative ABI paths are resolved against the config file's directory
        if settings.contract.abi_path.is_relative() {
            if let Some(dir) = config_path.parent() {
                let candidate = dir.join(&settings.contract.abi_path);
                if candidate.exists() {
                    settings.contract.abi_path = candidate;
                }
            }
        }

        Ok(settings)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_url.trim().is_empty() {
            anyhow::bail!("chain.rpc_url must not be empty");
        }
        if self.chain.request_timeout_secs == 0 {
            anyhow::bail!("chain.request_timeout_secs must be greater than zero");
        }
        if self.contract.address.trim().is_empty() {
            anyhow::bail!("contract.address must not be empty");
        }
        if self.gas.limit == 0 {
            anyhow::bail!("gas.limit must be greater than zero");
        }
        if self.gas.price_strategy == GasPriceStrategy::Fixed
            && self.gas.fixed_gas_price_gwei.is_none()
        {
            anyhow::bail!("gas.fixed_gas_price_gwei is required for the fixed strategy");
        }
        if self.wallet.private_key_env.is_none() && self.wallet.keystore_path.is_none() {
            anyhow::bail!("wallet needs private_key_env or keystore_path");
        }
        if self.gas.price_strategy == GasPriceStrategy::Node && self.gas.fixed_gas_price_gwei.is_some()
        {
            tracing::warn!("gas.fixed_gas_price_gwei is ignored by the node strategy");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
