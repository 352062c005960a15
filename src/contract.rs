//! Tournament contract binding loaded from an ABI file

use crate::config::ContractConfig;
use crate::error::{SubmitterError, SubmitterResult};

use ethers::abi::{Abi, Function, ParamType, StateMutability, Token};
use ethers::types::{Address, Bytes, U256};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// The deployed tournament contract and its shuffle entry point
#[derive(Debug, Clone)]
pub struct TournamentContract {
    address: Address,
    shuffle: Function,
}

impl TournamentContract {
    /// Read the ABI from `config.abi_path` and bind the configured method
    pub fn load(config: &ContractConfig) -> SubmitterResult<Self> {
        let abi = read_abi(&config.abi_path)?;
        Self::from_abi(&config.address, &abi, &config.method)
    }

    pub fn from_abi(address: &str, abi: &Abi, method: &str) -> SubmitterResult<Self> {
        let address = Address::from_str(address.trim())
            .map_err(|e| SubmitterError::Config(format!("Invalid contract address: {}", e)))?;

        let shuffle = abi
            .function(method)
            .map_err(|_| SubmitterError::Abi(format!("ABI has no function named {}", method)))?
            .clone();

        match shuffle.inputs.as_slice() {
            [param] if matches!(param.kind, ParamType::Uint(_) | ParamType::Int(_)) => {}
            inputs => {
                return Err(SubmitterError::Abi(format!(
                    "{} must take a single integer argument, found {} input(s)",
                    shuffle.signature(),
                    inputs.len()
                )))
            }
        }

        if matches!(
            shuffle.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            warn!(
                "{} is declared {:?}; a transaction will not change state",
                method, shuffle.state_mutability
            );
        }

        debug!(
            "Bound {} (selector 0x{}) at {:?}",
            shuffle.signature(),
            hex::encode(shuffle.short_signature()),
            address
        );

        Ok(Self { address, shuffle })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Canonical signature of the bound method, e.g. `playersShuffle(uint256)`
    pub fn signature(&self) -> String {
        self.shuffle.signature()
    }

    /// Calldata for shuffling `tournament_id`
    pub fn encode_shuffle(&self, tournament_id: U256) -> SubmitterResult<Bytes> {
        let token = match self.shuffle.inputs[0].kind {
            ParamType::Int(_) => Token::Int(tournament_id),
            _ => Token::Uint(tournament_id),
        };

        self.shuffle
            .encode_input(&[token])
            .map(Bytes::from)
            .map_err(|e| SubmitterError::Abi(format!("Failed to encode call: {}", e)))
    }
}

/// Read a JSON ABI document from disk
pub fn read_abi(path: &Path) -> SubmitterResult<Abi> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SubmitterError::Config(format!("Failed to read ABI file {:?}: {}", path, e)))?;

    serde_json::from_str(&text)
        .map_err(|e| SubmitterError::Abi(format!("Failed to parse ABI file {:?}: {}", path, e)))
}
