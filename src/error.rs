//! Error types for the tournament shuffler

use ethers::abi::{self, ParamType};
use thiserror::Error;

/// Selector of the standard `Error(string)` revert payload
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Main error type for transaction submission
#[derive(Error, Debug)]
pub enum SubmitterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Chain id mismatch: configured {expected}, node reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Nonce conflict: {message}")]
    NonceConflict { message: String },

    #[error("Insufficient funds: {message}")]
    InsufficientFunds { message: String },

    #[error("Out of gas: {message}")]
    OutOfGas { message: String },

    #[error("Contract reverted: {reason}")]
    ContractRevert { reason: String },

    #[error("Transaction rejected by node: {0}")]
    Rejected(String),
}

/// Coarse error taxonomy surfaced at the process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Network,
    Validation,
    Contract,
}

impl ErrorKind {
    /// Process exit code for this kind of failure
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::Network => 3,
            ErrorKind::Validation => 4,
            ErrorKind::Contract => 5,
        }
    }
}

impl SubmitterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitterError::Config(_)
            | SubmitterError::Abi(_)
            | SubmitterError::Wallet(_)
            | SubmitterError::ChainIdMismatch { .. } => ErrorKind::Configuration,
            SubmitterError::Network(_) | SubmitterError::Timeout { .. } => ErrorKind::Network,
            SubmitterError::NonceConflict { .. }
            | SubmitterError::InsufficientFunds { .. }
            | SubmitterError::OutOfGas { .. }
            | SubmitterError::Rejected(_) => ErrorKind::Validation,
            SubmitterError::ContractRevert { .. } => ErrorKind::Contract,
        }
    }

    /// Classify a JSON-RPC error returned by the node.
    ///
    /// Nodes report submission failures as free-form messages, so matching is
    /// done on the lowercase message text. `data` is the optional revert
    /// payload some nodes attach to `execution reverted` errors.
    pub fn from_rpc(message: &str, data: Option<&str>) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("nonce too low")
            || lower.contains("already known")
            || lower.contains("replacement transaction underpriced")
            || lower.contains("nonce has already been used")
        {
            SubmitterError::NonceConflict {
                message: message.to_string(),
            }
        } else if lower.contains("insufficient funds") {
            SubmitterError::InsufficientFunds {
                message: message.to_string(),
            }
        } else if lower.contains("intrinsic gas too low")
            || lower.contains("out of gas")
            || lower.contains("gas required exceeds allowance")
        {
            SubmitterError::OutOfGas {
                message: message.to_string(),
            }
        } else if lower.contains("execution reverted") || lower.contains("revert") {
            let reason = data
                .and_then(decode_revert_reason)
                .unwrap_or_else(|| message.to_string());
            SubmitterError::ContractRevert { reason }
        } else {
            SubmitterError::Rejected(message.to_string())
        }
    }
}

/// Decode an `Error(string)` revert payload given as a hex string
pub fn decode_revert_reason(data: &str) -> Option<String> {
    let raw = hex::decode(data.trim_start_matches("0x")).ok()?;
    if raw.len() < 4 || raw[..4] != ERROR_STRING_SELECTOR {
        return None;
    }

    let tokens = abi::decode(&[ParamType::String], &raw[4..]).ok()?;
    tokens.into_iter().next()?.into_string()
}

/// Result type for submitter operations
pub type SubmitterResult<T> = Result<T, SubmitterError>;
