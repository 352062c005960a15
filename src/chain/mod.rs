//! Chain module - the node-facing seam of the submitter
//!
//! This module provides:
//! - The `ChainClient` trait covering the JSON-RPC calls a submission needs
//! - `ChainProvider`, its HTTP implementation with per-request timeouts

pub mod provider;

pub use provider::ChainProvider;

use crate::error::SubmitterResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, H256, U256};

/// Node operations used to build, check and broadcast one transaction
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the node (`eth_chainId`)
    async fn chain_id(&self) -> SubmitterResult<u64>;

    /// Pending transaction count for `address`, i.e. its next nonce
    async fn transaction_count(&self, address: Address) -> SubmitterResult<U256>;

    /// Node's suggested legacy gas price (`eth_gasPrice`)
    async fn gas_price(&self) -> SubmitterResult<U256>;

    /// Base fee of the latest block, `None` on pre-London chains
    async fn base_fee(&self) -> SubmitterResult<Option<U256>>;

    async fn balance(&self, address: Address) -> SubmitterResult<U256>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> SubmitterResult<U256>;

    /// Broadcast signed bytes and return the node-assigned hash
    async fn send_raw_transaction(&self, raw: Bytes) -> SubmitterResult<H256>;
}
