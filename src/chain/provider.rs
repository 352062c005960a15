//! HTTP JSON-RPC chain provider with request timeouts

use super::ChainClient;
use crate::config::ChainConfig;
use crate::error::{SubmitterError, SubmitterResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Single-endpoint provider; every request is bounded by `request_timeout`
pub struct ChainProvider {
    rpc_url: String,
    http: Provider<Http>,
    request_timeout: Duration,
}

impl ChainProvider {
    /// Create a provider for the configured endpoint. No request is made.
    pub fn new(config: &ChainConfig) -> SubmitterResult<Self> {
        let http = Provider::<Http>::try_from(config.rpc_url.as_str()).map_err(|e| {
            SubmitterError::Config(format!("Invalid RPC URL {}: {}", config.rpc_url, e))
        })?;

        debug!(
            "Created HTTP provider for chain {}: {}",
            config.chain_id, config.rpc_url
        );

        Ok(Self {
            rpc_url: config.rpc_url.clone(),
            http,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Run one RPC future under the request timeout and classify its error
    async fn request<T, F>(&self, operation: &str, fut: F) -> SubmitterResult<T>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match timeout(self.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let err = classify_provider_error(e);
                debug!("{} failed: {}", operation, err);
                Err(err)
            }
            Err(_) => {
                warn!(
                    "{} timed out after {:?} against {}",
                    operation, self.request_timeout, self.rpc_url
                );
                Err(SubmitterError::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ChainClient for ChainProvider {
    async fn chain_id(&self) -> SubmitterResult<u64> {
        let id = self.request("eth_chainId", self.http.get_chainid()).await?;
        Ok(id.as_u64())
    }

    async fn transaction_count(&self, address: Address) -> SubmitterResult<U256> {
        self.request(
            "eth_getTransactionCount",
            self.http
                .get_transaction_count(address, Some(BlockNumber::Pending.into())),
        )
        .await
    }

    async fn gas_price(&self) -> SubmitterResult<U256> {
        self.request("eth_gasPrice", self.http.get_gas_price()).await
    }

    async fn base_fee(&self) -> SubmitterResult<Option<U256>> {
        let block = self
            .request("eth_getBlockByNumber", self.http.get_block(BlockNumber::Latest))
            .await?;
        Ok(block.and_then(|b| b.base_fee_per_gas))
    }

    async fn balance(&self, address: Address) -> SubmitterResult<U256> {
        self.request("eth_getBalance", self.http.get_balance(address, None))
            .await
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> SubmitterResult<U256> {
        self.request("eth_estimateGas", self.http.estimate_gas(tx, None))
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> SubmitterResult<H256> {
        self.request("eth_sendRawTransaction", async {
            self.http
                .send_raw_transaction(raw)
                .await
                .map(|pending| pending.tx_hash())
        })
        .await
    }
}

/// Map a provider error onto the submitter taxonomy.
///
/// JSON-RPC error bodies are classified by message; anything that never got a
/// JSON-RPC answer is a network failure.
fn classify_provider_error(err: ProviderError) -> SubmitterError {
    if let Some(resp) = RpcError::as_error_response(&err) {
        let data = resp.data.as_ref().and_then(|d| d.as_str());
        return SubmitterError::from_rpc(&resp.message, data);
    }

    if let Some(serde_err) = RpcError::as_serde_error(&err) {
        return SubmitterError::Rejected(format!("Malformed node response: {}", serde_err));
    }

    SubmitterError::Network(err.to_string())
}
