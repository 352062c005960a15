//! Builds, signs and broadcasts the players shuffle transaction

use super::gas::{GasEstimator, GasPrice};
use super::nonce::NonceTracker;
use crate::chain::ChainClient;
use crate::config::Settings;
use crate::contract::TournamentContract;
use crate::error::{SubmitterError, SubmitterResult};
use crate::wallet;

use chrono::{DateTime, Utc};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, H256, U256};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Record of one broadcast transaction
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub tx_hash: H256,
    pub tournament_id: U256,
    pub nonce: U256,
    pub from: Address,
    pub contract: Address,
    pub chain_id: u64,
    pub gas_limit: U256,
    pub submitted_at: DateTime<Utc>,
}

/// Submits `playersShuffle` calls for a single sender account
pub struct TransactionSubmitter {
    client: Arc<dyn ChainClient>,
    wallet: LocalWallet,
    contract: TournamentContract,
    gas_estimator: GasEstimator,
    nonces: NonceTracker,
    chain_id: u64,
    preflight: bool,
}

impl TransactionSubmitter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        wallet: LocalWallet,
        contract: TournamentContract,
        gas_estimator: GasEstimator,
        chain_id: u64,
    ) -> Self {
        let wallet = wallet.with_chain_id(chain_id);
        let nonces = NonceTracker::new(wallet.address());

        Self {
            client,
            wallet,
            contract,
            gas_estimator,
            nonces,
            chain_id,
            preflight: true,
        }
    }

    /// Load wallet and contract binding from settings
    pub fn from_settings(
        settings: &Settings,
        client: Arc<dyn ChainClient>,
    ) -> SubmitterResult<Self> {
        let wallet = wallet::load_wallet(&settings.wallet, settings.chain.chain_id)?;
        let contract = TournamentContract::load(&settings.contract)?;
        let gas_estimator = GasEstimator::new(&settings.gas);

        info!(
            "Submitter ready: {} on {:?} (chain {})",
            contract.signature(),
            contract.address(),
            settings.chain.chain_id
        );

        Ok(Self::new(
            client,
            wallet,
            contract,
            gas_estimator,
            settings.chain.chain_id,
        )
        .with_preflight(settings.submission.preflight))
    }

    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    pub fn sender(&self) -> Address {
        self.wallet.address()
    }

    /// Fail unless the node serves the configured chain
    pub async fn verify_chain(&self) -> SubmitterResult<()> {
        let actual = self.client.chain_id().await?;
        if actual != self.chain_id {
            return Err(SubmitterError::ChainIdMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        debug!("Node chain id {} matches configuration", actual);
        Ok(())
    }

    /// Submit `playersShuffle(tournament_id)` and return the transaction hash.
    ///
    /// Returns as soon as the node accepts the transaction; inclusion and
    /// execution are not awaited.
    pub async fn submit_players_shuffle(&self, tournament_id: U256) -> SubmitterResult<H256> {
        self.submit_players_shuffle_detailed(tournament_id)
            .await
            .map(|submission| submission.tx_hash)
    }

    pub async fn submit_players_shuffle_detailed(
        &self,
        tournament_id: U256,
    ) -> SubmitterResult<Submission> {
        let lease = self.nonces.lease(self.client.as_ref()).await?;
        let nonce = lease.nonce();

        let gas_price = self
            .gas_estimator
            .get_gas_price(self.client.as_ref())
            .await?;

        let tx = self.build_shuffle_tx(tournament_id, nonce, &gas_price)?;

        if self.preflight {
            self.preflight_check(&tx, &gas_price).await?;
        }

        let raw = self.sign(&tx).await?;
        let tx_hash = self.client.send_raw_transaction(raw).await?;
        lease.commit();

        info!(
            "Shuffle for tournament {} sent: {:?} (nonce {})",
            tournament_id, tx_hash, nonce
        );

        Ok(Submission {
            tx_hash,
            tournament_id,
            nonce,
            from: self.wallet.address(),
            contract: self.contract.address(),
            chain_id: self.chain_id,
            gas_limit: self.gas_estimator.gas_limit(),
            submitted_at: Utc::now(),
        })
    }

    /// Build the unsigned shuffle transaction
    pub fn build_shuffle_tx(
        &self,
        tournament_id: U256,
        nonce: U256,
        gas_price: &GasPrice,
    ) -> SubmitterResult<TypedTransaction> {
        let data = self.contract.encode_shuffle(tournament_id)?;
        let from = self.wallet.address();
        let to = self.contract.address();
        let gas_limit = self.gas_estimator.gas_limit();

        let tx = match gas_price {
            GasPrice::Legacy(price) => TypedTransaction::Legacy(
                TransactionRequest::new()
                    .from(from)
                    .to(to)
                    .data(data)
                    .nonce(nonce)
                    .gas(gas_limit)
                    .gas_price(*price)
                    .chain_id(self.chain_id),
            ),
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => TypedTransaction::Eip1559(
                Eip1559TransactionRequest::new()
                    .from(from)
                    .to(to)
                    .data(data)
                    .nonce(nonce)
                    .gas(gas_limit)
                    .max_fee_per_gas(*max_fee_per_gas)
                    .max_priority_fee_per_gas(*max_priority_fee_per_gas)
                    .chain_id(self.chain_id),
            ),
        };

        Ok(tx)
    }

    /// Estimate gas and check the balance without broadcasting anything
    async fn preflight_check(
        &self,
        tx: &TypedTransaction,
        gas_price: &GasPrice,
    ) -> SubmitterResult<()> {
        let gas_limit = self.gas_estimator.gas_limit();

        let estimate = self.client.estimate_gas(tx).await?;
        if estimate > gas_limit {
            warn!("Estimated gas {} exceeds limit {}", estimate, gas_limit);
            return Err(SubmitterError::OutOfGas {
                message: format!("estimated {} gas exceeds limit {}", estimate, gas_limit),
            });
        }

        let balance = self.client.balance(self.wallet.address()).await?;
        let cost = GasEstimator::calculate_cost(gas_limit, gas_price);
        if balance < cost {
            return Err(SubmitterError::InsufficientFunds {
                message: format!("balance {} wei, worst-case fee {} wei", balance, cost),
            });
        }

        debug!("Preflight ok: estimate {}, limit {}", estimate, gas_limit);
        Ok(())
    }

    async fn sign(&self, tx: &TypedTransaction) -> SubmitterResult<Bytes> {
        let signature = self
            .wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| SubmitterError::Wallet(format!("Failed to sign transaction: {}", e)))?;
        Ok(tx.rlp_signed(&signature))
    }
}
