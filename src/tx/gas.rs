//! Gas limit and fee policy
//!
//! The gas limit is always fixed by configuration. Fees follow the configured
//! strategy, with an EIP-1559 chain lacking a base fee falling back to the
//! node's legacy gas price.

use crate::chain::ChainClient;
use crate::config::{GasConfig, GasPriceStrategy};
use crate::error::SubmitterResult;

use ethers::types::U256;
use tracing::{debug, warn};

const GWEI: u64 = 1_000_000_000;

/// Fee fields for a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasPrice {
    Legacy(U256),
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasPrice {
    /// Highest price per gas unit the transaction may pay
    pub fn max_price(&self) -> U256 {
        match self {
            GasPrice::Legacy(price) => *price,
            GasPrice::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }
}

/// Applies the configured gas policy
#[derive(Debug, Clone)]
pub struct GasEstimator {
    gas_limit: U256,
    strategy: GasPriceStrategy,
    fixed_gas_price: Option<U256>,
    priority_fee: U256,
    max_gas_price: Option<U256>,
    /// Buffer percentage added to node-derived prices (e.g., 10 = 10%)
    gas_price_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new(config: &GasConfig) -> Self {
        Self {
            gas_limit: U256::from(config.limit),
            strategy: config.price_strategy,
            fixed_gas_price: config.fixed_gas_price_gwei.map(gwei),
            priority_fee: gwei(config.priority_fee_gwei),
            max_gas_price: config.max_gas_price_gwei.map(gwei),
            gas_price_buffer_percent: config.price_buffer_percent,
        }
    }

    pub fn gas_limit(&self) -> U256 {
        self.gas_limit
    }

    /// Fee fields for the next transaction
    pub async fn get_gas_price(&self, client: &dyn ChainClient) -> SubmitterResult<GasPrice> {
        let price = match self.strategy {
            GasPriceStrategy::Node => self.node_price(client).await?,
            GasPriceStrategy::Fixed => match self.fixed_gas_price {
                Some(price) => GasPrice::Legacy(self.cap(price)),
                None => {
                    warn!("No fixed gas price configured, using node price");
                    self.node_price(client).await?
                }
            },
            GasPriceStrategy::Eip1559 => match client.base_fee().await? {
                Some(base_fee) => self.eip1559_price(base_fee),
                None => {
                    warn!("Latest block has no base fee, falling back to node gas price");
                    self.node_price(client).await?
                }
            },
        };

        debug!("Gas price ({:?} strategy): {:?}", self.strategy, price);
        Ok(price)
    }

    async fn node_price(&self, client: &dyn ChainClient) -> SubmitterResult<GasPrice> {
        let price = client.gas_price().await?;
        Ok(GasPrice::Legacy(self.cap(self.buffered(price))))
    }

    /// Max fee = 2 * base_fee + priority_fee, saturating on absurd node values
    fn eip1559_price(&self, base_fee: U256) -> GasPrice {
        let max_fee = base_fee
            .saturating_mul(U256::from(2))
            .saturating_add(self.priority_fee);
        let max_fee = self.cap(self.buffered(max_fee));
        GasPrice::Eip1559 {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: std::cmp::min(self.priority_fee, max_fee),
        }
    }

    fn buffered(&self, price: U256) -> U256 {
        let buffer = price.saturating_mul(U256::from(self.gas_price_buffer_percent)) / 100;
        price.saturating_add(buffer)
    }

    fn cap(&self, price: U256) -> U256 {
        match self.max_gas_price {
            Some(max) if price > max => {
                warn!("Gas price {} capped at {}", price, max);
                max
            }
            _ => price,
        }
    }

    /// Worst-case cost in wei
    pub fn calculate_cost(gas_limit: U256, gas_price: &GasPrice) -> U256 {
        gas_limit.saturating_mul(gas_price.max_price())
    }
}

fn gwei(amount: u64) -> U256 {
    U256::from(amount) * U256::from(GWEI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;

    fn config(strategy: GasPriceStrategy) -> GasConfig {
        GasConfig {
            price_strategy: strategy,
            ..GasConfig::default()
        }
    }

    #[tokio::test]
    async fn node_strategy_uses_node_price() {
        let mut client = MockChainClient::new();
        client
            .expect_gas_price()
            .times(1)
            .returning(|| Ok(gwei(40)));

        let estimator = GasEstimator::new(&config(GasPriceStrategy::Node));
        let price = estimator.get_gas_price(&client).await.unwrap();
        assert_eq!(price, GasPrice::Legacy(gwei(40)));
        assert_eq!(estimator.gas_limit(), U256::from(500_000));
    }

    #[tokio::test]
    async fn buffer_and_cap_apply_to_node_price() {
        let mut client = MockChainClient::new();
        client.expect_gas_price().returning(|| Ok(gwei(100)));

        let mut cfg = config(GasPriceStrategy::Node);
        cfg.price_buffer_percent = 10;
        let price = GasEstimator::new(&cfg).get_gas_price(&client).await.unwrap();
        assert_eq!(price, GasPrice::Legacy(gwei(110)));

        cfg.max_gas_price_gwei = Some(105);
        let price = GasEstimator::new(&cfg).get_gas_price(&client).await.unwrap();
        assert_eq!(price, GasPrice::Legacy(gwei(105)));
    }

    #[tokio::test]
    async fn fixed_strategy_never_asks_node() {
        let client = MockChainClient::new();
        let mut cfg = config(GasPriceStrategy::Fixed);
        cfg.fixed_gas_price_gwei = Some(35);

        let price = GasEstimator::new(&cfg).get_gas_price(&client).await.unwrap();
        assert_eq!(price, GasPrice::Legacy(gwei(35)));
    }

    #[tokio::test]
    async fn eip1559_doubles_base_fee() {
        let mut client = MockChainClient::new();
        client.expect_base_fee().returning(|| Ok(Some(gwei(50))));

        let price = GasEstimator::new(&config(GasPriceStrategy::Eip1559))
            .get_gas_price(&client)
            .await
            .unwrap();
        assert_eq!(
            price,
            GasPrice::Eip1559 {
                max_fee_per_gas: gwei(130),
                max_priority_fee_per_gas: gwei(30),
            }
        );
    }

    #[tokio::test]
    async fn eip1559_without_base_fee_falls_back_to_legacy() {
        let mut client = MockChainClient::new();
        client.expect_base_fee().returning(|| Ok(None));
        client.expect_gas_price().times(1).returning(|| Ok(gwei(20)));

        let price = GasEstimator::new(&config(GasPriceStrategy::Eip1559))
            .get_gas_price(&client)
            .await
            .unwrap();
        assert_eq!(price, GasPrice::Legacy(gwei(20)));
    }

    #[test]
    fn cost_uses_max_price() {
        let price = GasPrice::Eip1559 {
            max_fee_per_gas: U256::from(3),
            max_priority_fee_per_gas: U256::from(1),
        };
        assert_eq!(
            GasEstimator::calculate_cost(U256::from(100), &price),
            U256::from(300)
        );
    }

    #[tokio::test]
    async fn huge_node_values_saturate() {
        let mut client = MockChainClient::new();
        client.expect_base_fee().returning(|| Ok(Some(U256::MAX)));
        client.expect_gas_price().returning(|| Ok(U256::MAX));

        let mut cfg = config(GasPriceStrategy::Eip1559);
        cfg.price_buffer_percent = 10;
        let price = GasEstimator::new(&cfg).get_gas_price(&client).await.unwrap();
        assert_eq!(price.max_price(), U256::MAX);

        cfg.price_strategy = GasPriceStrategy::Node;
        let price = GasEstimator::new(&cfg).get_gas_price(&client).await.unwrap();
        assert_eq!(price, GasPrice::Legacy(U256::MAX));

        assert_eq!(
            GasEstimator::calculate_cost(U256::from(500_000), &price),
            U256::MAX
        );
    }
}
