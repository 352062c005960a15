//! Nonce handling for one-shot submission
//!
//! The nonce is read from the node's pending count right before each
//! transaction is built. The tracker remembers the last nonce this process
//! broadcast and refuses to hand it out again.

use crate::chain::ChainClient;
use crate::error::{SubmitterError, SubmitterResult};

use ethers::types::{Address, U256};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Tracks nonce use for a single sender
pub struct NonceTracker {
    address: Address,
    /// Last nonce successfully broadcast by this process
    last_submitted: Mutex<Option<U256>>,
}

/// A nonce reserved for one submission.
///
/// The lease holds the tracker lock, so submissions through one tracker run
/// one at a time. Dropping it without `commit` leaves the nonce reusable.
pub struct NonceLease<'a> {
    guard: MutexGuard<'a, Option<U256>>,
    nonce: U256,
}

impl NonceLease<'_> {
    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    /// Record the nonce as consumed by a broadcast transaction
    pub fn commit(mut self) {
        *self.guard = Some(self.nonce);
    }
}

impl NonceTracker {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            last_submitted: Mutex::new(None),
        }
    }

    /// Fetch the next nonce from the node and reserve it
    pub async fn lease(&self, client: &dyn ChainClient) -> SubmitterResult<NonceLease<'_>> {
        let guard = self.last_submitted.lock().await;
        let nonce = client.transaction_count(self.address).await?;

        if let Some(last) = *guard {
            if nonce <= last {
                warn!(
                    "Node reports nonce {} for {:?} but {} was already submitted",
                    nonce, self.address, last
                );
                return Err(SubmitterError::NonceConflict {
                    message: format!(
                        "nonce {} already used by this submitter (last submitted {})",
                        nonce, last
                    ),
                });
            }
        }

        debug!("Leased nonce {} for {:?}", nonce, self.address);
        Ok(NonceLease { guard, nonce })
    }

    #[cfg(test)]
    pub async fn last_submitted(&self) -> Option<U256> {
        *self.last_submitted.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;

    fn client_with_counts(counts: Vec<u64>) -> MockChainClient {
        let mut client = MockChainClient::new();
        let mut counts = counts.into_iter();
        client
            .expect_transaction_count()
            .returning(move |_| Ok(U256::from(counts.next().unwrap())));
        client
    }

    #[tokio::test]
    async fn committed_nonce_is_not_reused() {
        let client = client_with_counts(vec![7, 7]);
        let tracker = NonceTracker::new(Address::random());

        let lease = tracker.lease(&client).await.unwrap();
        assert_eq!(lease.nonce(), U256::from(7));
        lease.commit();
        assert_eq!(tracker.last_submitted().await, Some(U256::from(7)));

        let err = tracker.lease(&client).await.err().unwrap();
        assert!(matches!(err, SubmitterError::NonceConflict { .. }));
    }

    #[tokio::test]
    async fn dropped_lease_releases_nonce() {
        let client = client_with_counts(vec![3, 3]);
        let tracker = NonceTracker::new(Address::random());

        drop(tracker.lease(&client).await.unwrap());
        assert_eq!(tracker.last_submitted().await, None);

        let lease = tracker.lease(&client).await.unwrap();
        assert_eq!(lease.nonce(), U256::from(3));
    }

    #[tokio::test]
    async fn advancing_nonce_is_accepted() {
        let client = client_with_counts(vec![1, 2]);
        let tracker = NonceTracker::new(Address::random());

        tracker.lease(&client).await.unwrap().commit();
        let lease = tracker.lease(&client).await.unwrap();
        assert_eq!(lease.nonce(), U256::from(2));
    }

    #[tokio::test]
    async fn node_error_propagates() {
        let mut client = MockChainClient::new();
        client
            .expect_transaction_count()
            .returning(|_| Err(SubmitterError::Network("connection refused".into())));
        let tracker = NonceTracker::new(Address::random());

        let err = tracker.lease(&client).await.err().unwrap();
        assert!(matches!(err, SubmitterError::Network(_)));
    }
}
