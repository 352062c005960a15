//! Transaction submission with nonce tracking and an explicit gas policy

mod gas;
mod nonce;
mod submitter;

pub use submitter::TransactionSubmitter;
