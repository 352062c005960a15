//! Signing key loading

use crate::config::WalletConfig;
use crate::error::{SubmitterError, SubmitterResult};

use ethers::signers::{LocalWallet, Signer};
use tracing::{debug, info};

/// Load the signing wallet, bound to `chain_id` for replay protection.
///
/// A hex key from the environment variable named by `private_key_env` wins
/// over an encrypted keystore.
pub fn load_wallet(config: &WalletConfig, chain_id: u64) -> SubmitterResult<LocalWallet> {
    let wallet = if let Some(var) = &config.private_key_env {
        match std::env::var(var) {
            Ok(key) => wallet_from_hex(&key)?,
            Err(_) if config.keystore_path.is_some() => {
                debug!("{} is not set, trying keystore", var);
                load_keystore(config)?
            }
            Err(_) => {
                return Err(SubmitterError::Wallet(format!(
                    "Environment variable {} is not set",
                    var
                )))
            }
        }
    } else {
        load_keystore(config)?
    };

    let wallet = wallet.with_chain_id(chain_id);
    info!("Loaded wallet {:?}", wallet.address());
    Ok(wallet)
}

/// Parse a hex private key, with or without a `0x` prefix
pub fn wallet_from_hex(key: &str) -> SubmitterResult<LocalWallet> {
    let key = key.trim();
    let key = key
        .strip_prefix("0x")
        .or_else(|| key.strip_prefix("0X"))
        .unwrap_or(key);

    let bytes = hex::decode(key)
        .map_err(|e| SubmitterError::Wallet(format!("Invalid private key hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(SubmitterError::Wallet(format!(
            "Private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    LocalWallet::from_bytes(&bytes)
        .map_err(|e| SubmitterError::Wallet(format!("Invalid private key: {}", e)))
}

fn load_keystore(config: &WalletConfig) -> SubmitterResult<LocalWallet> {
    let path = config.keystore_path.as_ref().ok_or_else(|| {
        SubmitterError::Wallet("No wallet configured. Set private_key_env or keystore_path".into())
    })?;

    let password = match &config.keystore_password_env {
        Some(var) => std::env::var(var).map_err(|_| {
            SubmitterError::Wallet(format!("Environment variable {} is not set", var))
        })?,
        None => String::new(),
    };

    LocalWallet::decrypt_keystore(path, password)
        .map_err(|e| SubmitterError::Wallet(format!("Failed to decrypt keystore {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn expected_address() -> Address {
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap()
    }

    #[test]
    fn parses_key_with_and_without_prefix() {
        let plain = wallet_from_hex(KEY).unwrap();
        let prefixed = wallet_from_hex(&format!("0x{KEY}")).unwrap();
        assert_eq!(plain.address(), expected_address());
        assert_eq!(prefixed.address(), expected_address());
    }

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            wallet_from_hex("abcd"),
            Err(SubmitterError::Wallet(_))
        ));
    }

    #[test]
    fn rejects_non_hex_key() {
        assert!(wallet_from_hex("not-a-key").is_err());
    }

    #[test]
    fn loads_from_env_with_chain_id() {
        std::env::set_var("SHUFFLER_TEST_WALLET_KEY", KEY);
        let config = WalletConfig {
            private_key_env: Some("SHUFFLER_TEST_WALLET_KEY".into()),
            ..Default::default()
        };
        let wallet = load_wallet(&config, 80001).unwrap();
        assert_eq!(wallet.address(), expected_address());
        assert_eq!(wallet.chain_id(), 80001);
    }

    #[test]
    fn missing_env_without_keystore_fails() {
        let config = WalletConfig {
            private_key_env: Some("SHUFFLER_TEST_UNSET_WALLET_KEY".into()),
            ..Default::default()
        };
        assert!(matches!(
            load_wallet(&config, 1),
            Err(SubmitterError::Wallet(_))
        ));
    }
}
