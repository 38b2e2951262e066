//! SDK configuration and well-known protocol addresses
//!
//! Mainnet constants for the vault and multi-rewards packages plus the
//! concrete implementation addresses the platform detector compares against.
//! `SdkConfig` carries everything environment-specific: endpoints, API keys
//! and the MovePosition broker mapping.

use std::collections::HashMap;

/// Satay vault package (mainnet)
pub const SATAY_PACKAGE: &str =
    "0x9d6dc1a06be65ae2ae1b7ca0f0e7e1c5c851bfb2e3c0b205e1d27e05c4ff8c1e";

/// Multi-rewards staking package (mainnet)
pub const MULTI_REWARDS_PACKAGE: &str =
    "0x5e1c7a55ee7a3cb1f3c2d2f24b46f8deb3c7c4408a8d7f1ff86b7c6ab0e9d2a4";

/// Native gas coin type, the default type argument for fungible-asset vaults
pub const APTOS_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";

/// Concrete implementation addresses used for platform classification.
/// Compared under normalization, so casing/prefix never matters here.
pub mod concrete {
    pub const MOVEPOSITION: &str =
        "0x44a8d9cbbf1cba8cbbcd0e9b1a4b27cf1a1f6e6790e6ab833ff7bee0bd0cf6a2";
    pub const ECHELON: &str =
        "0xcb9ea38d9d1c52a1ba5cb2a80e9c4e0b4f2a7b12c7d11d01ba0c39a47f5c1d83";
    pub const LAYERBANK: &str =
        "0xf219f0e3ba44b7b09fcc04bb1aef33c5a9b4bf094a4e1a331c9a5b73e1e0fa12";
    pub const MERIDIAN: &str =
        "0x7f4b1e6c3a2d9b08c15de67f0d12aa4c8e9b3f5a61c2d4e8f7a9b0c1d2e3f405";
}

/// Pool-discovery network name sent to the MovePosition API
pub const MOVEPOSITION_NETWORK: &str = "aptos";

/// Static staking-token -> reward-pool mapping, the second resolution layer
/// for stake transactions. Keys and pool addresses are canonical form.
pub const STATIC_STAKING_POOLS: &[(&str, &[&str])] = &[
    (
        // sUSDC vault shares
        "0x1c6b7a9e2f0d4c8b5a3e1f7d9c0b2a4e6f8d0c2b4a6e8f0d2c4b6a8e0f2d4c6b",
        &["0x3a1b5c7d9e0f2a4c6e8b0d2f4a6c8e0b2d4f6a8c0e2b4d6f8a0c2e4b6d8f0a2c"],
    ),
    (
        // sAPT vault shares
        "0x8e2d4f6a0c2e4b6d8f0a2c4e6b8d0f2a4c6e8b0d2f4a6c8e0b2d4f6a8c0e2b4d",
        &[
            "0x5d7e9f1a3c5e7b9d1f3a5c7e9b1d3f5a7c9e1b3d5f7a9c1e3b5d7f9a1c3e5b7d",
            "0x6e8f0a2c4e6b8d0f2a4c6e8b0d2f4a6c8e0b2d4f6a8c0e2b4d6f8a0c2e4b6d8f",
        ],
    ),
];

/// MovePosition integration settings
///
/// Absent entirely when the deployment does not use MovePosition strategies;
/// packet generation degrades to empty packets in that case.
#[derive(Debug, Clone)]
pub struct MovePositionConfig {
    /// Broker API base URL
    pub api_url: String,
    /// Network name included in packet requests
    pub network: String,
    /// Vault asset address -> broker name
    pub broker_names: HashMap<String, String>,
}

impl MovePositionConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            network: MOVEPOSITION_NETWORK.to_string(),
            broker_names: HashMap::new(),
        }
    }

    pub fn with_broker(mut self, asset: impl Into<String>, broker: impl Into<String>) -> Self {
        self.broker_names
            .insert(crate::chain::address::normalize_address(&asset.into()), broker.into());
        self
    }

    /// Broker name for a vault asset, compared under address normalization
    pub fn broker_for(&self, asset: &str) -> Option<&str> {
        self.broker_names
            .get(&crate::chain::address::normalize_address(asset))
            .map(String::as_str)
    }
}

/// Top-level SDK configuration
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Fullnode REST base URL
    pub fullnode_url: String,
    /// Vault metadata GraphQL endpoint
    pub vault_api_url: Option<String>,
    /// Staking-pool metadata GraphQL endpoint
    pub pool_api_url: Option<String>,
    /// API key for the metadata/pool-discovery endpoints
    pub api_key: Option<String>,
    /// Vault package address override (defaults to mainnet)
    pub satay_package: String,
    /// Multi-rewards package address override (defaults to mainnet)
    pub multi_rewards_package: String,
    /// MovePosition broker integration, when available
    pub move_position: Option<MovePositionConfig>,
}

impl SdkConfig {
    pub fn new(fullnode_url: impl Into<String>) -> Self {
        Self {
            fullnode_url: fullnode_url.into(),
            vault_api_url: None,
            pool_api_url: None,
            api_key: None,
            satay_package: SATAY_PACKAGE.to_string(),
            multi_rewards_package: MULTI_REWARDS_PACKAGE.to_string(),
            move_position: None,
        }
    }

    /// Read configuration from the environment (`.env` honored).
    ///
    /// `SATAY_FULLNODE_URL` is required; `SATAY_VAULT_API_URL`,
    /// `SATAY_POOL_API_URL`, `SATAY_API_KEY` and `MOVEPOSITION_API_URL`
    /// are optional.
    pub fn from_env() -> crate::types::SdkResult<Self> {
        dotenvy::dotenv().ok();

        let fullnode_url = std::env::var("SATAY_FULLNODE_URL").map_err(|_| {
            crate::types::SdkError::InvalidInput("SATAY_FULLNODE_URL is not set".into())
        })?;

        let mut config = Self::new(fullnode_url);
        config.vault_api_url = std::env::var("SATAY_VAULT_API_URL").ok();
        config.pool_api_url = std::env::var("SATAY_POOL_API_URL").ok();
        config.api_key = std::env::var("SATAY_API_KEY").ok();
        config.move_position = std::env::var("MOVEPOSITION_API_URL")
            .ok()
            .map(MovePositionConfig::new);

        Ok(config)
    }

    pub fn with_move_position(mut self, move_position: MovePositionConfig) -> Self {
        self.move_position = Some(move_position);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Fully-qualified vault-module function identifier
    pub fn vault_function(&self, module: &str, name: &str) -> String {
        format!("{}::{}::{}", self.satay_package, module, name)
    }

    /// Fully-qualified multi-rewards function identifier
    pub fn rewards_function(&self, module: &str, name: &str) -> String {
        format!("{}::{}::{}", self.multi_rewards_package, module, name)
    }

    /// Static pool lookup for a staking token, compared under normalization
    pub fn static_pools_for(&self, token: &str) -> Option<Vec<String>> {
        let canonical = crate::chain::address::normalize_address(token);
        STATIC_STAKING_POOLS
            .iter()
            .find(|(t, _)| *t == canonical)
            .map(|(_, pools)| pools.iter().map(|p| p.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_identifiers() {
        let config = SdkConfig::new("http://localhost:8080");
        assert_eq!(
            config.vault_function("vault", "deposit_allocation"),
            format!("{SATAY_PACKAGE}::vault::deposit_allocation")
        );
        assert_eq!(
            config.rewards_function("multi_rewards", "stake"),
            format!("{MULTI_REWARDS_PACKAGE}::multi_rewards::stake")
        );
    }

    #[test]
    fn test_broker_lookup_is_normalized() {
        let mp = MovePositionConfig::new("https://broker.example")
            .with_broker("0xAB", "usdc-broker");
        assert_eq!(mp.broker_for("0xab"), Some("usdc-broker"));
        assert_eq!(mp.broker_for("ab"), Some("usdc-broker"));
        assert_eq!(mp.broker_for("0xcd"), None);
    }

    #[test]
    fn test_static_pool_lookup() {
        let config = SdkConfig::new("http://localhost:8080");
        let (token, pools) = STATIC_STAKING_POOLS[0];
        let found = config.static_pools_for(token).unwrap();
        assert_eq!(found.len(), pools.len());
        // Prefixless/mixed-case queries hit the same entry
        let mixed = token.trim_start_matches("0x").to_uppercase();
        assert!(config.static_pools_for(&mixed).is_some());
    }
}
