//! Strategy platform classification
//!
//! A vault's platform is derived from the first strategy's concrete
//! (implementation) address, compared under address normalization against a
//! registry of well-known constants. The registry is injectable so new
//! platforms are a data change, not a code change. Classification is total:
//! no strategies or no match falls back to the default Satay platform.

use serde::Serialize;

use crate::chain::address::normalize_address;
use crate::config::concrete;
use crate::vault::view::VaultView;

/// Known strategy platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    MovePosition,
    Echelon,
    LayerBank,
    Meridian,
    DefaultSatay,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MovePosition => "move_position",
            Platform::Echelon => "echelon",
            Platform::LayerBank => "layer_bank",
            Platform::Meridian => "meridian",
            Platform::DefaultSatay => "default_satay",
        }
    }
}

/// One registry row: a platform, its concrete address, and its capabilities
#[derive(Debug, Clone)]
pub struct PlatformEntry {
    pub platform: Platform,
    /// Concrete implementation address, stored normalized
    pub concrete: String,
    /// Whether deposits/withdrawals need externally-generated proof packets
    pub requires_external_proof: bool,
    /// Whether the platform uses the native-coin entry points
    pub coin_entry: bool,
}

impl PlatformEntry {
    pub fn new(
        platform: Platform,
        concrete: &str,
        requires_external_proof: bool,
        coin_entry: bool,
    ) -> Self {
        Self {
            platform,
            concrete: normalize_address(concrete),
            requires_external_proof,
            coin_entry,
        }
    }
}

/// Classification result with the capabilities the orchestrator branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub requires_external_proof: bool,
    pub coin_entry: bool,
}

impl PlatformInfo {
    const DEFAULT: PlatformInfo = PlatformInfo {
        platform: Platform::DefaultSatay,
        requires_external_proof: false,
        coin_entry: false,
    };
}

/// Ordered registry of known platforms, first match wins
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    entries: Vec<PlatformEntry>,
}

impl PlatformRegistry {
    pub fn new(entries: Vec<PlatformEntry>) -> Self {
        Self { entries }
    }

    /// Classify a vault from its first strategy's concrete address.
    ///
    /// Total: a vault with no strategies, or an unknown concrete address,
    /// classifies as the default Satay platform.
    pub fn classify(&self, view: &VaultView) -> PlatformInfo {
        let Some(first) = view.strategies.first() else {
            return PlatformInfo::DEFAULT;
        };

        let concrete = normalize_address(&first.concrete);
        self.entries
            .iter()
            .find(|entry| entry.concrete == concrete)
            .map(|entry| PlatformInfo {
                platform: entry.platform,
                requires_external_proof: entry.requires_external_proof,
                coin_entry: entry.coin_entry,
            })
            .unwrap_or(PlatformInfo::DEFAULT)
    }
}

impl Default for PlatformRegistry {
    /// Detection order matters only for the (unexpected) case of duplicate
    /// concrete addresses: MovePosition, Echelon, LayerBank, Meridian.
    fn default() -> Self {
        Self::new(vec![
            PlatformEntry::new(Platform::MovePosition, concrete::MOVEPOSITION, true, false),
            PlatformEntry::new(Platform::Echelon, concrete::ECHELON, false, true),
            PlatformEntry::new(Platform::LayerBank, concrete::LAYERBANK, false, false),
            PlatformEntry::new(Platform::Meridian, concrete::MERIDIAN, false, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::view::StrategyView;

    fn vault_with_concrete(concrete: &str) -> VaultView {
        VaultView {
            vault: "0x1".into(),
            decimals: 8,
            total_debt: 0,
            total_idle: 0,
            total_asset: 0,
            total_shares: 0,
            asset: "0xaa".into(),
            shares: "0xbb".into(),
            paired_coin_type: None,
            paused: false,
            strategies: vec![StrategyView {
                strategy: "0x51".into(),
                concrete: concrete.into(),
                current_debt: 0,
                debt_limit: 0,
                total_profit: 0,
                total_loss: 0,
                total_idle: 0,
                total_asset: 0,
            }],
        }
    }

    #[test]
    fn test_classify_known_platforms() {
        let registry = PlatformRegistry::default();
        let cases = [
            (concrete::MOVEPOSITION, Platform::MovePosition, true, false),
            (concrete::ECHELON, Platform::Echelon, false, true),
            (concrete::LAYERBANK, Platform::LayerBank, false, false),
            (concrete::MERIDIAN, Platform::Meridian, false, false),
        ];
        for (concrete, platform, proof, coin) in cases {
            let info = registry.classify(&vault_with_concrete(concrete));
            assert_eq!(info.platform, platform);
            assert_eq!(info.requires_external_proof, proof);
            assert_eq!(info.coin_entry, coin);
        }
    }

    #[test]
    fn test_classify_is_normalization_insensitive() {
        let registry = PlatformRegistry::default();
        let bare = concrete::ECHELON.trim_start_matches("0x").to_uppercase();
        let info = registry.classify(&vault_with_concrete(&bare));
        assert_eq!(info.platform, Platform::Echelon);
    }

    #[test]
    fn test_classify_unknown_and_empty_default() {
        let registry = PlatformRegistry::default();
        assert_eq!(
            registry.classify(&vault_with_concrete("0xdead")).platform,
            Platform::DefaultSatay
        );

        let mut no_strategies = vault_with_concrete("0x1");
        no_strategies.strategies.clear();
        let info = registry.classify(&no_strategies);
        assert_eq!(info.platform, Platform::DefaultSatay);
        assert!(!info.requires_external_proof);
    }

    #[test]
    fn test_first_strategy_decides() {
        let registry = PlatformRegistry::default();
        let mut vault = vault_with_concrete(concrete::MERIDIAN);
        let mut second = vault.strategies[0].clone();
        second.concrete = concrete::MOVEPOSITION.into();
        vault.strategies.push(second);
        assert_eq!(registry.classify(&vault).platform, Platform::Meridian);
    }
}
