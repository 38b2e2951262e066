//! Vault transaction assembly
//!
//! The orchestrator: fetches the vault view, resolves the strategy
//! allocation, classifies the platform, generates proof packets where the
//! platform requires them, and assembles the entry-function payload with the
//! correct entry point and type arguments. Integrators never need to know
//! the vault's internal architecture.

use crate::chain::{address, ViewClient};
use crate::config::{SdkConfig, APTOS_COIN_TYPE};
use crate::types::{EntryArgument, EntryFunctionPayload, SdkError, SdkResult};
use crate::vault::allocation::{self, AllocationResolver};
use crate::vault::packets::{
    create_packet_arrays, BrokerClient, Operation, PacketGenerator, ProofService, VaultContext,
};
use crate::vault::platform::{PlatformInfo, PlatformRegistry};
use crate::vault::view::{fetch_vault_view, VaultView};

/// Default minimum shares out for deposits (no slippage floor)
const DEFAULT_MIN_SHARES_OUT: u64 = 0;
/// Default max loss for withdrawals; 100 is the "no cap" convention
const DEFAULT_MAX_LOSS: u64 = 100;
/// Minimum amount out floor for withdrawals
const MIN_AMOUNT_OUT: u64 = 0;
/// Stricter floor for proof-requiring platforms, where settlement is fuzzier
const MIN_AMOUNT_OUT_WITH_PROOF: u64 = 1;

/// Builds deposit/withdraw entry-function payloads for vaults
pub struct TransactionBuilder<'a, V: ViewClient, S: ProofService = BrokerClient> {
    client: &'a V,
    config: &'a SdkConfig,
    registry: PlatformRegistry,
    proof_service: Option<S>,
}

impl<'a, V: ViewClient> TransactionBuilder<'a, V, BrokerClient> {
    /// Builder wired to the MovePosition broker API when configured
    pub fn new(client: &'a V, config: &'a SdkConfig) -> Self {
        let proof_service = config
            .move_position
            .as_ref()
            .map(|mp| BrokerClient::new(&mp.api_url));
        Self {
            client,
            config,
            registry: PlatformRegistry::default(),
            proof_service,
        }
    }
}

impl<'a, V: ViewClient, S: ProofService> TransactionBuilder<'a, V, S> {
    /// Builder with an explicit proof service (tests, alternative transports)
    pub fn with_proof_service(client: &'a V, config: &'a SdkConfig, service: S) -> Self {
        Self {
            client,
            config,
            registry: PlatformRegistry::default(),
            proof_service: Some(service),
        }
    }

    /// Override the platform registry (extension point for new platforms)
    pub fn with_registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Build a deposit payload: `amount` of the vault's asset, allocated
    /// across strategies per the chain's deposit-allocation view.
    pub async fn build_deposit(
        &self,
        vault: &str,
        amount: u128,
        signer: &str,
    ) -> SdkResult<EntryFunctionPayload> {
        self.validate_inputs(vault, amount, signer)?;
        let view = self.fetch_checked_view(vault).await?;

        let resolver = AllocationResolver::new(self.client, self.config);
        let allocation = resolver.resolve_deposit(&view.vault, amount).await?;
        allocation::validate(&allocation, amount)?;

        let info = self.registry.classify(&view);
        tracing::debug!(vault = %view.vault, platform = info.platform.as_str(), "deposit classified");

        let (strategies, packet_bytes) = if info.requires_external_proof {
            let generator =
                PacketGenerator::new(self.client, self.config, self.proof_service.as_ref());
            let packets = generator
                .generate(
                    &allocation.strategies,
                    &allocation.amounts,
                    Operation::Deposit,
                    &self.context(&view, signer),
                )
                .await;
            create_packet_arrays(&packets, Some(&allocation))
        } else {
            (Vec::new(), Vec::new())
        };

        self.assemble(&view, info, strategies, packet_bytes, amount, Operation::Deposit)
    }

    /// Build a withdraw payload for `shares` of the vault's shares token.
    ///
    /// No conservation validation here: withdrawal amounts are
    /// chain-determined, not integrator-supplied.
    pub async fn build_withdraw(
        &self,
        vault: &str,
        shares: u128,
        signer: &str,
    ) -> SdkResult<EntryFunctionPayload> {
        self.validate_inputs(vault, shares, signer)?;
        let view = self.fetch_checked_view(vault).await?;

        let resolver = AllocationResolver::new(self.client, self.config);
        let allocation = resolver.resolve_withdraw(&view.vault, shares).await?;

        let info = self.registry.classify(&view);
        tracing::debug!(vault = %view.vault, platform = info.platform.as_str(), "withdraw classified");

        let (strategies, packet_bytes) = if info.requires_external_proof {
            let generator =
                PacketGenerator::new(self.client, self.config, self.proof_service.as_ref());
            let packets = generator
                .generate(
                    &allocation.strategies,
                    &allocation.amounts,
                    Operation::Withdraw,
                    &self.context(&view, signer),
                )
                .await;
            create_packet_arrays(&packets, Some(&allocation))
        } else {
            (Vec::new(), Vec::new())
        };

        self.assemble(&view, info, strategies, packet_bytes, shares, Operation::Withdraw)
    }

    fn validate_inputs(&self, vault: &str, amount: u128, signer: &str) -> SdkResult<()> {
        if !address::is_valid_address(vault) {
            return Err(SdkError::InvalidVaultAddress(vault.to_string()));
        }
        if !address::is_valid_address(signer) {
            return Err(SdkError::InvalidUserAddress(signer.to_string()));
        }
        if amount == 0 {
            return Err(SdkError::AmountTooSmall(
                "amount must be a positive integer".into(),
            ));
        }
        Ok(())
    }

    async fn fetch_checked_view(&self, vault: &str) -> SdkResult<VaultView> {
        let view = fetch_vault_view(self.client, self.config, vault).await?;
        if view.paused {
            return Err(SdkError::VaultPaused(view.vault));
        }
        Ok(view)
    }

    fn context(&self, view: &VaultView, signer: &str) -> VaultContext {
        VaultContext {
            vault: view.vault.clone(),
            asset: view.asset.clone(),
            signer: address::normalize_address(signer),
        }
    }

    fn assemble(
        &self,
        view: &VaultView,
        info: PlatformInfo,
        strategies: Vec<String>,
        packet_bytes: Vec<Vec<u8>>,
        amount: u128,
        operation: Operation,
    ) -> SdkResult<EntryFunctionPayload> {
        if info.coin_entry {
            // Native-coin entries: asset and shares share the paired coin
            // type, and strategy/packet lists are always empty regardless of
            // detector output.
            let coin = view
                .paired_coin_type
                .as_deref()
                .map(address::normalize_type_tag)
                .ok_or_else(|| {
                    SdkError::build_failed_msg(format!(
                        "vault {} uses coin entry points but has no paired coin type",
                        view.vault
                    ))
                })?;

            let name = match operation {
                Operation::Deposit => "deposit_coin",
                Operation::Withdraw => "withdraw_coin",
            };
            let mut arguments = vec![
                EntryArgument::Address(view.vault.clone()),
                EntryArgument::AddressList(Vec::new()),
                EntryArgument::BytesList(Vec::new()),
                EntryArgument::amount(amount),
            ];
            arguments.extend(self.trailing_arguments(operation, info));

            return Ok(EntryFunctionPayload::new(
                self.config.vault_function("vault_entries", name),
                vec![coin.clone(), coin],
                arguments,
            ));
        }

        // Fungible-asset entries, parameterized by the paired coin type or
        // the native gas coin when none is set.
        let type_argument = view
            .paired_coin_type
            .as_deref()
            .map(address::normalize_type_tag)
            .unwrap_or_else(|| address::normalize_type_tag(APTOS_COIN_TYPE));

        let name = match operation {
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
        };

        let mut arguments = vec![
            EntryArgument::Address(view.vault.clone()),
            EntryArgument::AddressList(strategies),
            EntryArgument::BytesList(packet_bytes),
            EntryArgument::amount(amount),
        ];
        arguments.extend(self.trailing_arguments(operation, info));

        Ok(EntryFunctionPayload::new(
            self.config.vault_function("vault_entries", name),
            vec![type_argument],
            arguments,
        ))
    }

    fn trailing_arguments(&self, operation: Operation, info: PlatformInfo) -> Vec<EntryArgument> {
        match operation {
            Operation::Deposit => {
                vec![EntryArgument::amount(DEFAULT_MIN_SHARES_OUT as u128)]
            }
            Operation::Withdraw => {
                let floor = if info.requires_external_proof {
                    MIN_AMOUNT_OUT_WITH_PROOF
                } else {
                    MIN_AMOUNT_OUT
                };
                vec![
                    EntryArgument::amount(DEFAULT_MAX_LOSS as u128),
                    EntryArgument::amount(floor as u128),
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ViewRequest;
    use crate::config::concrete;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    struct MockView {
        responses: HashMap<String, Vec<Value>>,
    }

    impl MockView {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        fn with(mut self, function: &str, results: Vec<Value>) -> Self {
            self.responses.insert(function.to_string(), results);
            self
        }
    }

    impl ViewClient for MockView {
        async fn view(&self, request: ViewRequest) -> SdkResult<Vec<Value>> {
            let suffix = request.function.rsplit("::").next().unwrap_or_default();
            self.responses
                .get(suffix)
                .cloned()
                .ok_or_else(|| SdkError::network_msg(format!("no mock for {suffix}")))
        }
    }

    fn vault_state(paired_coin: Value, paused: bool) -> Value {
        json!({
            "decimals": "8",
            "total_debt": "900000",
            "total_idle": "100000",
            "total_asset": "1000000",
            "total_shares": "1000000",
            "asset": {"inner": "0xaa"},
            "shares": {"inner": "0xbb"},
            "paired_coin": paired_coin,
            "paused": paused,
        })
    }

    fn strategy_states(concrete_addr: &str) -> Value {
        json!([{
            "strategy": {"inner": "0x51"},
            "concrete": concrete_addr,
            "current_debt": "900000",
            "debt_limit": "2000000",
            "total_profit": "0",
            "total_loss": "0",
            "total_idle": "0",
            "total_asset": "900000",
        }])
    }

    fn default_platform_mock() -> MockView {
        MockView::new()
            .with("vault_state", vec![vault_state(json!({"vec": []}), false)])
            .with("strategy_states", vec![strategy_states("0x52")])
            .with(
                "deposit_allocation",
                vec![json!({"data": [{"key": "0x51", "value": "1000000"}]})],
            )
            .with(
                "withdrawal_allocation",
                vec![json!({"data": [{"key": "0x51", "value": "1000000"}]})],
            )
    }

    #[tokio::test]
    async fn test_default_platform_deposit_end_to_end() {
        let view = default_platform_mock();
        let config = SdkConfig::new("http://localhost:8080");
        let builder = TransactionBuilder::new(&view, &config);

        let payload = builder
            .build_deposit("0x1", 1_000_000, "0xfeed")
            .await
            .unwrap();

        assert!(payload.function.ends_with("::vault_entries::deposit"));
        // FA vault without a paired coin type defaults to the gas coin
        assert_eq!(
            payload.type_arguments,
            vec![address::normalize_type_tag(APTOS_COIN_TYPE)]
        );
        // No proof required: packet arrays are empty, amount rides through
        assert_eq!(payload.arguments[1], EntryArgument::AddressList(vec![]));
        assert_eq!(payload.arguments[2], EntryArgument::BytesList(vec![]));
        assert_eq!(payload.arguments[3], EntryArgument::Amount("1000000".into()));
        assert_eq!(payload.arguments[4], EntryArgument::Amount("0".into()));
    }

    #[tokio::test]
    async fn test_echelon_coin_deposit_uses_coin_entry() {
        let view = MockView::new()
            .with(
                "vault_state",
                vec![vault_state(
                    json!({"vec": ["0x1::aptos_coin::AptosCoin"]}),
                    false,
                )],
            )
            .with("strategy_states", vec![strategy_states(concrete::ECHELON)])
            .with(
                "deposit_allocation",
                vec![json!({"data": [{"key": "0x51", "value": "1000000"}]})],
            );
        let config = SdkConfig::new("http://localhost:8080");
        let builder = TransactionBuilder::new(&view, &config);

        let payload = builder
            .build_deposit("0x1", 1_000_000, "0xfeed")
            .await
            .unwrap();

        assert!(payload.function.ends_with("::vault_entries::deposit_coin"));
        assert_eq!(payload.type_arguments.len(), 2);
        assert_eq!(payload.type_arguments[0], payload.type_arguments[1]);
        // Echelon bypasses packets entirely: fixed empty lists
        assert_eq!(payload.arguments[1], EntryArgument::AddressList(vec![]));
        assert_eq!(payload.arguments[2], EntryArgument::BytesList(vec![]));
    }

    #[tokio::test]
    async fn test_withdraw_floor_stricter_for_proof_platforms() {
        let make_view = |concrete_addr: &str| {
            MockView::new()
                .with("vault_state", vec![vault_state(json!({"vec": []}), false)])
                .with("strategy_states", vec![strategy_states(concrete_addr)])
                .with(
                    "withdrawal_allocation",
                    vec![json!({"data": [{"key": "0x51", "value": "500"}]})],
                )
        };
        let config = SdkConfig::new("http://localhost:8080");

        // Default platform: max_loss 100, floor 0
        let view = make_view("0x52");
        let payload = TransactionBuilder::new(&view, &config)
            .build_withdraw("0x1", 500, "0xfeed")
            .await
            .unwrap();
        assert!(payload.function.ends_with("::vault_entries::withdraw"));
        assert_eq!(payload.arguments[4], EntryArgument::Amount("100".into()));
        assert_eq!(payload.arguments[5], EntryArgument::Amount("0".into()));

        // MovePosition (no broker configured: packets degrade to empty, but
        // the stricter floor still applies)
        let view = make_view(concrete::MOVEPOSITION);
        let payload = TransactionBuilder::new(&view, &config)
            .build_withdraw("0x1", 500, "0xfeed")
            .await
            .unwrap();
        assert_eq!(payload.arguments[1], EntryArgument::AddressList(vec![]));
        assert_eq!(payload.arguments[5], EntryArgument::Amount("1".into()));
    }

    #[tokio::test]
    async fn test_eager_validation() {
        let view = MockView::new(); // never reached
        let config = SdkConfig::new("http://localhost:8080");
        let builder = TransactionBuilder::new(&view, &config);

        let err = builder.build_deposit("vault!", 1, "0xfeed").await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidVaultAddress(_)));

        let err = builder.build_deposit("0x1", 0, "0xfeed").await.unwrap_err();
        assert!(matches!(err, SdkError::AmountTooSmall(_)));

        let err = builder.build_deposit("0x1", 1, "who").await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidUserAddress(_)));
    }

    #[tokio::test]
    async fn test_paused_vault_rejected() {
        let view = MockView::new()
            .with("vault_state", vec![vault_state(json!({"vec": []}), true)])
            .with("strategy_states", vec![json!([])]);
        let config = SdkConfig::new("http://localhost:8080");
        let builder = TransactionBuilder::new(&view, &config);

        let err = builder.build_deposit("0x1", 100, "0xfeed").await.unwrap_err();
        assert!(matches!(err, SdkError::VaultPaused(_)));
    }

    #[tokio::test]
    async fn test_gross_allocation_mismatch_rejected() {
        let view = MockView::new()
            .with("vault_state", vec![vault_state(json!({"vec": []}), false)])
            .with("strategy_states", vec![strategy_states("0x52")])
            .with(
                "deposit_allocation",
                vec![json!({"data": [{"key": "0x51", "value": "500000"}]})],
            );
        let config = SdkConfig::new("http://localhost:8080");
        let builder = TransactionBuilder::new(&view, &config);

        let err = builder
            .build_deposit("0x1", 1_000_000, "0xfeed")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::TransactionBuildFailed { .. }));
    }
}
