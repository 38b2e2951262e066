//! Vault state snapshots
//!
//! Fetches a vault's on-chain view (`vault_state` + `strategy_states`) and
//! decodes the chain-native value conventions into typed structs. The
//! presence of `paired_coin_type` is the single source of truth for the
//! vault's asset-representation mode (native coin vs fungible asset); no
//! other field may be used to infer it.

use serde::Serialize;
use serde_json::{json, Value};

use crate::chain::{self, ViewClient, ViewRequest};
use crate::config::SdkConfig;
use crate::types::{SdkError, SdkResult};

/// Snapshot of a vault's on-chain state
#[derive(Debug, Clone, Serialize)]
pub struct VaultView {
    pub vault: String,
    pub decimals: u8,
    pub total_debt: u128,
    pub total_idle: u128,
    pub total_asset: u128,
    pub total_shares: u128,
    /// Underlying asset metadata address
    pub asset: String,
    /// Shares token metadata address
    pub shares: String,
    /// Present iff the vault uses the native-coin representation
    pub paired_coin_type: Option<String>,
    pub paused: bool,
    /// Allocation targets, in on-chain order
    pub strategies: Vec<StrategyView>,
}

/// One allocation target inside a vault
#[derive(Debug, Clone, Serialize)]
pub struct StrategyView {
    pub strategy: String,
    /// Implementation address used for platform classification
    pub concrete: String,
    pub current_debt: u128,
    pub debt_limit: u128,
    pub total_profit: u128,
    pub total_loss: u128,
    pub total_idle: u128,
    pub total_asset: u128,
}

/// Fetch a vault's full view snapshot.
///
/// A transport failure or node outage surfaces as `NetworkError`; a view
/// call the node rejects (unknown address, missing resource, a 4xx status)
/// maps to `VaultNotFound`.
pub async fn fetch_vault_view<V: ViewClient>(
    client: &V,
    config: &SdkConfig,
    vault: &str,
) -> SdkResult<VaultView> {
    let vault = chain::address::normalize_address(vault);

    let state = client
        .view(ViewRequest::new(
            config.vault_function("vault", "vault_state"),
            vec![json!(vault)],
        ))
        .await
        .map_err(|e| match e {
            // The fullnode rejected the call: no such vault. Transport
            // failures and 5xx outages keep their NetworkError kind so a
            // retry layer never treats them as permanent.
            SdkError::NetworkError {
                status: Some(code), ..
            } if (400..500).contains(&code) => SdkError::VaultNotFound(vault.clone()),
            other => other,
        })?;

    let state = state
        .first()
        .ok_or_else(|| SdkError::VaultNotFound(vault.clone()))?;

    let strategies = client
        .view(ViewRequest::new(
            config.vault_function("vault", "strategy_states"),
            vec![json!(vault)],
        ))
        .await?;

    parse_vault_view(&vault, state, strategies.first())
}

fn parse_vault_view(
    vault: &str,
    state: &Value,
    strategies: Option<&Value>,
) -> SdkResult<VaultView> {
    let obj = state.as_object().ok_or_else(|| {
        SdkError::build_failed_msg(format!("vault_state is not an object: {state}"))
    })?;

    let field = |name: &str| -> SdkResult<&Value> {
        obj.get(name)
            .ok_or_else(|| SdkError::build_failed_msg(format!("vault_state missing {name}")))
    };

    let paired_coin_type = match obj.get("paired_coin") {
        Some(value) => chain::parse_option(value)?
            .and_then(Value::as_str)
            .map(chain::address::normalize_type_tag),
        None => None,
    };

    let strategy_views = match strategies {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(parse_strategy_view)
            .collect::<SdkResult<Vec<_>>>()?,
        Some(other) => {
            return Err(SdkError::build_failed_msg(format!(
                "strategy_states is not a list: {other}"
            )))
        }
        None => Vec::new(),
    };

    let decimals = chain::parse_u64(field("decimals")?)?;
    let decimals = u8::try_from(decimals)
        .map_err(|e| SdkError::build_failed(format!("decimals {decimals} exceeds u8"), e))?;

    Ok(VaultView {
        vault: vault.to_string(),
        decimals,
        total_debt: chain::parse_u128(field("total_debt")?)?,
        total_idle: chain::parse_u128(field("total_idle")?)?,
        total_asset: chain::parse_u128(field("total_asset")?)?,
        total_shares: chain::parse_u128(field("total_shares")?)?,
        asset: chain::parse_address(field("asset")?)?,
        shares: chain::parse_address(field("shares")?)?,
        paired_coin_type,
        paused: obj.get("paused").and_then(Value::as_bool).unwrap_or(false),
        strategies: strategy_views,
    })
}

fn parse_strategy_view(value: &Value) -> SdkResult<StrategyView> {
    let obj = value.as_object().ok_or_else(|| {
        SdkError::build_failed_msg(format!("strategy entry is not an object: {value}"))
    })?;

    let field = |name: &str| -> SdkResult<&Value> {
        obj.get(name)
            .ok_or_else(|| SdkError::build_failed_msg(format!("strategy entry missing {name}")))
    };

    Ok(StrategyView {
        strategy: chain::parse_address(field("strategy")?)?,
        concrete: chain::parse_address(field("concrete")?)?,
        current_debt: chain::parse_u128(field("current_debt")?)?,
        debt_limit: chain::parse_u128(field("debt_limit")?)?,
        total_profit: chain::parse_u128(field("total_profit")?)?,
        total_loss: chain::parse_u128(field("total_loss")?)?,
        total_idle: chain::parse_u128(field("total_idle")?)?,
        total_asset: chain::parse_u128(field("total_asset")?)?,
    })
}
