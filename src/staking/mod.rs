//! Multi-rewards staking: pool resolution and staking transactions
//!
//! Pool resolution is a layered fallback: explicit caller input, then the
//! static token->pool table, then remote discovery (only when an API key is
//! configured). Failing every layer is an actionable error, not a generic
//! one, since missing pool-discovery configuration is the most common
//! integration dead-end.

use std::future::Future;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};

use crate::chain::{self, address, ViewClient, ViewRequest};
use crate::config::SdkConfig;
use crate::types::{EntryArgument, EntryFunctionPayload, SdkError, SdkResult};

/// A discoverable reward pool
#[derive(Debug, Clone, Serialize)]
pub struct StakingPoolInfo {
    pub pool: String,
    pub staking_token: String,
    pub reward_tokens: Vec<String>,
}

/// Pending rewards for one reward token in one pool
#[derive(Debug, Clone, Serialize)]
pub struct PendingReward {
    pub token: String,
    pub amount: u128,
}

/// A user's position in one subscribed pool
///
/// Pending rewards are computed only for pools the user is actively
/// subscribed to, not all discoverable pools.
#[derive(Debug, Clone, Serialize)]
pub struct UserStakingPosition {
    pub pool: String,
    pub staking_token: String,
    pub staked_amount: u128,
    pub pending_rewards: Vec<PendingReward>,
}

/// Remote pool-discovery capability (third resolution layer)
pub trait PoolApi: Send + Sync {
    /// Pool addresses that accept the given staking token
    fn pools_for_token(&self, token: &str) -> impl Future<Output = SdkResult<Vec<String>>> + Send;
}

/// Builds staking transactions against the multi-rewards module
pub struct StakingClient<'a, V: ViewClient, P: PoolApi> {
    client: &'a V,
    config: &'a SdkConfig,
    pool_api: Option<&'a P>,
}

impl<'a, V: ViewClient, P: PoolApi> StakingClient<'a, V, P> {
    pub fn new(client: &'a V, config: &'a SdkConfig, pool_api: Option<&'a P>) -> Self {
        Self {
            client,
            config,
            pool_api,
        }
    }

    /// Build a stake transaction for `amount` of `token`.
    ///
    /// Resolution order: `explicit_pools` wins absolutely, then the static
    /// table, then remote discovery (API key required). When `user` is
    /// supplied, already-subscribed pools are filtered out so the entry
    /// function never re-subscribes; if every candidate is already
    /// subscribed the plain `stake` entry is used instead.
    pub async fn resolve_stake(
        &self,
        token: &str,
        amount: u128,
        user: Option<&str>,
        explicit_pools: Option<&[String]>,
    ) -> SdkResult<EntryFunctionPayload> {
        if !address::is_valid_address(token) {
            return Err(SdkError::InvalidTokenAddress(token.to_string()));
        }
        if amount == 0 {
            return Err(SdkError::AmountTooSmall(
                "stake amount must be a positive integer".into(),
            ));
        }
        if let Some(user) = user {
            if !address::is_valid_address(user) {
                return Err(SdkError::InvalidUserAddress(user.to_string()));
            }
        }

        let token = address::normalize_address(token);
        let candidates = self.resolve_pools(&token, explicit_pools).await?;
        if candidates.is_empty() {
            // A source existed but yielded nothing
            return Err(SdkError::pools_resolved_empty(&token));
        }

        let pools_to_subscribe = match user {
            Some(user) => self.filter_unsubscribed(user, &candidates).await,
            None => candidates,
        };

        let payload = if pools_to_subscribe.is_empty() {
            // User already participates everywhere; a subscribe-capable
            // entry with zero pools may be rejected on-chain.
            EntryFunctionPayload::new(
                self.config.rewards_function("multi_rewards_entries", "stake"),
                Vec::new(),
                vec![
                    EntryArgument::Address(token),
                    EntryArgument::amount(amount),
                ],
            )
        } else {
            EntryFunctionPayload::new(
                self.config
                    .rewards_function("multi_rewards_entries", "stake_and_subscribe"),
                Vec::new(),
                vec![
                    EntryArgument::Address(token),
                    EntryArgument::amount(amount),
                    EntryArgument::AddressList(pools_to_subscribe),
                ],
            )
        };
        Ok(payload)
    }

    async fn resolve_pools(
        &self,
        token: &str,
        explicit_pools: Option<&[String]>,
    ) -> SdkResult<Vec<String>> {
        if let Some(pools) = explicit_pools {
            if !pools.is_empty() {
                let mut resolved = Vec::with_capacity(pools.len());
                for pool in pools {
                    if !address::is_valid_address(pool) {
                        return Err(SdkError::InvalidPoolAddress(pool.clone()));
                    }
                    resolved.push(address::normalize_address(pool));
                }
                return Ok(resolved);
            }
        }

        if let Some(pools) = self.config.static_pools_for(token) {
            tracing::debug!(token = %token, pools = pools.len(), "static pool mapping hit");
            return Ok(pools);
        }

        if self.config.api_key.is_some() {
            if let Some(api) = self.pool_api {
                let pools = api.pools_for_token(token).await?;
                return Ok(pools
                    .iter()
                    .map(|p| address::normalize_address(p))
                    .collect());
            }
        }

        Err(SdkError::no_pool_source(token))
    }

    /// Concurrent subscription checks; a failed check counts as "not
    /// subscribed" so one flaky pool query cannot silently drop a needed
    /// subscription.
    async fn filter_unsubscribed(&self, user: &str, pools: &[String]) -> Vec<String> {
        let user = address::normalize_address(user);
        let checks = pools.iter().map(|pool| {
            let user = user.clone();
            async move {
                match self.is_subscribed(&user, pool).await {
                    Ok(subscribed) => subscribed,
                    Err(e) => {
                        tracing::warn!(pool = %pool, error = %e,
                            "subscription check failed, treating as not subscribed");
                        false
                    }
                }
            }
        });

        let results = join_all(checks).await;
        pools
            .iter()
            .zip(results)
            .filter(|(_, subscribed)| !subscribed)
            .map(|(pool, _)| pool.clone())
            .collect()
    }

    async fn is_subscribed(&self, user: &str, pool: &str) -> SdkResult<bool> {
        let results = self
            .client
            .view(ViewRequest::new(
                self.config.rewards_function("multi_rewards", "is_subscribed"),
                vec![json!(user), json!(pool)],
            ))
            .await?;
        results
            .first()
            .and_then(Value::as_bool)
            .ok_or_else(|| SdkError::build_failed_msg("is_subscribed returned no boolean"))
    }

    /// Claim pending rewards across a batch of staking tokens.
    ///
    /// One entry call; the chain module aggregates claims over the
    /// caller-supplied token list.
    pub fn claim_rewards(&self, tokens: &[String]) -> SdkResult<EntryFunctionPayload> {
        if tokens.is_empty() {
            return Err(SdkError::InvalidInput("no tokens to claim for".into()));
        }
        let mut claimed = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !address::is_valid_address(token) {
                return Err(SdkError::InvalidTokenAddress(token.clone()));
            }
            claimed.push(address::normalize_address(token));
        }

        Ok(EntryFunctionPayload::new(
            self.config
                .rewards_function("multi_rewards_entries", "claim_rewards"),
            Vec::new(),
            vec![EntryArgument::AddressList(claimed)],
        ))
    }

    /// Unstake `amount` of `token`.
    ///
    /// Dispatch is purely syntactic: a `::` module-path separator means a
    /// coin type (typed withdraw entry), anything else is a fungible-asset
    /// metadata address. This heuristic is load-bearing.
    pub fn unstake(&self, token: &str, amount: u128) -> SdkResult<EntryFunctionPayload> {
        if amount == 0 {
            return Err(SdkError::AmountTooSmall(
                "unstake amount must be a positive integer".into(),
            ));
        }

        if address::is_coin_type(token) {
            return Ok(EntryFunctionPayload::new(
                self.config
                    .rewards_function("multi_rewards_entries", "withdraw_coin"),
                vec![address::normalize_type_tag(token)],
                vec![EntryArgument::amount(amount)],
            ));
        }

        if !address::is_valid_address(token) {
            return Err(SdkError::InvalidTokenAddress(token.to_string()));
        }
        Ok(EntryFunctionPayload::new(
            self.config
                .rewards_function("multi_rewards_entries", "withdraw"),
            Vec::new(),
            vec![
                EntryArgument::Address(address::normalize_address(token)),
                EntryArgument::amount(amount),
            ],
        ))
    }

    /// Info for a single pool
    pub async fn pool_info(&self, pool: &str) -> SdkResult<StakingPoolInfo> {
        if !address::is_valid_address(pool) {
            return Err(SdkError::InvalidPoolAddress(pool.to_string()));
        }
        let pool = address::normalize_address(pool);

        let staking_token = self
            .view_single("staking_token", vec![json!(pool)])
            .await
            .and_then(|v| chain::parse_address(&v))?;
        let reward_tokens = self
            .view_single("reward_tokens", vec![json!(pool)])
            .await
            .and_then(|v| parse_address_list(&v))?;

        Ok(StakingPoolInfo {
            pool,
            staking_token,
            reward_tokens,
        })
    }

    /// The user's positions across all pools they are subscribed to
    pub async fn user_positions(&self, user: &str) -> SdkResult<Vec<UserStakingPosition>> {
        if !address::is_valid_address(user) {
            return Err(SdkError::InvalidUserAddress(user.to_string()));
        }
        let user = address::normalize_address(user);

        let pools = self
            .view_single("subscribed_pools", vec![json!(user)])
            .await
            .and_then(|v| parse_address_list(&v))?;

        let mut positions = Vec::with_capacity(pools.len());
        for pool in pools {
            let info = self.pool_info(&pool).await?;
            let staked_amount = self
                .view_single("staked_balance", vec![json!(user), json!(pool)])
                .await
                .and_then(|v| chain::parse_u128(&v))?;

            let mut pending_rewards = Vec::with_capacity(info.reward_tokens.len());
            for token in &info.reward_tokens {
                let amount = self
                    .view_single(
                        "pending_reward",
                        vec![json!(user), json!(pool), json!(token)],
                    )
                    .await
                    .and_then(|v| chain::parse_u128(&v))?;
                pending_rewards.push(PendingReward {
                    token: token.clone(),
                    amount,
                });
            }

            positions.push(UserStakingPosition {
                pool: info.pool,
                staking_token: info.staking_token,
                staked_amount,
                pending_rewards,
            });
        }
        Ok(positions)
    }

    async fn view_single(&self, function: &str, arguments: Vec<Value>) -> SdkResult<Value> {
        let results = self
            .client
            .view(ViewRequest::new(
                self.config.rewards_function("multi_rewards", function),
                arguments,
            ))
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SdkError::build_failed_msg(format!("{function} returned no result")))
    }
}

fn parse_address_list(value: &Value) -> SdkResult<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(chain::parse_address).collect(),
        other => Err(SdkError::build_failed_msg(format!(
            "expected address list, got {other}"
        ))),
    }
}
