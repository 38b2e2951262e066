//! MovePosition proof-packet generation
//!
//! Some strategy platforms require a signed, externally-generated proof of
//! the signer's portfolio state before a deposit/withdraw leg will settle.
//! Packet generation is best-effort by contract: a failure for one strategy
//! degrades to an empty packet for that strategy only, never aborting the
//! batch. The vault transaction may still be valid with zero allocation to
//! that strategy; an empty packet is a legitimate no-op, not an error.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::chain::{self, ViewClient, ViewRequest};
use crate::config::SdkConfig;
use crate::types::{SdkError, SdkResult};
use crate::vault::allocation::AllocationMap;

/// Vault operation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Withdraw,
}

/// One strategy's packet; empty bytes mean "no packet required or
/// generation degraded", which callers must treat as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketData {
    pub strategy: String,
    pub packet: Vec<u8>,
}

impl PacketData {
    pub fn empty(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            packet: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.packet.is_empty()
    }
}

/// Packet-creation request sent to the broker API
#[derive(Debug, Clone, Serialize)]
pub struct PacketRequest {
    pub amount: String,
    pub network: String,
    #[serde(rename = "signerPubkey")]
    pub signer_pubkey: String,
    #[serde(rename = "currentPortfolioState")]
    pub current_portfolio_state: Value,
    #[serde(rename = "brokerName")]
    pub broker_name: String,
}

/// The external lending-API capability
///
/// `BrokerClient` is the production implementation; tests substitute mocks
/// to exercise partial-failure behavior without HTTP.
pub trait ProofService: Send + Sync {
    /// Current portfolio state (collateral/liability lists) for a signer
    fn portfolio(&self, address: &str) -> impl Future<Output = SdkResult<Value>> + Send;

    /// Request a signed packet; returns the decoded packet bytes
    fn create_packet(
        &self,
        request: &PacketRequest,
        operation: Operation,
    ) -> impl Future<Output = SdkResult<Vec<u8>>> + Send;
}

/// HTTP client for the MovePosition broker API
pub struct BrokerClient {
    http: reqwest::Client,
    base_url: String,
}

impl BrokerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Broker client with a request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ProofService for BrokerClient {
    async fn portfolio(&self, address: &str) -> SdkResult<Value> {
        let url = format!("{}/portfolios/{}", self.base_url, address);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SdkError::network(format!("portfolio fetch from {url} failed"), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::network_msg(format!(
                "portfolio fetch returned {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SdkError::network("malformed portfolio response", e))
    }

    async fn create_packet(
        &self,
        request: &PacketRequest,
        operation: Operation,
    ) -> SdkResult<Vec<u8>> {
        let endpoint = match operation {
            Operation::Deposit => "brokers/lend/v2",
            Operation::Withdraw => "brokers/redeem/v2",
        };
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SdkError::network(format!("packet request to {url} failed"), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SdkError::PacketGenerationFailed(format!(
                "broker returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SdkError::network("malformed packet response", e))?;

        let packet_hex = body
            .get("packet")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SdkError::PacketGenerationFailed("packet response missing packet field".into())
            })?;

        hex::decode(packet_hex.trim_start_matches("0x")).map_err(|e| {
            SdkError::PacketGenerationFailed(format!("packet is not valid hex: {e}"))
        })
    }
}

/// Context shared by every packet in one batch
#[derive(Debug, Clone)]
pub struct VaultContext {
    pub vault: String,
    /// Underlying asset address, used for the broker-name lookup
    pub asset: String,
    /// Signer account whose portfolio state backs the packets
    pub signer: String,
}

/// Generates proof packets for a batch of strategies
pub struct PacketGenerator<'a, V: ViewClient, S: ProofService> {
    client: &'a V,
    config: &'a SdkConfig,
    service: Option<&'a S>,
}

impl<'a, V: ViewClient, S: ProofService> PacketGenerator<'a, V, S> {
    pub fn new(client: &'a V, config: &'a SdkConfig, service: Option<&'a S>) -> Self {
        Self {
            client,
            config,
            service,
        }
    }

    /// Generate one packet per input strategy, element-wise.
    ///
    /// Infallible: every failure path substitutes an empty packet for the
    /// affected strategy and the batch continues. Strategies are processed
    /// sequentially; the withdraw exact-amount lookup depends on per-strategy
    /// state and failure isolation is simplest serialized.
    pub async fn generate(
        &self,
        strategies: &[String],
        amounts: &[u128],
        operation: Operation,
        ctx: &VaultContext,
    ) -> Vec<PacketData> {
        let available = self
            .config
            .move_position
            .as_ref()
            .zip(self.service)
            .and_then(|(mp, service)| {
                mp.broker_for(&ctx.asset)
                    .map(|broker| (mp, service, broker.to_string()))
            });

        // Feature unavailable for this asset: degrade gracefully, no error
        let Some((mp, service, broker_name)) = available else {
            tracing::debug!(asset = %ctx.asset, "no broker configuration, emitting empty packets");
            return strategies.iter().map(PacketData::empty).collect();
        };

        let mut packets = Vec::with_capacity(strategies.len());
        for (strategy, &amount) in strategies.iter().zip(amounts) {
            let packet = self
                .generate_one(strategy, amount, operation, ctx, service, &broker_name, &mp.network)
                .await;
            packets.push(match packet {
                Ok(packet) => PacketData {
                    strategy: strategy.clone(),
                    packet,
                },
                Err(e) => {
                    tracing::warn!(
                        strategy = %strategy,
                        error = %e,
                        "packet generation degraded to empty packet"
                    );
                    PacketData::empty(strategy)
                }
            });
        }
        packets
    }

    async fn generate_one(
        &self,
        strategy: &str,
        amount: u128,
        operation: Operation,
        ctx: &VaultContext,
        service: &S,
        broker_name: &str,
        network: &str,
    ) -> SdkResult<Vec<u8>> {
        let amount = match operation {
            Operation::Deposit => amount,
            // The requested shares are a lower-bound target; the settleable
            // amount includes accrued yield/fees and comes from the chain.
            // A failed lookup means zero, never a propagated error.
            Operation::Withdraw => self
                .exact_withdrawal_amount(&ctx.vault, strategy, amount)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(strategy = %strategy, error = %e,
                        "exact withdrawal amount lookup failed, treating as zero");
                    0
                }),
        };

        if amount == 0 {
            return Ok(Vec::new());
        }

        let portfolio = service.portfolio(&ctx.signer).await?;
        let request = PacketRequest {
            amount: amount.to_string(),
            network: network.to_string(),
            signer_pubkey: ctx.signer.clone(),
            current_portfolio_state: portfolio,
            broker_name: broker_name.to_string(),
        };
        service.create_packet(&request, operation).await
    }

    async fn exact_withdrawal_amount(
        &self,
        vault: &str,
        strategy: &str,
        shares: u128,
    ) -> SdkResult<u128> {
        let results = self
            .client
            .view(ViewRequest::new(
                self.config.vault_function("vault", "strategy_withdrawal_amount"),
                vec![json!(vault), json!(strategy), json!(shares.to_string())],
            ))
            .await?;

        let raw = results.first().ok_or_else(|| {
            SdkError::build_failed_msg("strategy_withdrawal_amount returned no result")
        })?;
        chain::parse_u128(raw)
    }
}

/// Split packets into the parallel arrays the entry function takes,
/// keeping only strategies with non-empty packets.
///
/// When an allocation map is supplied, iteration follows the allocation's
/// strategy order rather than packet-generation order: the entry function
/// pairs packet bytes with allocation entries by index, so the two arrays
/// must agree positionally.
pub fn create_packet_arrays(
    packets: &[PacketData],
    allocation: Option<&AllocationMap>,
) -> (Vec<String>, Vec<Vec<u8>>) {
    let mut strategies = Vec::new();
    let mut bytes = Vec::new();

    match allocation {
        Some(allocation) => {
            for strategy in &allocation.strategies {
                let Some(packet) = packets.iter().find(|p| &p.strategy == strategy) else {
                    continue;
                };
                if packet.is_empty() {
                    continue;
                }
                strategies.push(packet.strategy.clone());
                bytes.push(packet.packet.clone());
            }
        }
        None => {
            for packet in packets {
                if packet.is_empty() {
                    continue;
                }
                strategies.push(packet.strategy.clone());
                bytes.push(packet.packet.clone());
            }
        }
    }

    (strategies, bytes)
}
