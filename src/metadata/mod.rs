//! Off-chain metadata: GraphQL fetch with TTL caching
//!
//! Two independent metadata sources share one client shape: vault
//! display/financial metadata and staking-pool discovery. Metadata is
//! best-effort: a failed fetch degrades to `None` with a warning, because
//! on-chain data alone is enough to build transactions. Pool discovery is
//! not best-effort; it is a resolution layer and its failures propagate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::config::SdkConfig;
use crate::staking::PoolApi;
use crate::types::{SdkError, SdkResult};
use crate::vault::view::VaultView;

/// Default freshness window for cached metadata
const DEFAULT_TTL: Duration = Duration::from_secs(60);

const VAULT_METADATA_QUERY: &str = r#"
query VaultMetadata($vault: String!) {
  vault(address: $vault) {
    name
    symbol
    logoUrl
    apr
    tvlUsd
  }
}
"#;

const POOLS_FOR_TOKEN_QUERY: &str = r#"
query PoolsForToken($token: String!) {
  stakingPools(stakingToken: $token) {
    address
  }
}
"#;

/// Minimal GraphQL-over-HTTPS client
pub struct GraphqlClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl GraphqlClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }

    /// Execute a query; GraphQL-level errors surface as `NetworkError`.
    pub async fn query(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
    ) -> SdkResult<Value> {
        let mut request = self.http.post(&self.url).json(&json!({
            "operationName": operation_name,
            "query": query,
            "variables": variables,
        }));
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SdkError::network(format!("{operation_name} query failed"), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::network_msg(format!(
                "{operation_name} query returned {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SdkError::network("malformed GraphQL response", e))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(SdkError::network_msg(format!(
                    "{operation_name} returned errors: {}",
                    Value::Array(errors.clone())
                )));
            }
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}

/// String-keyed cache with per-entry expiry
pub struct TtlCache<T: Clone> {
    entries: RwLock<HashMap<String, (Instant, T)>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        entries.get(key).and_then(|(inserted, value)| {
            (inserted.elapsed() <= self.ttl).then(|| value.clone())
        })
    }

    pub async fn insert(&self, key: impl Into<String>, value: T) {
        let mut entries = self.entries.write().await;
        entries.insert(key.into(), (Instant::now(), value));
    }
}

/// Display/financial metadata for a vault, GraphQL-sourced
#[derive(Debug, Clone, Serialize)]
pub struct VaultMetadata {
    pub name: String,
    pub symbol: String,
    pub logo_url: Option<String>,
    pub apr: Option<f64>,
    pub tvl_usd: Option<f64>,
}

impl VaultMetadata {
    /// Convert the raw GraphQL object; `None` when required fields are
    /// missing or mistyped.
    pub fn from_gql(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            name: obj.get("name")?.as_str()?.to_string(),
            symbol: obj.get("symbol")?.as_str()?.to_string(),
            logo_url: obj
                .get("logoUrl")
                .and_then(Value::as_str)
                .map(String::from),
            apr: obj.get("apr").and_then(Value::as_f64),
            tvl_usd: obj.get("tvlUsd").and_then(Value::as_f64),
        })
    }
}

/// A vault entity merged from GraphQL metadata and on-chain state.
///
/// Either source may be absent; the entity is constructible from either
/// alone.
#[derive(Debug, Clone, Serialize)]
pub struct VaultData {
    pub vault: String,
    pub metadata: Option<VaultMetadata>,
    pub view: Option<VaultView>,
}

impl VaultData {
    /// `None` only when both sources are absent
    pub fn from_parts(
        vault: impl Into<String>,
        metadata: Option<VaultMetadata>,
        view: Option<VaultView>,
    ) -> Option<Self> {
        if metadata.is_none() && view.is_none() {
            return None;
        }
        Some(Self {
            vault: vault.into(),
            metadata,
            view,
        })
    }
}

/// Cached access to the vault and staking-pool metadata endpoints
pub struct MetadataClient {
    vault_api: Option<GraphqlClient>,
    pool_api: Option<GraphqlClient>,
    vault_cache: TtlCache<VaultMetadata>,
    pool_cache: TtlCache<Vec<String>>,
}

impl MetadataClient {
    pub fn new(config: &SdkConfig) -> Self {
        let vault_api = config
            .vault_api_url
            .as_ref()
            .map(|url| GraphqlClient::new(url, config.api_key.clone()));
        let pool_api = config
            .pool_api_url
            .as_ref()
            .map(|url| GraphqlClient::new(url, config.api_key.clone()));
        Self {
            vault_api,
            pool_api,
            vault_cache: TtlCache::new(DEFAULT_TTL),
            pool_cache: TtlCache::new(DEFAULT_TTL),
        }
    }

    /// Vault display metadata, best-effort: failures degrade to `None`
    /// with a warning because on-chain data suffices for transactions.
    pub async fn vault_metadata(&self, vault: &str) -> Option<VaultMetadata> {
        let api = self.vault_api.as_ref()?;

        if let Some(cached) = self.vault_cache.get(vault).await {
            return Some(cached);
        }

        let fetched = api
            .query("VaultMetadata", VAULT_METADATA_QUERY, json!({"vault": vault}))
            .await;
        let data = match fetched {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(vault = %vault, error = %e, "vault metadata fetch degraded to none");
                return None;
            }
        };

        let metadata = VaultMetadata::from_gql(data.get("vault").unwrap_or(&Value::Null))?;
        self.vault_cache.insert(vault, metadata.clone()).await;
        Some(metadata)
    }
}

impl PoolApi for MetadataClient {
    async fn pools_for_token(&self, token: &str) -> SdkResult<Vec<String>> {
        let Some(api) = self.pool_api.as_ref() else {
            return Ok(Vec::new());
        };

        if let Some(cached) = self.pool_cache.get(token).await {
            return Ok(cached);
        }

        let data = api
            .query("PoolsForToken", POOLS_FOR_TOKEN_QUERY, json!({"token": token}))
            .await?;

        let pools: Vec<String> = data
            .get("stakingPools")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|p| p.get("address").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        self.pool_cache.insert(token, pools.clone()).await;
        Ok(pools)
    }
}
