//! Shared types and error handling
//!
//! The public error taxonomy plus the entry-function payload structure
//! returned to integrators. Payloads are submit-ready JSON shapes; signing
//! and submission happen outside the SDK.

use serde::Serialize;

/// Result type used throughout the SDK
pub type SdkResult<T> = Result<T, SdkError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SDK error taxonomy
///
/// Every variant carries a human-readable message; `code()` exposes a stable
/// machine-readable identifier so integrators can branch without string
/// matching. Unexpected internal failures are wrapped into the nearest
/// domain kind with the original cause attached as `source`.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("Vault not found: {0}")]
    VaultNotFound(String),

    #[error("Vault is paused: {0}")]
    VaultPaused(String),

    #[error("Invalid vault address: {0}")]
    InvalidVaultAddress(String),

    #[error("Invalid user address: {0}")]
    InvalidUserAddress(String),

    #[error("Invalid token address: {0}")]
    InvalidTokenAddress(String),

    #[error("Invalid pool address: {0}")]
    InvalidPoolAddress(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Amount too small: {0}")]
    AmountTooSmall(String),

    #[error("Transaction build failed: {message}")]
    TransactionBuildFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        /// HTTP status of the failing response, when one was received
        status: Option<u16>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("No staking pools found for {token}. {detail}")]
    StakingPoolsNotFound { token: String, detail: String },

    #[error("Packet generation failed: {0}")]
    PacketGenerationFailed(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
}

impl SdkError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            SdkError::VaultNotFound(_) => "VAULT_NOT_FOUND",
            SdkError::VaultPaused(_) => "VAULT_PAUSED",
            SdkError::InvalidVaultAddress(_) => "INVALID_VAULT_ADDRESS",
            SdkError::InvalidUserAddress(_) => "INVALID_USER_ADDRESS",
            SdkError::InvalidTokenAddress(_) => "INVALID_TOKEN_ADDRESS",
            SdkError::InvalidPoolAddress(_) => "INVALID_POOL_ADDRESS",
            SdkError::InvalidInput(_) => "INVALID_INPUT",
            SdkError::AmountTooSmall(_) => "AMOUNT_TOO_SMALL",
            SdkError::TransactionBuildFailed { .. } => "TRANSACTION_BUILD_FAILED",
            SdkError::NetworkError { .. } => "NETWORK_ERROR",
            SdkError::StakingPoolsNotFound { .. } => "STAKING_POOLS_NOT_FOUND",
            SdkError::PacketGenerationFailed(_) => "PACKET_GENERATION_FAILED",
            SdkError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
        }
    }

    /// Wrap a non-domain failure as a build failure, keeping the cause
    pub fn build_failed<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SdkError::TransactionBuildFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build failure with no underlying cause
    pub fn build_failed_msg(message: impl Into<String>) -> Self {
        SdkError::TransactionBuildFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a transport-level failure, keeping the cause
    pub fn network<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SdkError::NetworkError {
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    /// Network error with no underlying cause
    pub fn network_msg(message: impl Into<String>) -> Self {
        SdkError::NetworkError {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Non-2xx response; the status lets callers tell a node-side rejection
    /// (4xx) from an outage (5xx)
    pub fn network_status(message: impl Into<String>, status: u16) -> Self {
        SdkError::NetworkError {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// No pool source is configured at all; the message enumerates the
    /// three remediation options because this is the most common
    /// integration dead-end.
    pub fn no_pool_source(token: impl Into<String>) -> Self {
        SdkError::StakingPoolsNotFound {
            token: token.into(),
            detail: "Provide pools explicitly, add a static pool mapping for this \
                     token, or configure a pool-discovery API key."
                .into(),
        }
    }

    /// A pool source existed but yielded nothing (distinct from having no
    /// source configured)
    pub fn pools_resolved_empty(token: impl Into<String>) -> Self {
        SdkError::StakingPoolsNotFound {
            token: token.into(),
            detail: "A configured pool source returned no pools for this token.".into(),
        }
    }
}

/// A single argument in an entry-function payload
///
/// Serializes untagged into the chain-submittable JSON shape: addresses and
/// amounts as strings (amounts are decimal strings to avoid u64 precision
/// loss in JSON), byte arrays as raw byte lists, lists as arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntryArgument {
    Address(String),
    Amount(String),
    Bool(bool),
    Bytes(Vec<u8>),
    AddressList(Vec<String>),
    BytesList(Vec<Vec<u8>>),
}

impl EntryArgument {
    pub fn amount(value: u128) -> Self {
        EntryArgument::Amount(value.to_string())
    }
}

/// Entry-function transaction payload returned to integrators
///
/// `function` is the fully-qualified `address::module::name` identifier.
/// The structure is opaque to the SDK beyond correct construction; callers
/// hand it to their wallet/submission layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFunctionPayload {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<EntryArgument>,
}

impl EntryFunctionPayload {
    pub fn new(
        function: impl Into<String>,
        type_arguments: Vec<String>,
        arguments: Vec<EntryArgument>,
    ) -> Self {
        Self {
            function: function.into(),
            type_arguments,
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(SdkError::VaultNotFound("0x1".into()).code(), "VAULT_NOT_FOUND");
        assert_eq!(
            SdkError::build_failed_msg("boom").code(),
            "TRANSACTION_BUILD_FAILED"
        );
        assert_eq!(
            SdkError::no_pool_source("0x1").code(),
            "STAKING_POOLS_NOT_FOUND"
        );
    }

    #[test]
    fn test_staking_pools_not_found_lists_remediations() {
        let msg = SdkError::no_pool_source("0xabc").to_string();
        assert!(msg.contains("explicitly"));
        assert!(msg.contains("static"));
        assert!(msg.contains("API key"));

        let msg = SdkError::pools_resolved_empty("0xabc").to_string();
        assert!(msg.contains("returned no pools"));
    }

    #[test]
    fn test_payload_serialization_shape() {
        let payload = EntryFunctionPayload::new(
            "0x1::vault_entries::deposit",
            vec!["0x1::aptos_coin::AptosCoin".to_string()],
            vec![
                EntryArgument::Address("0xabc".into()),
                EntryArgument::AddressList(vec![]),
                EntryArgument::BytesList(vec![vec![1, 2]]),
                EntryArgument::amount(1_000_000),
            ],
        );

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["function"], "0x1::vault_entries::deposit");
        assert_eq!(json["arguments"][0], "0xabc");
        assert_eq!(json["arguments"][1], serde_json::json!([]));
        assert_eq!(json["arguments"][2], serde_json::json!([[1, 2]]));
        assert_eq!(json["arguments"][3], "1000000");
    }
}
