//! Chain access: the view-call capability and chain-value conventions
//!
//! `ViewClient` is the seam the rest of the SDK depends on; `FullnodeClient`
//! is the production implementation against the fullnode REST `/v1/view`
//! endpoint. The parsing helpers decode the chain-native value conventions:
//! integers as numeric strings, addresses plain or `{"inner": ...}`-wrapped,
//! options as zero-or-one-element `{"vec": [...]}` wrappers.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::types::{SdkError, SdkResult};

pub mod address;
pub mod decimals;

/// A single view-function invocation
#[derive(Debug, Clone, Serialize)]
pub struct ViewRequest {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl ViewRequest {
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    pub fn with_type_arguments(mut self, type_arguments: Vec<String>) -> Self {
        self.type_arguments = type_arguments;
        self
    }
}

/// The chain view-call capability
///
/// Implementations return the raw result list of the view function. Tests
/// substitute canned responses through this trait; nothing above this layer
/// talks HTTP directly.
pub trait ViewClient: Send + Sync {
    fn view(
        &self,
        request: ViewRequest,
    ) -> impl Future<Output = SdkResult<Vec<Value>>> + Send;
}

/// Fullnode REST implementation of [`ViewClient`]
///
/// POSTs to `{base}/v1/view`. Transport failures and non-2xx responses map
/// to `NetworkError` with the response body retained for diagnostics.
pub struct FullnodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl FullnodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
        }
    }

    /// Same as [`FullnodeClient::new`] with a request timeout applied.
    ///
    /// Without a timeout a hung fullnode blocks the enclosing build
    /// indefinitely.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: trim_trailing_slash(base_url.into()),
        }
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

impl ViewClient for FullnodeClient {
    async fn view(&self, request: ViewRequest) -> SdkResult<Vec<Value>> {
        let url = format!("{}/v1/view", self.base_url);
        tracing::debug!(function = %request.function, "view call");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::network(format!("view call to {url} failed"), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SdkError::network_status(
                format!("view {} returned {status}: {body}", request.function),
                status.as_u16(),
            ));
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| SdkError::network("malformed view response", e))
    }
}

/// Parse a chain integer (numeric string or JSON number) as u128
pub fn parse_u128(value: &Value) -> SdkResult<u128> {
    match value {
        Value::String(s) => s
            .parse::<u128>()
            .map_err(|e| SdkError::build_failed(format!("invalid integer string {s:?}"), e)),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| SdkError::build_failed_msg(format!("invalid integer {n}"))),
        other => Err(SdkError::build_failed_msg(format!(
            "expected integer, got {other}"
        ))),
    }
}

/// Parse a chain integer as u64
pub fn parse_u64(value: &Value) -> SdkResult<u64> {
    let wide = parse_u128(value)?;
    u64::try_from(wide)
        .map_err(|e| SdkError::build_failed(format!("integer {wide} exceeds u64"), e))
}

/// Parse an address, either a plain string or an `{"inner": "0x..."}` wrapper
pub fn parse_address(value: &Value) -> SdkResult<String> {
    match value {
        Value::String(s) => Ok(address::normalize_address(s)),
        Value::Object(map) => match map.get("inner") {
            Some(Value::String(s)) => Ok(address::normalize_address(s)),
            _ => Err(SdkError::build_failed_msg(format!(
                "expected address object with inner field, got {value}"
            ))),
        },
        other => Err(SdkError::build_failed_msg(format!(
            "expected address, got {other}"
        ))),
    }
}

/// Unwrap a chain `Option<T>`: `{"vec": []}` or `{"vec": [v]}`; a plain
/// zero-or-one-element array and `null` are accepted as equivalents.
pub fn parse_option(value: &Value) -> SdkResult<Option<&Value>> {
    let elems = match value {
        Value::Null => return Ok(None),
        Value::Object(map) => match map.get("vec") {
            Some(Value::Array(elems)) => elems,
            _ => {
                return Err(SdkError::build_failed_msg(format!(
                    "expected option wrapper, got {value}"
                )))
            }
        },
        Value::Array(elems) => elems,
        other => {
            return Err(SdkError::build_failed_msg(format!(
                "expected option wrapper, got {other}"
            )))
        }
    };

    match elems.len() {
        0 => Ok(None),
        1 => Ok(Some(&elems[0])),
        n => Err(SdkError::build_failed_msg(format!(
            "option wrapper holds {n} elements"
        ))),
    }
}
