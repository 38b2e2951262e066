//! Strategy allocation resolution
//!
//! Queries the chain's deposit/withdrawal allocation view functions and
//! decodes the returned map into parallel strategy/amount arrays. The map
//! encoding varies by framework version, so parsing is an explicit shape
//! dispatch; anything unrecognized is a hard build failure rather than a
//! guess. Zero-amount entries mean "eligible but unallocated" and are
//! silently pruned.

use serde_json::{json, Value};

use crate::chain::{self, ViewClient, ViewRequest};
use crate::config::SdkConfig;
use crate::types::{SdkError, SdkResult};

/// Conservation tolerance divisor: allocations may deviate from the
/// requested total by up to total/1000 (0.1%) to absorb chain-side rounding.
const TOLERANCE_DIVISOR: u128 = 1000;

/// Parallel strategy/amount arrays produced fresh per call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationMap {
    pub strategies: Vec<String>,
    pub amounts: Vec<u128>,
}

impl AllocationMap {
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn total(&self) -> u128 {
        self.amounts.iter().sum()
    }
}

/// Resolves allocation maps from on-chain view calls
pub struct AllocationResolver<'a, V: ViewClient> {
    client: &'a V,
    config: &'a SdkConfig,
}

impl<'a, V: ViewClient> AllocationResolver<'a, V> {
    pub fn new(client: &'a V, config: &'a SdkConfig) -> Self {
        Self { client, config }
    }

    /// How a deposit of `amount` would be split across strategies
    pub async fn resolve_deposit(&self, vault: &str, amount: u128) -> SdkResult<AllocationMap> {
        self.resolve("deposit_allocation", vault, amount).await
    }

    /// How a withdrawal of `shares` would be drawn from strategies
    pub async fn resolve_withdraw(&self, vault: &str, shares: u128) -> SdkResult<AllocationMap> {
        self.resolve("withdrawal_allocation", vault, shares).await
    }

    async fn resolve(&self, function: &str, vault: &str, amount: u128) -> SdkResult<AllocationMap> {
        let vault = chain::address::normalize_address(vault);
        let results = self
            .client
            .view(ViewRequest::new(
                self.config.vault_function("vault", function),
                vec![json!(vault), json!(amount.to_string())],
            ))
            .await
            .map_err(|e| SdkError::build_failed(format!("{function} view call failed"), e))?;

        let raw = results.first().ok_or_else(|| {
            SdkError::build_failed_msg(format!("{function} returned no result"))
        })?;

        parse_allocation_map(raw)
    }
}

/// The map encodings the chain is known to produce
enum MapShape<'a> {
    /// SimpleMap: `{"data": [{"key": .., "value": ..}, ..]}`
    SimpleMap(&'a Vec<Value>),
    /// Plain list of `{"key", "value"}` entry objects or `[key, value]` pairs
    EntryList(&'a Vec<Value>),
}

fn detect_shape(value: &Value) -> SdkResult<MapShape<'_>> {
    match value {
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(entries)) => Ok(MapShape::SimpleMap(entries)),
            _ => Err(SdkError::build_failed_msg(format!(
                "unrecognized allocation map shape: {value}"
            ))),
        },
        Value::Array(entries) => Ok(MapShape::EntryList(entries)),
        other => Err(SdkError::build_failed_msg(format!(
            "unrecognized allocation map shape: {other}"
        ))),
    }
}

/// Parse a chain allocation map into parallel arrays, pruning zero entries.
pub fn parse_allocation_map(value: &Value) -> SdkResult<AllocationMap> {
    let entries = match detect_shape(value)? {
        MapShape::SimpleMap(entries) | MapShape::EntryList(entries) => entries,
    };

    let mut allocation = AllocationMap::default();
    for entry in entries {
        let (key, amount) = parse_entry(entry)?;
        // Present key with zero/missing value: eligible but unallocated
        let Some(amount) = amount else { continue };
        if amount == 0 {
            continue;
        }
        allocation.strategies.push(key);
        allocation.amounts.push(amount);
    }

    Ok(allocation)
}

fn parse_entry(entry: &Value) -> SdkResult<(String, Option<u128>)> {
    let (key, value) = match entry {
        Value::Object(map) => {
            let key = map.get("key").ok_or_else(|| {
                SdkError::build_failed_msg(format!("allocation entry missing key: {entry}"))
            })?;
            (key, map.get("value"))
        }
        Value::Array(pair) if pair.len() == 2 => (&pair[0], Some(&pair[1])),
        other => {
            return Err(SdkError::build_failed_msg(format!(
                "unrecognized allocation entry: {other}"
            )))
        }
    };

    let key = chain::parse_address(key)?;
    let amount = match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(chain::parse_u128(v)?),
    };
    Ok((key, amount))
}

/// Validate an allocation against the requested total.
///
/// Rejects empty allocations, parallel-array length mismatches, and sums
/// that deviate from `total` by more than total/1000 in either direction.
pub fn validate(allocation: &AllocationMap, total: u128) -> SdkResult<()> {
    if allocation.is_empty() {
        return Err(SdkError::build_failed_msg(
            "allocation resolved to no strategies",
        ));
    }
    if allocation.strategies.len() != allocation.amounts.len() {
        return Err(SdkError::build_failed_msg(format!(
            "allocation arrays misaligned: {} strategies vs {} amounts",
            allocation.strategies.len(),
            allocation.amounts.len()
        )));
    }

    let sum = allocation.total();
    let tolerance = total / TOLERANCE_DIVISOR;
    let deviation = sum.abs_diff(total);
    if deviation > tolerance {
        return Err(SdkError::build_failed_msg(format!(
            "allocation sum {sum} deviates from requested {total} by {deviation} \
             (tolerance {tolerance})"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_map_shape() {
        let raw = json!({"data": [
            {"key": "0x51", "value": "600000"},
            {"key": "0x52", "value": "400000"},
        ]});
        let allocation = parse_allocation_map(&raw).unwrap();
        assert_eq!(allocation.len(), 2);
        assert_eq!(allocation.amounts, vec![600_000, 400_000]);
    }

    #[test]
    fn test_parse_pair_list_shape() {
        let raw = json!([["0x51", "250"], ["0x52", "750"]]);
        let allocation = parse_allocation_map(&raw).unwrap();
        assert_eq!(allocation.total(), 1000);
    }

    #[test]
    fn test_zero_and_missing_values_pruned() {
        let raw = json!({"data": [
            {"key": "0x51", "value": "0"},
            {"key": "0x52"},
            {"key": "0x53", "value": null},
            {"key": "0x54", "value": "10"},
        ]});
        let allocation = parse_allocation_map(&raw).unwrap();
        assert_eq!(allocation.len(), 1);
        assert!(allocation.amounts.iter().all(|&a| a > 0));
    }

    #[test]
    fn test_unrecognized_shape_is_error() {
        for raw in [json!("0x51"), json!({"entries": []}), json!(42)] {
            let err = parse_allocation_map(&raw).unwrap_err();
            assert!(matches!(err, SdkError::TransactionBuildFailed { .. }));
            assert!(err.to_string().contains("unrecognized"));
        }
    }

    #[test]
    fn test_validate_within_tolerance() {
        let total = 1_000_000u128;
        // tolerance = 1000 either direction
        for sum in [999_000u128, 1_000_000, 1_001_000] {
            let allocation = AllocationMap {
                strategies: vec!["0x51".into()],
                amounts: vec![sum],
            };
            assert!(validate(&allocation, total).is_ok(), "sum {sum}");
        }
    }

    #[test]
    fn test_validate_rejects_gross_mismatch() {
        let total = 1_000_000u128;
        for sum in [998_999u128, 1_001_001] {
            let allocation = AllocationMap {
                strategies: vec!["0x51".into()],
                amounts: vec![sum],
            };
            assert!(validate(&allocation, total).is_err(), "sum {sum}");
        }
    }

    #[test]
    fn test_validate_rejects_empty_and_misaligned() {
        assert!(validate(&AllocationMap::default(), 100).is_err());
        let misaligned = AllocationMap {
            strategies: vec!["0x51".into(), "0x52".into()],
            amounts: vec![100],
        };
        assert!(validate(&misaligned, 100).is_err());
    }

    #[test]
    fn test_tolerance_truncates() {
        // total 1999 -> tolerance 1 (integer division)
        let allocation = AllocationMap {
            strategies: vec!["0x51".into()],
            amounts: vec![1997],
        };
        assert!(validate(&allocation, 1999).is_err());
        let allocation = AllocationMap {
            strategies: vec!["0x51".into()],
            amounts: vec![1998],
        };
        assert!(validate(&allocation, 1999).is_ok());
    }
}
