//! Decimal-string scaling helpers
//!
//! On-chain amounts travel as smallest-unit decimal strings; user-facing
//! amounts are human decimal strings. These helpers convert between the two
//! with pure string math, so no floats and no precision loss.

use crate::types::{SdkError, SdkResult};

/// Scale a human decimal string to a smallest-unit integer string.
///
/// `scale_to_decimals("1.5", 6)` -> `"1500000"`. Fails with `InvalidInput`
/// on non-numeric input, a negative sign, or more fractional digits than
/// `decimals` (truncating silently would lose funds).
pub fn scale_to_decimals(amount: &str, decimals: u32) -> SdkResult<String> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(SdkError::InvalidInput("empty amount string".into()));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(SdkError::InvalidInput(format!("invalid amount: {amount}")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(SdkError::InvalidInput(format!(
            "amount is not a non-negative decimal: {amount}"
        )));
    }
    if frac_part.len() > decimals as usize {
        return Err(SdkError::InvalidInput(format!(
            "amount {amount} has more than {decimals} fractional digits"
        )));
    }

    let mut scaled = String::with_capacity(int_part.len() + decimals as usize);
    scaled.push_str(int_part);
    scaled.push_str(frac_part);
    for _ in 0..(decimals as usize - frac_part.len()) {
        scaled.push('0');
    }

    Ok(strip_leading_zeros(&scaled))
}

/// Scale a smallest-unit integer string back to a human decimal string.
///
/// Trailing fractional zeros are stripped; whole numbers carry no fractional
/// part. Fails with `InvalidInput` if the input is not an unsigned integer
/// string.
pub fn scale_from_decimals(amount: &str, decimals: u32) -> SdkResult<String> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit()) {
        return Err(SdkError::InvalidInput(format!(
            "amount is not an unsigned integer: {amount}"
        )));
    }

    if decimals == 0 {
        return Ok(strip_leading_zeros(amount));
    }

    let decimals = decimals as usize;
    let padded = if amount.len() <= decimals {
        format!("{amount:0>width$}", width = decimals + 1)
    } else {
        amount.to_string()
    };

    let split = padded.len() - decimals;
    let int_part = strip_leading_zeros(&padded[..split]);
    let frac_part = padded[split..].trim_end_matches('0');

    if frac_part.is_empty() {
        Ok(int_part)
    } else {
        Ok(format!("{int_part}.{frac_part}"))
    }
}

fn strip_leading_zeros(s: &str) -> String {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_to_decimals() {
        assert_eq!(scale_to_decimals("1.5", 6).unwrap(), "1500000");
        assert_eq!(scale_to_decimals("0.000001", 6).unwrap(), "1");
        assert_eq!(scale_to_decimals("42", 0).unwrap(), "42");
        assert_eq!(scale_to_decimals("0", 8).unwrap(), "0");
    }

    #[test]
    fn test_scale_to_decimals_rejects_bad_input() {
        assert!(scale_to_decimals("", 6).is_err());
        assert!(scale_to_decimals("-1", 6).is_err());
        assert!(scale_to_decimals("1.2.3", 6).is_err());
        assert!(scale_to_decimals("abc", 6).is_err());
        // More fractional digits than decimals would silently lose funds
        assert!(scale_to_decimals("0.1234567", 6).is_err());
        assert!(matches!(
            scale_to_decimals("x", 6).unwrap_err(),
            SdkError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_scale_from_decimals() {
        assert_eq!(scale_from_decimals("1500000", 6).unwrap(), "1.5");
        assert_eq!(scale_from_decimals("1", 6).unwrap(), "0.000001");
        assert_eq!(scale_from_decimals("1000000", 6).unwrap(), "1");
        assert_eq!(scale_from_decimals("0", 6).unwrap(), "0");
        assert_eq!(scale_from_decimals("007", 0).unwrap(), "7");
    }

    #[test]
    fn test_round_trip() {
        // scale_from(scale_to(s, d), d) reproduces s with trailing
        // fractional zeros stripped and whole numbers left bare
        let cases = [
            ("1.5", 6, "1.5"),
            ("1.500", 6, "1.5"),
            ("1.000000", 6, "1"),
            ("0.000000000000000001", 18, "0.000000000000000001"),
            ("123456789", 0, "123456789"),
            ("0", 9, "0"),
            ("10.010", 4, "10.01"),
        ];
        for (input, decimals, expected) in cases {
            let scaled = scale_to_decimals(input, decimals).unwrap();
            let back = scale_from_decimals(&scaled, decimals).unwrap();
            assert_eq!(back, expected, "round trip of {input} @ {decimals}");
        }
    }
}
