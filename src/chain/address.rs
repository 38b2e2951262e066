//! Address and type-tag normalization
//!
//! Everything that compares addresses or embeds them in function identifiers
//! goes through `normalize_address` first: lowercase, zero-left-padded to
//! 32 bytes, `0x`-prefixed. Normalization is total (it never errors), so a
//! missing prefix or mixed casing can never cause a misclassification.

/// Canonical hex width of a 32-byte account address
const ADDRESS_HEX_WIDTH: usize = 64;

/// Normalize an account address to canonical `0x` + 64 lowercase hex chars.
///
/// Accepts an optional `@` or `0x` prefix. Inputs longer than 64 hex chars
/// are passed through lowercased rather than truncated.
pub fn normalize_address(address: &str) -> String {
    let stripped = address
        .trim()
        .trim_start_matches('@')
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .to_lowercase();

    if stripped.len() >= ADDRESS_HEX_WIDTH {
        return format!("0x{stripped}");
    }
    format!("0x{stripped:0>width$}", width = ADDRESS_HEX_WIDTH)
}

/// Normalize a `pkg::module::Type` tag.
///
/// The package segment gets address normalization (including an optional
/// leading `@`); module and type segments pass through unchanged. Inputs
/// without a `::` separator are returned as-is.
pub fn normalize_type_tag(tag: &str) -> String {
    let tag = tag.trim();
    match tag.split_once("::") {
        Some((package, rest)) => format!("{}::{}", normalize_address(package), rest),
        None => tag.to_string(),
    }
}

/// Whether a token identifier names a coin type rather than a fungible-asset
/// metadata address. The `::` module-path separator is the discriminator;
/// this heuristic is load-bearing for unstake dispatch.
pub fn is_coin_type(token: &str) -> bool {
    token.contains("::")
}

/// Syntactic account-address check used for eager input validation.
///
/// Accepts an optional `0x` prefix followed by 1..=64 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    let stripped = address
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    !stripped.is_empty()
        && stripped.len() <= ADDRESS_HEX_WIDTH
        && stripped.chars().all(|c| c.is_ascii_hexdigit())
}

/// Address equality under normalization
pub fn addresses_equal(a: &str, b: &str) -> bool {
    normalize_address(a) == normalize_address(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_and_lowercases() {
        assert_eq!(
            normalize_address("0xA1"),
            format!("0x{}a1", "0".repeat(62))
        );
        assert_eq!(normalize_address("a1"), normalize_address("0xA1"));
        assert_eq!(normalize_address("@a1"), normalize_address("0xa1"));
    }

    #[test]
    fn test_normalize_full_width_untouched() {
        let full = format!("0x{}", "ab".repeat(32));
        assert_eq!(normalize_address(&full), full);
    }

    #[test]
    fn test_normalize_is_total_on_garbage() {
        // Not valid hex, but normalization must not panic or error
        let out = normalize_address("not-hex");
        assert!(out.starts_with("0x"));
    }

    #[test]
    fn test_normalize_type_tag_package_only() {
        assert_eq!(
            normalize_type_tag("0x1::aptos_coin::AptosCoin"),
            format!("0x{}1::aptos_coin::AptosCoin", "0".repeat(63))
        );
        assert_eq!(
            normalize_type_tag("@1::aptos_coin::AptosCoin"),
            normalize_type_tag("0x1::aptos_coin::AptosCoin")
        );
        // Module/type casing passes through unchanged
        assert!(normalize_type_tag("0x1::Foo::BAR").ends_with("::Foo::BAR"));
    }

    #[test]
    fn test_normalize_type_tag_without_separator() {
        assert_eq!(normalize_type_tag("0xabc"), "0xabc");
    }

    #[test]
    fn test_is_coin_type() {
        assert!(is_coin_type("0x1::aptos_coin::AptosCoin"));
        assert!(!is_coin_type("0xabc123"));
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address("0x1"));
        assert!(is_valid_address("0xABCdef"));
        assert!(is_valid_address(&"f".repeat(64)));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x"));
        assert!(!is_valid_address("0xzz"));
        assert!(!is_valid_address(&"f".repeat(65)));
    }

    #[test]
    fn test_addresses_equal_ignores_prefix_and_case() {
        assert!(addresses_equal("0xAB", "ab"));
        assert!(addresses_equal("@ab", "0x00AB"));
        assert!(!addresses_equal("0xab", "0xac"));
    }
}
