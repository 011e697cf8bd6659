// =============================================================================
// Shared Types — instrument codes, k-line granularity
// =============================================================================
//
// Instrument codes follow the exchange-prefixed form used across the A-share
// data vendors: "SH600000", "SZ000001", "BJ830799". Helpers translate between
// that form, the bare six-digit number, and the vendor-specific id schemes.
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bar granularity for fetches and series storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KlineType {
    #[default]
    Day,
    Min30,
}

impl fmt::Display for KlineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KlineType::Day => write!(f, "day"),
            KlineType::Min30 => write!(f, "30min"),
        }
    }
}

/// Exchange prefixes recognised in a full instrument code.
pub const EXCHANGE_PREFIXES: [&str; 3] = ["SH", "SZ", "BJ"];

/// Is `code` a full exchange-prefixed code ("SH600000")?
pub fn is_prefixed_code(code: &str) -> bool {
    code.len() == 8
        && EXCHANGE_PREFIXES.contains(&code[..2].to_uppercase().as_str())
        && code[2..].bytes().all(|b| b.is_ascii_digit())
}

/// Is `code` a bare six-digit instrument number?
pub fn is_code_number(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Strip the exchange prefix, leaving the six-digit number.
pub fn code_number(code: &str) -> &str {
    if is_prefixed_code(code) {
        &code[2..]
    } else {
        code
    }
}

/// Re-attach the exchange prefix implied by the leading digit of a bare
/// number: 6xx → SH, 0xx/3xx → SZ, 4xx/8xx → BJ.
pub fn full_code(code: &str) -> String {
    if !is_code_number(code) {
        return code.to_string();
    }
    let prefix = match code.as_bytes()[0] {
        b'6' => "SH",
        b'0' | b'3' => "SZ",
        b'4' | b'8' => "BJ",
        _ => return code.to_string(),
    };
    format!("{prefix}{code}")
}

/// Vendor secid for the push-quote APIs: market id dot number, market 1 for
/// Shanghai and 0 for the rest.
pub fn vendor_secid(code: &str) -> String {
    if !is_prefixed_code(code) {
        return code.to_string();
    }
    let market = match &code[..2].to_uppercase()[..] {
        "SH" => "1",
        _ => "0",
    };
    format!("{}.{}", market, &code[2..])
}

/// Vendor secucode form: number dot prefix ("600000.SH").
pub fn vendor_secucode(code: &str) -> String {
    if !is_prefixed_code(code) {
        return code.to_string();
    }
    format!("{}.{}", &code[2..], &code[..2].to_uppercase())
}
