//! Abbreviated-counter parsing.
//!
//! Feed surfaces render counts as "203.7K videos", "1.2M", "732". The same
//! grammar appears on comment likes, ad view counts, and music usage counts,
//! so it lives here once rather than per adapter.

use std::sync::OnceLock;

use regex::Regex;

fn count_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([\d.,]+)\s*([KMB])?").expect("valid counter regex"))
}

/// Parse an abbreviated UI counter into an integer.
///
/// Accepts an optional decimal number followed by an optional K/M/B unit
/// (case-insensitive), surrounded by arbitrary decoration which is ignored.
/// Decimal values are multiplied by the unit and truncated toward zero.
///
/// This is a best-effort UI-text parser: unmatched input yields 0, never an
/// error.
pub fn parse_count(text: &str) -> u64 {
    let Some(caps) = count_pattern().captures(text.trim()) else {
        return 0;
    };

    let number: f64 = match caps[1].replace(',', "").parse() {
        Ok(n) => n,
        Err(_) => return 0,
    };

    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(u) if u == "K" => 1_000.0,
        Some(u) if u == "M" => 1_000_000.0,
        Some(u) if u == "B" => 1_000_000_000.0,
        _ => 1.0,
    };

    (number * multiplier) as u64
}
