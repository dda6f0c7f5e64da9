//! Best-effort extraction of an ads count from fetcher output.

use std::sync::LazyLock;

use regex::Regex;

/// Tried in order; the first pattern with any match wins.
static ADS_COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)fetched\s+(\d+)\s+ads",
        r"(?i)ads_fetched[:\s]+(\d+)",
        r"(?i)found\s+(\d+)\s+ads",
        r"(?i)total ads:\s*(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Returns the largest count reported by the first matching pattern, or 0.
pub fn parse_ads_count(text: &str) -> i64 {
    for pattern in ADS_COUNT_PATTERNS.iter() {
        let best = pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse::<i64>().ok())
            .max();
        if let Some(count) = best {
            return count;
        }
    }
    0
}
