//! Human-readable interval strings such as `"55 minute"` or `"2 hours"`.
//!
//! The grammar is `<digits> [whitespace] <unit>[s]` where unit is one of
//! `second`, `minute`, `hour` or `day`, matched case-insensitively.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

static INTERVAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(second|minute|hour|day)s?$").expect("Invalid interval regex")
});

/// Errors produced while parsing an interval string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    /// The string does not follow the `<quantity> <unit>` grammar.
    #[error("invalid interval format: {0:?}")]
    InvalidFormat(String),

    /// The quantity multiplied by the unit does not fit in 64 bits of milliseconds.
    #[error("interval out of range: {0:?}")]
    Overflow(String),
}

/// Milliseconds per unit keyword.
fn unit_millis(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "second" => Some(1_000),
        "minute" => Some(60_000),
        "hour" => Some(3_600_000),
        "day" => Some(86_400_000),
        _ => None,
    }
}

/// Converts an interval string to a number of milliseconds.
///
/// ```
/// use calconnect_core::interval_to_millis;
///
/// assert_eq!(interval_to_millis("55 minute").unwrap(), 3_300_000);
/// assert_eq!(interval_to_millis("2 hours").unwrap(), 7_200_000);
/// ```
pub fn interval_to_millis(input: &str) -> Result<u64, IntervalError> {
    let caps = INTERVAL_REGEX
        .captures(input)
        .ok_or_else(|| IntervalError::InvalidFormat(input.to_string()))?;

    let factor = unit_millis(&caps[2]).ok_or_else(|| IntervalError::InvalidFormat(input.to_string()))?;
    let quantity: u64 = caps[1]
        .parse()
        .map_err(|_| IntervalError::Overflow(input.to_string()))?;

    quantity
        .checked_mul(factor)
        .ok_or_else(|| IntervalError::Overflow(input.to_string()))
}

/// Parses an interval string into a [`Duration`].
pub fn parse_interval(input: &str) -> Result<Duration, IntervalError> {
    interval_to_millis(input).map(Duration::from_millis)
}
