// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable ceremony timeout parsing.
//!
//! WebAuthn expresses ceremony timeouts in milliseconds. Configuration
//! accepts friendlier forms and converts them here.
//!
//! # Supported formats
//!
//! - `60000` - raw milliseconds
//! - `500ms` - milliseconds
//! - `60s` - seconds
//! - `5m` - minutes
//! - `1h` - hours
//! - `1m30s` - combined
//!
//! # Examples
//!
//! ```
//! use fidobridge_common::duration::parse_timeout_ms;
//!
//! assert_eq!(parse_timeout_ms("60000").unwrap(), 60_000);
//! assert_eq!(parse_timeout_ms("60s").unwrap(), 60_000);
//! assert_eq!(parse_timeout_ms("2m").unwrap(), 120_000);
//! assert_eq!(parse_timeout_ms("1m30s").unwrap(), 90_000);
//! assert_eq!(parse_timeout_ms("250ms").unwrap(), 250);
//! ```

use std::fmt;

/// Error type for timeout parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDurationError {
    input: String,
    reason: String,
}

impl ParseDurationError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid duration '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseDurationError {}

const UNITS: &[(&str, u64)] = &[
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
];

/// Parse a timeout string into milliseconds.
///
/// A bare number is taken as milliseconds. Otherwise the input is a sequence
/// of `<number><unit>` components with units `h`, `m`, `s` and `ms`
/// (case-insensitive).
pub fn parse_timeout_ms(input: &str) -> Result<u64, ParseDurationError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(ParseDurationError::new(input, "empty string"));
    }

    if let Ok(ms) = input.parse::<u64>() {
        return Ok(ms);
    }

    let lower = input.to_ascii_lowercase();
    let mut rest = lower.as_str();
    let mut total: u64 = 0;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(ParseDurationError::new(
                input,
                format!("expected number before '{}'", rest),
            ));
        }
        let num: u64 = rest[..digits]
            .parse()
            .map_err(|_| ParseDurationError::new(input, format!("invalid number '{}'", &rest[..digits])))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        if unit.is_empty() {
            return Err(ParseDurationError::new(
                input,
                format!("number '{}' missing unit (use h, m, s, ms)", num),
            ));
        }

        let multiplier = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, ms)| *ms)
            .ok_or_else(|| {
                ParseDurationError::new(
                    input,
                    format!("unknown unit '{}' (supported: h, m, s, ms)", unit),
                )
            })?;

        total = num
            .checked_mul(multiplier)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| ParseDurationError::new(input, "duration overflow"))?;

        rest = &rest[unit_len..];
    }

    Ok(total)
}

/// Format milliseconds as a human-readable string; inverse of
/// [`parse_timeout_ms`].
///
/// ```
/// use fidobridge_common::duration::format_timeout_ms;
///
/// assert_eq!(format_timeout_ms(60_000), "1m");
/// assert_eq!(format_timeout_ms(90_500), "1m30s500ms");
/// assert_eq!(format_timeout_ms(0), "0ms");
/// ```
pub fn format_timeout_ms(mut ms: u64) -> String {
    if ms == 0 {
        return "0ms".to_string();
    }

    let mut out = String::new();
    for (name, unit) in UNITS.iter().rev() {
        let count = ms / unit;
        if count > 0 {
            out.push_str(&format!("{}{}", count, name));
            ms %= unit;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_milliseconds() {
        assert_eq!(parse_timeout_ms("0").unwrap(), 0);
        assert_eq!(parse_timeout_ms("60000").unwrap(), 60_000);
        assert_eq!(parse_timeout_ms(" 1500 ").unwrap(), 1_500);
    }

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_timeout_ms("750ms").unwrap(), 750);
        assert_eq!(parse_timeout_ms("60s").unwrap(), 60_000);
        assert_eq!(parse_timeout_ms("5m").unwrap(), 300_000);
        assert_eq!(parse_timeout_ms("1h").unwrap(), 3_600_000);
    }

    #[test]
    fn test_parse_combined_and_case() {
        assert_eq!(parse_timeout_ms("1m30s").unwrap(), 90_000);
        assert_eq!(parse_timeout_ms("1H2M3S4MS").unwrap(), 3_723_004);
        assert_eq!(parse_timeout_ms("2s500ms").unwrap(), 2_500);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_timeout_ms("").is_err());
        assert!(parse_timeout_ms("30x").is_err());
        assert!(parse_timeout_ms("s").is_err());
        assert!(parse_timeout_ms("30s20").is_err());
        assert!(parse_timeout_ms("30s@").is_err());
        assert!(parse_timeout_ms("-5s").is_err());

        let err = parse_timeout_ms("10d").unwrap_err();
        assert!(err.to_string().contains("unknown unit 'd'"));
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_timeout_ms("18446744073709551615h").is_err());
    }

    #[test]
    fn test_format_roundtrip() {
        for ms in [0, 1, 999, 1_000, 60_000, 90_500, 3_723_004] {
            let formatted = format_timeout_ms(ms);
            assert_eq!(parse_timeout_ms(&formatted).unwrap(), ms, "roundtrip failed for {}", formatted);
        }
    }
}
