//! Per-operation timeouts from the `timeouts` block

use crate::error::{ProviderError, Result};
use crate::values::{Str, str_opt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tf_provider::{Value, ValueList};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// One `timeouts { ... }` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutsBlock {
    pub create: Str,
    pub update: Str,
    pub delete: Str,
}

pub type TimeoutsValue = ValueList<Value<TimeoutsBlock>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Resolve the configured block; invalid durations fall back to the default
    /// here and are reported during validation
    pub fn from_value(value: &TimeoutsValue) -> Self {
        let mut timeouts = Self::default();
        let Some(block) = first_block(value) else {
            return timeouts;
        };
        let pick = |v: &Str, default: Duration| {
            str_opt(v)
                .and_then(|s| parse_duration(s).ok())
                .unwrap_or(default)
        };
        timeouts.create = pick(&block.create, timeouts.create);
        timeouts.update = pick(&block.update, timeouts.update);
        timeouts.delete = pick(&block.delete, timeouts.delete);
        timeouts
    }

    /// Every configured duration that does not parse
    pub fn invalid(value: &TimeoutsValue) -> Vec<ProviderError> {
        let Some(block) = first_block(value) else {
            return Vec::new();
        };
        [&block.create, &block.update, &block.delete]
            .into_iter()
            .filter_map(str_opt)
            .filter_map(|s| parse_duration(s).err())
            .collect()
    }
}

fn first_block(value: &TimeoutsValue) -> Option<&TimeoutsBlock> {
    match value {
        Value::Value(blocks) => blocks.iter().find_map(|b| match b {
            Value::Value(block) => Some(block),
            _ => None,
        }),
        _ => None,
    }
}

/// Parse durations such as `90s`, `10m`, `1h30m`, `1.5h` or `500ms`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || ProviderError::InvalidDuration(input.to_string());
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let amount: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        let nanos = amount * unit_nanos;
        if nanos >= u64::MAX as f64 {
            return Err(invalid());
        }
        let unit = Duration::from_nanos(nanos.round() as u64);
        total = total.checked_add(unit).ok_or_else(invalid)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::to_str;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m0.5s").unwrap(), Duration::from_millis(120_500));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for bad in ["", "10", "m", "10x", ".s", "1..5s", "-1s"] {
            assert!(parse_duration(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_parse_duration_overflow_is_an_error() {
        assert!(matches!(
            parse_duration("9999999999999999h"),
            Err(ProviderError::InvalidDuration(_))
        ));
        assert!(parse_duration("18446744073709551615s1h").is_err());
    }

    #[test]
    fn test_from_value() {
        let value: TimeoutsValue = Value::Value(vec![Value::Value(TimeoutsBlock {
            create: to_str("20m"),
            update: Value::Null,
            delete: to_str("bogus"),
        })]);
        let timeouts = Timeouts::from_value(&value);
        assert_eq!(timeouts.create, Duration::from_secs(1200));
        assert_eq!(timeouts.update, DEFAULT_TIMEOUT);
        assert_eq!(timeouts.delete, DEFAULT_TIMEOUT);
        assert_eq!(Timeouts::invalid(&value).len(), 1);
    }

    #[test]
    fn test_missing_block_uses_defaults() {
        assert_eq!(Timeouts::from_value(&Value::Null), Timeouts::default());
    }
}
