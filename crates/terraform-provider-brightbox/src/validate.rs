//! Attribute validators
//!
//! Each check takes a known value and returns a message on failure. The
//! [`Checker`] applies them to state values, skipping nulls and unknowns,
//! and records attribute-scoped diagnostics.

use crate::diag;
use crate::values::{Str, StrSet, num_opt, str_opt};
use regex::Regex;
use std::sync::LazyLock;
use tf_provider::{Diagnostics, ValueNumber};

static ZONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^gb1s?-[ab]$").unwrap());
static LOWERCASE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").unwrap());

pub type Check = std::result::Result<(), String>;

/// `srv-abc12` style identifiers
pub fn id_with_prefix(value: &str, prefixes: &[&str]) -> Check {
    let ok = value.split_once('-').is_some_and(|(prefix, rest)| {
        prefixes.contains(&prefix)
            && rest.len() == 5
            && rest.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });
    if ok {
        Ok(())
    } else {
        let expected: Vec<String> = prefixes.iter().map(|p| format!("{}-xxxxx", p)).collect();
        Err(format!(
            "'{}' is not a valid identifier, expected {}",
            value,
            expected.join(" or ")
        ))
    }
}

pub fn one_of(value: &str, allowed: &[&str]) -> Check {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "'{}' must be one of: {}",
            value,
            allowed.join(", ")
        ))
    }
}

pub fn in_range(value: i64, min: i64, max: i64) -> Check {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be between {} and {}", value, min, max))
    }
}

pub fn zone(value: &str) -> Check {
    if ZONE.is_match(value) {
        Ok(())
    } else {
        Err(format!("'{}' is not a zone handle such as gb1-a", value))
    }
}

pub fn not_empty(value: &str) -> Check {
    if value.trim().is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(())
    }
}

pub fn port(value: &str) -> Check {
    value
        .parse::<i64>()
        .map_err(|_| format!("'{}' is not a port number", value))
        .and_then(|p| in_range(p, 1, 65535))
}

/// A single port or a `from-to` range
pub fn port_range(value: &str) -> Check {
    match value.split_once('-') {
        Some((from, to)) => {
            port(from)?;
            port(to)
        }
        None => port(value),
    }
}

/// Named protocol or an IP protocol number
pub fn protocol(value: &str) -> Check {
    const NAMED: &[&str] = &["tcp", "udp", "icmp", "esp", "ah", "gre"];
    if NAMED.contains(&value) {
        return Ok(());
    }
    match value.parse::<i64>() {
        Ok(n) => in_range(n, 0, 255),
        Err(_) => one_of(value, NAMED),
    }
}

/// Orbit stores metadata keys lowercased
pub fn metadata_key(value: &str) -> Check {
    if LOWERCASE_KEY.is_match(value) {
        Ok(())
    } else {
        Err(format!(
            "metadata key '{}' must be lowercase letters, digits, '-' or '_'",
            value
        ))
    }
}

pub fn regex(value: &str) -> Check {
    Regex::new(value)
        .map(|_| ())
        .map_err(|e| format!("invalid regular expression: {}", e))
}

/// Records failed checks against attributes
pub struct Checker<'d> {
    diags: &'d mut Diagnostics,
}

impl<'d> Checker<'d> {
    pub fn new(diags: &'d mut Diagnostics) -> Self {
        Self { diags }
    }

    fn record(&mut self, attribute: &'static str, check: Check) {
        if let Err(message) = check {
            diag::invalid(self.diags, attribute, format!("{}: {}", attribute, message));
        }
    }

    pub fn string(&mut self, attribute: &'static str, value: &Str, check: impl Fn(&str) -> Check) {
        if let Some(v) = str_opt(value) {
            self.record(attribute, check(v));
        }
    }

    pub fn number(
        &mut self,
        attribute: &'static str,
        value: &ValueNumber,
        check: impl Fn(i64) -> Check,
    ) {
        if let Some(v) = num_opt(value) {
            self.record(attribute, check(v));
        }
    }

    pub fn each(&mut self, attribute: &'static str, values: &StrSet, check: impl Fn(&str) -> Check) {
        if let tf_provider::Value::Value(items) = values {
            for v in items.iter().filter_map(str_opt) {
                self.record(attribute, check(v));
            }
        }
    }

    /// At most one of two attributes may be set
    pub fn conflicts(&mut self, a: &'static str, a_set: bool, b: &'static str, b_set: bool) {
        if a_set && b_set {
            self.record(a, Err(format!("conflicts with {}", b)));
        }
    }

    pub fn fail(&mut self, attribute: &'static str, message: impl Into<String>) {
        self.record(attribute, Err(message.into()));
    }

    pub fn ok(&self) -> bool {
        self.diags.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::to_str;

    #[test]
    fn test_id_with_prefix() {
        assert!(id_with_prefix("srv-ab12c", &["srv"]).is_ok());
        assert!(id_with_prefix("grp-ab12c", &["srv", "grp"]).is_ok());
        assert!(id_with_prefix("srv-AB12C", &["srv"]).is_err());
        assert!(id_with_prefix("srv-ab12", &["srv"]).is_err());
        assert!(id_with_prefix("vol-ab12c", &["srv"]).is_err());
        assert!(id_with_prefix("srvab12c", &["srv"]).is_err());
    }

    #[test]
    fn test_zone() {
        assert!(zone("gb1-a").is_ok());
        assert!(zone("gb1s-b").is_ok());
        assert!(zone("gb1-c").is_err());
        assert!(zone("zon-12345").is_err());
    }

    #[test]
    fn test_protocol() {
        assert!(protocol("tcp").is_ok());
        assert!(protocol("47").is_ok());
        assert!(protocol("256").is_err());
        assert!(protocol("sctp").is_err());
    }

    #[test]
    fn test_port_range() {
        assert!(port_range("80").is_ok());
        assert!(port_range("1000-2000").is_ok());
        assert!(port_range("0").is_err());
        assert!(port_range("80-70000").is_err());
        assert!(port_range("http").is_err());
    }

    #[test]
    fn test_metadata_key() {
        assert!(metadata_key("owner").is_ok());
        assert!(metadata_key("Owner").is_err());
    }

    #[test]
    fn test_checker_skips_unknown_and_records_errors() {
        let mut diags = Diagnostics::default();
        let mut checker = Checker::new(&mut diags);
        checker.string("zone", &tf_provider::Value::Unknown, zone);
        checker.string("zone", &tf_provider::Value::Null, zone);
        assert!(checker.ok());

        checker.string("zone", &to_str("gb1-z"), zone);
        assert!(!checker.ok());
        assert_eq!(diags.errors.len(), 1);
    }
}
