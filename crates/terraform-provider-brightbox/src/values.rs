//! Conversions between Terraform values and plain Rust types
//!
//! Unknown values read as "not set" everywhere: they only appear during
//! validation and planning, where the real value is not available yet.

use std::borrow::Cow;
use std::collections::BTreeMap;
use tf_provider::{Value, ValueList, ValueMap, ValueNumber, ValueString};

pub type Str = ValueString<'static>;
pub type StrSet = ValueList<Str>;
pub type StrMap = ValueMap<'static, Str>;
pub type ValueBool = Value<bool>;

pub fn str_opt<'v>(value: &'v ValueString<'_>) -> Option<&'v str> {
    match value {
        Value::Value(s) => Some(s.as_ref()),
        _ => None,
    }
}

pub fn string(value: &ValueString<'_>) -> Option<String> {
    str_opt(value).map(String::from)
}

pub fn bool_opt(value: &ValueBool) -> Option<bool> {
    match value {
        Value::Value(b) => Some(*b),
        _ => None,
    }
}

pub fn num_opt(value: &ValueNumber) -> Option<i64> {
    match value {
        Value::Value(n) => Some(*n),
        _ => None,
    }
}

/// Known string members of a list or set, sorted and deduplicated
pub fn strings(value: &StrSet) -> Vec<String> {
    let mut out: Vec<String> = match value {
        Value::Value(items) => items.iter().filter_map(string).collect(),
        _ => Vec::new(),
    };
    out.sort();
    out.dedup();
    out
}

pub fn string_map(value: &StrMap) -> BTreeMap<String, String> {
    match value {
        Value::Value(map) => map
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), string(v)?)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

pub fn to_str(s: impl Into<String>) -> Str {
    Value::Value(Cow::Owned(s.into()))
}

/// `None` and the empty string both map to null
pub fn non_empty(s: Option<impl Into<String>>) -> Str {
    match s.map(Into::into) {
        Some(s) if !s.is_empty() => to_str(s),
        _ => Value::Null,
    }
}

pub fn to_set<I, S>(items: I) -> StrSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
    items.sort();
    Value::Value(items.into_iter().map(to_str).collect())
}

/// Like [`to_set`] but an empty collection becomes null
pub fn to_set_or_null<I, S>(items: I) -> StrSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match to_set(items) {
        Value::Value(v) if v.is_empty() => Value::Null,
        set => set,
    }
}

pub fn to_map(map: BTreeMap<String, String>) -> StrMap {
    Value::Value(
        map.into_iter()
            .map(|(k, v)| (Cow::Owned(k), to_str(v)))
            .collect(),
    )
}

pub fn to_rfc3339(time: Option<chrono::DateTime<chrono::Utc>>) -> Str {
    non_empty(time.map(|t| t.to_rfc3339()))
}

/// The known entries of a nested block list
pub fn blocks<T>(list: &ValueList<Value<T>>) -> impl Iterator<Item = &T> {
    let entries = match list {
        Value::Value(entries) => entries.as_slice(),
        _ => &[],
    };
    entries.iter().filter_map(|entry| match entry {
        Value::Value(block) => Some(block),
        _ => None,
    })
}

/// Mark a value as unknown until apply when nothing is known about it yet
pub fn unknown_if_null<T>(value: &mut Value<T>) {
    if matches!(value, Value::Null) {
        *value = Value::Unknown;
    }
}

/// True when a planned value differs from the prior state
pub fn changed<T: PartialEq>(prior: &Value<T>, planned: &Value<T>) -> bool {
    prior != planned
}

/// The new value for an update: `Some` only when the attribute changed.
/// A value removed from the configuration becomes the empty string, which
/// the API treats as "clear".
pub fn changed_str(prior: &Str, planned: &Str) -> Option<String> {
    changed(prior, planned).then(|| string(planned).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_sorted_unique() {
        let set: StrSet = Value::Value(vec![
            to_str("srv-bbbbb"),
            Value::Unknown,
            to_str("srv-aaaaa"),
            to_str("srv-bbbbb"),
        ]);
        assert_eq!(strings(&set), vec!["srv-aaaaa", "srv-bbbbb"]);
        assert!(strings(&Value::Null).is_empty());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("")), Value::Null);
        assert_eq!(non_empty(None::<String>), Value::Null);
        assert_eq!(non_empty(Some("web")), to_str("web"));
    }

    #[test]
    fn test_changed_str_clears() {
        assert_eq!(changed_str(&to_str("a"), &to_str("a")), None);
        assert_eq!(changed_str(&to_str("a"), &to_str("b")), Some("b".to_string()));
        assert_eq!(changed_str(&to_str("a"), &Value::Null), Some(String::new()));
    }

    #[test]
    fn test_unknown_if_null() {
        let mut v: Str = Value::Null;
        unknown_if_null(&mut v);
        assert!(matches!(v, Value::Unknown));

        let mut known = to_str("x");
        unknown_if_null(&mut known);
        assert_eq!(known, to_str("x"));
    }

    #[test]
    fn test_set_or_null() {
        assert_eq!(to_set_or_null(Vec::<String>::new()), Value::Null);
        assert_eq!(
            to_set_or_null(vec!["b", "a"]),
            Value::Value(vec![to_str("a"), to_str("b")])
        );
    }
}
