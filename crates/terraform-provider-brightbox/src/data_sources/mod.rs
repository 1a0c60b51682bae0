//! Data sources: read-only lookups over API collections
//!
//! A lookup lists a collection, filters it by the configured criteria and
//! requires exactly one match, unless `most_recent` picks the newest.

mod database_snapshot;
mod database_type;
mod image;
mod server_group;
mod server_type;
mod zone;

pub use database_snapshot::*;
pub use database_type::*;
pub use image::*;
pub use server_group::*;
pub use server_type::*;
pub use zone::*;

use crate::client::{ClientSlot, CompositeClient};
use crate::diag;
use crate::error::{ProviderError, Result};
use crate::validate::Checker;
use crate::values::{Str, ValueBool, bool_opt, str_opt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tf_provider::{DataSource, Diagnostics, Schema, Value, ValueEmpty};

/// One `brightbox_*` data source
#[async_trait]
pub trait LookupSpec: Send + Sync + 'static {
    type State: Serialize + DeserializeOwned + Clone + Default + Debug + Send + Sync + 'static;

    /// Used in diagnostics and logs
    const TYPE_NAME: &'static str;

    fn schema(&self) -> Schema;

    fn validate(&self, _checker: &mut Checker<'_>, _config: &Self::State) {}

    /// Resolve the configuration into the full state
    async fn read(&self, clients: &CompositeClient, config: &Self::State) -> Result<Self::State>;
}

/// Adapter from a [`LookupSpec`] to a Terraform data source
pub struct Lookup<D> {
    spec: D,
    clients: ClientSlot,
}

impl<D: LookupSpec> Lookup<D> {
    pub fn new(spec: D, clients: ClientSlot) -> Self {
        Self { spec, clients }
    }
}

#[async_trait]
impl<D: LookupSpec> DataSource for Lookup<D> {
    type State<'a> = Value<D::State>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(self.spec.schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(config) = &config {
            let mut checker = Checker::new(diags);
            self.spec.validate(&mut checker, config);
        }
        diags.errors.is_empty().then_some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let Value::Value(config) = config else {
            diags.root_error(
                format!("Reading {}", D::TYPE_NAME),
                "configuration is missing".to_string(),
            );
            return None;
        };
        let clients = match self.clients.get() {
            Ok(clients) => clients,
            Err(e) => {
                diag::report(diags, format!("Reading {}", D::TYPE_NAME), &e);
                return None;
            }
        };

        match self.spec.read(&clients, &config).await {
            Ok(state) => Some(Value::Value(state)),
            Err(e) => {
                diag::report(diags, format!("Looking up {}", D::TYPE_NAME), &e);
                None
            }
        }
    }
}

/// Compile an optional regular expression filter
pub(crate) fn pattern(attribute: &'static str, value: &Str) -> Result<Option<Regex>> {
    str_opt(value)
        .map(|p| Regex::new(p).map_err(|e| ProviderError::invalid_config(attribute, e.to_string())))
        .transpose()
}

/// True when `filter` is unset or matches `value`
pub(crate) fn matches(filter: &Option<Regex>, value: &str) -> bool {
    filter.as_ref().is_none_or(|re| re.is_match(value))
}

/// Whether a data source lets the user settle several matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TieBreak {
    /// No `most_recent` attribute
    Unsupported,
    /// The `most_recent` setting, unset reading as false
    MostRecent(bool),
}

impl TieBreak {
    pub(crate) fn most_recent(value: &ValueBool) -> Self {
        Self::MostRecent(bool_opt(value).unwrap_or(false))
    }
}

/// Pick the single candidate left after filtering.
///
/// With `most_recent` several candidates are allowed and the newest by
/// `created_at` wins.
pub(crate) fn select_one<T>(
    mut candidates: Vec<T>,
    tie_break: TieBreak,
    created_at: impl Fn(&T) -> Option<DateTime<Utc>>,
) -> Result<T> {
    match candidates.len() {
        0 => Err(ProviderError::NoMatch),
        1 => Ok(candidates.remove(0)),
        n if tie_break == TieBreak::MostRecent(true) => {
            tracing::debug!("{} candidates, picking the most recent", n);
            candidates.sort_by_key(|c| created_at(c));
            candidates.pop().ok_or(ProviderError::NoMatch)
        }
        n => {
            let hint = match tie_break {
                TieBreak::Unsupported => "",
                TieBreak::MostRecent(_) => " or set most_recent to true",
            };
            Err(ProviderError::AmbiguousMatch(n, hint))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::to_str;
    use chrono::TimeZone;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    #[test]
    fn test_select_one() {
        let none: Vec<(&str, Option<DateTime<Utc>>)> = Vec::new();
        assert!(matches!(
            select_one(none, TieBreak::Unsupported, |c| c.1),
            Err(ProviderError::NoMatch)
        ));

        let many = vec![("old", at(100)), ("new", at(200)), ("mid", at(150))];
        assert!(matches!(
            select_one(many.clone(), TieBreak::MostRecent(false), |c| c.1),
            Err(ProviderError::AmbiguousMatch(3, _))
        ));
        assert_eq!(
            select_one(many, TieBreak::MostRecent(true), |c| c.1).unwrap().0,
            "new"
        );
    }

    #[test]
    fn test_ambiguous_match_hint() {
        let many = vec![("a", at(100)), ("b", at(200))];
        let unset = select_one(many.clone(), TieBreak::most_recent(&Value::Null), |c| c.1);
        let Err(e) = unset else {
            panic!("expected an ambiguous match");
        };
        assert!(e.to_string().contains("most_recent"), "{e}");

        let Err(e) = select_one(many, TieBreak::Unsupported, |c| c.1) else {
            panic!("expected an ambiguous match");
        };
        assert!(!e.to_string().contains("most_recent"), "{e}");
    }

    #[test]
    fn test_pattern_filter() {
        let filter = pattern("name", &to_str("^ubuntu-2[24]")).unwrap();
        assert!(matches(&filter, "ubuntu-24.04-server"));
        assert!(!matches(&filter, "debian-12"));
        assert!(matches(&None, "anything"));
        assert!(pattern("name", &to_str("(")).is_err());
    }
}
