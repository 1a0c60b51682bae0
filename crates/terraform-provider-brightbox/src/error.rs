//! Provider error types

use brightbox_api::ApiError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The provider has not been configured")]
    NotConfigured,

    #[error("{message}")]
    InvalidConfig {
        attribute: &'static str,
        message: String,
    },

    #[error("Timeout after {timeout:?} waiting for state to become '{target}' (last state: '{last}')")]
    Timeout {
        target: String,
        last: String,
        timeout: Duration,
    },

    #[error("Unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState { state: String, target: String },

    #[error("Couldn't find resource {0} (checked repeatedly while waiting)")]
    NotFound(String),

    #[error("Invalid duration '{0}': expected a value such as \"30s\", \"10m\" or \"1h30m\"")]
    InvalidDuration(String),

    #[error("Cannot import: {0}")]
    Import(String),

    #[error("Your query returned no results. Please change your search criteria and try again.")]
    NoMatch,

    #[error("Your query returned {0} results. Please use more specific search criteria{1}.")]
    AmbiguousMatch(usize, &'static str),
}

impl ProviderError {
    pub fn invalid_config(attribute: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidConfig {
            attribute,
            message: message.into(),
        }
    }

    /// True when the error is an API 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Api(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
