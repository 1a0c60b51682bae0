//! Provider configuration
//!
//! Each setting comes from the provider block first, then from its
//! `BRIGHTBOX_*` environment variable, then from the built-in default.

use crate::error::{ProviderError, Result};
use crate::values::{Str, string};
use serde::{Deserialize, Serialize};
use url::Url;

/// Public client id of the Brightbox command line application
pub const DEFAULT_CLIENT_ID: &str = "app-dkmch";
pub const DEFAULT_CLIENT_SECRET: &str = "uogoelzgt0nwawb";
pub const DEFAULT_API_URL: &str = "https://api.gb1.brightbox.com";
pub const DEFAULT_ORBIT_URL: &str = "https://orbit.brightbox.com/v1/";

/// The `provider "brightbox" { ... }` block as Terraform sends it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderBlock {
    pub username: Str,
    pub password: Str,
    pub account: Str,
    pub apiclient: Str,
    pub apisecret: Str,
    pub apiurl: Str,
    pub orbit_url: Str,
}

#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    pub api_url: Url,
    pub orbit_url: Url,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("account", &self.account)
            .field("api_url", &self.api_url.as_str())
            .field("orbit_url", &self.orbit_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Resolve against the process environment
    pub fn resolve(block: &ProviderBlock) -> Result<Self> {
        Self::resolve_with(block, |name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        block: &ProviderBlock,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let pick = |value: &Str, var: &str| {
            string(value)
                .filter(|s| !s.is_empty())
                .or_else(|| env(var).filter(|s| !s.is_empty()))
        };

        let api_url = pick(&block.apiurl, "BRIGHTBOX_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let orbit_url = pick(&block.orbit_url, "BRIGHTBOX_ORBIT_URL")
            .unwrap_or_else(|| DEFAULT_ORBIT_URL.to_string());

        Ok(Self {
            client_id: pick(&block.apiclient, "BRIGHTBOX_CLIENT")
                .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            client_secret: pick(&block.apisecret, "BRIGHTBOX_CLIENT_SECRET")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRET.to_string()),
            username: pick(&block.username, "BRIGHTBOX_USER_NAME"),
            password: pick(&block.password, "BRIGHTBOX_PASSWORD"),
            account: pick(&block.account, "BRIGHTBOX_ACCOUNT"),
            api_url: parse_url("apiurl", &api_url)?,
            orbit_url: parse_url("orbit_url", &orbit_url)?,
        })
    }

    /// True when an API client (`cli-`) credential is configured
    pub fn is_api_client(&self) -> bool {
        self.client_id.starts_with("cli-")
    }

    /// True when an application (`app-`) credential is configured
    pub fn is_application(&self) -> bool {
        self.client_id.starts_with("app-")
    }

    /// Everything wrong with the combination of settings, without any network call
    pub fn problems(&self) -> Vec<ProviderError> {
        let mut problems = Vec::new();

        if !self.is_api_client() && !self.is_application() {
            problems.push(ProviderError::invalid_config(
                "apiclient",
                format!(
                    "'{}' is not an API client (cli-xxxxx) or application (app-xxxxx) identifier",
                    self.client_id
                ),
            ));
        }

        match (&self.username, &self.password) {
            (Some(_), _) if self.is_api_client() => {
                problems.push(ProviderError::invalid_config(
                    "username",
                    "username and password cannot be used with an API client (cli-) credential",
                ));
            }
            (Some(_), None) => problems.push(ProviderError::invalid_config(
                "password",
                "a password is required when a username is set",
            )),
            (None, Some(_)) => problems.push(ProviderError::invalid_config(
                "username",
                "a username is required when a password is set",
            )),
            (None, None) if self.is_application() => {
                problems.push(ProviderError::invalid_config(
                    "username",
                    "an application credential needs a username and password",
                ));
            }
            _ => {}
        }

        problems
    }
}

/// Parse a base URL, keeping a trailing slash so relative joins append
fn parse_url(attribute: &'static str, raw: &str) -> Result<Url> {
    let normalised = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    let url = Url::parse(&normalised)
        .map_err(|e| ProviderError::invalid_config(attribute, format!("'{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProviderError::invalid_config(
            attribute,
            format!("'{}' must be an http or https URL", raw),
        ));
    }
    Ok(url)
}
