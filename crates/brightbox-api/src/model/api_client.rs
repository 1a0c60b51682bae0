use super::Ref;
use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiClient {
    pub id: String,
    pub name: String,
    pub description: String,
    pub permissions_group: String,
    /// Only returned on create and `reset_secret`
    pub secret: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub account: Option<Ref>,
}

impl ApiClient {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

impl ApiResource for ApiClient {
    const PATH: &'static str = "api_clients";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiClientOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_group: Option<String>,
}

impl ApiClientOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
