use super::Ref;
use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerGroup {
    pub id: String,
    pub name: String,
    pub description: String,
    pub default: bool,
    pub fqdn: String,
    pub created_at: Option<DateTime<Utc>>,
    pub firewall_policy: Option<Ref>,
    pub servers: Vec<Ref>,
}

impl ServerGroup {
    pub fn contains(&self, server_id: &str) -> bool {
        self.servers.iter().any(|s| s.id == server_id)
    }
}

impl ApiResource for ServerGroup {
    const PATH: &'static str = "server_groups";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerGroupOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ServerGroupOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEntry {
    pub server: String,
}

/// Body of `add_servers` / `remove_servers`
#[derive(Debug, Clone, Serialize)]
pub struct ServerGroupMembers {
    pub servers: Vec<ServerEntry>,
}

impl ServerGroupMembers {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: ids
                .into_iter()
                .map(|id| ServerEntry { server: id.into() })
                .collect(),
        }
    }
}
