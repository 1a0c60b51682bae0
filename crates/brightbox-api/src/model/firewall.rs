use super::Ref;
use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FirewallPolicy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub default: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub server_group: Option<Ref>,
    pub rules: Vec<Ref>,
}

impl ApiResource for FirewallPolicy {
    const PATH: &'static str = "firewall_policies";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FirewallPolicyOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only honoured on create; later changes go through `apply_to`/`remove`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_group: Option<String>,
}

impl FirewallPolicyOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of `POST /firewall_policies/{id}/apply_to` and `/remove`
#[derive(Debug, Clone, Serialize)]
pub struct PolicyTarget {
    pub server_group: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FirewallRule {
    pub id: String,
    pub description: Option<String>,
    pub protocol: Option<String>,
    pub source: Option<String>,
    pub source_port: Option<String>,
    pub destination: Option<String>,
    pub destination_port: Option<String>,
    pub icmp_type_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub firewall_policy: Option<Ref>,
}

impl ApiResource for FirewallRule {
    const PATH: &'static str = "firewall_rules";
}

/// Rule fields; an empty string clears a field on update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FirewallRuleOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FirewallRuleOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
