use super::Ref;
use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    pub status: String,
    pub policy: String,
    pub buffer_size: i64,
    pub https_redirect: bool,
    pub locked: bool,
    pub certificate_pem: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub listeners: Vec<LbListener>,
    pub healthcheck: Option<LbHealthcheck>,
    pub nodes: Vec<Ref>,
    pub cloud_ips: Vec<Ref>,
    pub acme: Option<Acme>,
}

impl ApiResource for LoadBalancer {
    const PATH: &'static str = "load_balancers";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbListener {
    #[serde(rename = "in")]
    pub incoming: i64,
    #[serde(rename = "out")]
    pub outgoing: i64,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub proxy_protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbHealthcheck {
    #[serde(rename = "type")]
    pub kind: String,
    pub port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_up: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_down: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Acme {
    pub domains: Vec<AcmeDomain>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AcmeDomain {
    pub identifier: String,
    pub status: String,
    pub last_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadBalancerNode {
    pub node: String,
}

/// Body of `add_nodes` / `remove_nodes`
#[derive(Debug, Clone, Serialize)]
pub struct LoadBalancerNodes {
    pub nodes: Vec<LoadBalancerNode>,
}

impl LoadBalancerNodes {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: ids
                .into_iter()
                .map(|id| LoadBalancerNode { node: id.into() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadBalancerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listeners: Option<Vec<LbListener>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<LbHealthcheck>,
    /// Only sent on create; membership changes use `add_nodes`/`remove_nodes`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<LoadBalancerNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_pem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
}

impl LoadBalancerOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
