use super::Ref;
use crate::client::ApiResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloudIp {
    pub id: String,
    pub name: String,
    pub status: String,
    pub public_ip: String,
    pub public_ipv4: String,
    pub public_ipv6: String,
    pub fqdn: String,
    pub reverse_dns: String,
    pub port_translators: Vec<PortTranslator>,
    pub interface: Option<Ref>,
    pub server: Option<Ref>,
    pub server_group: Option<Ref>,
    pub load_balancer: Option<Ref>,
    pub database_server: Option<Ref>,
}

impl CloudIp {
    pub fn is_mapped(&self) -> bool {
        self.status == "mapped"
    }

    /// The object this cloud IP routes to, in the form accepted by `map`
    pub fn target(&self) -> Option<&str> {
        self.interface
            .as_ref()
            .or(self.server_group.as_ref())
            .or(self.load_balancer.as_ref())
            .or(self.database_server.as_ref())
            .map(|r| r.id.as_str())
    }
}

impl ApiResource for CloudIp {
    const PATH: &'static str = "cloud_ips";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTranslator {
    pub incoming: u16,
    pub outgoing: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudIpOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_translators: Option<Vec<PortTranslator>>,
}

impl CloudIpOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of `POST /cloud_ips/{id}/map`
#[derive(Debug, Clone, Serialize)]
pub struct CloudIpMap {
    pub destination: String,
}
