use super::{Ref, ZoneRef};
use crate::client::ApiResource;
use crate::model::catalog::Interface;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: String,
    pub hostname: String,
    pub fqdn: String,
    pub locked: bool,
    pub disk_encrypted: bool,
    pub user_data: Option<String>,
    pub snapshots_schedule: Option<String>,
    pub snapshots_retention: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub image: Option<ServerImage>,
    pub server_type: Option<ServerTypeRef>,
    pub zone: Option<ZoneRef>,
    pub interfaces: Vec<Interface>,
    pub server_groups: Vec<Ref>,
    pub cloud_ips: Vec<ServerCloudIp>,
    pub volumes: Vec<ServerVolumeRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerImage {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerTypeRef {
    pub id: String,
    pub handle: String,
    pub disk_size: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerCloudIp {
    pub id: String,
    pub public_ipv4: Option<String>,
    pub public_ipv6: Option<String>,
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerVolumeRef {
    pub id: String,
    pub size: i64,
    pub boot: bool,
}

impl Server {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn primary_interface(&self) -> Option<&Interface> {
        self.interfaces.first()
    }

    pub fn boot_volume(&self) -> Option<&ServerVolumeRef> {
        self.volumes.iter().find(|v| v.boot)
    }

    /// Public hostname of the first mapped cloud IP
    pub fn public_hostname(&self) -> Option<String> {
        self.cloud_ips.first().and_then(|c| c.fqdn.clone())
    }
}

impl ApiResource for Server {
    const PATH: &'static str = "servers";
}

/// Network volume requested at server creation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_retention: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<ServerVolume>>,
}

impl ServerOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of `POST /servers/{id}/resize`
#[derive(Debug, Clone, Serialize)]
pub struct ServerResize {
    pub new_type: String,
}
