//! API object representations and option payloads
//!
//! Response types are lenient (`#[serde(default)]`) since the API embeds
//! abbreviated copies of related objects. Option types skip unset fields so an
//! update only sends what changed.

mod account;
mod api_client;
mod catalog;
mod cloud_ip;
mod config_map;
mod database;
mod firewall;
mod load_balancer;
mod server;
mod server_group;
mod volume;

pub use account::Account;
pub use api_client::{ApiClient, ApiClientOptions};
pub use catalog::{Image, Interface, ServerType, Zone};
pub use cloud_ip::{CloudIp, CloudIpMap, CloudIpOptions, PortTranslator};
pub use config_map::{ConfigMap, ConfigMapOptions};
pub use database::{DatabaseServer, DatabaseServerOptions, DatabaseSnapshot, DatabaseType};
pub use firewall::{FirewallPolicy, FirewallPolicyOptions, FirewallRule, FirewallRuleOptions, PolicyTarget};
pub use load_balancer::{
    Acme, AcmeDomain, LoadBalancer, LoadBalancerNode, LoadBalancerNodes, LoadBalancerOptions,
    LbHealthcheck, LbListener,
};
pub use server::{Server, ServerOptions, ServerResize, ServerVolume};
pub use server_group::{ServerEntry, ServerGroup, ServerGroupMembers, ServerGroupOptions};
pub use volume::{Volume, VolumeAttachment, VolumeOptions, VolumeResize};

use serde::{Deserialize, Serialize};

/// Abbreviated reference to another object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub id: String,
}

/// Zone reference embedded in servers, volumes and database servers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRef {
    pub id: String,
    #[serde(default)]
    pub handle: String,
}

/// Returns the ids of a list of references in API order
pub fn ids(refs: &[Ref]) -> Vec<String> {
    refs.iter().map(|r| r.id.clone()).collect()
}
