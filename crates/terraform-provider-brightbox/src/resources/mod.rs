//! Managed resources
//!
//! Each module holds the typed state, schema and API mapping of one
//! `brightbox_*` resource type. [`crate::crud::Crud`] turns them into
//! Terraform resources.

mod api_client;
mod cloud_ip;
mod config_map;
mod database_server;
mod firewall_policy;
mod firewall_rule;
mod load_balancer;
mod orbit_container;
mod server;
mod server_group;
mod server_group_membership;
mod volume;

pub use api_client::*;
pub use cloud_ip::*;
pub use config_map::*;
pub use database_server::*;
pub use firewall_policy::*;
pub use firewall_rule::*;
pub use load_balancer::*;
pub use orbit_container::*;
pub use server::*;
pub use server_group::*;
pub use server_group_membership::*;
pub use volume::*;
