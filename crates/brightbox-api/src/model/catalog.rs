//! Read-only catalogue objects: images, server types, zones, interfaces

use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub status: String,
    pub arch: String,
    pub description: Option<String>,
    pub source: String,
    pub source_type: String,
    pub public: bool,
    pub official: bool,
    pub compatibility_mode: bool,
    pub virtual_size: i64,
    pub disk_size: i64,
    pub min_ram: Option<i64>,
    pub owner: String,
    pub licence_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiResource for Image {
    const PATH: &'static str = "images";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerType {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub status: String,
    pub cores: i64,
    pub ram: i64,
    pub disk_size: i64,
    pub storage_type: String,
}

impl ApiResource for ServerType {
    const PATH: &'static str = "server_types";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Zone {
    pub id: String,
    pub handle: String,
}

impl ApiResource for Zone {
    const PATH: &'static str = "zones";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Interface {
    pub id: String,
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
    pub mac_address: Option<String>,
}

impl ApiResource for Interface {
    const PATH: &'static str = "interfaces";
}
