use super::{Ref, ZoneRef};
use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseServer {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub database_engine: String,
    pub database_version: String,
    pub admin_username: String,
    /// Only present in the create response
    pub admin_password: Option<String>,
    pub maintenance_weekday: i64,
    pub maintenance_hour: i64,
    pub snapshots_schedule: Option<String>,
    pub snapshots_schedule_next_at: Option<DateTime<Utc>>,
    pub snapshots_retention: Option<String>,
    pub allow_access: Vec<String>,
    pub locked: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub database_server_type: Option<Ref>,
    pub zone: Option<ZoneRef>,
    pub cloud_ips: Vec<Ref>,
}

impl ApiResource for DatabaseServer {
    const PATH: &'static str = "database_servers";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseServerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_access: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_weekday: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_hour: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_retention: Option<String>,
}

impl DatabaseServerOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub database_engine: String,
    pub database_version: String,
    /// MiB
    pub size: i64,
    pub locked: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiResource for DatabaseSnapshot {
    const PATH: &'static str = "database_snapshots";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub disk_size: i64,
    pub ram: i64,
}

impl ApiResource for DatabaseType {
    const PATH: &'static str = "database_types";
}
