use super::{Ref, ZoneRef};
use crate::client::ApiResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    /// MiB
    pub size: i64,
    pub storage_type: String,
    pub encrypted: bool,
    pub boot: bool,
    pub locked: bool,
    pub delete_with_server: bool,
    pub filesystem_label: Option<String>,
    pub filesystem_type: Option<String>,
    pub serial: Option<String>,
    pub source: Option<String>,
    pub source_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub image: Option<Ref>,
    pub server: Option<Ref>,
    pub zone: Option<ZoneRef>,
}

impl Volume {
    pub fn is_attached(&self) -> bool {
        self.server.is_some()
    }
}

impl ApiResource for Volume {
    const PATH: &'static str = "volumes";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_with_server: Option<bool>,
}

impl VolumeOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of `POST /volumes/{id}/attach`
#[derive(Debug, Clone, Serialize)]
pub struct VolumeAttachment {
    pub server: String,
    pub boot: bool,
}

/// Body of `POST /volumes/{id}/resize`
#[derive(Debug, Clone, Serialize)]
pub struct VolumeResize {
    pub from: i64,
    pub to: i64,
}
