use crate::client::ApiResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigMap {
    pub id: String,
    pub name: String,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl ConfigMap {
    /// Data values rendered as strings; JSON strings are unquoted
    pub fn string_data(&self) -> BTreeMap<String, String> {
        self.data
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

impl ApiResource for ConfigMap {
    const PATH: &'static str = "config_maps";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigMapOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

impl ConfigMapOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_data() {
        let map: ConfigMap = serde_json::from_value(serde_json::json!({
            "id": "cfg-12345",
            "name": "app",
            "data": {"host": "db.local", "port": 5432, "debug": true}
        }))
        .unwrap();

        let data = map.string_data();
        assert_eq!(data["host"], "db.local");
        assert_eq!(data["port"], "5432");
        assert_eq!(data["debug"], "true");
    }
}
