//! `brightbox_server_type`

use super::{LookupSpec, TieBreak, select_one};
use crate::client::CompositeClient;
use crate::error::{ProviderError, Result};
use crate::schema::{computed, optional_computed, resource_schema};
use crate::validate::Checker;
use crate::values::{Str, str_opt, to_str};
use async_trait::async_trait;
use brightbox_api::model::ServerType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tf_provider::{AttributeType, Schema, Value, ValueNumber, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerTypeState {
    pub id: Str,
    pub handle: Str,
    pub name: Str,
    pub status: Str,
    pub cores: ValueNumber,
    pub ram: ValueNumber,
    pub disk_size: ValueNumber,
    pub storage_type: Str,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerTypeLookup;

#[async_trait]
impl LookupSpec for ServerTypeLookup {
    type State = ServerTypeState;

    const TYPE_NAME: &'static str = "server type";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Server Type",
            map! {
                "id" => computed(AttributeType::String, "Identifier of the server type"),
                "handle" => optional_computed(AttributeType::String, "Handle such as 1gb.ssd"),
                "name" => optional_computed(AttributeType::String, "Display name of the server type"),
                "status" => computed(AttributeType::String, "Availability of the server type"),
                "cores" => computed(AttributeType::Number, "Number of CPU cores"),
                "ram" => computed(AttributeType::Number, "RAM in MiB"),
                "disk_size" => computed(AttributeType::Number, "Local disk size in MiB"),
                "storage_type" => computed(AttributeType::String, "local or network"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        if matches!(config.handle, Value::Null) && matches!(config.name, Value::Null) {
            checker.fail("handle", "one of handle or name must be set");
        }
    }

    async fn read(&self, clients: &CompositeClient, config: &Self::State) -> Result<ServerTypeState> {
        let handle = str_opt(&config.handle);
        let name = str_opt(&config.name);
        if handle.is_none() && name.is_none() {
            return Err(ProviderError::invalid_config(
                "handle",
                "one of handle or name must be set",
            ));
        }
        let candidates = clients
            .api
            .list::<ServerType>()
            .await?
            .into_iter()
            .filter(|t| handle.is_none_or(|h| h == t.handle))
            .filter(|t| name.is_none_or(|n| n == t.name))
            .collect();
        let found = select_one(candidates, TieBreak::Unsupported, |_: &ServerType| None)?;

        Ok(ServerTypeState {
            id: to_str(&found.id),
            handle: to_str(&found.handle),
            name: to_str(&found.name),
            status: to_str(&found.status),
            cores: Value::Value(found.cores),
            ram: Value::Value(found.ram),
            disk_size: Value::Value(found.disk_size),
            storage_type: to_str(&found.storage_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_lookup_by_handle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.0/server_types"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "typ-aaaaa", "handle": "1gb.ssd", "name": "1GB SSD", "cores": 1, "ram": 1024},
                {"id": "typ-bbbbb", "handle": "2gb.ssd", "name": "2GB SSD", "cores": 1, "ram": 2048}
            ])))
            .mount(&server)
            .await;
        let clients = test_slot(&server).await.get().unwrap();
        let config = ServerTypeState {
            handle: to_str("2gb.ssd"),
            ..Default::default()
        };
        let state = ServerTypeLookup.read(&clients, &config).await.unwrap();
        assert_eq!(state.id, to_str("typ-bbbbb"));
        assert_eq!(state.ram, Value::Value(2048));
    }
}
