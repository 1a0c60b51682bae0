//! `brightbox_config_map`

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{id_attribute, optional, required, resource_schema, string_map};
use crate::validate::{Checker, not_empty};
use crate::values::{
    Str, StrMap, changed, changed_str, non_empty, string, string_map as map_value, to_map,
};
use async_trait::async_trait;
use brightbox_api::model::{ConfigMap, ConfigMapOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tf_provider::{AttributeType, Schema, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigMapState {
    pub id: Str,
    pub name: Str,
    pub data: StrMap,
}

impl ResourceState for ConfigMapState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigMapResource;

#[async_trait]
impl ManagedResource for ConfigMapResource {
    type State = ConfigMapState;
    type Object = ConfigMap;

    const TYPE_NAME: &'static str = "config map";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Config Map",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the config map"),
                "data" => required(string_map(), "Key/value data held by the config map"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("name", &config.name, not_empty);
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<ConfigMap> {
        let options = ConfigMapOptions {
            name: string(&planned.name),
            data: Some(map_value(&planned.data)),
        };
        Ok(clients.api.create::<ConfigMap, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<ConfigMap> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let options = ConfigMapOptions {
            name: changed_str(&prior.name, &planned.name),
            data: changed(&prior.data, &planned.data).then(|| map_value(&planned.data)),
        };
        if options.is_empty() {
            return Ok(());
        }
        clients
            .api
            .update::<ConfigMap, _>(state_id(prior)?, &options)
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<ConfigMap>(state_id(state)?).await?)
    }

    fn object_id(object: &ConfigMap) -> String {
        object.id.clone()
    }

    fn set_attributes(&self, config_map: &ConfigMap, state: &mut Self::State) {
        state.name = non_empty(Some(config_map.name.as_str()));
        state.data = to_map(config_map.string_data());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use crate::crud::Crud;
    use crate::values::to_str;
    use std::collections::BTreeMap;
    use tf_provider::{Diagnostics, Resource, Value, ValueEmpty};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_sends_data() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "cfg-tests",
            "name": "app",
            "data": {"port": "5432", "host": "db.local"}
        });
        Mock::given(method("POST"))
            .and(path("/1.0/config_maps"))
            .and(body_json(serde_json::json!({
                "name": "app",
                "data": {"host": "db.local", "port": "5432"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/config_maps/cfg-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let data: BTreeMap<String, String> = [("host", "db.local"), ("port", "5432")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let planned = ConfigMapState {
            id: Value::Unknown,
            name: to_str("app"),
            data: to_map(data.clone()),
        };

        let crud = Crud::new(ConfigMapResource, test_slot(&server).await);
        let mut diags = Diagnostics::default();
        let (state, _) = crud
            .create(
                &mut diags,
                Value::Value(planned.clone()),
                Value::Value(planned),
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        let Value::Value(state) = state else {
            panic!("expected state");
        };
        assert_eq!(state.id, to_str("cfg-tests"));
        assert_eq!(map_value(&state.data), data);
    }
}
