//! `brightbox_api_client`
//!
//! The secret is only returned when the client is created, so it is kept
//! from state afterwards. Deleting an API client revokes it.

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{computed, id_attribute, optional, optional_computed, resource_schema, sensitive};
use crate::validate::{Checker, one_of};
use crate::values::{Str, changed_str, non_empty, string, to_str, unknown_if_null};
use async_trait::async_trait;
use brightbox_api::model::{ApiClient, ApiClientOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tf_provider::{AttributeType, Schema, map};

const PERMISSIONS_GROUPS: &[&str] = &["full", "storage"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiClientState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub permissions_group: Str,
    pub secret: Str,
    pub account: Str,
}

impl ResourceState for ApiClientState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ApiClientResource;

#[async_trait]
impl ManagedResource for ApiClientResource {
    type State = ApiClientState;
    type Object = ApiClient;

    const TYPE_NAME: &'static str = "API client";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox API Client",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the API client"),
                "description" => optional(AttributeType::String, "Verbose description of the API client"),
                "permissions_group" => optional_computed(AttributeType::String, "Permissions group: full or storage"),
                "secret" => sensitive(computed(AttributeType::String, "Generated secret, only available after create")),
                "account" => computed(AttributeType::String, "Account the API client belongs to"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("permissions_group", &config.permissions_group, |v| {
            one_of(v, PERMISSIONS_GROUPS)
        });
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        if prior.is_none() {
            unknown_if_null(&mut planned.permissions_group);
            unknown_if_null(&mut planned.secret);
            unknown_if_null(&mut planned.account);
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<ApiClient> {
        let options = ApiClientOptions {
            name: string(&planned.name),
            description: string(&planned.description),
            permissions_group: string(&planned.permissions_group),
        };
        Ok(clients.api.create::<ApiClient, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<ApiClient> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let options = ApiClientOptions {
            name: changed_str(&prior.name, &planned.name),
            description: changed_str(&prior.description, &planned.description),
            permissions_group: changed_str(&prior.permissions_group, &planned.permissions_group)
                .filter(|g| !g.is_empty()),
        };
        if options.is_empty() {
            return Ok(());
        }
        clients
            .api
            .update::<ApiClient, _>(state_id(prior)?, &options)
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<ApiClient>(state_id(state)?).await?)
    }

    fn object_id(object: &ApiClient) -> String {
        object.id.clone()
    }

    fn is_gone(object: &ApiClient) -> bool {
        object.is_revoked()
    }

    fn set_attributes(&self, client: &ApiClient, state: &mut Self::State) {
        state.name = non_empty(Some(client.name.as_str()));
        state.description = non_empty(Some(client.description.as_str()));
        state.permissions_group = to_str(&client.permissions_group);
        state.account = non_empty(client.account.as_ref().map(|a| a.id.as_str()));
        match &client.secret {
            Some(secret) => state.secret = to_str(secret),
            None if !matches!(state.secret, tf_provider::Value::Value(_)) => {
                state.secret = tf_provider::Value::Null
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tf_provider::Value;

    #[test]
    fn test_secret_survives_refresh() {
        let mut state = ApiClientState {
            secret: to_str("s3cr3t"),
            ..Default::default()
        };
        let refreshed = ApiClient {
            id: "cli-abcde".to_string(),
            permissions_group: "full".to_string(),
            ..Default::default()
        };
        ApiClientResource.set_attributes(&refreshed, &mut state);
        assert_eq!(state.secret, to_str("s3cr3t"));
        assert_eq!(state.permissions_group, to_str("full"));
    }

    #[test]
    fn test_unknown_secret_resolves_to_null() {
        let mut state = ApiClientState {
            secret: Value::Unknown,
            ..Default::default()
        };
        ApiClientResource.set_attributes(&ApiClient::default(), &mut state);
        assert_eq!(state.secret, Value::Null);
    }

    #[test]
    fn test_revoked_client_is_gone() {
        let revoked: ApiClient = serde_json::from_value(serde_json::json!({
            "id": "cli-abcde",
            "revoked_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(ApiClientResource::is_gone(&revoked));
    }
}
