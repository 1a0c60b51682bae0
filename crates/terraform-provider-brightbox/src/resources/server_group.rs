//! `brightbox_server_group`

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{computed, id_attribute, optional, resource_schema};
use crate::validate::{Checker, not_empty};
use crate::values::{Str, ValueBool, changed_str, non_empty, string, unknown_if_null};
use async_trait::async_trait;
use brightbox_api::model::{ServerGroup, ServerGroupOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tf_provider::{AttributeType, Schema, Value, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerGroupState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub default: ValueBool,
    pub fqdn: Str,
    pub firewall_policy: Str,
}

impl ResourceState for ServerGroupState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerGroupResource;

#[async_trait]
impl ManagedResource for ServerGroupResource {
    type State = ServerGroupState;
    type Object = ServerGroup;

    const TYPE_NAME: &'static str = "server group";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Server Group",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the server group"),
                "description" => optional(AttributeType::String, "Longer description of the group"),
                "default" => computed(AttributeType::Bool, "True if this is the account's default group"),
                "fqdn" => computed(AttributeType::String, "Fully qualified domain name of the group"),
                "firewall_policy" => computed(AttributeType::String, "Firewall policy applied to the group"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("name", &config.name, not_empty);
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        if prior.is_none() {
            unknown_if_null(&mut planned.default);
            unknown_if_null(&mut planned.fqdn);
            unknown_if_null(&mut planned.firewall_policy);
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<ServerGroup> {
        let options = ServerGroupOptions {
            name: string(&planned.name),
            description: string(&planned.description),
        };
        Ok(clients.api.create::<ServerGroup, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<ServerGroup> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let options = ServerGroupOptions {
            name: changed_str(&prior.name, &planned.name),
            description: changed_str(&prior.description, &planned.description),
        };
        if options.is_empty() {
            return Ok(());
        }
        clients
            .api
            .update::<ServerGroup, _>(state_id(prior)?, &options)
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<ServerGroup>(state_id(state)?).await?)
    }

    fn object_id(object: &ServerGroup) -> String {
        object.id.clone()
    }

    fn set_attributes(&self, group: &ServerGroup, state: &mut Self::State) {
        state.name = non_empty(Some(group.name.as_str()));
        state.description = non_empty(Some(group.description.as_str()));
        state.default = Value::Value(group.default);
        state.fqdn = non_empty(Some(group.fqdn.as_str()));
        state.firewall_policy = non_empty(group.firewall_policy.as_ref().map(|p| p.id.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::to_str;

    #[test]
    fn test_set_attributes_maps_empty_to_null() {
        let group = ServerGroup {
            id: "grp-abcde".to_string(),
            name: "web".to_string(),
            fqdn: "grp-abcde.gb1.brightbox.com".to_string(),
            ..Default::default()
        };
        let mut state = ServerGroupState::default();
        ServerGroupResource.set_attributes(&group, &mut state);
        assert_eq!(state.name, to_str("web"));
        assert_eq!(state.description, Value::Null);
        assert_eq!(state.firewall_policy, Value::Null);
        assert_eq!(state.default, Value::Value(false));
    }
}
