//! `brightbox_server_group`

use super::{LookupSpec, TieBreak, matches, pattern, select_one};
use crate::client::CompositeClient;
use crate::error::Result;
use crate::schema::{computed, optional_computed, resource_schema, string_set};
use crate::validate::{Checker, regex};
use crate::values::{Str, StrSet, ValueBool, non_empty, to_set, to_str};
use async_trait::async_trait;
use brightbox_api::model::{ServerGroup, ids};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tf_provider::{AttributeType, Schema, Value, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerGroupLookupState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub default: ValueBool,
    pub fqdn: Str,
    pub firewall_policy: Str,
    pub servers: StrSet,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerGroupLookup;

#[async_trait]
impl LookupSpec for ServerGroupLookup {
    type State = ServerGroupLookupState;

    const TYPE_NAME: &'static str = "server group";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Server Group",
            map! {
                "id" => computed(AttributeType::String, "Identifier of the server group"),
                "name" => optional_computed(AttributeType::String, "Regular expression matched against group names"),
                "description" => optional_computed(AttributeType::String, "Regular expression matched against descriptions"),
                "default" => computed(AttributeType::Bool, "True for the account's default group"),
                "fqdn" => computed(AttributeType::String, "DNS name resolving to the group's servers"),
                "firewall_policy" => computed(AttributeType::String, "Firewall policy applied to the group"),
                "servers" => computed(string_set(), "Servers in the group"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("name", &config.name, regex);
        checker.string("description", &config.description, regex);
    }

    async fn read(
        &self,
        clients: &CompositeClient,
        config: &Self::State,
    ) -> Result<ServerGroupLookupState> {
        let name = pattern("name", &config.name)?;
        let description = pattern("description", &config.description)?;
        let candidates = clients
            .api
            .list::<ServerGroup>()
            .await?
            .into_iter()
            .filter(|g| matches(&name, &g.name) && matches(&description, &g.description))
            .collect();
        let group = select_one(candidates, TieBreak::Unsupported, |g: &ServerGroup| {
            g.created_at
        })?;

        Ok(ServerGroupLookupState {
            id: to_str(&group.id),
            name: to_str(&group.name),
            description: non_empty(Some(group.description.as_str())),
            default: Value::Value(group.default),
            fqdn: to_str(&group.fqdn),
            firewall_policy: non_empty(group.firewall_policy.as_ref().map(|p| p.id.as_str())),
            servers: to_set(ids(&group.servers)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use crate::error::ProviderError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_matches_name_and_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.0/server_groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "grp-aaaaa", "name": "web", "description": "production", "servers": [{"id": "srv-aaaaa"}]},
                {"id": "grp-bbbbb", "name": "web", "description": "staging"},
                {"id": "grp-ccccc", "name": "default", "default": true}
            ])))
            .mount(&server)
            .await;
        let clients = test_slot(&server).await.get().unwrap();

        let config = ServerGroupLookupState {
            name: to_str("^web$"),
            description: to_str("prod"),
            ..Default::default()
        };
        let state = ServerGroupLookup.read(&clients, &config).await.unwrap();
        assert_eq!(state.id, to_str("grp-aaaaa"));
        assert_eq!(state.servers, to_set(["srv-aaaaa"]));

        let config = ServerGroupLookupState {
            name: to_str("^web$"),
            ..Default::default()
        };
        assert!(matches!(
            ServerGroupLookup.read(&clients, &config).await,
            Err(ProviderError::AmbiguousMatch(2, _))
        ));

        let config = ServerGroupLookupState {
            name: to_str("^db"),
            ..Default::default()
        };
        assert!(matches!(
            ServerGroupLookup.read(&clients, &config).await,
            Err(ProviderError::NoMatch)
        ));
    }
}
