//! `brightbox_server_group_membership`
//!
//! Manages a set of servers inside a group without owning the group itself.
//! The id is generated locally since the API has no membership object.

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState};
use crate::error::{ProviderError, Result};
use crate::schema::{id_attribute, required, resource_schema, string_set};
use crate::validate::{Checker, id_with_prefix};
use crate::values::{Str, StrSet, string, strings, to_set, to_str};
use async_trait::async_trait;
use brightbox_api::model::{ServerGroup, ServerGroupMembers};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tf_provider::{AttributePath, AttributeType, Schema, Value, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipState {
    pub id: Str,
    pub group: Str,
    pub servers: StrSet,
}

impl ResourceState for MembershipState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

/// The group as seen by this membership
#[derive(Debug, Clone)]
pub struct Membership {
    pub id: String,
    pub group: ServerGroup,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MembershipResource;

fn group_id(state: &MembershipState) -> Result<String> {
    string(&state.group).ok_or_else(|| ProviderError::invalid_config("group", "group is required"))
}

#[async_trait]
impl ManagedResource for MembershipResource {
    type State = MembershipState;
    type Object = Membership;

    const TYPE_NAME: &'static str = "server group membership";

    fn schema(&self) -> Schema {
        resource_schema(
            "Membership of servers in a Brightbox Server Group",
            map! {
                "id" => id_attribute(),
                "group" => required(AttributeType::String, "The server group to add the servers to"),
                "servers" => required(string_set(), "Servers that belong to the group"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("group", &config.group, |v| id_with_prefix(v, &["grp"]));
        checker.each("servers", &config.servers, |v| id_with_prefix(v, &["srv"]));
    }

    fn requires_replace(&self, prior: &Self::State, planned: &Self::State) -> Vec<AttributePath> {
        if prior.group != planned.group {
            vec![AttributePath::new("group")]
        } else {
            Vec::new()
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<Membership> {
        let group_id = group_id(planned)?;
        let servers = strings(&planned.servers);
        let group = clients
            .api
            .action::<ServerGroup, _>(&group_id, "add_servers", &ServerGroupMembers::new(servers))
            .await?;
        Ok(Membership {
            id: uuid::Uuid::new_v4().to_string(),
            group,
        })
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<Membership> {
        let group = clients.api.get::<ServerGroup>(&group_id(state)?).await?;
        Ok(Membership {
            id: string(&state.id).unwrap_or_default(),
            group,
        })
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let group_id = group_id(planned)?;
        let before: BTreeSet<String> = strings(&prior.servers).into_iter().collect();
        let after: BTreeSet<String> = strings(&planned.servers).into_iter().collect();

        let removed: Vec<&String> = before.difference(&after).collect();
        if !removed.is_empty() {
            clients
                .api
                .action::<ServerGroup, _>(
                    &group_id,
                    "remove_servers",
                    &ServerGroupMembers::new(removed.into_iter().cloned()),
                )
                .await?;
        }

        let added: Vec<&String> = after.difference(&before).collect();
        if !added.is_empty() {
            clients
                .api
                .action::<ServerGroup, _>(
                    &group_id,
                    "add_servers",
                    &ServerGroupMembers::new(added.into_iter().cloned()),
                )
                .await?;
        }
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let servers = strings(&state.servers);
        if servers.is_empty() {
            return Ok(());
        }
        clients
            .api
            .action::<ServerGroup, _>(
                &group_id(state)?,
                "remove_servers",
                &ServerGroupMembers::new(servers),
            )
            .await?;
        Ok(())
    }

    fn object_id(object: &Membership) -> String {
        object.id.clone()
    }

    /// Only the managed servers that are still in the group stay in state
    fn set_attributes(&self, membership: &Membership, state: &mut Self::State) {
        let group = &membership.group;
        let present: Vec<String> = match &state.servers {
            Value::Value(_) => strings(&state.servers)
                .into_iter()
                .filter(|id| group.contains(id))
                .collect(),
            _ => group.servers.iter().map(|s| s.id.clone()).collect(),
        };
        state.group = to_str(&group.id);
        state.servers = to_set(present);
    }

    /// Import by group id: every current member becomes managed
    fn import_state(&self, id: &str) -> Result<Self::State> {
        crate::validate::id_with_prefix(id, &["grp"]).map_err(ProviderError::Import)?;
        Ok(MembershipState {
            id: to_str(uuid::Uuid::new_v4().to_string()),
            group: to_str(id),
            servers: Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use crate::crud::Crud;
    use tf_provider::{Diagnostics, Resource, ValueEmpty};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn group(servers: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "id": "grp-tests",
            "name": "web",
            "servers": servers.iter().map(|id| serde_json::json!({"id": id})).collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn test_create_adds_servers_and_generates_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.0/server_groups/grp-tests/add_servers"))
            .and(body_json(serde_json::json!({
                "servers": [{"server": "srv-aaaaa"}, {"server": "srv-bbbbb"}]
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(group(&["srv-aaaaa", "srv-bbbbb"])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/server_groups/grp-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(group(&[
                "srv-aaaaa",
                "srv-bbbbb",
                "srv-other",
            ])))
            .mount(&server)
            .await;

        let crud = Crud::new(MembershipResource, test_slot(&server).await);
        let planned = MembershipState {
            id: Value::Unknown,
            group: to_str("grp-tests"),
            servers: to_set(["srv-bbbbb", "srv-aaaaa"]),
        };
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
        let id = string(&state.id).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(state.servers, to_set(["srv-aaaaa", "srv-bbbbb"]));
    }

    #[test]
    fn test_set_attributes_drops_removed_servers() {
        let membership = Membership {
            id: "m".to_string(),
            group: serde_json::from_value(group(&["srv-aaaaa"])).unwrap(),
        };
        let mut state = MembershipState {
            servers: to_set(["srv-aaaaa", "srv-bbbbb"]),
            ..Default::default()
        };
        MembershipResource.set_attributes(&membership, &mut state);
        assert_eq!(state.servers, to_set(["srv-aaaaa"]));
    }

    #[test]
    fn test_import_requires_group_id() {
        assert!(MembershipResource.import_state("srv-aaaaa").is_err());
        let state = MembershipResource.import_state("grp-tests").unwrap();
        assert_eq!(state.group, to_str("grp-tests"));
    }
}
