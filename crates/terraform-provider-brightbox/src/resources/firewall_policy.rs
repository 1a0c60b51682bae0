//! `brightbox_firewall_policy`

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{computed, id_attribute, optional, resource_schema};
use crate::validate::{Checker, id_with_prefix};
use crate::values::{Str, changed, changed_str, non_empty, string, to_rfc3339, unknown_if_null};
use async_trait::async_trait;
use brightbox_api::model::{FirewallPolicy, FirewallPolicyOptions, PolicyTarget};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tf_provider::{AttributeType, Schema, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallPolicyState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub server_group: Str,
    pub created_at: Str,
}

impl ResourceState for FirewallPolicyState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirewallPolicyResource;

#[async_trait]
impl ManagedResource for FirewallPolicyResource {
    type State = FirewallPolicyState;
    type Object = FirewallPolicy;

    const TYPE_NAME: &'static str = "firewall policy";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Firewall Policy",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the policy"),
                "description" => optional(AttributeType::String, "Longer description of the policy"),
                "server_group" => optional(AttributeType::String, "Server group the policy applies to"),
                "created_at" => computed(AttributeType::String, "Creation time (RFC3339)"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("server_group", &config.server_group, |v| {
            id_with_prefix(v, &["grp"])
        });
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        if prior.is_none() {
            unknown_if_null(&mut planned.created_at);
        }
    }

    async fn create(
        &self,
        clients: &CompositeClient,
        planned: &Self::State,
    ) -> Result<FirewallPolicy> {
        let options = FirewallPolicyOptions {
            name: string(&planned.name),
            description: string(&planned.description),
            server_group: string(&planned.server_group),
        };
        Ok(clients.api.create::<FirewallPolicy, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<FirewallPolicy> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let id = state_id(prior)?;
        let options = FirewallPolicyOptions {
            name: changed_str(&prior.name, &planned.name),
            description: changed_str(&prior.description, &planned.description),
            server_group: None,
        };
        if !options.is_empty() {
            clients.api.update::<FirewallPolicy, _>(id, &options).await?;
        }

        if changed(&prior.server_group, &planned.server_group) {
            if let Some(old) = string(&prior.server_group) {
                tracing::info!("Removing firewall policy {} from {}", id, old);
                clients
                    .api
                    .action::<FirewallPolicy, _>(id, "remove", &PolicyTarget { server_group: old })
                    .await?;
            }
            if let Some(new) = string(&planned.server_group) {
                tracing::info!("Applying firewall policy {} to {}", id, new);
                clients
                    .api
                    .action::<FirewallPolicy, _>(id, "apply_to", &PolicyTarget { server_group: new })
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<FirewallPolicy>(state_id(state)?).await?)
    }

    fn object_id(object: &FirewallPolicy) -> String {
        object.id.clone()
    }

    fn set_attributes(&self, policy: &FirewallPolicy, state: &mut Self::State) {
        state.name = non_empty(Some(policy.name.as_str()));
        state.description = non_empty(Some(policy.description.as_str()));
        state.server_group = non_empty(policy.server_group.as_ref().map(|g| g.id.as_str()));
        state.created_at = to_rfc3339(policy.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use crate::values::to_str;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_moving_policy_between_groups() {
        let server = MockServer::start().await;
        let policy = serde_json::json!({"id": "fwp-tests", "name": "web"});
        Mock::given(method("POST"))
            .and(path("/1.0/firewall_policies/fwp-tests/remove"))
            .and(body_json(serde_json::json!({"server_group": "grp-aaaaa"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(&policy))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/1.0/firewall_policies/fwp-tests/apply_to"))
            .and(body_json(serde_json::json!({"server_group": "grp-bbbbb"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(&policy))
            .expect(1)
            .mount(&server)
            .await;

        let slot = test_slot(&server).await;
        let clients = slot.get().unwrap();
        let prior = FirewallPolicyState {
            id: to_str("fwp-tests"),
            name: to_str("web"),
            server_group: to_str("grp-aaaaa"),
            ..Default::default()
        };
        let planned = FirewallPolicyState {
            server_group: to_str("grp-bbbbb"),
            ..prior.clone()
        };

        FirewallPolicyResource
            .update(&clients, &prior, &planned, Duration::from_secs(60))
            .await
            .unwrap();
    }
}
