//! `brightbox_orbit_container`
//!
//! Containers are addressed by name, which doubles as the resource id.

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{computed, id_attribute, optional, required, resource_schema, string_map, string_set};
use crate::validate::{Checker, metadata_key, not_empty};
use crate::values::{
    Str, StrMap, StrSet, changed, changed_str, non_empty, string, string_map as map_value,
    strings, to_map, to_rfc3339, to_set_or_null, to_str, unknown_if_null,
};
use async_trait::async_trait;
use brightbox_api::{ContainerInfo, ContainerOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tf_provider::{AttributePath, AttributeType, Schema, Value, ValueNumber, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitContainerState {
    pub id: Str,
    pub name: Str,
    pub metadata: StrMap,
    pub container_read: StrSet,
    pub container_write: StrSet,
    pub versions_location: Str,
    pub history_location: Str,
    pub object_count: ValueNumber,
    pub bytes_used: ValueNumber,
    pub created_at: Str,
}

impl ResourceState for OrbitContainerState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

fn acl(value: &StrSet) -> Option<Vec<String>> {
    matches!(value, Value::Value(_)).then(|| strings(value))
}

fn metadata_changes(prior: &StrMap, planned: &StrMap) -> ContainerOptions {
    let before = map_value(prior);
    let after = map_value(planned);
    ContainerOptions {
        remove_metadata: before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .cloned()
            .collect(),
        metadata: after
            .into_iter()
            .filter(|(key, value)| before.get(key) != Some(value))
            .collect(),
        ..Default::default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrbitContainerResource;

#[async_trait]
impl ManagedResource for OrbitContainerResource {
    type State = OrbitContainerState;
    type Object = ContainerInfo;

    const TYPE_NAME: &'static str = "orbit container";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Orbit Container",
            map! {
                "id" => id_attribute(),
                "name" => required(AttributeType::String, "Name of the container"),
                "metadata" => optional(string_map(), "Container metadata, keys in lower case"),
                "container_read" => optional(string_set(), "Read ACL entries"),
                "container_write" => optional(string_set(), "Write ACL entries"),
                "versions_location" => optional(AttributeType::String, "Container holding old object versions"),
                "history_location" => optional(AttributeType::String, "Container holding object history"),
                "object_count" => computed(AttributeType::Number, "Number of objects in the container"),
                "bytes_used" => computed(AttributeType::Number, "Bytes stored in the container"),
                "created_at" => computed(AttributeType::String, "Time the container was created"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("name", &config.name, |name| {
            not_empty(name)?;
            if name.contains('/') {
                return Err("must not contain '/'".to_string());
            }
            Ok(())
        });
        if let Value::Value(metadata) = &config.metadata {
            for key in metadata.keys() {
                if let Err(message) = metadata_key(key) {
                    checker.fail("metadata", format!("key '{}' {}", key, message));
                }
            }
        }
        let set = |v: &Str| !matches!(v, Value::Null);
        checker.conflicts(
            "versions_location",
            set(&config.versions_location),
            "history_location",
            set(&config.history_location),
        );
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        if prior.is_none() {
            unknown_if_null(&mut planned.object_count);
            unknown_if_null(&mut planned.bytes_used);
            unknown_if_null(&mut planned.created_at);
        }
    }

    fn requires_replace(&self, prior: &Self::State, planned: &Self::State) -> Vec<AttributePath> {
        if prior.name != planned.name {
            vec![AttributePath::new("name")]
        } else {
            Vec::new()
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<ContainerInfo> {
        let name = string(&planned.name).unwrap_or_default();
        let options = ContainerOptions {
            metadata: map_value(&planned.metadata),
            container_read: acl(&planned.container_read),
            container_write: acl(&planned.container_write),
            versions_location: string(&planned.versions_location),
            history_location: string(&planned.history_location),
            ..Default::default()
        };
        tracing::info!("Creating orbit container {} in {}", name, clients.account);
        clients.orbit.create_container(&name, &options).await?;
        Ok(clients.orbit.get_container(&name).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<ContainerInfo> {
        Ok(clients.orbit.get_container(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let options = ContainerOptions {
            container_read: changed(&prior.container_read, &planned.container_read)
                .then(|| strings(&planned.container_read)),
            container_write: changed(&prior.container_write, &planned.container_write)
                .then(|| strings(&planned.container_write)),
            versions_location: changed_str(&prior.versions_location, &planned.versions_location),
            history_location: changed_str(&prior.history_location, &planned.history_location),
            ..metadata_changes(&prior.metadata, &planned.metadata)
        };
        if options == ContainerOptions::default() {
            return Ok(());
        }
        clients
            .orbit
            .update_container(state_id(prior)?, &options)
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.orbit.delete_container(state_id(state)?).await?)
    }

    fn object_id(object: &ContainerInfo) -> String {
        object.name.clone()
    }

    fn set_attributes(&self, container: &ContainerInfo, state: &mut Self::State) {
        state.name = to_str(&container.name);
        state.metadata = if container.metadata.is_empty() && !matches!(state.metadata, Value::Value(_)) {
            Value::Null
        } else {
            to_map(container.metadata.clone())
        };
        state.container_read = to_set_or_null(container.container_read.iter().map(String::as_str));
        state.container_write = to_set_or_null(container.container_write.iter().map(String::as_str));
        state.versions_location = non_empty(container.versions_location.as_deref());
        state.history_location = non_empty(container.history_location.as_deref());
        state.object_count = Value::Value(container.object_count);
        state.bytes_used = Value::Value(container.bytes_used);
        state.created_at = to_rfc3339(container.created_at);
    }

    fn import_state(&self, id: &str) -> Result<Self::State> {
        Ok(OrbitContainerState {
            id: to_str(id),
            name: to_str(id),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use crate::crud::Crud;
    use std::collections::BTreeMap;
    use tf_provider::{Diagnostics, Resource, ValueEmpty};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn metadata(pairs: &[(&str, &str)]) -> StrMap {
        to_map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_metadata_changes() {
        let options = metadata_changes(
            &metadata(&[("colour", "blue"), ("size", "l"), ("old", "x")]),
            &metadata(&[("colour", "red"), ("size", "l"), ("new", "y")]),
        );
        assert_eq!(options.remove_metadata, vec!["old".to_string()]);
        assert_eq!(
            options.metadata.keys().collect::<Vec<_>>(),
            vec!["colour", "new"]
        );
    }

    #[test]
    fn test_uppercase_metadata_key_rejected() {
        let config = OrbitContainerState {
            name: to_str("backups"),
            metadata: metadata(&[("Colour", "blue")]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        OrbitContainerResource.validate(&mut Checker::new(&mut diags), &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_create_sends_acl_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/acc-tests/backups"))
            .and(header("x-auth-token", "test-token"))
            .and(header("x-container-read", ".r:*"))
            .and(header_exists("x-container-meta-owner"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/v1/acc-tests/backups"))
            .respond_with(
                ResponseTemplate::new(204)
                    .insert_header("x-container-object-count", "3")
                    .insert_header("x-container-bytes-used", "2048")
                    .insert_header("x-container-read", ".r:*")
                    .insert_header("x-container-meta-owner", "ops")
                    .insert_header("x-timestamp", "1700000000.00000"),
            )
            .mount(&server)
            .await;

        let mut planned = OrbitContainerState {
            name: to_str("backups"),
            metadata: metadata(&[("owner", "ops")]),
            container_read: crate::values::to_set([".r:*"]),
            ..Default::default()
        };
        OrbitContainerResource.plan(&mut planned, None);
        planned.id = Value::Unknown;

        let crud = Crud::new(OrbitContainerResource, test_slot(&server).await);
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
        assert_eq!(state.id, to_str("backups"));
        assert_eq!(state.object_count, Value::Value(3));
        assert_eq!(state.bytes_used, Value::Value(2048));
        assert_eq!(state.created_at, to_str("2023-11-14T22:13:20+00:00"));
    }
}
