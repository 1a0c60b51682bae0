//! `brightbox_volume`

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id, wait_for};
use crate::error::Result;
use crate::schema::{
    computed, id_attribute, optional, optional_computed, resource_schema, timeouts_block,
};
use crate::timeouts::TimeoutsValue;
use crate::validate::{Checker, id_with_prefix, in_range, one_of, zone};
use crate::values::{
    Str, ValueBool, bool_opt, changed, changed_str, non_empty, num_opt, string, to_str,
    unknown_if_null,
};
use crate::waiter::WaitConfig;
use async_trait::async_trait;
use brightbox_api::model::{Volume, VolumeAttachment, VolumeOptions, VolumeResize};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tf_provider::{AttributePath, AttributeType, Schema, Value, ValueNumber, map};

const FILESYSTEM_TYPES: &[&str] = &["ext4", "xfs"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub size: ValueNumber,
    pub image: Str,
    pub source: Str,
    pub source_type: Str,
    pub encrypted: ValueBool,
    pub filesystem_label: Str,
    pub filesystem_type: Str,
    pub serial: Str,
    pub zone: Str,
    pub server: Str,
    pub boot: ValueBool,
    pub delete_with_server: ValueBool,
    pub locked: ValueBool,
    pub status: Str,
    pub storage_type: Str,
    pub timeouts: TimeoutsValue,
}

impl ResourceState for VolumeState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }

    fn timeouts(&self) -> Option<&TimeoutsValue> {
        Some(&self.timeouts)
    }

    fn locked(&self) -> Option<bool> {
        bool_opt(&self.locked)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VolumeResource;

impl VolumeResource {
    async fn attach(
        &self,
        clients: &CompositeClient,
        state: &VolumeState,
        server: String,
        timeout: Duration,
    ) -> Result<()> {
        let id = state_id(state)?;
        tracing::info!("Attaching volume {} to {}", id, server);
        let attachment = VolumeAttachment {
            server,
            boot: bool_opt(&state.boot).unwrap_or(false),
        };
        clients
            .api
            .action::<Volume, _>(id, "attach", &attachment)
            .await?;
        let wait = WaitConfig::new(&["detached"], &["attached"]).with_timeout(timeout);
        wait_for(self, clients, state, &wait).await?;
        Ok(())
    }

    async fn detach(
        &self,
        clients: &CompositeClient,
        state: &VolumeState,
        timeout: Duration,
    ) -> Result<()> {
        let id = state_id(state)?;
        tracing::info!("Detaching volume {}", id);
        clients
            .api
            .action::<Volume, _>(id, "detach", &serde_json::json!({}))
            .await?;
        let wait = WaitConfig::new(&["attached"], &["detached"]).with_timeout(timeout);
        wait_for(self, clients, state, &wait).await?;
        Ok(())
    }
}

#[async_trait]
impl ManagedResource for VolumeResource {
    type State = VolumeState;
    type Object = Volume;

    const TYPE_NAME: &'static str = "volume";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Volume",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the volume"),
                "description" => optional(AttributeType::String, "Longer description of the volume"),
                "size" => optional_computed(AttributeType::Number, "Size in MiB; growing resizes, shrinking replaces"),
                "image" => optional(AttributeType::String, "Image the volume is built from"),
                "source" => optional(AttributeType::String, "Volume or image id to copy"),
                "source_type" => computed(AttributeType::String, "How the volume was created"),
                "encrypted" => optional_computed(AttributeType::Bool, "Encrypt the volume at rest"),
                "filesystem_label" => optional_computed(AttributeType::String, "Label of a newly created filesystem"),
                "filesystem_type" => optional_computed(AttributeType::String, "ext4 or xfs for a blank volume"),
                "serial" => optional_computed(AttributeType::String, "Serial number presented to the server"),
                "zone" => optional_computed(AttributeType::String, "Zone the volume lives in"),
                "server" => optional(AttributeType::String, "Server the volume is attached to"),
                "boot" => computed(AttributeType::Bool, "True if this is the server's boot volume"),
                "delete_with_server" => optional_computed(AttributeType::Bool, "Delete the volume along with its server"),
                "locked" => optional_computed(AttributeType::Bool, "Protect the volume from deletion"),
                "status" => computed(AttributeType::String, "Current state of the volume"),
                "storage_type" => computed(AttributeType::String, "Storage backing the volume"),
            },
            map! {
                "timeouts" => timeouts_block(),
            },
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("image", &config.image, |v| id_with_prefix(v, &["img"]));
        checker.string("source", &config.source, |v| id_with_prefix(v, &["vol", "img"]));
        checker.string("server", &config.server, |v| id_with_prefix(v, &["srv"]));
        checker.string("zone", &config.zone, zone);
        checker.string("filesystem_type", &config.filesystem_type, |v| {
            one_of(v, FILESYSTEM_TYPES)
        });
        checker.number("size", &config.size, |v| in_range(v, 1, 1_048_576));

        let set = |v: &Str| matches!(v, Value::Value(_));
        checker.conflicts("image", set(&config.image), "source", set(&config.source));
        checker.conflicts(
            "filesystem_type",
            set(&config.filesystem_type),
            "image",
            set(&config.image),
        );
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        match prior {
            None => {
                unknown_if_null(&mut planned.size);
                unknown_if_null(&mut planned.encrypted);
                unknown_if_null(&mut planned.filesystem_label);
                unknown_if_null(&mut planned.filesystem_type);
                unknown_if_null(&mut planned.serial);
                unknown_if_null(&mut planned.zone);
                unknown_if_null(&mut planned.boot);
                unknown_if_null(&mut planned.delete_with_server);
                unknown_if_null(&mut planned.locked);
                unknown_if_null(&mut planned.source_type);
                unknown_if_null(&mut planned.storage_type);
                planned.status = Value::Unknown;
            }
            Some(prior) => {
                if prior.server != planned.server {
                    planned.status = Value::Unknown;
                    planned.boot = Value::Unknown;
                }
            }
        }
    }

    fn requires_replace(&self, prior: &Self::State, planned: &Self::State) -> Vec<AttributePath> {
        let mut replace = Vec::new();
        let fixed = [
            ("image", prior.image != planned.image),
            ("source", prior.source != planned.source),
            ("encrypted", prior.encrypted != planned.encrypted),
            ("filesystem_label", prior.filesystem_label != planned.filesystem_label),
            ("filesystem_type", prior.filesystem_type != planned.filesystem_type),
            ("zone", prior.zone != planned.zone),
        ];
        for (name, differs) in fixed {
            if differs {
                replace.push(AttributePath::new(name));
            }
        }
        if let (Some(from), Some(to)) = (num_opt(&prior.size), num_opt(&planned.size)) {
            if to < from {
                replace.push(AttributePath::new("size"));
            }
        }
        replace
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<Volume> {
        let options = VolumeOptions {
            name: string(&planned.name),
            description: string(&planned.description),
            size: num_opt(&planned.size),
            image: string(&planned.image),
            source: string(&planned.source),
            encrypted: bool_opt(&planned.encrypted),
            filesystem_label: string(&planned.filesystem_label),
            filesystem_type: string(&planned.filesystem_type),
            serial: string(&planned.serial),
            zone: string(&planned.zone),
            delete_with_server: bool_opt(&planned.delete_with_server),
        };
        Ok(clients.api.create::<Volume, _>(&options).await?)
    }

    async fn after_create(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        planned: &Self::State,
        timeout: Duration,
    ) -> Result<()> {
        if let Some(server) = string(&planned.server) {
            self.attach(clients, state, server, timeout).await?;
        }
        Ok(())
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<Volume> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        timeout: Duration,
    ) -> Result<()> {
        let id = state_id(prior)?;
        let options = VolumeOptions {
            name: changed_str(&prior.name, &planned.name),
            description: changed_str(&prior.description, &planned.description),
            serial: changed_str(&prior.serial, &planned.serial).filter(|s| !s.is_empty()),
            delete_with_server: changed(&prior.delete_with_server, &planned.delete_with_server)
                .then(|| bool_opt(&planned.delete_with_server))
                .flatten(),
            ..Default::default()
        };
        if !options.is_empty() {
            clients.api.update::<Volume, _>(id, &options).await?;
        }

        if let (Some(from), Some(to)) = (num_opt(&prior.size), num_opt(&planned.size)) {
            if to > from {
                tracing::info!("Resizing volume {} from {} to {} MiB", id, from, to);
                clients
                    .api
                    .action::<Volume, _>(id, "resize", &VolumeResize { from, to })
                    .await?;
            }
        }

        if changed(&prior.server, &planned.server) {
            if string(&prior.server).is_some() {
                self.detach(clients, prior, timeout).await?;
            }
            if let Some(server) = string(&planned.server) {
                self.attach(clients, prior, server, timeout).await?;
            }
        }
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        timeout: Duration,
    ) -> Result<()> {
        let current = self.fetch(clients, state).await?;
        if current.is_attached() {
            self.detach(clients, state, timeout).await?;
        }
        Ok(clients.api.destroy::<Volume>(state_id(state)?).await?)
    }

    async fn set_lock(&self, clients: &CompositeClient, state: &Self::State, locked: bool) -> Result<()> {
        clients
            .api
            .set_lock::<Volume>(state_id(state)?, locked)
            .await?;
        Ok(())
    }

    fn object_id(object: &Volume) -> String {
        object.id.clone()
    }

    fn status(object: &Volume) -> &str {
        &object.status
    }

    fn set_attributes(&self, volume: &Volume, state: &mut Self::State) {
        state.name = non_empty(Some(volume.name.as_str()));
        state.description = non_empty(Some(volume.description.as_str()));
        state.size = Value::Value(volume.size);
        state.encrypted = Value::Value(volume.encrypted);
        state.filesystem_label = non_empty(volume.filesystem_label.as_deref());
        state.filesystem_type = non_empty(volume.filesystem_type.as_deref());
        state.serial = non_empty(volume.serial.as_deref());
        state.zone = non_empty(volume.zone.as_ref().map(|z| z.handle.as_str()));
        state.server = non_empty(volume.server.as_ref().map(|s| s.id.as_str()));
        state.boot = Value::Value(volume.boot);
        state.delete_with_server = Value::Value(volume.delete_with_server);
        state.locked = Value::Value(volume.locked);
        state.status = to_str(&volume.status);
        state.storage_type = to_str(&volume.storage_type);
        state.source_type = non_empty(volume.source_type.as_deref());
        if let Some(image) = &volume.image {
            if matches!(state.image, Value::Value(_)) {
                state.image = to_str(&image.id);
            }
        }
    }

    fn create_wait(&self) -> Option<WaitConfig> {
        Some(WaitConfig::new(&["creating"], &["detached", "attached"]))
    }

    fn delete_wait(&self) -> Option<WaitConfig> {
        Some(WaitConfig::deleted(&["detached", "deleting"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_slot;
    use crate::crud::Crud;
    use tf_provider::{Diagnostics, Resource, ValueEmpty};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn volume(status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "vol-tests",
            "name": "data",
            "status": status,
            "size": 20480,
            "storage_type": "network",
            "zone": {"id": "zon-aaaaa", "handle": "gb1-a"}
        })
    }

    #[tokio::test]
    async fn test_delete_waits_for_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/1.0/volumes/vol-tests"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        // Before the delete, then once while deleting, then gone
        Mock::given(method("GET"))
            .and(path("/1.0/volumes/vol-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(volume("detached")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/volumes/vol-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(volume("deleting")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/volumes/vol-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(volume("deleted")))
            .mount(&server)
            .await;

        let crud = Crud::new(VolumeResource, test_slot(&server).await);
        let state = VolumeState {
            id: to_str("vol-tests"),
            status: to_str("detached"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let done = crud
            .destroy(&mut diags, Value::Value(state), ValueEmpty::default())
            .await;
        assert!(done.is_some(), "{:?}", diags.errors);
    }

    #[tokio::test]
    async fn test_delete_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/1.0/volumes/vol-tests"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/volumes/vol-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(volume("deleting")))
            .mount(&server)
            .await;

        let crud = Crud::new(VolumeResource, test_slot(&server).await);
        let state = VolumeState {
            id: to_str("vol-tests"),
            timeouts: Value::Value(vec![Value::Value(crate::timeouts::TimeoutsBlock {
                delete: to_str("500ms"),
                ..Default::default()
            })]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let done = crud
            .destroy(&mut diags, Value::Value(state), ValueEmpty::default())
            .await;
        assert!(done.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn test_shrinking_requires_replacement() {
        let prior = VolumeState {
            size: Value::Value(20480),
            ..Default::default()
        };
        let grow = VolumeState {
            size: Value::Value(40960),
            ..prior.clone()
        };
        let shrink = VolumeState {
            size: Value::Value(10240),
            ..prior.clone()
        };
        assert!(VolumeResource.requires_replace(&prior, &grow).is_empty());
        assert_eq!(VolumeResource.requires_replace(&prior, &shrink).len(), 1);
    }
}
