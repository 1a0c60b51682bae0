//! `brightbox_server`
//!
//! User data can be given as text (`user_data`, encoded here) or already
//! encoded (`user_data_base64`). A change of `type` resizes the server in
//! place; a change of image, zone or disk layout rebuilds it.

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id, wait_for};
use crate::encoding::{base64_encode, check_user_data, is_base64};
use crate::error::Result;
use crate::schema::{
    computed, id_attribute, optional, optional_computed, required, resource_schema, string_set,
    timeouts_block,
};
use crate::timeouts::TimeoutsValue;
use crate::validate::{Checker, id_with_prefix, in_range, zone};
use crate::values::{
    Str, StrSet, ValueBool, bool_opt, changed, changed_str, non_empty, num_opt, str_opt, string,
    strings, to_set, to_str, unknown_if_null,
};
use crate::waiter::WaitConfig;
use async_trait::async_trait;
use brightbox_api::model::{Server, ServerOptions, ServerResize, ServerVolume, ids};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tf_provider::{AttributePath, AttributeType, Schema, Value, ValueNumber, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerState {
    pub id: Str,
    pub image: Str,
    pub name: Str,
    #[serde(rename = "type")]
    pub server_type: Str,
    pub zone: Str,
    pub user_data: Str,
    pub user_data_base64: Str,
    pub server_groups: StrSet,
    pub locked: ValueBool,
    pub disk_encrypted: ValueBool,
    pub disk_size: ValueNumber,
    pub snapshots_schedule: Str,
    pub snapshots_retention: Str,
    pub status: Str,
    pub hostname: Str,
    pub fqdn: Str,
    pub username: Str,
    pub interface: Str,
    pub ipv4_address: Str,
    pub ipv4_address_private: Str,
    pub ipv6_address: Str,
    pub ipv6_hostname: Str,
    pub public_hostname: Str,
    pub timeouts: TimeoutsValue,
}

impl ResourceState for ServerState {
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

impl ServerState {
    /// User data as it is sent to the API
    fn encoded_user_data(&self) -> Option<String> {
        str_opt(&self.user_data)
            .map(base64_encode)
            .or_else(|| string(&self.user_data_base64))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerResource;

#[async_trait]
impl ManagedResource for ServerResource {
    type State = ServerState;
    type Object = Server;

    const TYPE_NAME: &'static str = "server";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Cloud Server",
            map! {
                "id" => id_attribute(),
                "image" => required(AttributeType::String, "Image used to build the server"),
                "name" => optional(AttributeType::String, "Friendly name of the server"),
                "type" => optional_computed(AttributeType::String, "Server type handle or id"),
                "zone" => optional_computed(AttributeType::String, "Zone the server is built in"),
                "user_data" => optional(AttributeType::String, "User data as text"),
                "user_data_base64" => optional(AttributeType::String, "User data already base64 encoded"),
                "server_groups" => optional_computed(string_set(), "Server groups the server belongs to"),
                "locked" => optional_computed(AttributeType::Bool, "Protect the server from deletion"),
                "disk_encrypted" => optional_computed(AttributeType::Bool, "Encrypt the local disk"),
                "disk_size" => optional_computed(AttributeType::Number, "Size of a network boot volume in MiB"),
                "snapshots_schedule" => optional(AttributeType::String, "Crontab pattern for scheduled snapshots"),
                "snapshots_retention" => optional(AttributeType::String, "Number of scheduled snapshots to keep"),
                "status" => computed(AttributeType::String, "Current state of the server"),
                "hostname" => computed(AttributeType::String, "Hostname of the server"),
                "fqdn" => computed(AttributeType::String, "Fully qualified domain name of the server"),
                "username" => computed(AttributeType::String, "Login username of the image"),
                "interface" => computed(AttributeType::String, "Id of the primary network interface"),
                "ipv4_address" => computed(AttributeType::String, "Public IPv4 address of the first mapped cloud IP"),
                "ipv4_address_private" => computed(AttributeType::String, "Private IPv4 address"),
                "ipv6_address" => computed(AttributeType::String, "IPv6 address"),
                "ipv6_hostname" => computed(AttributeType::String, "Hostname resolving to the IPv6 address"),
                "public_hostname" => computed(AttributeType::String, "Hostname of the first mapped cloud IP"),
            },
            map! {
                "timeouts" => timeouts_block(),
            },
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("image", &config.image, |v| id_with_prefix(v, &["img"]));
        checker.string("zone", &config.zone, zone);
        checker.each("server_groups", &config.server_groups, |v| {
            id_with_prefix(v, &["grp"])
        });
        checker.number("disk_size", &config.disk_size, |v| in_range(v, 1, 1_048_576));

        let set = |v: &Str| !matches!(v, Value::Null);
        checker.conflicts(
            "user_data",
            set(&config.user_data),
            "user_data_base64",
            set(&config.user_data_base64),
        );
        if let Some(encoded) = str_opt(&config.user_data_base64) {
            if !is_base64(encoded) {
                checker.fail("user_data_base64", "is not valid base64");
            }
        }
        if let Some(data) = config.encoded_user_data() {
            let attribute = if set(&config.user_data) {
                "user_data"
            } else {
                "user_data_base64"
            };
            if let Err(message) = check_user_data(&data) {
                checker.fail(attribute, message);
            }
        }
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        match prior {
            None => {
                unknown_if_null(&mut planned.server_type);
                unknown_if_null(&mut planned.zone);
                unknown_if_null(&mut planned.server_groups);
                unknown_if_null(&mut planned.locked);
                unknown_if_null(&mut planned.disk_encrypted);
                unknown_if_null(&mut planned.disk_size);
                planned.status = Value::Unknown;
                planned.hostname = Value::Unknown;
                planned.fqdn = Value::Unknown;
                planned.username = Value::Unknown;
                planned.interface = Value::Unknown;
                planned.ipv4_address = Value::Unknown;
                planned.ipv4_address_private = Value::Unknown;
                planned.ipv6_address = Value::Unknown;
                planned.ipv6_hostname = Value::Unknown;
                planned.public_hostname = Value::Unknown;
            }
            Some(prior) => {
                if changed(&prior.server_type, &planned.server_type) {
                    planned.status = Value::Unknown;
                }
            }
        }
    }

    fn requires_replace(&self, prior: &Self::State, planned: &Self::State) -> Vec<AttributePath> {
        [
            ("image", prior.image != planned.image),
            ("zone", changed(&prior.zone, &planned.zone)),
            ("disk_encrypted", changed(&prior.disk_encrypted, &planned.disk_encrypted)),
            ("disk_size", changed(&prior.disk_size, &planned.disk_size)),
        ]
        .into_iter()
        .filter(|(_, differs)| *differs)
        .map(|(name, _)| AttributePath::new(name))
        .collect()
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<Server> {
        let image = string(&planned.image);
        let volumes = num_opt(&planned.disk_size).map(|size| {
            vec![ServerVolume {
                image: image.clone(),
                size: Some(size),
            }]
        });
        let server_groups = match &planned.server_groups {
            Value::Value(_) => Some(strings(&planned.server_groups)),
            _ => None,
        };
        let options = ServerOptions {
            name: string(&planned.name),
            image: if volumes.is_some() { None } else { image },
            server_type: string(&planned.server_type),
            zone: string(&planned.zone),
            user_data: planned.encoded_user_data(),
            server_groups,
            disk_encrypted: bool_opt(&planned.disk_encrypted),
            snapshots_schedule: string(&planned.snapshots_schedule),
            snapshots_retention: string(&planned.snapshots_retention),
            volumes,
        };
        Ok(clients.api.create::<Server, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<Server> {
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
        let user_data = (prior.encoded_user_data() != planned.encoded_user_data())
            .then(|| planned.encoded_user_data().unwrap_or_default());
        let server_groups = (changed(&prior.server_groups, &planned.server_groups)
            && matches!(planned.server_groups, Value::Value(_)))
        .then(|| strings(&planned.server_groups));
        let options = ServerOptions {
            name: changed_str(&prior.name, &planned.name),
            user_data,
            server_groups,
            snapshots_schedule: changed_str(&prior.snapshots_schedule, &planned.snapshots_schedule),
            snapshots_retention: changed_str(
                &prior.snapshots_retention,
                &planned.snapshots_retention,
            ),
            ..Default::default()
        };
        if !options.is_empty() {
            clients.api.update::<Server, _>(id, &options).await?;
        }

        if let (true, Some(new_type)) = (
            changed(&prior.server_type, &planned.server_type),
            string(&planned.server_type),
        ) {
            tracing::info!("Resizing server {} to {}", id, new_type);
            clients
                .api
                .action::<Server, _>(id, "resize", &ServerResize { new_type })
                .await?;
            let wait = WaitConfig::new(&["inactive"], &["active"])
                .with_delay(Duration::from_secs(2))
                .with_timeout(timeout);
            wait_for(self, clients, prior, &wait).await?;
        }
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<Server>(state_id(state)?).await?)
    }

    async fn set_lock(&self, clients: &CompositeClient, state: &Self::State, locked: bool) -> Result<()> {
        clients
            .api
            .set_lock::<Server>(state_id(state)?, locked)
            .await?;
        Ok(())
    }

    fn object_id(object: &Server) -> String {
        object.id.clone()
    }

    fn status(object: &Server) -> &str {
        &object.status
    }

    fn set_attributes(&self, server: &Server, state: &mut Self::State) {
        state.name = non_empty(Some(server.name.as_str()));
        if let Some(image) = &server.image {
            state.image = to_str(&image.id);
            state.username = non_empty(image.username.as_deref());
        }
        if let Some(server_type) = &server.server_type {
            // Keep the form the configuration used, handle or id
            let matches = str_opt(&state.server_type)
                .is_some_and(|t| t == server_type.id || t == server_type.handle);
            if !matches {
                state.server_type = to_str(&server_type.handle);
            }
        }
        state.zone = non_empty(server.zone.as_ref().map(|z| z.handle.as_str()));
        state.server_groups = to_set(ids(&server.server_groups));
        state.locked = Value::Value(server.locked);
        state.disk_encrypted = Value::Value(server.disk_encrypted);
        state.disk_size = match server.boot_volume() {
            Some(volume) => Value::Value(volume.size),
            None => server
                .server_type
                .as_ref()
                .map_or(Value::Null, |t| Value::Value(t.disk_size)),
        };
        if matches!(state.snapshots_schedule, Value::Value(_)) || server.snapshots_schedule.is_some() {
            state.snapshots_schedule = non_empty(server.snapshots_schedule.as_deref());
        }
        if matches!(state.snapshots_retention, Value::Value(_)) || server.snapshots_retention.is_some() {
            state.snapshots_retention = non_empty(server.snapshots_retention.as_deref());
        }
        state.status = to_str(&server.status);
        state.hostname = to_str(&server.hostname);
        state.fqdn = to_str(&server.fqdn);

        let interface = server.primary_interface();
        state.interface = non_empty(interface.map(|i| i.id.as_str()));
        state.ipv4_address_private = non_empty(interface.and_then(|i| i.ipv4_address.as_deref()));
        state.ipv6_address = non_empty(interface.and_then(|i| i.ipv6_address.as_deref()));
        state.ipv6_hostname = match &state.ipv6_address {
            Value::Value(_) => to_str(format!("ipv6.{}", server.fqdn)),
            _ => Value::Null,
        };
        let cloud_ip = server.cloud_ips.first();
        state.ipv4_address = non_empty(
            cloud_ip
                .and_then(|c| c.public_ipv4.as_deref())
                .or_else(|| interface.and_then(|i| i.ipv4_address.as_deref())),
        );
        state.public_hostname = non_empty(server.public_hostname());
        if matches!(state.user_data, Value::Unknown) {
            state.user_data = Value::Null;
        }
        if matches!(state.user_data_base64, Value::Unknown) {
            state.user_data_base64 = Value::Null;
        }
    }

    fn create_wait(&self) -> Option<WaitConfig> {
        Some(
            WaitConfig::new(&["creating"], &["active"])
                .with_delay(Duration::from_secs(5))
                .with_min_interval(Duration::from_secs(3)),
        )
    }

    fn delete_wait(&self) -> Option<WaitConfig> {
        Some(
            WaitConfig::deleted(&["active", "inactive", "deleting"])
                .with_min_interval(Duration::from_secs(3)),
        )
    }
}
