//! `brightbox_database_server`
//!
//! The admin password is only returned when the server is created and is
//! carried in state from then on.

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{
    computed, id_attribute, optional, optional_computed, required, resource_schema, sensitive,
    string_set, timeouts_block,
};
use crate::timeouts::TimeoutsValue;
use crate::validate::{Check, Checker, id_with_prefix, in_range, one_of, zone};
use crate::values::{
    Str, StrSet, ValueBool, bool_opt, changed, changed_str, non_empty, num_opt, string, strings,
    to_rfc3339, to_set, to_str, unknown_if_null,
};
use crate::waiter::WaitConfig;
use async_trait::async_trait;
use brightbox_api::model::{DatabaseServer, DatabaseServerOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tf_provider::{AttributePath, AttributeType, Schema, Value, ValueNumber, map};

const ENGINES: &[&str] = &["mysql", "postgresql"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseServerState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub database_engine: Str,
    pub database_version: Str,
    pub database_type: Str,
    pub zone: Str,
    pub snapshot: Str,
    pub allow_access: StrSet,
    pub maintenance_weekday: ValueNumber,
    pub maintenance_hour: ValueNumber,
    pub snapshots_schedule: Str,
    pub snapshots_schedule_next_at: Str,
    pub snapshots_retention: Str,
    pub locked: ValueBool,
    pub admin_username: Str,
    pub admin_password: Str,
    pub status: Str,
    pub timeouts: TimeoutsValue,
}

impl ResourceState for DatabaseServerState {
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

/// An address, a CIDR block, or a server, server group or load balancer id
fn access_source(value: &str) -> Check {
    let address = value.split_once('/').map_or(value, |(addr, _)| addr);
    if address.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }
    id_with_prefix(value, &["srv", "grp", "lba"])
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseServerResource;

#[async_trait]
impl ManagedResource for DatabaseServerResource {
    type State = DatabaseServerState;
    type Object = DatabaseServer;

    const TYPE_NAME: &'static str = "database server";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Database Server",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the database server"),
                "description" => optional(AttributeType::String, "Longer description of the database server"),
                "database_engine" => optional_computed(AttributeType::String, "mysql or postgresql"),
                "database_version" => optional_computed(AttributeType::String, "Engine version"),
                "database_type" => optional_computed(AttributeType::String, "Database server type id"),
                "zone" => optional_computed(AttributeType::String, "Zone the database server runs in"),
                "snapshot" => optional(AttributeType::String, "Snapshot to build the database server from"),
                "allow_access" => required(string_set(), "Addresses, CIDR blocks or object ids allowed to connect"),
                "maintenance_weekday" => optional_computed(AttributeType::Number, "Day of the maintenance window, 0 is Sunday"),
                "maintenance_hour" => optional_computed(AttributeType::Number, "Hour of the maintenance window (UTC)"),
                "snapshots_schedule" => optional(AttributeType::String, "Crontab pattern for scheduled snapshots"),
                "snapshots_schedule_next_at" => computed(AttributeType::String, "Time of the next scheduled snapshot"),
                "snapshots_retention" => optional(AttributeType::String, "Number of scheduled snapshots to keep"),
                "locked" => optional_computed(AttributeType::Bool, "Protect the database server from deletion"),
                "admin_username" => computed(AttributeType::String, "Administrator login"),
                "admin_password" => sensitive(computed(AttributeType::String, "Administrator password, set on create")),
                "status" => computed(AttributeType::String, "Current state of the database server"),
            },
            map! {
                "timeouts" => timeouts_block(),
            },
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("database_engine", &config.database_engine, |v| one_of(v, ENGINES));
        checker.string("database_type", &config.database_type, |v| {
            id_with_prefix(v, &["dbt"])
        });
        checker.string("snapshot", &config.snapshot, |v| id_with_prefix(v, &["dbi"]));
        checker.string("zone", &config.zone, zone);
        checker.each("allow_access", &config.allow_access, access_source);
        checker.number("maintenance_weekday", &config.maintenance_weekday, |v| {
            in_range(v, 0, 6)
        });
        checker.number("maintenance_hour", &config.maintenance_hour, |v| in_range(v, 0, 23));
        if matches!(&config.allow_access, Value::Value(v) if v.is_empty()) {
            checker.fail("allow_access", "at least one entry is required");
        }
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        match prior {
            None => {
                unknown_if_null(&mut planned.database_engine);
                unknown_if_null(&mut planned.database_version);
                unknown_if_null(&mut planned.database_type);
                unknown_if_null(&mut planned.zone);
                unknown_if_null(&mut planned.maintenance_weekday);
                unknown_if_null(&mut planned.maintenance_hour);
                unknown_if_null(&mut planned.locked);
                planned.snapshots_schedule_next_at = Value::Unknown;
                planned.admin_username = Value::Unknown;
                planned.admin_password = Value::Unknown;
                planned.status = Value::Unknown;
            }
            Some(prior) => {
                if changed(&prior.snapshots_schedule, &planned.snapshots_schedule) {
                    planned.snapshots_schedule_next_at = Value::Unknown;
                }
            }
        }
    }

    fn requires_replace(&self, prior: &Self::State, planned: &Self::State) -> Vec<AttributePath> {
        [
            ("database_engine", changed(&prior.database_engine, &planned.database_engine)),
            ("database_version", changed(&prior.database_version, &planned.database_version)),
            ("database_type", changed(&prior.database_type, &planned.database_type)),
            ("zone", changed(&prior.zone, &planned.zone)),
            ("snapshot", changed(&prior.snapshot, &planned.snapshot)),
        ]
        .into_iter()
        .filter(|(_, differs)| *differs)
        .map(|(name, _)| AttributePath::new(name))
        .collect()
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<DatabaseServer> {
        let options = DatabaseServerOptions {
            name: string(&planned.name),
            description: string(&planned.description),
            engine: string(&planned.database_engine),
            version: string(&planned.database_version),
            allow_access: Some(strings(&planned.allow_access)),
            snapshot: string(&planned.snapshot),
            zone: string(&planned.zone),
            database_type: string(&planned.database_type),
            maintenance_weekday: num_opt(&planned.maintenance_weekday),
            maintenance_hour: num_opt(&planned.maintenance_hour),
            snapshots_schedule: string(&planned.snapshots_schedule),
            snapshots_retention: string(&planned.snapshots_retention),
        };
        Ok(clients.api.create::<DatabaseServer, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<DatabaseServer> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let number = |prior: &ValueNumber, planned: &ValueNumber| {
            changed(prior, planned).then(|| num_opt(planned)).flatten()
        };
        let options = DatabaseServerOptions {
            name: changed_str(&prior.name, &planned.name),
            description: changed_str(&prior.description, &planned.description),
            allow_access: changed(&prior.allow_access, &planned.allow_access)
                .then(|| strings(&planned.allow_access)),
            maintenance_weekday: number(&prior.maintenance_weekday, &planned.maintenance_weekday),
            maintenance_hour: number(&prior.maintenance_hour, &planned.maintenance_hour),
            snapshots_schedule: changed_str(&prior.snapshots_schedule, &planned.snapshots_schedule),
            snapshots_retention: changed_str(
                &prior.snapshots_retention,
                &planned.snapshots_retention,
            ),
            ..Default::default()
        };
        if options.is_empty() {
            return Ok(());
        }
        clients
            .api
            .update::<DatabaseServer, _>(state_id(prior)?, &options)
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<DatabaseServer>(state_id(state)?).await?)
    }

    async fn set_lock(&self, clients: &CompositeClient, state: &Self::State, locked: bool) -> Result<()> {
        clients
            .api
            .set_lock::<DatabaseServer>(state_id(state)?, locked)
            .await?;
        Ok(())
    }

    fn object_id(object: &DatabaseServer) -> String {
        object.id.clone()
    }

    fn status(object: &DatabaseServer) -> &str {
        &object.status
    }

    fn set_attributes(&self, db: &DatabaseServer, state: &mut Self::State) {
        state.name = non_empty(Some(db.name.as_str()));
        state.description = non_empty(Some(db.description.as_str()));
        state.database_engine = to_str(&db.database_engine);
        state.database_version = to_str(&db.database_version);
        state.database_type = non_empty(db.database_server_type.as_ref().map(|t| t.id.as_str()));
        state.zone = non_empty(db.zone.as_ref().map(|z| z.handle.as_str()));
        state.allow_access = to_set(db.allow_access.iter().map(String::as_str));
        state.maintenance_weekday = Value::Value(db.maintenance_weekday);
        state.maintenance_hour = Value::Value(db.maintenance_hour);
        state.snapshots_schedule = non_empty(db.snapshots_schedule.as_deref());
        state.snapshots_schedule_next_at = to_rfc3339(db.snapshots_schedule_next_at);
        state.snapshots_retention = non_empty(db.snapshots_retention.as_deref());
        state.locked = Value::Value(db.locked);
        state.admin_username = to_str(&db.admin_username);
        state.status = to_str(&db.status);
        match &db.admin_password {
            Some(password) => state.admin_password = to_str(password),
            None if matches!(state.admin_password, Value::Unknown) => {
                state.admin_password = Value::Null
            }
            None => {}
        }
    }

    fn create_wait(&self) -> Option<WaitConfig> {
        Some(
            WaitConfig::new(&["creating"], &["active"])
                .with_delay(Duration::from_secs(10))
                .with_min_interval(Duration::from_secs(3)),
        )
    }

    fn delete_wait(&self) -> Option<WaitConfig> {
        Some(
            WaitConfig::deleted(&["active", "deleting", "failed"])
                .with_min_interval(Duration::from_secs(3)),
        )
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

    fn db_json() -> serde_json::Value {
        db_with_status("active")
    }

    fn db_with_status(status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "dbs-tests",
            "name": "pg",
            "status": status,
            "database_engine": "postgresql",
            "database_version": "14",
            "admin_username": "admin",
            "admin_password": "hunter22",
            "maintenance_weekday": 5,
            "maintenance_hour": 4,
            "allow_access": ["srv-bbbbb", "10.0.0.0/8"],
            "snapshots_schedule_next_at": "2024-05-01T04:00:00Z",
            "database_server_type": {"id": "dbt-aaaaa"},
            "zone": {"id": "zon-aaaaa", "handle": "gb1-a"}
        })
    }

    #[test]
    fn test_password_kept_after_create() {
        let created: DatabaseServer = serde_json::from_value(db_json()).unwrap();
        let mut state = DatabaseServerState {
            admin_password: Value::Unknown,
            ..Default::default()
        };
        DatabaseServerResource.set_attributes(&created, &mut state);
        assert_eq!(state.admin_password, to_str("hunter22"));
        assert_eq!(
            state.snapshots_schedule_next_at,
            to_str("2024-05-01T04:00:00+00:00")
        );

        let refreshed = DatabaseServer {
            admin_password: None,
            ..created
        };
        DatabaseServerResource.set_attributes(&refreshed, &mut state);
        assert_eq!(state.admin_password, to_str("hunter22"));
        assert_eq!(strings(&state.allow_access), vec!["10.0.0.0/8", "srv-bbbbb"]);
    }

    #[test]
    fn test_maintenance_window_bounds() {
        let config = DatabaseServerState {
            allow_access: to_set(["10.0.0.0/8"]),
            maintenance_weekday: Value::Value(7),
            maintenance_hour: Value::Value(23),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        DatabaseServerResource.validate(&mut Checker::new(&mut diags), &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn test_engine_change_replaces() {
        let prior = DatabaseServerState {
            database_engine: to_str("mysql"),
            name: to_str("a"),
            ..Default::default()
        };
        let renamed = DatabaseServerState {
            name: to_str("b"),
            ..prior.clone()
        };
        let switched = DatabaseServerState {
            database_engine: to_str("postgresql"),
            ..prior.clone()
        };
        assert!(DatabaseServerResource.requires_replace(&prior, &renamed).is_empty());
        assert_eq!(DatabaseServerResource.requires_replace(&prior, &switched).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_waits_for_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/1.0/database_servers/dbs-tests"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/database_servers/dbs-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(db_with_status("deleting")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/database_servers/dbs-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(db_with_status("deleted")))
            .mount(&server)
            .await;

        let crud = Crud::new(DatabaseServerResource, test_slot(&server).await);
        let state = DatabaseServerState {
            id: to_str("dbs-tests"),
            status: to_str("active"),
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
            .and(path("/1.0/database_servers/dbs-tests"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/database_servers/dbs-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(db_with_status("deleting")))
            .mount(&server)
            .await;

        let crud = Crud::new(DatabaseServerResource, test_slot(&server).await);
        let state = DatabaseServerState {
            id: to_str("dbs-tests"),
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
        assert!(format!("{:?}", diags.errors).contains("last state: 'deleting'"));
    }
}
