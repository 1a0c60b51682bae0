//! `brightbox_database_snapshot`

use super::{LookupSpec, TieBreak, matches, pattern, select_one};
use crate::client::CompositeClient;
use crate::error::Result;
use crate::schema::{computed, optional, optional_computed, resource_schema};
use crate::validate::{Checker, regex};
use crate::values::{Str, ValueBool, non_empty, str_opt, to_rfc3339, to_str};
use async_trait::async_trait;
use brightbox_api::model::DatabaseSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tf_provider::{AttributeType, Schema, Value, ValueNumber, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshotState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub database_engine: Str,
    pub database_version: Str,
    pub most_recent: ValueBool,
    pub status: Str,
    pub size: ValueNumber,
    pub locked: ValueBool,
    pub created_at: Str,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseSnapshotLookup;

#[async_trait]
impl LookupSpec for DatabaseSnapshotLookup {
    type State = DatabaseSnapshotState;

    const TYPE_NAME: &'static str = "database snapshot";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Database Snapshot",
            map! {
                "id" => computed(AttributeType::String, "Identifier of the snapshot"),
                "name" => optional_computed(AttributeType::String, "Regular expression matched against snapshot names"),
                "description" => optional_computed(AttributeType::String, "Regular expression matched against descriptions"),
                "database_engine" => optional_computed(AttributeType::String, "Engine of the snapshotted server"),
                "database_version" => optional_computed(AttributeType::String, "Engine version of the snapshotted server"),
                "most_recent" => optional(AttributeType::Bool, "Pick the newest of several matches"),
                "status" => computed(AttributeType::String, "Status of the snapshot"),
                "size" => computed(AttributeType::Number, "Size in MiB"),
                "locked" => computed(AttributeType::Bool, "True when the snapshot is locked"),
                "created_at" => computed(AttributeType::String, "Time the snapshot was taken"),
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
    ) -> Result<DatabaseSnapshotState> {
        let name = pattern("name", &config.name)?;
        let description = pattern("description", &config.description)?;
        let engine = str_opt(&config.database_engine);
        let version = str_opt(&config.database_version);
        let candidates = clients
            .api
            .list::<DatabaseSnapshot>()
            .await?
            .into_iter()
            .filter(|s| s.status == "available")
            .filter(|s| matches(&name, &s.name) && matches(&description, &s.description))
            .filter(|s| engine.is_none_or(|e| e == s.database_engine))
            .filter(|s| version.is_none_or(|v| v == s.database_version))
            .collect();
        let snapshot = select_one(
            candidates,
            TieBreak::most_recent(&config.most_recent),
            |s: &DatabaseSnapshot| s.created_at,
        )?;

        Ok(DatabaseSnapshotState {
            id: to_str(&snapshot.id),
            name: to_str(&snapshot.name),
            description: non_empty(Some(snapshot.description.as_str())),
            database_engine: to_str(&snapshot.database_engine),
            database_version: to_str(&snapshot.database_version),
            most_recent: config.most_recent.clone(),
            status: to_str(&snapshot.status),
            size: Value::Value(snapshot.size),
            locked: Value::Value(snapshot.locked),
            created_at: to_rfc3339(snapshot.created_at),
        })
    }
}
