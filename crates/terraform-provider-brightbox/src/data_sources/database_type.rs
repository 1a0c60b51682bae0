//! `brightbox_database_type`

use super::{LookupSpec, TieBreak, matches, pattern, select_one};
use crate::client::CompositeClient;
use crate::error::Result;
use crate::schema::{computed, optional_computed, resource_schema};
use crate::validate::{Checker, regex};
use crate::values::{Str, non_empty, to_str};
use async_trait::async_trait;
use brightbox_api::model::DatabaseType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tf_provider::{AttributeType, Schema, Value, ValueNumber, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseTypeState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub disk_size: ValueNumber,
    pub ram: ValueNumber,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseTypeLookup;

#[async_trait]
impl LookupSpec for DatabaseTypeLookup {
    type State = DatabaseTypeState;

    const TYPE_NAME: &'static str = "database type";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Database Type",
            map! {
                "id" => computed(AttributeType::String, "Identifier of the database type"),
                "name" => optional_computed(AttributeType::String, "Regular expression matched against type names"),
                "description" => computed(AttributeType::String, "Description of the database type"),
                "disk_size" => computed(AttributeType::Number, "Disk size in MiB"),
                "ram" => computed(AttributeType::Number, "RAM in MiB"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("name", &config.name, regex);
    }

    async fn read(&self, clients: &CompositeClient, config: &Self::State) -> Result<DatabaseTypeState> {
        let name = pattern("name", &config.name)?;
        let candidates = clients
            .api
            .list::<DatabaseType>()
            .await?
            .into_iter()
            .filter(|t| matches(&name, &t.name))
            .collect();
        let found = select_one(candidates, TieBreak::Unsupported, |_: &DatabaseType| None)?;
        Ok(DatabaseTypeState {
            id: to_str(&found.id),
            name: to_str(&found.name),
            description: non_empty(Some(found.description.as_str())),
            disk_size: Value::Value(found.disk_size),
            ram: Value::Value(found.ram),
        })
    }
}
