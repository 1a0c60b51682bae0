//! `brightbox_zone`

use super::{LookupSpec, TieBreak, select_one};
use crate::client::CompositeClient;
use crate::error::Result;
use crate::schema::{computed, required, resource_schema};
use crate::validate::{Checker, zone};
use crate::values::{Str, str_opt, to_str};
use async_trait::async_trait;
use brightbox_api::model::Zone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tf_provider::{AttributeType, Schema, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneState {
    pub id: Str,
    pub handle: Str,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZoneLookup;

#[async_trait]
impl LookupSpec for ZoneLookup {
    type State = ZoneState;

    const TYPE_NAME: &'static str = "zone";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Zone",
            map! {
                "id" => computed(AttributeType::String, "Identifier of the zone"),
                "handle" => required(AttributeType::String, "Zone handle such as gb1-a"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("handle", &config.handle, zone);
    }

    async fn read(&self, clients: &CompositeClient, config: &Self::State) -> Result<ZoneState> {
        let handle = str_opt(&config.handle).unwrap_or_default();
        let candidates = clients
            .api
            .list::<Zone>()
            .await?
            .into_iter()
            .filter(|z| z.handle == handle)
            .collect();
        let found = select_one(candidates, TieBreak::Unsupported, |_: &Zone| None)?;
        Ok(ZoneState {
            id: to_str(&found.id),
            handle: to_str(&found.handle),
        })
    }
}
