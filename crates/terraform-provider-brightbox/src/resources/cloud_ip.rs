//! `brightbox_cloudip`
//!
//! A cloud IP is created unmapped and then mapped to its `target`. Moving it
//! to another target unmaps it first; both steps wait for the status change.

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id, wait_for};
use crate::error::Result;
use crate::schema::{
    computed, id_attribute, optional, optional_computed, required, resource_schema, timeouts_block,
};
use crate::timeouts::TimeoutsValue;
use crate::validate::{Checker, id_with_prefix, in_range, one_of};
use crate::values::{Str, changed, changed_str, non_empty, num_opt, string, to_str, unknown_if_null};
use crate::waiter::WaitConfig;
use async_trait::async_trait;
use brightbox_api::model::{CloudIp, CloudIpMap, CloudIpOptions, PortTranslator};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tf_provider::schema::NestedBlock;
use tf_provider::{AttributeType, Block, Description, Schema, Value, ValueList, ValueNumber, map};

const TARGET_PREFIXES: &[&str] = &["int", "grp", "lba", "dbs"];
const TRANSLATOR_PROTOCOLS: &[&str] = &["http", "https", "tcp"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortTranslatorBlock {
    pub incoming: ValueNumber,
    pub outgoing: ValueNumber,
    pub protocol: Str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudIpState {
    pub id: Str,
    pub name: Str,
    pub target: Str,
    pub reverse_dns: Str,
    pub port_translator: ValueList<Value<PortTranslatorBlock>>,
    pub public_ip: Str,
    pub public_ipv4: Str,
    pub public_ipv6: Str,
    pub fqdn: Str,
    pub status: Str,
    pub timeouts: TimeoutsValue,
}

impl ResourceState for CloudIpState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }

    fn timeouts(&self) -> Option<&TimeoutsValue> {
        Some(&self.timeouts)
    }
}

fn translators(state: &CloudIpState) -> Vec<PortTranslator> {
    let Value::Value(blocks) = &state.port_translator else {
        return Vec::new();
    };
    let mut out: Vec<PortTranslator> = blocks
        .iter()
        .filter_map(|b| match b {
            Value::Value(b) => Some(PortTranslator {
                incoming: u16::try_from(num_opt(&b.incoming)?).ok()?,
                outgoing: u16::try_from(num_opt(&b.outgoing)?).ok()?,
                protocol: string(&b.protocol)?,
            }),
            _ => None,
        })
        .collect();
    out.sort_by(|a, b| (a.incoming, a.outgoing, &a.protocol).cmp(&(b.incoming, b.outgoing, &b.protocol)));
    out
}

fn translator_blocks(translators: &[PortTranslator]) -> ValueList<Value<PortTranslatorBlock>> {
    if translators.is_empty() {
        return Value::Null;
    }
    Value::Value(
        translators
            .iter()
            .map(|t| {
                Value::Value(PortTranslatorBlock {
                    incoming: Value::Value(t.incoming.into()),
                    outgoing: Value::Value(t.outgoing.into()),
                    protocol: to_str(&t.protocol),
                })
            })
            .collect(),
    )
}

fn mapped() -> WaitConfig {
    WaitConfig::new(&["unmapped"], &["mapped"])
}

fn unmapped() -> WaitConfig {
    WaitConfig::new(&["mapped"], &["unmapped"])
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CloudIpResource;

impl CloudIpResource {
    async fn map(
        &self,
        clients: &CompositeClient,
        state: &CloudIpState,
        destination: String,
        timeout: Duration,
    ) -> Result<()> {
        let id = state_id(state)?;
        tracing::info!("Mapping cloud IP {} to {}", id, destination);
        clients
            .api
            .action::<CloudIp, _>(id, "map", &CloudIpMap { destination })
            .await?;
        wait_for(self, clients, state, &mapped().with_timeout(timeout)).await?;
        Ok(())
    }

    async fn unmap(&self, clients: &CompositeClient, state: &CloudIpState, timeout: Duration) -> Result<()> {
        let id = state_id(state)?;
        tracing::info!("Unmapping cloud IP {}", id);
        clients
            .api
            .action::<CloudIp, _>(id, "unmap", &serde_json::json!({}))
            .await?;
        wait_for(self, clients, state, &unmapped().with_timeout(timeout)).await?;
        Ok(())
    }
}

#[async_trait]
impl ManagedResource for CloudIpResource {
    type State = CloudIpState;
    type Object = CloudIp;

    const TYPE_NAME: &'static str = "cloud IP";

    fn schema(&self) -> Schema {
        let port_translator = NestedBlock::Set(Block {
            description: Description::plain("Port translation rule"),
            attributes: map! {
                "incoming" => required(AttributeType::Number, "Port the cloud IP listens on"),
                "outgoing" => required(AttributeType::Number, "Port traffic is sent to"),
                "protocol" => required(AttributeType::String, "http, https or tcp"),
            },
            ..Default::default()
        });

        resource_schema(
            "Brightbox Cloud IP",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the cloud IP"),
                "target" => optional(AttributeType::String, "Interface, server group, load balancer or database server to map to"),
                "reverse_dns" => optional_computed(AttributeType::String, "Reverse DNS entry for the IPv4 address"),
                "public_ip" => computed(AttributeType::String, "Public IPv4 address"),
                "public_ipv4" => computed(AttributeType::String, "Public IPv4 address"),
                "public_ipv6" => computed(AttributeType::String, "Public IPv6 address"),
                "fqdn" => computed(AttributeType::String, "Fully qualified domain name"),
                "status" => computed(AttributeType::String, "mapped or unmapped"),
            },
            map! {
                "port_translator" => port_translator,
                "timeouts" => timeouts_block(),
            },
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("target", &config.target, |v| id_with_prefix(v, TARGET_PREFIXES));
        if let Value::Value(blocks) = &config.port_translator {
            for block in blocks.iter().filter_map(|b| match b {
                Value::Value(b) => Some(b),
                _ => None,
            }) {
                checker.number("port_translator", &block.incoming, |p| in_range(p, 1, 65535));
                checker.number("port_translator", &block.outgoing, |p| in_range(p, 1, 65535));
                checker.string("port_translator", &block.protocol, |p| {
                    one_of(p, TRANSLATOR_PROTOCOLS)
                });
            }
        }
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        if prior.is_none() {
            for value in [
                &mut planned.reverse_dns,
                &mut planned.public_ip,
                &mut planned.public_ipv4,
                &mut planned.public_ipv6,
                &mut planned.fqdn,
            ] {
                unknown_if_null(value);
            }
        }
        if prior.is_none_or(|p| p.target != planned.target) {
            planned.status = match &planned.target {
                Value::Null => to_str("unmapped"),
                Value::Value(_) => to_str("mapped"),
                Value::Unknown => Value::Unknown,
            };
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<CloudIp> {
        let port_translators = translators(planned);
        let options = CloudIpOptions {
            name: string(&planned.name),
            reverse_dns: string(&planned.reverse_dns),
            port_translators: (!port_translators.is_empty()).then_some(port_translators),
        };
        Ok(clients.api.create::<CloudIp, _>(&options).await?)
    }

    async fn after_create(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        planned: &Self::State,
        timeout: Duration,
    ) -> Result<()> {
        if let Some(target) = string(&planned.target) {
            self.map(clients, state, target, timeout).await?;
        }
        Ok(())
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<CloudIp> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        timeout: Duration,
    ) -> Result<()> {
        let options = CloudIpOptions {
            name: changed_str(&prior.name, &planned.name),
            reverse_dns: changed_str(&prior.reverse_dns, &planned.reverse_dns),
            port_translators: changed(&prior.port_translator, &planned.port_translator)
                .then(|| translators(planned)),
        };
        if !options.is_empty() {
            clients
                .api
                .update::<CloudIp, _>(state_id(prior)?, &options)
                .await?;
        }

        if changed(&prior.target, &planned.target) {
            if string(&prior.target).is_some() {
                self.unmap(clients, prior, timeout).await?;
            }
            if let Some(target) = string(&planned.target) {
                self.map(clients, prior, target, timeout).await?;
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
        if current.is_mapped() {
            self.unmap(clients, state, timeout).await?;
        }
        Ok(clients.api.destroy::<CloudIp>(state_id(state)?).await?)
    }

    fn object_id(object: &CloudIp) -> String {
        object.id.clone()
    }

    fn status(object: &CloudIp) -> &str {
        &object.status
    }

    fn set_attributes(&self, ip: &CloudIp, state: &mut Self::State) {
        state.name = non_empty(Some(ip.name.as_str()));
        state.target = non_empty(ip.target());
        state.reverse_dns = to_str(&ip.reverse_dns);
        state.port_translator = translator_blocks(&ip.port_translators);
        state.public_ip = non_empty(Some(ip.public_ip.as_str()));
        state.public_ipv4 = non_empty(Some(ip.public_ipv4.as_str()));
        state.public_ipv6 = non_empty(Some(ip.public_ipv6.as_str()));
        state.fqdn = non_empty(Some(ip.fqdn.as_str()));
        state.status = to_str(&ip.status);
    }
}
