//! `brightbox_firewall_rule`

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{id_attribute, optional, required, resource_schema};
use crate::validate::{Checker, id_with_prefix, port_range, protocol};
use crate::values::{Str, changed_str, non_empty, string, str_opt};
use async_trait::async_trait;
use brightbox_api::model::{FirewallRule, FirewallRuleOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tf_provider::{AttributePath, AttributeType, Schema, map};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRuleState {
    pub id: Str,
    pub firewall_policy: Str,
    pub protocol: Str,
    pub source: Str,
    pub source_port: Str,
    pub destination: Str,
    pub destination_port: Str,
    pub icmp_type_name: Str,
    pub description: Str,
}

impl ResourceState for FirewallRuleState {
    fn id(&self) -> &Str {
        &self.id
    }

    fn id_mut(&mut self) -> &mut Str {
        &mut self.id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirewallRuleResource;

/// `any`, an address or CIDR, or a server, group or load balancer id
fn endpoint(value: &str) -> crate::validate::Check {
    if value == "any" || value.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }
    if let Some((addr, bits)) = value.split_once('/') {
        if addr.parse::<std::net::IpAddr>().is_ok() && bits.parse::<u8>().is_ok_and(|b| b <= 128) {
            return Ok(());
        }
    }
    id_with_prefix(value, &["srv", "grp", "lba", "dbs"])
}

#[async_trait]
impl ManagedResource for FirewallRuleResource {
    type State = FirewallRuleState;
    type Object = FirewallRule;

    const TYPE_NAME: &'static str = "firewall rule";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Firewall Rule",
            map! {
                "id" => id_attribute(),
                "firewall_policy" => required(AttributeType::String, "The firewall policy this rule belongs to"),
                "protocol" => optional(AttributeType::String, "tcp, udp, icmp, esp, ah, gre or a protocol number"),
                "source" => optional(AttributeType::String, "Source address, CIDR, object id or 'any'"),
                "source_port" => optional(AttributeType::String, "Source port or port range"),
                "destination" => optional(AttributeType::String, "Destination address, CIDR, object id or 'any'"),
                "destination_port" => optional(AttributeType::String, "Destination port or port range"),
                "icmp_type_name" => optional(AttributeType::String, "ICMP type name, only with the icmp protocol"),
                "description" => optional(AttributeType::String, "Description of the rule"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("firewall_policy", &config.firewall_policy, |v| {
            id_with_prefix(v, &["fwp"])
        });
        checker.string("protocol", &config.protocol, protocol);
        checker.string("source", &config.source, endpoint);
        checker.string("destination", &config.destination, endpoint);
        checker.string("source_port", &config.source_port, port_range);
        checker.string("destination_port", &config.destination_port, port_range);

        let unset = |v: &Str| matches!(v, tf_provider::Value::Null);
        if unset(&config.source) && unset(&config.destination) {
            checker.fail("source", "one of source or destination must be set");
        }
        if !unset(&config.icmp_type_name)
            && str_opt(&config.protocol).is_some_and(|p| p != "icmp")
        {
            checker.fail("icmp_type_name", "only valid with the icmp protocol");
        }
    }

    fn requires_replace(&self, prior: &Self::State, planned: &Self::State) -> Vec<AttributePath> {
        if prior.firewall_policy != planned.firewall_policy {
            vec![AttributePath::new("firewall_policy")]
        } else {
            Vec::new()
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<FirewallRule> {
        let options = FirewallRuleOptions {
            firewall_policy: string(&planned.firewall_policy),
            protocol: string(&planned.protocol),
            source: string(&planned.source),
            source_port: string(&planned.source_port),
            destination: string(&planned.destination),
            destination_port: string(&planned.destination_port),
            icmp_type_name: string(&planned.icmp_type_name),
            description: string(&planned.description),
        };
        Ok(clients.api.create::<FirewallRule, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<FirewallRule> {
        Ok(clients.api.get(state_id(state)?).await?)
    }

    async fn update(
        &self,
        clients: &CompositeClient,
        prior: &Self::State,
        planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        let options = FirewallRuleOptions {
            firewall_policy: None,
            protocol: changed_str(&prior.protocol, &planned.protocol),
            source: changed_str(&prior.source, &planned.source),
            source_port: changed_str(&prior.source_port, &planned.source_port),
            destination: changed_str(&prior.destination, &planned.destination),
            destination_port: changed_str(&prior.destination_port, &planned.destination_port),
            icmp_type_name: changed_str(&prior.icmp_type_name, &planned.icmp_type_name),
            description: changed_str(&prior.description, &planned.description),
        };
        if options.is_empty() {
            return Ok(());
        }
        clients
            .api
            .update::<FirewallRule, _>(state_id(prior)?, &options)
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<FirewallRule>(state_id(state)?).await?)
    }

    fn object_id(object: &FirewallRule) -> String {
        object.id.clone()
    }

    fn set_attributes(&self, rule: &FirewallRule, state: &mut Self::State) {
        if let Some(policy) = &rule.firewall_policy {
            state.firewall_policy = non_empty(Some(policy.id.as_str()));
        }
        state.protocol = non_empty(rule.protocol.as_deref());
        state.source = non_empty(rule.source.as_deref());
        state.source_port = non_empty(rule.source_port.as_deref());
        state.destination = non_empty(rule.destination.as_deref());
        state.destination_port = non_empty(rule.destination_port.as_deref());
        state.icmp_type_name = non_empty(rule.icmp_type_name.as_deref());
        state.description = non_empty(rule.description.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::to_str;
    use tf_provider::Diagnostics;

    fn check(state: &FirewallRuleState) -> usize {
        let mut diags = Diagnostics::default();
        let mut checker = Checker::new(&mut diags);
        FirewallRuleResource.validate(&mut checker, state);
        diags.errors.len()
    }

    #[test]
    fn test_requires_source_or_destination() {
        let rule = FirewallRuleState {
            firewall_policy: to_str("fwp-abcde"),
            protocol: to_str("tcp"),
            ..Default::default()
        };
        assert_eq!(check(&rule), 1);

        let rule = FirewallRuleState {
            destination: to_str("any"),
            destination_port: to_str("443"),
            ..rule
        };
        assert_eq!(check(&rule), 0);
    }

    #[test]
    fn test_endpoints() {
        assert!(endpoint("any").is_ok());
        assert!(endpoint("10.0.0.0/8").is_ok());
        assert!(endpoint("2a02:1348::/32").is_ok());
        assert!(endpoint("grp-abcde").is_ok());
        assert!(endpoint("example.com").is_err());
    }

    #[test]
    fn test_icmp_type_needs_icmp() {
        let rule = FirewallRuleState {
            firewall_policy: to_str("fwp-abcde"),
            protocol: to_str("tcp"),
            source: to_str("any"),
            icmp_type_name: to_str("echo-request"),
            ..Default::default()
        };
        assert_eq!(check(&rule), 1);
    }
}
