//! `brightbox_lb`

use crate::client::CompositeClient;
use crate::crud::{ManagedResource, ResourceState, state_id};
use crate::error::Result;
use crate::schema::{
    computed, id_attribute, optional, optional_computed, required, resource_schema, sensitive,
    string_set, timeouts_block,
};
use crate::timeouts::TimeoutsValue;
use crate::validate::{Checker, id_with_prefix, in_range, one_of};
use crate::values::{
    Str, StrSet, ValueBool, blocks, bool_opt, changed, changed_str, non_empty, num_opt, string,
    strings, to_set, to_set_or_null, to_str, unknown_if_null,
};
use crate::waiter::WaitConfig;
use async_trait::async_trait;
use brightbox_api::model::{
    LbHealthcheck, LbListener, LoadBalancer, LoadBalancerNodes, LoadBalancerOptions, ids,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tf_provider::schema::NestedBlock;
use tf_provider::{
    AttributeType, Block, Description, Schema, Value, ValueList, ValueNumber, map,
};

const POLICIES: &[&str] = &["least-connections", "round-robin", "source-address"];
const LISTENER_PROTOCOLS: &[&str] = &["http", "https", "http+ws", "https+wss", "tcp"];
const HEALTHCHECK_TYPES: &[&str] = &["http", "tcp"];
const PROXY_PROTOCOLS: &[&str] = &["v1", "v2", "v2-ssl", "v2-ssl-cn"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListenerBlock {
    #[serde(rename = "in")]
    pub incoming: ValueNumber,
    #[serde(rename = "out")]
    pub outgoing: ValueNumber,
    pub protocol: Str,
    pub timeout: ValueNumber,
    pub proxy_protocol: Str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthcheckBlock {
    #[serde(rename = "type")]
    pub kind: Str,
    pub port: ValueNumber,
    pub request: Str,
    pub interval: ValueNumber,
    pub timeout: ValueNumber,
    pub threshold_up: ValueNumber,
    pub threshold_down: ValueNumber,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerState {
    pub id: Str,
    pub name: Str,
    pub policy: Str,
    pub buffer_size: ValueNumber,
    pub https_redirect: ValueBool,
    pub nodes: StrSet,
    pub certificate_pem: Str,
    pub certificate_private_key: Str,
    pub domains: StrSet,
    pub locked: ValueBool,
    pub status: Str,
    pub listener: ValueList<Value<ListenerBlock>>,
    pub healthcheck: ValueList<Value<HealthcheckBlock>>,
    pub timeouts: TimeoutsValue,
}

impl ResourceState for LoadBalancerState {
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

fn listeners(state: &LoadBalancerState) -> Vec<LbListener> {
    let mut out: Vec<LbListener> = blocks(&state.listener)
        .filter_map(|l| {
            Some(LbListener {
                incoming: num_opt(&l.incoming)?,
                outgoing: num_opt(&l.outgoing)?,
                protocol: string(&l.protocol)?,
                timeout: num_opt(&l.timeout),
                proxy_protocol: string(&l.proxy_protocol),
            })
        })
        .collect();
    out.sort_by(|a, b| (a.incoming, a.outgoing).cmp(&(b.incoming, b.outgoing)));
    out
}

fn listener_blocks(listeners: &[LbListener]) -> ValueList<Value<ListenerBlock>> {
    Value::Value(
        listeners
            .iter()
            .map(|l| {
                Value::Value(ListenerBlock {
                    incoming: Value::Value(l.incoming),
                    outgoing: Value::Value(l.outgoing),
                    protocol: to_str(&l.protocol),
                    timeout: l.timeout.map_or(Value::Null, Value::Value),
                    proxy_protocol: non_empty(l.proxy_protocol.as_deref()),
                })
            })
            .collect(),
    )
}

fn healthcheck(state: &LoadBalancerState) -> Option<LbHealthcheck> {
    let block = blocks(&state.healthcheck).next()?;
    Some(LbHealthcheck {
        kind: string(&block.kind)?,
        port: num_opt(&block.port)?,
        request: string(&block.request),
        interval: num_opt(&block.interval),
        timeout: num_opt(&block.timeout),
        threshold_up: num_opt(&block.threshold_up),
        threshold_down: num_opt(&block.threshold_down),
    })
}

fn healthcheck_blocks(check: Option<&LbHealthcheck>) -> ValueList<Value<HealthcheckBlock>> {
    let Some(check) = check else {
        return Value::Null;
    };
    let number = |n: Option<i64>| n.map_or(Value::Null, Value::Value);
    Value::Value(vec![Value::Value(HealthcheckBlock {
        kind: to_str(&check.kind),
        port: Value::Value(check.port),
        request: non_empty(check.request.as_deref()),
        interval: number(check.interval),
        timeout: number(check.timeout),
        threshold_up: number(check.threshold_up),
        threshold_down: number(check.threshold_down),
    })])
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoadBalancerResource;

#[async_trait]
impl ManagedResource for LoadBalancerResource {
    type State = LoadBalancerState;
    type Object = LoadBalancer;

    const TYPE_NAME: &'static str = "load balancer";

    fn schema(&self) -> Schema {
        let listener = NestedBlock::Set(Block {
            description: Description::plain("Port the load balancer listens on"),
            attributes: map! {
                "in" => required(AttributeType::Number, "Port to listen on"),
                "out" => required(AttributeType::Number, "Port on the nodes to forward to"),
                "protocol" => required(AttributeType::String, "http, https, http+ws, https+wss or tcp"),
                "timeout" => optional_computed(AttributeType::Number, "Idle timeout in milliseconds"),
                "proxy_protocol" => optional(AttributeType::String, "PROXY protocol version sent to the nodes"),
            },
            ..Default::default()
        });
        let healthcheck = NestedBlock::List(Block {
            description: Description::plain("How node health is checked"),
            attributes: map! {
                "type" => required(AttributeType::String, "http or tcp"),
                "port" => required(AttributeType::Number, "Port on the nodes to check"),
                "request" => optional_computed(AttributeType::String, "HTTP path to request"),
                "interval" => optional_computed(AttributeType::Number, "Milliseconds between checks"),
                "timeout" => optional_computed(AttributeType::Number, "Milliseconds before a check fails"),
                "threshold_up" => optional_computed(AttributeType::Number, "Passes before a node is healthy"),
                "threshold_down" => optional_computed(AttributeType::Number, "Failures before a node is unhealthy"),
            },
            ..Default::default()
        });

        resource_schema(
            "Brightbox Load Balancer",
            map! {
                "id" => id_attribute(),
                "name" => optional(AttributeType::String, "Friendly name of the load balancer"),
                "policy" => optional_computed(AttributeType::String, "Balancing policy"),
                "buffer_size" => optional_computed(AttributeType::Number, "Buffer size in bytes"),
                "https_redirect" => optional_computed(AttributeType::Bool, "Redirect http listeners to https"),
                "nodes" => optional(string_set(), "Servers traffic is balanced across"),
                "certificate_pem" => optional(AttributeType::String, "PEM encoded certificate for https listeners"),
                "certificate_private_key" => sensitive(optional(AttributeType::String, "PEM encoded private key of the certificate")),
                "domains" => optional(string_set(), "Domains to obtain ACME certificates for"),
                "locked" => optional_computed(AttributeType::Bool, "Protect the load balancer from deletion"),
                "status" => computed(AttributeType::String, "Current state of the load balancer"),
            },
            map! {
                "listener" => listener,
                "healthcheck" => healthcheck,
                "timeouts" => timeouts_block(),
            },
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("policy", &config.policy, |v| one_of(v, POLICIES));
        checker.number("buffer_size", &config.buffer_size, |v| in_range(v, 1024, 16384));
        checker.each("nodes", &config.nodes, |v| id_with_prefix(v, &["srv"]));

        if blocks(&config.listener).next().is_none() && !matches!(config.listener, Value::Unknown) {
            checker.fail("listener", "at least one listener is required");
        }
        for listener in blocks(&config.listener) {
            checker.number("listener", &listener.incoming, |p| in_range(p, 1, 65535));
            checker.number("listener", &listener.outgoing, |p| in_range(p, 1, 65535));
            checker.string("listener", &listener.protocol, |p| {
                one_of(p, LISTENER_PROTOCOLS)
            });
            checker.string("listener", &listener.proxy_protocol, |p| {
                one_of(p, PROXY_PROTOCOLS)
            });
        }
        for check in blocks(&config.healthcheck) {
            checker.string("healthcheck", &check.kind, |t| one_of(t, HEALTHCHECK_TYPES));
            checker.number("healthcheck", &check.port, |p| in_range(p, 1, 65535));
        }

        let set = |v: &Str| !matches!(v, Value::Null);
        if set(&config.certificate_pem) != set(&config.certificate_private_key) {
            checker.fail(
                "certificate_private_key",
                "certificate_pem and certificate_private_key must be set together",
            );
        }
    }

    fn plan(&self, planned: &mut Self::State, prior: Option<&Self::State>) {
        if prior.is_none() {
            unknown_if_null(&mut planned.policy);
            unknown_if_null(&mut planned.buffer_size);
            unknown_if_null(&mut planned.https_redirect);
            unknown_if_null(&mut planned.locked);
            planned.status = Value::Unknown;
        }
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<LoadBalancer> {
        let nodes = strings(&planned.nodes);
        let options = LoadBalancerOptions {
            name: string(&planned.name),
            policy: string(&planned.policy),
            buffer_size: num_opt(&planned.buffer_size),
            https_redirect: bool_opt(&planned.https_redirect),
            listeners: Some(listeners(planned)),
            healthcheck: healthcheck(planned),
            nodes: (!nodes.is_empty()).then(|| LoadBalancerNodes::new(nodes).nodes),
            certificate_pem: string(&planned.certificate_pem),
            certificate_private_key: string(&planned.certificate_private_key),
            domains: matches!(planned.domains, Value::Value(_)).then(|| strings(&planned.domains)),
        };
        Ok(clients.api.create::<LoadBalancer, _>(&options).await?)
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<LoadBalancer> {
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
        let options = LoadBalancerOptions {
            name: changed_str(&prior.name, &planned.name),
            policy: changed_str(&prior.policy, &planned.policy).filter(|p| !p.is_empty()),
            buffer_size: changed(&prior.buffer_size, &planned.buffer_size)
                .then(|| num_opt(&planned.buffer_size))
                .flatten(),
            https_redirect: changed(&prior.https_redirect, &planned.https_redirect)
                .then(|| bool_opt(&planned.https_redirect))
                .flatten(),
            listeners: (listeners(prior) != listeners(planned)).then(|| listeners(planned)),
            healthcheck: changed(&prior.healthcheck, &planned.healthcheck)
                .then(|| healthcheck(planned))
                .flatten(),
            nodes: None,
            certificate_pem: changed_str(&prior.certificate_pem, &planned.certificate_pem),
            certificate_private_key: changed_str(
                &prior.certificate_private_key,
                &planned.certificate_private_key,
            ),
            domains: changed(&prior.domains, &planned.domains).then(|| strings(&planned.domains)),
        };
        if !options.is_empty() {
            clients.api.update::<LoadBalancer, _>(id, &options).await?;
        }

        let before: BTreeSet<String> = strings(&prior.nodes).into_iter().collect();
        let after: BTreeSet<String> = strings(&planned.nodes).into_iter().collect();
        let added: Vec<&String> = after.difference(&before).collect();
        let removed: Vec<&String> = before.difference(&after).collect();
        if !added.is_empty() {
            tracing::info!("Adding {} node(s) to load balancer {}", added.len(), id);
            clients
                .api
                .action::<LoadBalancer, _>(id, "add_nodes", &LoadBalancerNodes::new(added))
                .await?;
        }
        if !removed.is_empty() {
            tracing::info!("Removing {} node(s) from load balancer {}", removed.len(), id);
            clients
                .api
                .action::<LoadBalancer, _>(id, "remove_nodes", &LoadBalancerNodes::new(removed))
                .await?;
        }
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(clients.api.destroy::<LoadBalancer>(state_id(state)?).await?)
    }

    async fn set_lock(&self, clients: &CompositeClient, state: &Self::State, locked: bool) -> Result<()> {
        clients
            .api
            .set_lock::<LoadBalancer>(state_id(state)?, locked)
            .await?;
        Ok(())
    }

    fn object_id(object: &LoadBalancer) -> String {
        object.id.clone()
    }

    fn status(object: &LoadBalancer) -> &str {
        &object.status
    }

    fn set_attributes(&self, lb: &LoadBalancer, state: &mut Self::State) {
        state.name = non_empty(Some(lb.name.as_str()));
        state.policy = to_str(&lb.policy);
        state.buffer_size = Value::Value(lb.buffer_size);
        state.https_redirect = Value::Value(lb.https_redirect);
        state.locked = Value::Value(lb.locked);
        state.status = to_str(&lb.status);
        state.nodes = to_set_or_null(ids(&lb.nodes));
        state.listener = listener_blocks(&lb.listeners);
        state.healthcheck = healthcheck_blocks(lb.healthcheck.as_ref());
        state.certificate_pem = non_empty(lb.certificate_pem.as_deref());
        if matches!(state.certificate_private_key, Value::Unknown) {
            state.certificate_private_key = Value::Null;
        }
        let domains = lb
            .acme
            .as_ref()
            .map(|acme| acme.domains.iter().map(|d| d.identifier.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        state.domains = if domains.is_empty() && !matches!(state.domains, Value::Value(_)) {
            Value::Null
        } else {
            to_set(domains)
        };
    }

    fn create_wait(&self) -> Option<WaitConfig> {
        Some(WaitConfig::new(&["creating"], &["active"]).with_min_interval(Duration::from_secs(3)))
    }

    fn delete_wait(&self) -> Option<WaitConfig> {
        Some(
            WaitConfig::deleted(&["active", "deleting"])
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
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listener(incoming: i64, outgoing: i64, protocol: &str) -> Value<ListenerBlock> {
        Value::Value(ListenerBlock {
            incoming: Value::Value(incoming),
            outgoing: Value::Value(outgoing),
            protocol: to_str(protocol),
            ..Default::default()
        })
    }

    fn lb_json(nodes: &[&str]) -> serde_json::Value {
        lb_with_status("active", nodes)
    }

    fn lb_deleting(status: &str) -> serde_json::Value {
        lb_with_status(status, &[])
    }

    fn lb_with_status(status: &str, nodes: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "id": "lba-tests",
            "name": "web",
            "status": status,
            "policy": "least-connections",
            "buffer_size": 4096,
            "listeners": [{"in": 80, "out": 8080, "protocol": "http", "timeout": 50000}],
            "healthcheck": {"type": "http", "port": 8080, "request": "/"},
            "nodes": nodes.iter().map(|id| serde_json::json!({"id": id})).collect::<Vec<_>>()
        })
    }

    #[test]
    fn test_listeners_are_required() {
        let config = LoadBalancerState::default();
        let mut diags = Diagnostics::default();
        LoadBalancerResource.validate(&mut Checker::new(&mut diags), &config);
        assert_eq!(diags.errors.len(), 1);

        let config = LoadBalancerState {
            listener: Value::Value(vec![listener(443, 8080, "gopher")]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        LoadBalancerResource.validate(&mut Checker::new(&mut diags), &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn test_attributes_from_api() {
        let lb: LoadBalancer = serde_json::from_value(lb_json(&["srv-bbbbb", "srv-aaaaa"])).unwrap();
        let mut state = LoadBalancerState::default();
        LoadBalancerResource.set_attributes(&lb, &mut state);
        assert_eq!(strings(&state.nodes), vec!["srv-aaaaa", "srv-bbbbb"]);
        assert_eq!(listeners(&state)[0].timeout, Some(50000));
        assert_eq!(healthcheck(&state).map(|h| h.port), Some(8080));
        assert_eq!(state.domains, Value::Null);
    }

    #[tokio::test]
    async fn test_node_changes_use_actions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.0/load_balancers/lba-tests/add_nodes"))
            .and(body_json(serde_json::json!({"nodes": [{"node": "srv-ccccc"}]})))
            .respond_with(ResponseTemplate::new(202).set_body_json(lb_json(&[])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/1.0/load_balancers/lba-tests/remove_nodes"))
            .and(body_json(serde_json::json!({"nodes": [{"node": "srv-aaaaa"}]})))
            .respond_with(ResponseTemplate::new(202).set_body_json(lb_json(&[])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lb_json(&[])))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(lb_json(&["srv-bbbbb", "srv-ccccc"])),
            )
            .mount(&server)
            .await;

        let crud = Crud::new(LoadBalancerResource, test_slot(&server).await);
        let prior = LoadBalancerState {
            id: to_str("lba-tests"),
            name: to_str("web"),
            nodes: to_set(["srv-aaaaa", "srv-bbbbb"]),
            listener: Value::Value(vec![listener(80, 8080, "http")]),
            locked: Value::Value(false),
            ..Default::default()
        };
        let planned = LoadBalancerState {
            nodes: to_set(["srv-bbbbb", "srv-ccccc"]),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = crud
            .update(
                &mut diags,
                Value::Value(prior),
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
        assert_eq!(strings(&state.nodes), vec!["srv-bbbbb", "srv-ccccc"]);
    }

    #[tokio::test]
    async fn test_delete_waits_for_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lb_deleting("deleting")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lb_deleting("deleted")))
            .mount(&server)
            .await;

        let crud = Crud::new(LoadBalancerResource, test_slot(&server).await);
        let state = LoadBalancerState {
            id: to_str("lba-tests"),
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
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.0/load_balancers/lba-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lb_deleting("deleting")))
            .mount(&server)
            .await;

        let crud = Crud::new(LoadBalancerResource, test_slot(&server).await);
        let state = LoadBalancerState {
            id: to_str("lba-tests"),
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
