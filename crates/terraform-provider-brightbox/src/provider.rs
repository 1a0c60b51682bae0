//! The `brightbox` provider: configuration and the resource catalogue

use crate::client::{ClientSlot, authenticate};
use crate::config::{ProviderBlock, ProviderConfig};
use crate::crud::Crud;
use crate::data_sources::{
    DatabaseSnapshotLookup, DatabaseTypeLookup, ImageLookup, Lookup, ServerGroupLookup,
    ServerTypeLookup, ZoneLookup,
};
use crate::diag;
use crate::resources::{
    ApiClientResource, CloudIpResource, ConfigMapResource, DatabaseServerResource,
    FirewallPolicyResource, FirewallRuleResource, LoadBalancerResource, MembershipResource,
    OrbitContainerResource, ServerGroupResource, ServerResource, VolumeResource,
};
use crate::schema::{optional, sensitive};
use async_trait::async_trait;
use std::collections::HashMap;
use tf_provider::{
    AttributeType, Block, Description, Diagnostics, Provider, Schema, Value, ValueEmpty, map,
};

/// Brightbox Cloud provider
#[derive(Debug, Clone, Default)]
pub struct BrightboxProvider {
    clients: ClientSlot,
}

impl BrightboxProvider {
    /// Resolve and check the configuration, reporting every problem found
    fn resolve(diags: &mut Diagnostics, block: &ProviderBlock) -> Option<ProviderConfig> {
        let config = match ProviderConfig::resolve(block) {
            Ok(config) => config,
            Err(e) => {
                diag::report(diags, "Invalid provider configuration", &e);
                return None;
            }
        };
        let problems = config.problems();
        for problem in &problems {
            diag::report(diags, "Invalid provider configuration", problem);
        }
        problems.is_empty().then_some(config)
    }
}

fn has_unknown(block: &ProviderBlock) -> bool {
    [
        &block.username,
        &block.password,
        &block.account,
        &block.apiclient,
        &block.apisecret,
        &block.apiurl,
        &block.orbit_url,
    ]
    .iter()
    .any(|v| matches!(v, Value::Unknown))
}

#[async_trait]
impl Provider for BrightboxProvider {
    type Config<'a> = Value<ProviderBlock>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Brightbox Cloud"),
                attributes: map! {
                    "username" => optional(AttributeType::String, "User name, or BRIGHTBOX_USER_NAME"),
                    "password" => sensitive(optional(AttributeType::String, "Password, or BRIGHTBOX_PASSWORD")),
                    "account" => optional(AttributeType::String, "Account to operate on, or BRIGHTBOX_ACCOUNT"),
                    "apiclient" => optional(AttributeType::String, "API client or application id, or BRIGHTBOX_CLIENT"),
                    "apisecret" => sensitive(optional(AttributeType::String, "API client secret, or BRIGHTBOX_CLIENT_SECRET")),
                    "apiurl" => optional(AttributeType::String, "API endpoint, or BRIGHTBOX_API_URL"),
                    "orbit_url" => optional(AttributeType::String, "Orbit endpoint, or BRIGHTBOX_ORBIT_URL"),
                },
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        let block = match config {
            Value::Value(block) => block,
            _ => ProviderBlock::default(),
        };
        if has_unknown(&block) {
            tracing::debug!("Provider configuration not fully known yet, skipping checks");
            return Some(());
        }
        Self::resolve(diags, &block).map(|_| ())
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        tracing::info!(
            "Configuring {} v{} for Terraform {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            terraform_version
        );
        let block = match config {
            Value::Value(block) => block,
            _ => ProviderBlock::default(),
        };
        let config = Self::resolve(diags, &block)?;
        tracing::debug!("Resolved {:?}", config);

        match authenticate(&config).await {
            Ok((clients, warning)) => {
                if let Some(warning) = warning {
                    diags.root_warning("Account is not active".to_string(), warning);
                }
                self.clients.set(clients);
                Some(())
            }
            Err(e) => {
                diag::report(diags, "Unable to authenticate with Brightbox", &e);
                None
            }
        }
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::resource::DynamicResource>>> {
        let clients = &self.clients;
        Some(map! {
            "server" => Crud::new(ServerResource, clients.clone()),
            "volume" => Crud::new(VolumeResource, clients.clone()),
            "cloudip" => Crud::new(CloudIpResource, clients.clone()),
            "server_group" => Crud::new(ServerGroupResource, clients.clone()),
            "server_group_membership" => Crud::new(MembershipResource, clients.clone()),
            "firewall_policy" => Crud::new(FirewallPolicyResource, clients.clone()),
            "firewall_rule" => Crud::new(FirewallRuleResource, clients.clone()),
            "lb" => Crud::new(LoadBalancerResource, clients.clone()),
            "database_server" => Crud::new(DatabaseServerResource, clients.clone()),
            "config_map" => Crud::new(ConfigMapResource, clients.clone()),
            "api_client" => Crud::new(ApiClientResource, clients.clone()),
            "orbit_container" => Crud::new(OrbitContainerResource, clients.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::data_source::DynamicDataSource>>> {
        let clients = &self.clients;
        Some(map! {
            "image" => Lookup::new(ImageLookup, clients.clone()),
            "server_type" => Lookup::new(ServerTypeLookup, clients.clone()),
            "zone" => Lookup::new(ZoneLookup, clients.clone()),
            "server_group" => Lookup::new(ServerGroupLookup, clients.clone()),
            "database_type" => Lookup::new(DatabaseTypeLookup, clients.clone()),
            "database_snapshot" => Lookup::new(DatabaseSnapshotLookup, clients.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_token;
    use crate::values::to_str;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_password_with_api_client_rejected_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let block = ProviderBlock {
            apiclient: to_str("cli-abcde"),
            apisecret: to_str("secret"),
            username: to_str("jason@example.com"),
            password: to_str("hunter2"),
            apiurl: to_str(server.uri()),
            ..Default::default()
        };
        let provider = BrightboxProvider::default();
        let mut diags = Diagnostics::default();
        assert!(provider.validate(&mut diags, Value::Value(block)).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_configuration_is_not_checked() {
        let block = ProviderBlock {
            apiclient: to_str("cli-abcde"),
            username: Value::Unknown,
            password: to_str("hunter2"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let validated = BrightboxProvider::default()
            .validate(&mut diags, Value::Value(block))
            .await;
        assert!(validated.is_some());
    }

    #[tokio::test]
    async fn test_configure_fills_client_slot() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/1.0/accounts/acc-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "acc-tests", "name": "Tests", "status": "active"
            })))
            .mount(&server)
            .await;

        let block = ProviderBlock {
            apiclient: to_str("cli-tests"),
            apisecret: to_str("secret"),
            account: to_str("acc-tests"),
            apiurl: to_str(server.uri()),
            orbit_url: to_str(format!("{}/v1/", server.uri())),
            ..Default::default()
        };
        let provider = BrightboxProvider::default();
        let mut diags = Diagnostics::default();
        let configured = provider
            .configure(&mut diags, "1.9.0".to_string(), Value::Value(block))
            .await;
        assert!(configured.is_some(), "{:?}", diags.errors);
        assert!(diags.warnings.is_empty());
        assert_eq!(provider.clients.get().unwrap().account, "acc-tests");
    }

    #[test]
    fn test_catalogue() {
        let provider = BrightboxProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).unwrap();
        assert_eq!(resources.len(), 12);
        assert!(resources.contains_key("cloudip"));
        let data_sources = provider.get_data_sources(&mut diags).unwrap();
        assert_eq!(data_sources.len(), 6);
    }
}
