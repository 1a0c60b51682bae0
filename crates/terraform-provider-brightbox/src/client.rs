//! Authenticated clients shared by every resource

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use brightbox_api::model::Account;
use brightbox_api::{Client, Credentials, OrbitClient, TokenSource};
use std::sync::{Arc, RwLock};

const USER_AGENT: &str = concat!("terraform-provider-brightbox/", env!("CARGO_PKG_VERSION"));

/// API and Orbit clients bound to the configured account
#[derive(Debug, Clone)]
pub struct CompositeClient {
    pub api: Client,
    pub orbit: OrbitClient,
    pub account: String,
}

/// Holds the clients once the provider has been configured
#[derive(Debug, Clone, Default)]
pub struct ClientSlot(Arc<RwLock<Option<Arc<CompositeClient>>>>);

impl ClientSlot {
    pub fn set(&self, client: CompositeClient) {
        let mut slot = self.0.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(client));
    }

    pub fn get(&self) -> Result<Arc<CompositeClient>> {
        self.0
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }
}

/// Authenticate once and select the account.
///
/// Returns a warning message alongside the clients when the account is not
/// active.
pub async fn authenticate(config: &ProviderConfig) -> Result<(CompositeClient, Option<String>)> {
    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    let credentials = Credentials::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        config.username.clone(),
        config.password.clone(),
    );
    tracing::info!(
        "Authenticating {} with the {} grant",
        config.client_id,
        credentials.grant_type()
    );

    let tokens = Arc::new(TokenSource::new(http.clone(), &config.api_url, credentials)?);
    tokens.access_token().await?;

    let unbound = Client::new(http.clone(), config.api_url.clone(), None, tokens.clone());
    let account = match &config.account {
        Some(id) => unbound.get::<Account>(id).await?,
        None => {
            let account = unbound
                .list::<Account>()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ProviderError::invalid_config("account", "these credentials have no accounts")
                })?;
            tracing::info!("No account configured, using {}", account.id);
            account
        }
    };

    let warning = (!account.is_active()).then(|| {
        format!(
            "Account {} is {}, operations on it may fail",
            account.id,
            if account.status.is_empty() {
                "not active"
            } else {
                account.status.as_str()
            }
        )
    });

    let api = unbound.with_account(account.id.clone());
    let orbit = OrbitClient::new(http, &config.orbit_url, &account.id, tokens)?;

    Ok((
        CompositeClient {
            api,
            orbit,
            account: account.id,
        },
        warning,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ProviderBlock;
    use crate::values::to_str;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) async fn mock_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test-token",
                "token_type": "Bearer",
                "expires_in": 7200
            })))
            .mount(server)
            .await;
    }

    pub(crate) fn test_config(server: &MockServer) -> ProviderConfig {
        let block = ProviderBlock {
            apiclient: to_str("cli-tests"),
            apisecret: to_str("secret"),
            account: to_str("acc-tests"),
            apiurl: to_str(server.uri()),
            orbit_url: to_str(format!("{}/v1/", server.uri())),
            ..Default::default()
        };
        ProviderConfig::resolve_with(&block, |_| None).unwrap()
    }

    /// A configured slot pointing at the mock server
    pub(crate) async fn test_slot(server: &MockServer) -> ClientSlot {
        mock_token(server).await;
        Mock::given(method("GET"))
            .and(path("/1.0/accounts/acc-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "acc-tests", "name": "Tests", "status": "active"
            })))
            .mount(server)
            .await;

        let (client, warning) = authenticate(&test_config(server)).await.unwrap();
        assert!(warning.is_none());
        let slot = ClientSlot::default();
        slot.set(client);
        slot
    }

    #[test]
    fn test_unconfigured_slot() {
        assert!(matches!(
            ClientSlot::default().get(),
            Err(ProviderError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_binds_account() {
        let server = MockServer::start().await;
        let slot = test_slot(&server).await;
        let client = slot.get().unwrap();
        assert_eq!(client.account, "acc-tests");
        assert_eq!(client.api.account(), Some("acc-tests"));
        assert!(client.orbit.account_url().as_str().ends_with("/v1/acc-tests/"));
    }

    #[tokio::test]
    async fn test_inactive_account_warns() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/1.0/accounts/acc-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "acc-tests", "status": "suspended"
            })))
            .mount(&server)
            .await;

        let (_, warning) = authenticate(&test_config(&server)).await.unwrap();
        assert!(warning.unwrap().contains("suspended"));
    }

    #[tokio::test]
    async fn test_bad_credentials_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let err = authenticate(&test_config(&server)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }
}
