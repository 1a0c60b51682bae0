//! OAuth2 token acquisition
//!
//! Brightbox issues bearer tokens from `{api_url}/token`. API clients
//! (`cli-...`) use the `client_credentials` grant; applications (`app-...`)
//! authenticate a user with the `password` grant.

use crate::error::{ApiError, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Tokens are refreshed this long before the server-side expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// OAuth2 grant selected from the configured credentials
#[derive(Clone)]
pub enum Grant {
    Password { username: String, password: String },
    ClientCredentials,
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grant::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Grant::ClientCredentials => write!(f, "ClientCredentials"),
        }
    }
}

/// Client credentials plus the grant used to exchange them
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub grant: Grant,
}

impl Credentials {
    /// Chooses the password grant when both username and password are present
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let grant = match (username, password) {
            (Some(username), Some(password)) => Grant::Password { username, password },
            _ => Grant::ClientCredentials,
        };
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant,
        }
    }

    pub fn grant_type(&self) -> &'static str {
        match self.grant {
            Grant::Password { .. } => "password",
            Grant::ClientCredentials => "client_credentials",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("grant", &self.grant)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct Token {
    access_token: String,
    expires_at: Option<Instant>,
}

impl Token {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() + EXPIRY_SKEW < at)
            .unwrap_or(true)
    }
}

/// Caching token source shared by the API and Orbit clients
#[derive(Debug)]
pub struct TokenSource {
    http: reqwest::Client,
    token_url: Url,
    credentials: Credentials,
    cache: Mutex<Option<Token>>,
}

impl TokenSource {
    pub fn new(http: reqwest::Client, api_url: &Url, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            http,
            token_url: api_url.join("token")?,
            credentials,
            cache: Mutex::new(None),
        })
    }

    /// Returns a valid access token, fetching a new one when the cached token expired
    pub async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch().await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    async fn fetch(&self) -> Result<Token> {
        tracing::debug!(
            grant_type = self.credentials.grant_type(),
            client_id = %self.credentials.client_id,
            "Requesting Brightbox access token"
        );

        let mut form = vec![("grant_type", self.credentials.grant_type())];
        if let Grant::Password { username, password } = &self.credentials.grant {
            form.push(("username", username.as_str()));
            form.push(("password", password.as_str()));
        }

        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(e) => ApiError::OAuth {
                    error: e.error,
                    description: e.error_description.unwrap_or_default(),
                },
                Err(_) => ApiError::from_body(status.as_u16(), &body),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        if parsed.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "token endpoint returned an empty access token".to_string(),
            ));
        }

        Ok(Token {
            access_token: parsed.access_token,
            expires_at: parsed
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer, credentials: Credentials) -> TokenSource {
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        TokenSource::new(reqwest::Client::new(), &url, credentials).unwrap()
    }

    #[test]
    fn test_grant_selection() {
        let user = Credentials::new(
            "app-12345",
            "secret",
            Some("user@example.com".to_string()),
            Some("pw".to_string()),
        );
        assert_eq!(user.grant_type(), "password");

        let partial = Credentials::new("app-12345", "secret", Some("u".to_string()), None);
        assert_eq!(partial.grant_type(), "client_credentials");

        let cli = Credentials::new("cli-12345", "secret", None, None);
        assert_eq!(cli.grant_type(), "client_credentials");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new(
            "app-12345",
            "topsecret",
            Some("user".to_string()),
            Some("hunter2".to_string()),
        );
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("topsecret"));
        assert!(!printed.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "Bearer",
                "expires_in": 7200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = source(&server, Credentials::new("cli-abc12", "s", None, None));
        assert_eq!(tokens.access_token().await.unwrap(), "tok-1");
        assert_eq!(tokens.access_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_password_grant_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=password"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The username or password is wrong"
            })))
            .mount(&server)
            .await;

        let tokens = source(
            &server,
            Credentials::new(
                "app-abc12",
                "s",
                Some("user@example.com".to_string()),
                Some("wrong".to_string()),
            ),
        );
        match tokens.access_token().await {
            Err(ApiError::OAuth { error, description }) => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description, "The username or password is wrong");
            }
            other => panic!("expected OAuth error, got {:?}", other),
        }
    }
}
