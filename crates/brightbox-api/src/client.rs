//! Brightbox Cloud REST client
//!
//! Every collection lives under `/1.0/{path}` and is addressed the same way,
//! so the CRUD calls are generic over [`ApiResource`].

use crate::auth::TokenSource;
use crate::error::{ApiError, Result};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

const API_VERSION: &str = "1.0";

/// A collection endpoint of the Brightbox API
pub trait ApiResource: DeserializeOwned + Send + Sync {
    /// Collection path below `/1.0/`, e.g. `servers`
    const PATH: &'static str;
}

/// Authenticated Brightbox API client bound to one account
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_url: Url,
    account: Option<String>,
    tokens: Arc<TokenSource>,
}

impl Client {
    pub fn new(
        http: reqwest::Client,
        api_url: Url,
        account: Option<String>,
        tokens: Arc<TokenSource>,
    ) -> Self {
        Self {
            http,
            api_url,
            account,
            tokens,
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Bind the client to another account, keeping the same token source
    pub fn with_account(&self, account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            ..self.clone()
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.api_url.join(&format!("{}/{}", API_VERSION, path))?;
        if let Some(account) = &self.account {
            url.query_pairs_mut().append_pair("account_id", account);
        }
        Ok(url)
    }

    /// Send a request and return the raw body of a successful response
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String> {
        let url = self.url(path)?;
        let token = self.tokens.access_token().await?;

        tracing::debug!("{} {}", method, url.path());

        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!("{} {} failed with {}", method, path, status);
            return Err(ApiError::from_body(status.as_u16(), &text));
        }

        Ok(text)
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let text = self.send(method, path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET `/1.0/{PATH}/{id}`
    pub async fn get<T: ApiResource>(&self, id: &str) -> Result<T> {
        self.request::<T, ()>(Method::GET, &format!("{}/{}", T::PATH, id), None)
            .await
    }

    /// GET `/1.0/{PATH}`
    pub async fn list<T: ApiResource>(&self) -> Result<Vec<T>> {
        self.request::<Vec<T>, ()>(Method::GET, T::PATH, None).await
    }

    /// POST `/1.0/{PATH}`
    pub async fn create<T, O>(&self, options: &O) -> Result<T>
    where
        T: ApiResource,
        O: Serialize + Sync,
    {
        self.request(Method::POST, T::PATH, Some(options)).await
    }

    /// PUT `/1.0/{PATH}/{id}`
    pub async fn update<T, O>(&self, id: &str, options: &O) -> Result<T>
    where
        T: ApiResource,
        O: Serialize + Sync,
    {
        self.request(Method::PUT, &format!("{}/{}", T::PATH, id), Some(options))
            .await
    }

    /// DELETE `/1.0/{PATH}/{id}`; the response body is ignored
    pub async fn destroy<T: ApiResource>(&self, id: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, &format!("{}/{}", T::PATH, id), None)
            .await?;
        Ok(())
    }

    /// POST `/1.0/{PATH}/{id}/{action}`
    pub async fn action<T, B>(&self, id: &str, action: &str, body: &B) -> Result<T>
    where
        T: ApiResource,
        B: Serialize + Sync + ?Sized,
    {
        self.request(
            Method::POST,
            &format!("{}/{}/{}", T::PATH, id, action),
            Some(body),
        )
        .await
    }

    /// PUT `/1.0/{PATH}/{id}/lock_resource`
    pub async fn lock<T: ApiResource>(&self, id: &str) -> Result<T> {
        self.request::<T, ()>(
            Method::PUT,
            &format!("{}/{}/lock_resource", T::PATH, id),
            None,
        )
        .await
    }

    /// PUT `/1.0/{PATH}/{id}/unlock_resource`
    pub async fn unlock<T: ApiResource>(&self, id: &str) -> Result<T> {
        self.request::<T, ()>(
            Method::PUT,
            &format!("{}/{}/unlock_resource", T::PATH, id),
            None,
        )
        .await
    }

    /// Set the lock state in one call
    pub async fn set_lock<T: ApiResource>(&self, id: &str, locked: bool) -> Result<T> {
        if locked {
            self.lock::<T>(id).await
        } else {
            self.unlock::<T>(id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::model::{Server, ServerGroup};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> Client {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 7200
            })))
            .mount(server)
            .await;

        let http = reqwest::Client::new();
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let tokens = TokenSource::new(
            http.clone(),
            &url,
            Credentials::new("cli-abc12", "s", None, None),
        )
        .unwrap();
        Client::new(http, url, Some("acc-12345".to_string()), Arc::new(tokens))
    }

    #[tokio::test]
    async fn test_get_passes_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.0/server_groups/grp-12345"))
            .and(query_param("account_id", "acc-12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "grp-12345",
                "name": "web",
                "description": "web servers",
                "default": false,
                "fqdn": "grp-12345.gb1.brightbox.com",
                "servers": [{"id": "srv-aaaaa"}]
            })))
            .mount(&server)
            .await;

        let group: ServerGroup = client(&server).await.get("grp-12345").await.unwrap();
        assert_eq!(group.name, "web");
        assert_eq!(group.servers.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.0/servers/srv-gone1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error_name": "missing_resource",
                "errors": ["Resource not found"]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .get::<Server>("srv-gone1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_lock_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/1.0/servers/srv-12345/lock_resource"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "srv-12345",
                "name": "locked",
                "status": "active",
                "locked": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let srv: Server = client(&server)
            .await
            .set_lock("srv-12345", true)
            .await
            .unwrap();
        assert!(srv.locked);
    }
}
