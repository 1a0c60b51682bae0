//! Orbit object storage (OpenStack Swift compatible)
//!
//! Only container-level operations are supported. Containers live at
//! `{orbit_url}{account}/{container}` and authenticate with the same OAuth
//! access token as the API, sent as `X-Auth-Token`.

use crate::auth::TokenSource;
use crate::error::{ApiError, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

const META_PREFIX: &str = "x-container-meta-";

/// Container state reported by a `HEAD` request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerInfo {
    pub name: String,
    pub object_count: i64,
    pub bytes_used: i64,
    pub container_read: Vec<String>,
    pub container_write: Vec<String>,
    pub versions_location: Option<String>,
    pub history_location: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Headers applied on create (`PUT`) or update (`POST`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerOptions {
    pub metadata: BTreeMap<String, String>,
    /// Metadata keys to delete
    pub remove_metadata: Vec<String>,
    pub container_read: Option<Vec<String>>,
    pub container_write: Option<Vec<String>>,
    /// `Some("")` removes the setting
    pub versions_location: Option<String>,
    pub history_location: Option<String>,
}

impl ContainerOptions {
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.metadata {
            headers.insert(
                header_name(&format!("{}{}", META_PREFIX, key))?,
                header_value(value)?,
            );
        }
        for key in &self.remove_metadata {
            headers.insert(
                header_name(&format!("x-remove-container-meta-{}", key))?,
                HeaderValue::from_static("x"),
            );
        }
        if let Some(acl) = &self.container_read {
            headers.insert("x-container-read", header_value(&acl.join(","))?);
        }
        if let Some(acl) = &self.container_write {
            headers.insert("x-container-write", header_value(&acl.join(","))?);
        }
        for (name, value) in [
            ("versions-location", &self.versions_location),
            ("history-location", &self.history_location),
        ] {
            match value.as_deref() {
                Some("") => {
                    headers.insert(
                        header_name(&format!("x-remove-{}", name))?,
                        HeaderValue::from_static("x"),
                    );
                }
                Some(v) => {
                    headers.insert(header_name(&format!("x-{}", name))?, header_value(v)?);
                }
                None => {}
            }
        }
        Ok(headers)
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
        .map_err(|e| ApiError::InvalidResponse(format!("invalid header name {}: {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::InvalidResponse(format!("invalid header value: {}", e)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn split_acl(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// `X-Timestamp` is fractional seconds since the epoch
fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let secs: f64 = value?.parse().ok()?;
    Utc.timestamp_opt(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        .single()
}

impl ContainerInfo {
    fn from_headers(name: &str, headers: &HeaderMap) -> Self {
        let number = |h: &str| {
            header_str(headers, h)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };

        let metadata = headers
            .iter()
            .filter_map(|(k, v)| {
                let key = k.as_str().strip_prefix(META_PREFIX)?;
                Some((key.to_string(), v.to_str().ok()?.to_string()))
            })
            .collect();

        Self {
            name: name.to_string(),
            object_count: number("x-container-object-count"),
            bytes_used: number("x-container-bytes-used"),
            container_read: split_acl(header_str(headers, "x-container-read")),
            container_write: split_acl(header_str(headers, "x-container-write")),
            versions_location: header_str(headers, "x-versions-location").map(String::from),
            history_location: header_str(headers, "x-history-location").map(String::from),
            metadata,
            created_at: parse_timestamp(header_str(headers, "x-timestamp")),
        }
    }
}

/// Orbit client for a single account
#[derive(Debug, Clone)]
pub struct OrbitClient {
    http: reqwest::Client,
    account_url: Url,
    tokens: Arc<TokenSource>,
}

impl OrbitClient {
    /// `orbit_url` is the service root, e.g. `https://orbit.brightbox.com/v1/`
    pub fn new(
        http: reqwest::Client,
        orbit_url: &Url,
        account: &str,
        tokens: Arc<TokenSource>,
    ) -> Result<Self> {
        Ok(Self {
            http,
            account_url: orbit_url.join(&format!("{}/", account))?,
            tokens,
        })
    }

    pub fn account_url(&self) -> &Url {
        &self.account_url
    }

    fn container_url(&self, name: &str) -> Result<Url> {
        let mut url = self.account_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidResponse("orbit url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn send(&self, method: Method, name: &str, headers: HeaderMap) -> Result<HeaderMap> {
        let url = self.container_url(name)?;
        let token = self.tokens.access_token().await?;

        tracing::debug!("{} {}", method, url.path());

        let response = self
            .http
            .request(method, url)
            .header("x-auth-token", token)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_body(status.as_u16(), &body));
        }
        Ok(headers)
    }

    pub async fn get_container(&self, name: &str) -> Result<ContainerInfo> {
        let headers = self.send(Method::HEAD, name, HeaderMap::new()).await?;
        Ok(ContainerInfo::from_headers(name, &headers))
    }

    pub async fn create_container(&self, name: &str, options: &ContainerOptions) -> Result<()> {
        self.send(Method::PUT, name, options.headers()?).await?;
        Ok(())
    }

    pub async fn update_container(&self, name: &str, options: &ContainerOptions) -> Result<()> {
        self.send(Method::POST, name, options.headers()?).await?;
        Ok(())
    }

    /// Fails with 409 when the container still holds objects
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        self.send(Method::DELETE, name, HeaderMap::new()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn orbit(server: &MockServer) -> OrbitClient {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 7200
            })))
            .mount(server)
            .await;

        let http = reqwest::Client::new();
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let tokens = TokenSource::new(
            http.clone(),
            &base,
            Credentials::new("cli-abc12", "s", None, None),
        )
        .unwrap();
        let orbit_url = base.join("v1/").unwrap();
        OrbitClient::new(http, &orbit_url, "acc-12345", Arc::new(tokens)).unwrap()
    }

    #[test]
    fn test_option_headers() {
        let options = ContainerOptions {
            metadata: [("Colour".to_string(), "blue".to_string())].into(),
            remove_metadata: vec!["old".to_string()],
            container_read: Some(vec![".r:*".to_string(), "acc-12345".to_string()]),
            versions_location: Some(String::new()),
            ..Default::default()
        };
        let headers = options.headers().unwrap();
        assert_eq!(header_str(&headers, "x-container-meta-colour"), Some("blue"));
        assert_eq!(header_str(&headers, "x-remove-container-meta-old"), Some("x"));
        assert_eq!(header_str(&headers, "x-container-read"), Some(".r:*,acc-12345"));
        assert!(headers.contains_key("x-remove-versions-location"));
        assert!(!headers.contains_key("x-container-write"));
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(Some("1700000000.50000")).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(parse_timestamp(Some("garbage")).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[tokio::test]
    async fn test_head_container() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/v1/acc-12345/backups"))
            .and(header("x-auth-token", "tok"))
            .respond_with(
                ResponseTemplate::new(204)
                    .insert_header("x-container-object-count", "3")
                    .insert_header("x-container-bytes-used", "1024")
                    .insert_header("x-container-read", ".r:*, .rlistings")
                    .insert_header("x-container-meta-owner", "ops"),
            )
            .mount(&server)
            .await;

        let info = orbit(&server).await.get_container("backups").await.unwrap();
        assert_eq!(info.object_count, 3);
        assert_eq!(info.bytes_used, 1024);
        assert_eq!(info.container_read, vec![".r:*", ".rlistings"]);
        assert_eq!(info.metadata.get("owner").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn test_missing_container() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/v1/acc-12345/nothing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = orbit(&server)
            .await
            .get_container("nothing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
