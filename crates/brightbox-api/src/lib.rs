//! Brightbox Cloud API client
//!
//! A thin typed layer over the Brightbox REST API (`/1.0/...`) and the Orbit
//! object storage endpoint, covering what the Terraform provider manages.
//!
//! # Example
//!
//! ```ignore
//! use brightbox_api::{Client, Credentials, TokenSource, model::Server};
//! use std::sync::Arc;
//!
//! let http = reqwest::Client::new();
//! let api_url = url::Url::parse("https://api.gb1.brightbox.com/")?;
//! let credentials = Credentials::new("cli-xxxxx", "secret", None, None);
//! let tokens = Arc::new(TokenSource::new(http.clone(), &api_url, credentials)?);
//! let client = Client::new(http, api_url, None, tokens);
//!
//! let server: Server = client.get("srv-xxxxx").await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod model;
pub mod orbit;

pub use auth::{Credentials, Grant, TokenSource};
pub use client::{ApiResource, Client};
pub use error::{ApiError, Result};
pub use orbit::{ContainerInfo, ContainerOptions, OrbitClient};
