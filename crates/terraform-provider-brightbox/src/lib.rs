//! Terraform provider for Brightbox Cloud
//!
//! Resources implement [`crud::ManagedResource`] and data sources implement
//! [`data_sources::LookupSpec`]; the generic adapters in `crud` and
//! `data_sources` handle the Terraform side. Every resource shares the
//! clients created when the provider is configured.

pub mod client;
pub mod config;
pub mod crud;
pub mod data_sources;
pub mod diag;
pub mod encoding;
pub mod error;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod timeouts;
pub mod validate;
pub mod values;
pub mod waiter;

pub use error::{ProviderError, Result};
pub use provider::BrightboxProvider;
