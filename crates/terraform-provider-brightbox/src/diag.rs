//! Error to diagnostic conversion
//!
//! API and OAuth errors keep their structured fields so the user sees the
//! remote error name and every message; anything else is shown as-is.

use crate::error::ProviderError;
use brightbox_api::ApiError;
use tf_provider::{AttributePath, Diagnostics};

/// Render the detail text for an error
pub fn detail(err: &ProviderError) -> String {
    match err {
        ProviderError::Api(ApiError::Api {
            status,
            error_name,
            errors,
        }) => {
            if errors.is_empty() {
                format!("{} (HTTP {})", error_name, status)
            } else {
                format!("{} (HTTP {}): {}", error_name, status, errors.join("\n"))
            }
        }
        ProviderError::Api(ApiError::OAuth { error, description }) => {
            if description.is_empty() {
                format!("Authentication failed: {}", error)
            } else {
                format!("Authentication failed: {}: {}", error, description)
            }
        }
        other => other.to_string(),
    }
}

/// Add an error diagnostic for `err`, attached to the provider or resource root
pub fn report(diags: &mut Diagnostics, summary: impl Into<String>, err: &ProviderError) {
    let summary = summary.into();
    tracing::error!("{}: {}", summary, err);

    match err {
        ProviderError::InvalidConfig { attribute, message } => {
            diags.error(summary, message.clone(), AttributePath::new(*attribute));
        }
        _ => diags.root_error(summary, detail(err)),
    }
}

/// Add an attribute-scoped validation error
pub fn invalid(diags: &mut Diagnostics, attribute: &'static str, message: impl Into<String>) {
    diags.error(
        "Invalid attribute value".to_string(),
        message.into(),
        AttributePath::new(attribute),
    );
}
