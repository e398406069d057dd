// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound relay to the form-delivery API.

use crate::config::{ConfigError, RelayConfig};
use crate::form::{ContactForm, ACCESS_KEY_FIELD};
use reqwest::header::ACCEPT;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Shown when the endpoint accepts the form without a message.
pub const SENT_FALLBACK: &str = "Message sent!";
/// Shown when the endpoint rejects the form without a message.
pub const FAILED_FALLBACK: &str = "Submission failed.";
/// Shown for any transport or decoding failure.
pub const GENERIC_FAILURE: &str = "Something went wrong!";

/// User-Agent sent on outbound requests unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("contact-relay/", env!("CARGO_PKG_VERSION"));

/// Relay failures. None of these reach the user verbatim.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Delivery request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Delivery response was not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// What the delivery endpoint said about a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayOutcome {
    pub success: bool,
    pub status: u16,
    pub message: String,
}

/// Form-delivery API client.
#[derive(Debug, Clone)]
pub struct RelayClient {
    endpoint: Url,
    access_key: Option<String>,
    client: reqwest::Client,
}

impl RelayClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        Self::with_user_agent(config, DEFAULT_USER_AGENT)
    }

    /// Create a client that identifies itself as `user_agent`.
    pub fn with_user_agent(config: &RelayConfig, user_agent: &str) -> Result<Self, RelayError> {
        let endpoint = config.endpoint_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            endpoint,
            access_key: config.access_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST the form as JSON and interpret the response.
    pub async fn submit(&self, form: &ContactForm) -> Result<RelayOutcome, RelayError> {
        let mut payload = form.clone();
        if let Some(key) = &self.access_key {
            payload.set_if_absent(ACCESS_KEY_FIELD, key.as_str());
        }

        debug!(endpoint = %self.endpoint, fields = payload.len(), "Relaying submission");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "Delivery request failed");
                e
            })?;

        let status = response.status();
        let body = response.bytes().await?;
        let data: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            warn!(status = status.as_u16(), error = %e, "Delivery response was not JSON");
            e
        })?;

        let success = status.is_success();
        let message = data
            .get("message")
            .and_then(serde_json::Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if success {
                    SENT_FALLBACK.to_string()
                } else {
                    FAILED_FALLBACK.to_string()
                }
            });

        debug!(status = status.as_u16(), success, "Delivery response received");
        Ok(RelayOutcome {
            success,
            status: status.as_u16(),
            message,
        })
    }
}
