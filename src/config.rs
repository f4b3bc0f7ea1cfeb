//! Configuration for the mock server.
//!
//! Defines global settings, preloaded overrides and the update request
//! accepted by the administrative endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::error::ValidationError;
use crate::model::{is_blank, Condition, ConditionalResponse, EndpointKey, HttpMethod};

/// Main configuration for the mock server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MockServerConfig {
    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,

    /// Updates applied in order before the server starts accepting requests
    #[serde(default)]
    pub overrides: Vec<UpdateRequest>,
}

impl MockServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the configuration named on the command line.
    ///
    /// A missing file falls back to the defaults unless `strict` is set
    /// (`--validate`), in which case it is an error.
    pub fn load(path: Option<&Path>, strict: bool) -> anyhow::Result<Self> {
        match path {
            Some(path) if path.exists() => {
                info!(path = ?path, "Loading configuration");
                Self::from_file(path)
            }
            Some(path) if strict => anyhow::bail!("Configuration file not found: {:?}", path),
            Some(path) => {
                info!(path = ?path, "Configuration file not found, using default configuration");
                Ok(Self::default())
            }
            None => {
                info!("Using default configuration (no overrides)");
                Ok(Self::default())
            }
        }
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.settings.validate()?;
        for (i, update) in self.overrides.iter().enumerate() {
            update
                .validate()
                .map_err(|e| anyhow::anyhow!("Override {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log all matched requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log requests that resolve to no response
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Path prefix of the administrative routes
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
}

impl GlobalSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.admin_prefix.starts_with('/') || self.admin_prefix.ends_with('/') {
            anyhow::bail!(
                "admin_prefix must start with '/' and must not end with '/': {}",
                self.admin_prefix
            );
        }
        Ok(())
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            admin_prefix: default_admin_prefix(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_admin_prefix() -> String {
    "/mock".to_string()
}

/// A mock update as submitted by a caller. Every field is optional at the
/// wire level; [`UpdateRequest::validate`] enforces presence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub status_code: Option<u16>,

    #[serde(default)]
    pub response_body: Option<Value>,

    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
}

impl UpdateRequest {
    /// Parse a raw JSON payload. Type mismatches are reported as
    /// [`ValidationError::Malformed`].
    pub fn from_json(payload: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(payload).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Check required fields and build the key and response to append.
    pub fn validate(&self) -> Result<(EndpointKey, ConditionalResponse), ValidationError> {
        let path = self
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingField("path"))?;

        let method_name = self
            .method
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::MissingField("method"))?;

        let status_code = self
            .status_code
            .filter(|code| *code != 0)
            .ok_or(ValidationError::MissingField("statusCode"))?;

        let body = self
            .response_body
            .as_ref()
            .filter(|body| !is_blank(body))
            .ok_or(ValidationError::MissingField("responseBody"))?;

        let method = HttpMethod::parse(method_name)
            .ok_or_else(|| ValidationError::UnknownMethod(method_name.to_string()))?;

        if !(100..=599).contains(&status_code) {
            return Err(ValidationError::InvalidStatusCode(status_code));
        }

        let response = ConditionalResponse {
            status_code,
            body: body.clone(),
            conditions: self.conditions.clone().unwrap_or_default(),
        };

        Ok((EndpointKey::new(method, path), response))
    }
}
