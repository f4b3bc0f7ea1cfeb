//! OpenAPI document loading.
//!
//! The document is kept as a JSON value with key order preserved, since the
//! registry picks the first declared response of each operation.

use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use crate::error::LoadError;

/// A parsed OpenAPI v3 document.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument {
    root: Value,
}

impl OpenApiDocument {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parse a YAML document. Non-string mapping keys (`201:`) become
    /// string keys.
    pub fn from_yaml_str(content: &str) -> Result<Self, LoadError> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })?;
        let root = serde_json::to_value(yaml).map_err(|source| LoadError::InvalidJson { source })?;
        Ok(Self { root })
    }

    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let root =
            serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
        Ok(Self { root })
    }

    /// The `paths` object, if the document declares one.
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.root.get("paths").and_then(Value::as_object)
    }

    /// `info.title`, used for startup logging.
    pub fn title(&self) -> Option<&str> {
        self.root
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

/// Load an OpenAPI document, choosing the parser from the file extension.
pub fn load_spec(path: &Path) -> Result<OpenApiDocument, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let is_yaml = match extension.as_deref() {
        Some("yaml") | Some("yml") => true,
        Some("json") => false,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), yaml = is_yaml, "Parsing OpenAPI document");

    if is_yaml {
        OpenApiDocument::from_yaml_str(&content)
    } else {
        OpenApiDocument::from_json_str(&content)
    }
}
