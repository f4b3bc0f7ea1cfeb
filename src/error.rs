//! Error types for spec loading, registry construction and mock updates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading an OpenAPI document from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("spec file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported spec format for {path}: expected .yaml, .yml or .json")]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal errors while deriving the default table from an OpenAPI document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("no paths defined in OpenAPI spec")]
    NoPaths,

    #[error("path {path} declares no operations")]
    NoOperations { path: String },

    #[error("method {method} not defined for path {path}")]
    MissingOperation { path: String, method: String },

    #[error("no responses defined for path {path} and method {method}")]
    MissingResponses { path: String, method: String },

    #[error("invalid status code \"{key}\" for path {path} and method {method}")]
    InvalidStatusCode {
        path: String,
        method: String,
        key: String,
    },
}

/// Rejected mock update requests. The engine state is never touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid update request, missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid update request, unknown HTTP method: {0}")]
    UnknownMethod(String),

    #[error("Invalid update request, status code out of range: {0}")]
    InvalidStatusCode(u16),

    #[error("Invalid update request: {0}")]
    Malformed(String),
}
