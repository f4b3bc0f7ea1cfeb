//! Endpoint registry.
//!
//! Walks an OpenAPI document once at startup and derives the default table:
//! one unconditional response per declared `(path, method)` pair.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::SpecError;
use crate::model::{is_blank, ConditionalResponse, EndpointKey, HttpMethod, MockTable};
use crate::openapi::OpenApiDocument;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Build the default table from an OpenAPI document.
///
/// Fails on the first path or operation that cannot produce a default
/// response; a partial table is never returned.
pub fn build_registry(spec: &OpenApiDocument) -> Result<MockTable, SpecError> {
    let paths = spec.paths().ok_or(SpecError::NoPaths)?;

    let mut table = MockTable::new();

    for (path, item) in paths {
        let operations = recognized_operations(item);
        if operations.is_empty() {
            return Err(SpecError::NoOperations { path: path.clone() });
        }

        for (method_name, method) in operations {
            let response = default_response(path, method_name, &item[method_name])?;
            let key = EndpointKey::new(method, path.as_str());
            debug!(
                endpoint = %key,
                status = response.status_code,
                "Registered default response"
            );
            table.append(key, response);
        }
    }

    info!(
        title = spec.title().unwrap_or("untitled"),
        endpoints = table.len(),
        "Endpoint registry built"
    );

    Ok(table)
}

/// Keys of a path item naming a recognized HTTP method, in document order.
fn recognized_operations(item: &Value) -> Vec<(&str, HttpMethod)> {
    item.as_object()
        .map(|item| {
            item.keys()
                .filter_map(|name| HttpMethod::parse(name).map(|m| (name.as_str(), m)))
                .collect()
        })
        .unwrap_or_default()
}

/// Derive the unconditional default response of one operation from its
/// first declared response.
fn default_response(
    path: &str,
    method: &str,
    operation: &Value,
) -> Result<ConditionalResponse, SpecError> {
    let operation = operation
        .as_object()
        .ok_or_else(|| SpecError::MissingOperation {
            path: path.to_string(),
            method: method.to_string(),
        })?;

    let (status_key, response) = operation
        .get("responses")
        .and_then(Value::as_object)
        .and_then(first_entry)
        .ok_or_else(|| SpecError::MissingResponses {
            path: path.to_string(),
            method: method.to_string(),
        })?;

    let status_code = status_key
        .parse::<u16>()
        .ok()
        .filter(|code| (100..=599).contains(code))
        .ok_or_else(|| SpecError::InvalidStatusCode {
            path: path.to_string(),
            method: method.to_string(),
            key: status_key.clone(),
        })?;

    let body = response
        .get("content")
        .and_then(|content| content.get(JSON_MEDIA_TYPE))
        .and_then(|media| media.get("example"))
        .filter(|example| !is_blank(example))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    Ok(ConditionalResponse::unconditional(status_code, body))
}

fn first_entry(map: &Map<String, Value>) -> Option<(&String, &Value)> {
    map.iter().next()
}
