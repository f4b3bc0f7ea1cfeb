//! Mock table data model.
//!
//! Endpoints are keyed by `(method, path)`. Each key maps to an ordered list
//! of candidate responses; the first candidate whose conditions all hold
//! against the request body wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// HTTP methods an OpenAPI path item can declare operations for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Uppercased method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Parse a method name case-insensitively. Returns `None` for anything
    /// outside the recognized set (including `trace`).
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route identifier, rendered as `"POST /Consent"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: HttpMethod,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for EndpointKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, path) = s
            .split_once(' ')
            .ok_or_else(|| ValidationError::Malformed(format!("invalid endpoint key: {s}")))?;
        let method =
            HttpMethod::parse(method).ok_or_else(|| ValidationError::UnknownMethod(method.into()))?;
        if path.is_empty() {
            return Err(ValidationError::MissingField("path"));
        }
        Ok(Self::new(method, path))
    }
}

impl Serialize for EndpointKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expected value of a condition: a JSON string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(serde_json::Number),
    String(String),
}

impl ConditionValue {
    /// Strict equality against a request body value. Strings only equal
    /// strings, numbers only equal numbers (compared numerically, so `1`
    /// equals `1.0`).
    pub fn matches(&self, actual: &Value) -> bool {
        match (self, actual) {
            (ConditionValue::String(expected), Value::String(actual)) => expected == actual,
            (ConditionValue::Number(expected), Value::Number(actual)) => {
                numbers_equal(expected, actual)
            }
            _ => false,
        }
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::String(value.to_string())
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Number(value.into())
    }
}

/// Equality constraint on a top-level request body field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub field: String,
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: impl Into<ConditionValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the request body satisfies this condition. Non-object bodies
    /// have no fields and never satisfy a condition.
    pub fn holds(&self, body: &Value) -> bool {
        body.get(&self.field)
            .is_some_and(|actual| self.value.matches(actual))
    }
}

/// A candidate response. Empty `conditions` makes it unconditional.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalResponse {
    pub status_code: u16,
    pub body: Value,
    pub conditions: Vec<Condition>,
}

impl ConditionalResponse {
    pub fn unconditional(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// `null`, `false`, `0` and `""` count as absent wherever a body value is
/// optional.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Ordered candidates for one endpoint; earlier entries are tried first.
pub type EndpointConfig = Vec<ConditionalResponse>;

/// Endpoint key to candidate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MockTable {
    entries: BTreeMap<EndpointKey, EndpointConfig>,
}

impl MockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EndpointKey) -> Option<&EndpointConfig> {
        self.entries.get(key)
    }

    /// Append a candidate, creating the endpoint list if absent.
    pub fn append(&mut self, key: EndpointKey, response: ConditionalResponse) {
        self.entries.entry(key).or_default().push(response);
    }

    pub fn contains(&self, key: &EndpointKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EndpointKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EndpointKey, &EndpointConfig)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!(HttpMethod::parse("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("DeLeTe"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("trace"), None);
        assert_eq!(HttpMethod::parse("parameters"), None);
    }

    #[test]
    fn test_endpoint_key_display_and_parse() {
        let key = EndpointKey::new(HttpMethod::Post, "/Consent");
        assert_eq!(key.to_string(), "POST /Consent");

        let parsed: EndpointKey = "post /Consent".parse().unwrap();
        assert_eq!(parsed, key);

        assert!("/Consent".parse::<EndpointKey>().is_err());
        assert!(matches!(
            "FETCH /Consent".parse::<EndpointKey>(),
            Err(ValidationError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_condition_strict_equality() {
        let cond = Condition::new("txnid", "conflict-id");
        assert!(cond.holds(&json!({"txnid": "conflict-id"})));
        assert!(!cond.holds(&json!({"txnid": "other"})));
        assert!(!cond.holds(&json!({})));
        assert!(!cond.holds(&json!("txnid")));

        let numeric = Condition::new("amount", 10);
        assert!(numeric.holds(&json!({"amount": 10})));
        assert!(numeric.holds(&json!({"amount": 10.0})));
        // No coercion between strings and numbers
        assert!(!numeric.holds(&json!({"amount": "10"})));
        assert!(!cond.holds(&json!({"txnid": ["conflict-id"]})));
    }

    #[test]
    fn test_condition_no_nested_paths() {
        let cond = Condition::new("user.id", "42");
        assert!(!cond.holds(&json!({"user": {"id": "42"}})));
        assert!(cond.holds(&json!({"user.id": "42"})));
    }

    #[test]
    fn test_condition_value_deserialize() {
        let cond: Condition = serde_json::from_value(json!({"field": "n", "value": 3})).unwrap();
        assert_eq!(cond.value, ConditionValue::Number(3.into()));

        let cond: Condition =
            serde_json::from_value(json!({"field": "s", "value": "3"})).unwrap();
        assert_eq!(cond.value, ConditionValue::String("3".into()));

        assert!(serde_json::from_value::<Condition>(json!({"field": "b", "value": true})).is_err());
    }

    #[test]
    fn test_is_blank() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_blank(&value), "{value}");
        }
        for value in [json!(true), json!(1), json!("x"), json!([]), json!({})] {
            assert!(!is_blank(&value), "{value}");
        }
    }

    #[test]
    fn test_table_append_preserves_order() {
        let key = EndpointKey::new(HttpMethod::Get, "/items");
        let mut table = MockTable::new();
        table.append(key.clone(), ConditionalResponse::unconditional(200, json!(1)));
        table.append(key.clone(), ConditionalResponse::unconditional(201, json!(2)));

        let statuses: Vec<u16> = table.get(&key).unwrap().iter().map(|r| r.status_code).collect();
        assert_eq!(statuses, vec![200, 201]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_serializes_by_key_string() {
        let mut table = MockTable::new();
        table.append(
            EndpointKey::new(HttpMethod::Post, "/Consent"),
            ConditionalResponse::unconditional(201, json!({"msg": "created"})),
        );
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(
            value,
            json!({"POST /Consent": [{"statusCode": 201, "body": {"msg": "created"}, "conditions": []}]})
        );
    }
}
