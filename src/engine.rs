//! Resolution engine.
//!
//! Holds the immutable default table and the append-only dynamic table, and
//! answers which response a request for an endpoint should receive.

use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::config::GlobalSettings;
use crate::matcher::find_match;
use crate::model::{ConditionalResponse, EndpointKey, MockTable};

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(ConditionalResponse),
    NotFound,
}

impl Resolution {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolution::NotFound)
    }

    pub fn response(&self) -> Option<&ConditionalResponse> {
        match self {
            Resolution::Matched(response) => Some(response),
            Resolution::NotFound => None,
        }
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub requests_total: u64,
    pub requests_matched: u64,
    pub requests_unmatched: u64,
    pub updates_total: u64,
    pub endpoints: usize,
}

/// Both tables as seen at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub defaults: MockTable,
    pub dynamic: MockTable,
}

/// Mock response resolution engine.
///
/// `dynamic` is guarded by a lock because `update` runs concurrently with
/// `resolve` on the multi-threaded runtime.
#[derive(Debug)]
pub struct ResolutionEngine {
    defaults: MockTable,
    dynamic: RwLock<MockTable>,
    settings: GlobalSettings,
    /// Total requests resolved.
    requests_total: AtomicU64,
    /// Requests that resolved to a candidate.
    requests_matched: AtomicU64,
    /// Requests that resolved to nothing.
    requests_unmatched: AtomicU64,
    updates_total: AtomicU64,
}

impl ResolutionEngine {
    /// Create an engine over a registry-built default table.
    pub fn new(defaults: MockTable) -> Self {
        Self::with_settings(defaults, GlobalSettings::default())
    }

    pub fn with_settings(defaults: MockTable, settings: GlobalSettings) -> Self {
        info!(endpoints = defaults.len(), "Resolution engine initialized");

        Self {
            defaults,
            dynamic: RwLock::new(MockTable::new()),
            settings,
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
            updates_total: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// The default table; every key is a routed endpoint.
    pub fn defaults(&self) -> &MockTable {
        &self.defaults
    }

    // The dynamic table is append-only, so a writer that panicked cannot
    // have left it half-updated.
    fn read_dynamic(&self) -> RwLockReadGuard<'_, MockTable> {
        self.dynamic.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pick the response for a request body.
    ///
    /// Dynamic candidates fully supersede the default ones whenever any
    /// exist for the key; the two lists are never merged.
    pub fn resolve(&self, key: &EndpointKey, body: &Value) -> Resolution {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let resolution = {
            let dynamic = self.read_dynamic();
            let candidates = dynamic
                .get(key)
                .filter(|list| !list.is_empty())
                .or_else(|| self.defaults.get(key));

            match candidates.and_then(|list| find_match(list, body)) {
                Some(result) => {
                    if self.settings.log_matches {
                        info!(
                            endpoint = %key,
                            candidate = result.index,
                            status = result.response.status_code,
                            "Request matched mock response"
                        );
                    }
                    Resolution::Matched(result.response.clone())
                }
                None => {
                    if self.settings.log_unmatched {
                        warn!(
                            endpoint = %key,
                            known = candidates.is_some(),
                            "No matching mock response found"
                        );
                    }
                    Resolution::NotFound
                }
            }
        };

        let counter = if resolution.is_not_found() {
            &self.requests_unmatched
        } else {
            &self.requests_matched
        };
        counter.fetch_add(1, Ordering::Relaxed);

        resolution
    }

    /// Append a candidate to the dynamic list of `key`.
    ///
    /// Keys without a default entry are accepted; they are stored but no
    /// route reaches them.
    pub fn update(&self, key: EndpointKey, response: ConditionalResponse) {
        if !self.defaults.contains(&key) {
            warn!(endpoint = %key, "Mock update for endpoint not declared in spec");
        }

        info!(
            endpoint = %key,
            status = response.status_code,
            conditions = response.conditions.len(),
            "Mock response appended"
        );

        self.dynamic
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .append(key, response);
        self.updates_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            defaults: self.defaults.clone(),
            dynamic: self.read_dynamic().clone(),
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_matched: self.requests_matched.load(Ordering::Relaxed),
            requests_unmatched: self.requests_unmatched.load(Ordering::Relaxed),
            updates_total: self.updates_total.load(Ordering::Relaxed),
            endpoints: self.defaults.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, HttpMethod};
    use crate::openapi::OpenApiDocument;
    use crate::registry::build_registry;
    use serde_json::json;
    use std::sync::Arc;

    const CONSENT_SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Consent API
  version: 1.0.0
paths:
  /Consent:
    post:
      responses:
        "201":
          description: Created
          content:
            application/json:
              example:
                msg: created
    get:
      responses:
        "200":
          description: OK
"#;

    fn consent_key() -> EndpointKey {
        EndpointKey::new(HttpMethod::Post, "/Consent")
    }

    fn test_engine() -> ResolutionEngine {
        let doc = OpenApiDocument::from_yaml_str(CONSENT_SPEC).unwrap();
        ResolutionEngine::new(build_registry(&doc).unwrap())
    }

    fn conflict() -> ConditionalResponse {
        ConditionalResponse::unconditional(409, json!({"code": 409, "msg": "Conflict"}))
            .with_condition(Condition::new("txnid", "conflict-id"))
    }

    #[test]
    fn test_defaults_without_updates() {
        let engine = test_engine();
        for key in engine.defaults().keys().cloned().collect::<Vec<_>>() {
            assert!(!engine.resolve(&key, &json!({})).is_not_found(), "{key}");
        }

        let resolution = engine.resolve(&consent_key(), &json!({}));
        assert_eq!(
            resolution,
            Resolution::Matched(ConditionalResponse::unconditional(
                201,
                json!({"msg": "created"})
            ))
        );
    }

    #[test]
    fn test_consent_scenario() {
        let engine = test_engine();
        engine.update(consent_key(), conflict());

        let matched = engine.resolve(&consent_key(), &json!({"txnid": "conflict-id"}));
        let response = matched.response().unwrap();
        assert_eq!(response.status_code, 409);
        assert_eq!(response.body, json!({"code": 409, "msg": "Conflict"}));

        // The dynamic list supersedes the default entirely
        assert!(engine
            .resolve(&consent_key(), &json!({"txnid": "x"}))
            .is_not_found());

        // Other endpoints keep their defaults
        let get = EndpointKey::new(HttpMethod::Get, "/Consent");
        assert_eq!(
            engine.resolve(&get, &json!({})).response().unwrap().status_code,
            200
        );
    }

    #[test]
    fn test_unconditional_update_overrides_default() {
        let engine = test_engine();
        engine.update(
            consent_key(),
            ConditionalResponse::unconditional(503, json!({"msg": "down"})),
        );

        for body in [json!({}), json!({"txnid": "anything"}), json!(null)] {
            let resolution = engine.resolve(&consent_key(), &body);
            assert_eq!(resolution.response().unwrap().status_code, 503);
        }
    }

    #[test]
    fn test_conditional_before_fallback() {
        let engine = test_engine();
        engine.update(consent_key(), conflict());
        engine.update(
            consent_key(),
            ConditionalResponse::unconditional(201, json!({"msg": "again"})),
        );

        let key = consent_key();
        assert_eq!(
            engine
                .resolve(&key, &json!({"txnid": "conflict-id"}))
                .response()
                .unwrap()
                .status_code,
            409
        );
        assert_eq!(
            engine
                .resolve(&key, &json!({"txnid": "x"}))
                .response()
                .unwrap()
                .body,
            json!({"msg": "again"})
        );
    }

    #[test]
    fn test_unconditional_shadows_later_conditional() {
        let engine = test_engine();
        engine.update(
            consent_key(),
            ConditionalResponse::unconditional(200, json!({"msg": "first"})),
        );
        engine.update(consent_key(), conflict());

        let resolution = engine.resolve(&consent_key(), &json!({"txnid": "conflict-id"}));
        assert_eq!(resolution.response().unwrap().status_code, 200);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let engine = test_engine();
        engine.update(consent_key(), conflict());
        let before = engine.snapshot();

        let body = json!({"txnid": "conflict-id"});
        let first = engine.resolve(&consent_key(), &body);
        for _ in 0..5 {
            assert_eq!(engine.resolve(&consent_key(), &body), first);
        }

        let after = engine.snapshot();
        assert_eq!(before.defaults, after.defaults);
        assert_eq!(before.dynamic, after.dynamic);
    }

    #[test]
    fn test_unknown_endpoint() {
        let engine = test_engine();
        let key = EndpointKey::new(HttpMethod::Delete, "/nowhere");
        assert!(engine.resolve(&key, &json!({})).is_not_found());

        // Orphaned updates are stored and resolvable by key
        engine.update(key.clone(), ConditionalResponse::unconditional(204, json!({})));
        assert_eq!(engine.snapshot().dynamic.len(), 1);
        assert!(!engine.defaults().contains(&key));
        assert_eq!(
            engine.resolve(&key, &json!({})).response().unwrap().status_code,
            204
        );
    }

    #[test]
    fn test_stats() {
        let engine = test_engine();
        engine.update(consent_key(), conflict());
        engine.resolve(&consent_key(), &json!({"txnid": "conflict-id"}));
        engine.resolve(&consent_key(), &json!({}));

        assert_eq!(
            engine.stats(),
            EngineStats {
                requests_total: 2,
                requests_matched: 1,
                requests_unmatched: 1,
                updates_total: 1,
                endpoints: 2,
            }
        );
    }

    #[test]
    fn test_concurrent_updates_and_resolves() {
        let engine = Arc::new(test_engine());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        engine.update(
                            consent_key(),
                            ConditionalResponse::unconditional(200, json!({}))
                                .with_condition(Condition::new("worker", i as i64)),
                        );
                        engine.resolve(&consent_key(), &json!({"worker": i}));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.dynamic.get(&consent_key()).unwrap().len(), 100);
        assert_eq!(engine.stats().requests_matched, 100);
    }
}
