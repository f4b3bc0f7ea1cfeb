//! OpenAPI Mock Server
//!
//! Serves canned responses for every operation declared in an OpenAPI
//! document, with conditional overrides that can be added at runtime.
//!
//! # How a response is chosen
//!
//! - At startup the **registry** derives one unconditional default response
//!   per `(path, method)`: the first response declared for the operation and
//!   its `application/json` example (or `{}`).
//! - Updates append conditional responses to a per-endpoint **dynamic**
//!   list. Once an endpoint has dynamic entries, its default is no longer
//!   consulted.
//! - Candidates are tried in order; the first whose conditions all equal
//!   the matching request body fields wins. No match yields a 404.
//!
//! # Example Configuration
//!
//! ```yaml
//! settings:
//!   admin_prefix: /mock
//! overrides:
//!   - path: /Consent
//!     method: post
//!     statusCode: 409
//!     responseBody:
//!       code: 409
//!       msg: "Conflict: Consent already exists"
//!     conditions:
//!       - field: txnid
//!         value: conflict-id
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod openapi;
pub mod registry;
pub mod server;

pub use config::{GlobalSettings, MockServerConfig, UpdateRequest};
pub use engine::{Resolution, ResolutionEngine};
pub use error::{LoadError, SpecError, ValidationError};
pub use model::{Condition, ConditionValue, ConditionalResponse, EndpointKey, HttpMethod, MockTable};
pub use openapi::{load_spec, OpenApiDocument};
pub use registry::build_registry;
pub use server::{bootstrap, build_router, serve};
