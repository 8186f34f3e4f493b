//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (frontend origin only)
//! 5. Rate limiting (governor), stricter on `/v1/auth`
//!
//! Authentication is not a layer: handlers opt in with the [`RequireAuth`]
//! and [`RequireAdmin`] extractors.

pub mod auth;
pub mod json;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth};
pub use json::ApiJson;
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
