//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with an empty `request_id` field)
//! 3. Request ID (fills the span field, tags Sentry, echoes the header)
//! 4. Claim rate limiting (governor, `/claim` only)
//!
//! Admin access is not a layer: handlers take the [`RequireAdmin`] extractor.

pub mod admin;
pub mod rate_limit;
pub mod request_id;

pub use admin::{ADMIN_CODE_HEADER, RequireAdmin};
pub use rate_limit::{claim_rate_limiter, rate_limited_response};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
