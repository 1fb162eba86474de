//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. CORS
//! 5. Rate limiting (login and registration only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::CurrentUser;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
