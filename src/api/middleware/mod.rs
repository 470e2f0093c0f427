//! API middleware components

pub mod client_ip;
pub mod logging;
pub mod metrics;
pub mod security;
pub mod session;

pub use client_ip::resolve_client_ip;
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use security::security_headers_middleware;
pub use session::{extract_session_token, RequireSession, SESSION_COOKIE};
