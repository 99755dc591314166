/// Middleware for the API server
///
/// - `auth`: login-required gate for the fleet routes
/// - `security`: security response headers

pub mod auth;
pub mod security;
