/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 bearer tokens for API clients
///
/// Session handling lives in the API crate; this module only deals with
/// credentials.

pub mod jwt;
pub mod password;
