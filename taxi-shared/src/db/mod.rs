/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool
/// - `migrations`: Embedded schema migrations
///
/// The queries themselves live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
