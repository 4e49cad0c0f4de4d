use sqlx::PgPool;

/// Shared connection pool handle used by every repository.
pub type Db = PgPool;
