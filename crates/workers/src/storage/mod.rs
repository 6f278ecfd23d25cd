pub mod migrator;
mod channels;
mod check_results;
mod incidents;
mod monitors;
mod pool;
mod retry;

pub use pool::create_pool;
pub use retry::with_retry;

use sqlx::PgPool;

/// Postgres implementation of the `store` traits.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
