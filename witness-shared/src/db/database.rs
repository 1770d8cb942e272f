/// Observed database handle
///
/// [`Database`] pairs a PostgreSQL pool with a name and a [`QueryObserver`]. Model functions
/// take `&Database`, route their SQL text through [`Database::statement`], and execute against
/// [`Database::pool`].
///
/// # Example
///
/// ```no_run
/// use witness_shared::db::database::Database;
/// use sqlx::{PgPool, Postgres, Transaction};
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let db = Database::new(pool);
///
/// let (count,): (i64,) = sqlx::query_as(db.statement("SELECT COUNT(*) FROM users"))
///     .fetch_one(db.pool())
///     .await?;
/// # Ok(())
/// # }
/// ```

use super::observer::{QueryObserver, TracingObserver};
use sqlx::{PgPool, Postgres, Transaction};
use std::panic::Location;
use std::sync::Arc;

/// Name given to handles built with [`Database::new`]
pub const DEFAULT_DATABASE: &str = "default";

/// A named, observed PostgreSQL handle
///
/// Cloning is cheap: the pool and observer are reference counted.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    pool: PgPool,
    observer: Arc<dyn QueryObserver>,
}

impl Database {
    /// Wraps a pool as the `"default"` database with a tracing observer
    pub fn new(pool: PgPool) -> Self {
        Self::named(DEFAULT_DATABASE, pool)
    }

    /// Wraps a pool under an explicit name
    pub fn named(name: &str, pool: PgPool) -> Self {
        Self {
            name: Arc::from(name),
            pool,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Returns a handle on the same pool that reports to `observer` instead
    pub fn observed_by(&self, observer: Arc<dyn QueryObserver>) -> Self {
        Self {
            name: self.name.clone(),
            pool: self.pool.clone(),
            observer,
        }
    }

    /// Name of this handle
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying pool, for executing statements
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Starts a transaction on the pool
    ///
    /// Statements executed on it still go through [`Database::statement`]; `BEGIN` and
    /// `COMMIT` are not reported. Dropping the transaction without committing rolls it back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Reports `sql` to the observer and hands it back for execution
    ///
    /// The caller's source location is captured so that observers can point at the model
    /// function that issued the statement.
    #[track_caller]
    pub fn statement<'q>(&self, sql: &'q str) -> &'q str {
        self.observer
            .on_statement(&self.name, sql, Location::caller());
        sql
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}
