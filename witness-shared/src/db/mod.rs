/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL pool creation and health checks
/// - `migrations`: embedded schema migrations
/// - `database`: the named, observed handle every model function takes
/// - `observer`: the query-observer capability and statement classification
///
/// # Example
///
/// ```no_run
/// use witness_shared::db::{database::Database, migrations::run_migrations, pool::{create_pool, PoolConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::new(std::env::var("DATABASE_URL")?)).await?;
/// run_migrations(&pool).await?;
/// let db = Database::new(pool);
/// # Ok(())
/// # }
/// ```

pub mod database;
pub mod migrations;
pub mod observer;
pub mod pool;

pub use database::Database;
