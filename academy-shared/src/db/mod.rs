/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// # Example
///
/// ```no_run
/// use academy_shared::db::pool::{create_pool, DatabaseConfig};
/// use academy_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod pool;
pub mod migrations;
