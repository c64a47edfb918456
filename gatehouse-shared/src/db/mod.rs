/// Database layer for Gatehouse
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: embedded migrations, applied or rolled back at boot
/// - `changeset`: column-level diff between a record and its stored row
/// - `record`: table-generic fetch, update and delete
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(&config).await?;
///     Ok(())
/// }
/// ```

pub mod changeset;
pub mod migrations;
pub mod pool;
pub mod record;
