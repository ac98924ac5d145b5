use crate::config::Config;
use crate::types::Result;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Error as ManagerError};
use diesel::sqlite::SqliteConnection;
use std::time::Duration;

pub mod schema;

static SCHEMA: &str = include_str!("schema.sql");

// An alias to the type for a pool of Diesel SQLite connections.
pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub type DbConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// Applied to every connection the pool opens: foreign keys are off by default
/// in SQLite, and a busy store should fail after `busy_timeout` instead of
/// blocking the caller indefinitely.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, ManagerError> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> ::std::result::Result<(), ManagerError> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(ManagerError::QueryError)
    }
}

pub fn init_pool(config: &Config) -> Result<Pool> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let manager = ConnectionManager::<SqliteConnection>::new(config.database_url.as_str());
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(timeout)
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: timeout,
        }))
        .build(manager)?;
    info!(
        pool_size = config.pool_size,
        timeout_seconds = config.timeout_seconds,
        "database pool ready"
    );
    Ok(pool)
}

/// An isolated store that lives as long as the returned pool. The pool holds a
/// single connection that is never recycled, since every new `:memory:`
/// connection would open an empty database.
pub fn memory_pool() -> Result<Pool> {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .max_lifetime(None)
        .idle_timeout(None)
        .test_on_check_out(false)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: Duration::from_secs(5),
        }))
        .build(manager)?;
    create_schema(&mut *pool.get()?)?;
    Ok(pool)
}

/// Creates any missing tables and indexes. Existing tables are left untouched.
pub fn create_schema(conn: &mut SqliteConnection) -> Result<()> {
    conn.batch_execute(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::dsl::count_star;
    use diesel::prelude::*;

    #[test]
    fn memory_pool_has_empty_tables() {
        use self::schema::users::dsl::*;
        let pool = memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let total = users.select(count_star()).first::<i64>(&mut conn).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn schema_creation_is_repeatable() {
        let pool = memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        create_schema(&mut conn).unwrap();
    }
}
