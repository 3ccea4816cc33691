//! Pooled connections with a known session state
//!
//! Every connection handed out by `DataSource::get_connection` is read-write
//! and runs at the pool's default isolation level. Callers may change either
//! setting on a borrowed connection; the pool restores both before the
//! connection becomes idle again.

use config::{DatabaseConfig, IsolationLevel};
use record_store::{DbError, DbResult};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres};
use std::ops::{Deref, DerefMut};
use std::time::Duration;


/// Statement that puts a session back into its pooled state
fn session_reset_sql(isolation: IsolationLevel) -> String {
    format!(
        "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL {}, READ WRITE",
        isolation.to_sql()
    )
}

/// Connection pool that resets read-only and isolation state on every connection
#[derive(Clone, Debug)]
pub struct DataSource {
    pool: PgPool,
    default_isolation: IsolationLevel,
}

impl DataSource {
    /// Create a pool for the configured database
    pub async fn new(config: &DatabaseConfig) -> DbResult<Self> {
        config.validate()?;
        Self::from_url(&config.connection_string(), config).await
    }

    /// Create a pool for `url`, taking pool sizes and timeouts from `config`
    pub async fn from_url(url: &str, config: &DatabaseConfig) -> DbResult<Self> {
        let isolation = config.default_isolation;
        let connect_reset = session_reset_sql(isolation);
        let release_reset = connect_reset.clone();

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options
            .after_connect(move |conn, _meta| {
                let sql = connect_reset.clone();
                Box::pin(async move {
                    sqlx::query(&sql).execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .after_release(move |conn, meta| {
                let sql = release_reset.clone();
                Box::pin(async move {
                    match sqlx::query(&sql).execute(&mut *conn).await {
                        Ok(_) => Ok(true),
                        Err(e) => {
                            // Closing is the only way to keep the state out of the pool
                            tracing::warn!(
                                "Discarding pooled connection (age {:?}), session reset failed: {}",
                                meta.age,
                                e
                            );
                            Ok(false)
                        }
                    }
                })
            })
            .connect(url)
            .await
            .map_err(|e| DbError::connection("connect", e))?;

        debug_log!(
            "Connection pool ready: max {} connections, default isolation {}",
            config.max_connections,
            isolation
        );

        Ok(Self {
            pool,
            default_isolation: isolation,
        })
    }

    /// Borrow a read-write connection at the default isolation level
    pub async fn get_connection(&self) -> DbResult<PooledConnection> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DbError::connection("acquire", e))?;
        Ok(PooledConnection { conn })
    }

    /// Check database connection health
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::connection("health_check", e))?;
        Ok(())
    }

    /// Close every connection; later borrows fail
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn default_isolation(&self) -> IsolationLevel {
        self.default_isolation
    }
}

/// A connection borrowed from a `DataSource`, returned to the pool on drop
#[derive(Debug)]
pub struct PooledConnection {
    conn: PoolConnection<Postgres>,
}

impl PooledConnection {
    /// Whether new transactions on this session start read-only
    pub async fn is_read_only(&mut self) -> DbResult<bool> {
        let value: String = sqlx::query_scalar("SHOW default_transaction_read_only")
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| DbError::connection("is_read_only", e))?;
        Ok(value == "on")
    }

    pub async fn set_read_only(&mut self, read_only: bool) -> DbResult<()> {
        let mode = if read_only { "READ ONLY" } else { "READ WRITE" };
        sqlx::query(&format!("SET SESSION CHARACTERISTICS AS TRANSACTION {}", mode))
            .execute(&mut *self.conn)
            .await
            .map_err(|e| DbError::connection("set_read_only", e))?;
        Ok(())
    }

    /// Isolation level new transactions on this session start with
    pub async fn isolation_level(&mut self) -> DbResult<IsolationLevel> {
        let value: String = sqlx::query_scalar("SHOW default_transaction_isolation")
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| DbError::connection("isolation_level", e))?;
        IsolationLevel::from_server_name(&value).ok_or_else(|| DbError::Connectivity {
            message: format!("server reported unknown isolation level '{}'", value),
            source: None,
        })
    }

    pub async fn set_isolation_level(&mut self, isolation: IsolationLevel) -> DbResult<()> {
        sqlx::query(&format!(
            "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL {}",
            isolation.to_sql()
        ))
        .execute(&mut *self.conn)
        .await
        .map_err(|e| DbError::connection("set_isolation_level", e))?;
        Ok(())
    }
}

impl Deref for PooledConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
