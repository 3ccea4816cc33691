//! Core RecordHaus functionality
//!
//! `DbServices` is the entry point for record persistence. Each operation
//! outside a session borrows a pooled connection and runs in auto-commit
//! mode; `start_transaction`, `with_session` and `transaction_with_retry`
//! group operations into one transaction.

use config::{AppConfig, IsolationLevel, RetryConfig};
use futures::future::BoxFuture;
use record_store::query_builder::SqlStatement;
use record_store::{
    ops, ClassHandler, DbError, DbResult, DeleteQuery, HandlerRegistry, Record, RecordId,
    SelectQuery,
};
use std::sync::Arc;

use crate::datasource::{DataSource, PooledConnection};
use crate::retry::backoff_delay;
use crate::session::DbSession;

/// Persistence facade over a connection pool and a handler registry
#[derive(Clone, Debug)]
pub struct DbServices {
    data_source: DataSource,
    registry: Arc<HandlerRegistry>,
    retry: RetryConfig,
}

impl DbServices {
    /// Connect with the given configuration
    pub async fn new(config: &AppConfig) -> DbResult<Self> {
        config.validate()?;
        let data_source = DataSource::new(&config.database).await?;
        Ok(Self::with_data_source(data_source, config.retry.clone()))
    }

    /// Use an existing data source and a fresh handler registry
    pub fn with_data_source(data_source: DataSource, retry: RetryConfig) -> Self {
        Self {
            data_source,
            registry: Arc::new(HandlerRegistry::new()),
            retry,
        }
    }

    /// Share `registry` with other facades
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// The mapping for `T`, built on first use
    pub fn class_handler<T: Record>(&self) -> DbResult<Arc<ClassHandler<T>>> {
        self.registry.handler_for::<T>()
    }

    async fn connection(&self) -> DbResult<PooledConnection> {
        self.data_source.get_connection().await
    }

    /// Insert a transient record or update a stored one
    pub async fn store_object<T: Record>(&self, record: &mut T) -> DbResult<()> {
        let handler = self.class_handler::<T>()?;
        let mut conn = self.connection().await?;
        ops::store_object(&mut conn, &handler, record).await
    }

    pub async fn retrieve_object<T: Record>(&self, query: &SelectQuery<T>) -> DbResult<Option<T>> {
        let handler = self.class_handler::<T>()?;
        let mut conn = self.connection().await?;
        ops::retrieve_object(&mut conn, &handler, query).await
    }

    pub async fn retrieve_list<T: Record>(&self, query: &SelectQuery<T>) -> DbResult<Vec<T>> {
        let handler = self.class_handler::<T>()?;
        let mut conn = self.connection().await?;
        ops::retrieve_list(&mut conn, &handler, query).await
    }

    pub async fn retrieve_by_id<T: Record>(&self, id: RecordId) -> DbResult<Option<T>> {
        let handler = self.class_handler::<T>()?;
        let mut conn = self.connection().await?;
        ops::retrieve_by_id(&mut conn, &handler, id).await
    }

    pub async fn retrieve_count<T>(&self, query: &SelectQuery<T>) -> DbResult<i64> {
        let mut conn = self.connection().await?;
        ops::retrieve_count(&mut conn, query).await
    }

    /// Delete a stored record and mark it transient again
    pub async fn delete_object<T: Record>(&self, record: &mut T) -> DbResult<()> {
        let handler = self.class_handler::<T>()?;
        let mut conn = self.connection().await?;
        ops::delete_object(&mut conn, &handler, record).await
    }

    pub async fn delete_where<T>(&self, query: &DeleteQuery<T>) -> DbResult<u64> {
        let mut conn = self.connection().await?;
        ops::delete_where(&mut conn, query).await
    }

    /// Reload a stored record in place
    pub async fn refresh<T: Record>(&self, record: &mut T) -> DbResult<()> {
        let handler = self.class_handler::<T>()?;
        let mut conn = self.connection().await?;
        ops::refresh(&mut conn, &handler, record).await
    }

    pub async fn execute(&self, statement: &SqlStatement) -> DbResult<u64> {
        let mut conn = self.connection().await?;
        ops::execute(&mut conn, statement).await
    }

    /// Open a transaction; the session rolls back unless committed
    pub async fn start_transaction(&self, isolation: IsolationLevel) -> DbResult<DbSession> {
        DbSession::begin(self.data_source.pool(), self.registry.clone(), isolation).await
    }

    /// Run `work` in one transaction, committing on success and rolling back on error
    pub async fn with_session<R, F>(&self, isolation: IsolationLevel, work: F) -> DbResult<R>
    where
        F: for<'s> FnOnce(&'s mut DbSession) -> BoxFuture<'s, DbResult<R>>,
    {
        let mut session = self.start_transaction(isolation).await?;
        match work(&mut session).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    tracing::warn!("Rollback after failed unit of work failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Run `work` as a unit of work, retrying the whole unit on transient conflicts.
    ///
    /// Each attempt runs in a fresh transaction at the configured retry
    /// isolation level. Serialization failures and deadlocks, raised by the
    /// work or by the commit, roll the attempt back and rerun `work` after a
    /// backoff delay. Other errors are returned at once. When every attempt
    /// conflicts the last error is returned inside `DbError::RetriesExhausted`.
    pub async fn transaction_with_retry<R, F>(&self, mut work: F) -> DbResult<R>
    where
        F: for<'s> FnMut(&'s mut DbSession) -> BoxFuture<'s, DbResult<R>> + Send,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.run_attempt(&mut work).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("Transaction succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    "Transaction gave up after {} attempts, last error: {}",
                    attempt,
                    err
                );
                return Err(DbError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = backoff_delay(&self.retry, attempt);
            tracing::warn!(
                "Transaction attempt {}/{} hit a conflict (sqlstate {:?}), retrying in {:?}: {}",
                attempt,
                max_attempts,
                err.sqlstate(),
                delay,
                err
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_attempt<R, F>(&self, work: &mut F) -> DbResult<R>
    where
        F: for<'s> FnMut(&'s mut DbSession) -> BoxFuture<'s, DbResult<R>> + Send,
    {
        let mut session = self.start_transaction(self.retry.isolation).await?;
        match work(&mut session).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(err) => {
                // A failed rollback only closes the connection, the work error matters more
                if let Err(rollback_err) = session.rollback().await {
                    tracing::warn!("Rollback of failed attempt failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Check database connection health
    pub async fn health_check(&self) -> DbResult<()> {
        self.data_source.health_check().await
    }
}
