//! Explicit transaction handle
//!
//! A `DbSession` owns one open transaction. Record operations on it see the
//! session's own uncommitted writes; other connections see them only after
//! `commit`. Dropping a session without committing rolls it back.

use config::IsolationLevel;
use record_store::query_builder::SqlStatement;
use record_store::{ops, DbError, DbResult, DeleteQuery, HandlerRegistry, Record, RecordId, SelectQuery};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;


pub struct DbSession {
    tx: Transaction<'static, Postgres>,
    registry: Arc<HandlerRegistry>,
    isolation: IsolationLevel,
}

impl DbSession {
    pub(crate) async fn begin(
        pool: &PgPool,
        registry: Arc<HandlerRegistry>,
        isolation: IsolationLevel,
    ) -> DbResult<Self> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DbError::connection("begin", e))?;

        // Must run before the first statement of the transaction
        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            isolation.to_sql()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::connection("set_transaction_isolation", e))?;

        debug_log!("Transaction started at {}", isolation);
        Ok(Self {
            tx,
            registry,
            isolation,
        })
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub async fn store_object<T: Record>(&mut self, record: &mut T) -> DbResult<()> {
        let handler = self.registry.handler_for::<T>()?;
        ops::store_object(&mut self.tx, &handler, record).await
    }

    pub async fn retrieve_object<T: Record>(&mut self, query: &SelectQuery<T>) -> DbResult<Option<T>> {
        let handler = self.registry.handler_for::<T>()?;
        ops::retrieve_object(&mut self.tx, &handler, query).await
    }

    pub async fn retrieve_list<T: Record>(&mut self, query: &SelectQuery<T>) -> DbResult<Vec<T>> {
        let handler = self.registry.handler_for::<T>()?;
        ops::retrieve_list(&mut self.tx, &handler, query).await
    }

    pub async fn retrieve_by_id<T: Record>(&mut self, id: RecordId) -> DbResult<Option<T>> {
        let handler = self.registry.handler_for::<T>()?;
        ops::retrieve_by_id(&mut self.tx, &handler, id).await
    }

    pub async fn retrieve_count<T>(&mut self, query: &SelectQuery<T>) -> DbResult<i64> {
        ops::retrieve_count(&mut self.tx, query).await
    }

    pub async fn delete_object<T: Record>(&mut self, record: &mut T) -> DbResult<()> {
        let handler = self.registry.handler_for::<T>()?;
        ops::delete_object(&mut self.tx, &handler, record).await
    }

    pub async fn delete_where<T>(&mut self, query: &DeleteQuery<T>) -> DbResult<u64> {
        ops::delete_where(&mut self.tx, query).await
    }

    pub async fn refresh<T: Record>(&mut self, record: &mut T) -> DbResult<()> {
        let handler = self.registry.handler_for::<T>()?;
        ops::refresh(&mut self.tx, &handler, record).await
    }

    pub async fn execute(&mut self, statement: &SqlStatement) -> DbResult<u64> {
        ops::execute(&mut self.tx, statement).await
    }

    /// Make the session's work visible to other connections
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::connection("commit", e))?;
        debug_log!("Transaction committed");
        Ok(())
    }

    /// Discard the session's work
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::connection("rollback", e))?;
        debug_log!("Transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for DbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSession")
            .field("isolation", &self.isolation)
            .finish_non_exhaustive()
    }
}
