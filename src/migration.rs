//! Table management for record types
//!
//! Tables are created from the `ClassHandler` of a record type. There is no
//! schema evolution: `ensure_table` creates missing tables, and with
//! `recreate` drops and creates them again.

use record_store::{DbError, DbResult, Record};

use crate::core::DbServices;

impl DbServices {
    /// Whether the table of `T` exists in the current schema
    pub async fn table_exists<T: Record>(&self) -> DbResult<bool> {
        let handler = self.class_handler::<T>()?;
        let sql = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                   WHERE table_schema = current_schema() AND table_name = $1)";
        let mut conn = self.data_source().get_connection().await?;
        sqlx::query_scalar::<_, bool>(sql)
            .bind(handler.table_name())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(handler.table_name(), "table_exists", sql, e))
    }

    /// Create the table of `T` unless it exists
    pub async fn create_table<T: Record>(&self) -> DbResult<()> {
        let handler = self.class_handler::<T>()?;
        let sql = handler.create_statement();
        debug_log!("Creating table with SQL: {}", sql);
        let mut conn = self.data_source().get_connection().await?;
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(handler.table_name(), "create_table", sql, e))?;
        Ok(())
    }

    /// Drop the table of `T` if it exists
    pub async fn drop_table<T: Record>(&self) -> DbResult<()> {
        let handler = self.class_handler::<T>()?;
        let sql = handler.drop_statement();
        debug_log!("Dropping table with SQL: {}", sql);
        let mut conn = self.data_source().get_connection().await?;
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(handler.table_name(), "drop_table", sql, e))?;
        Ok(())
    }

    /// Make sure the table of `T` exists; with `recreate` start from an empty table
    pub async fn ensure_table<T: Record>(&self, recreate: bool) -> DbResult<()> {
        if recreate {
            self.drop_table::<T>().await?;
        }
        self.create_table::<T>().await?;
        tracing::info!("Table '{}' is ready", T::table_name());
        Ok(())
    }
}
