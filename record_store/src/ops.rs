//! Record operations on a single connection
//!
//! These functions run on whatever `PgConnection` they are given: a pooled
//! connection in auto-commit mode or the connection of an open transaction.
//! The facade decides which.

use crate::class_handler::ClassHandler;
use crate::errors::{DbError, DbResult};
use crate::id_type::RecordId;
use crate::query_builder::statement::build_query;
use crate::query_builder::{DeleteQuery, SelectQuery, SqlStatement};
use crate::traits::Record;
use chrono::{SubsecRound, Utc};
use sqlx::{PgConnection, Row};

/// Insert a transient record or update a stored one.
///
/// On insert the generated identity and the insert timestamps are written
/// back once the row exists; a failed insert leaves the record unchanged.
pub async fn store_object<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    record: &mut T,
) -> DbResult<()> {
    if record.is_persisted() {
        update_object(conn, handler, record).await
    } else {
        insert_object(conn, handler, record).await
    }
}

async fn insert_object<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    record: &mut T,
) -> DbResult<()> {
    // PostgreSQL keeps microseconds, so the record holds what the row holds
    let now = Utc::now().trunc_subsecs(6);
    let values = handler.insert_values_at(record, now)?;
    let sql = handler.insert_statement();
    debug_log!("insert into {}: {}", handler.table_name(), sql);

    let row = build_query(sql, values)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(handler.table_name(), "insert", sql, e))?;
    let id: i64 = row
        .try_get(0)
        .map_err(|e| DbError::from_sqlx(handler.table_name(), "insert", sql, e))?;

    handler.stamp_insert_timestamps(record, now)?;
    record.set_id(RecordId::new(id));
    debug_log!("inserted {} record {}", handler.table_name(), id);
    Ok(())
}

async fn update_object<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    record: &T,
) -> DbResult<()> {
    let values = handler.update_values(record)?;
    let sql = handler.update_statement();
    debug_log!("update {} record {}: {}", handler.table_name(), record.id(), sql);

    let result = build_query(sql, values)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(handler.table_name(), "update", sql, e))?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            table: handler.table_name().to_string(),
            id: record.id().value(),
        });
    }
    Ok(())
}

/// First row of the query, if any
pub async fn retrieve_object<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    query: &SelectQuery<T>,
) -> DbResult<Option<T>> {
    let statement = query.statement()?;
    let sql = statement.numbered_sql()?;
    debug_log!("retrieve from {}: {} {:?}", query.table(), sql, statement.params);

    let row = build_query(&sql, statement.params)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(query.table(), "retrieve", &sql, e))?;

    row.map(|row| handler.read_row(&row)).transpose()
}

/// All rows of the query, in result-set order
pub async fn retrieve_list<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    query: &SelectQuery<T>,
) -> DbResult<Vec<T>> {
    let statement = query.statement()?;
    let sql = statement.numbered_sql()?;
    debug_log!("retrieve list from {}: {} {:?}", query.table(), sql, statement.params);

    let rows = build_query(&sql, statement.params)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(query.table(), "retrieve_list", &sql, e))?;

    rows.iter().map(|row| handler.read_row(row)).collect()
}

/// The record stored under `id`, if any
pub async fn retrieve_by_id<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    id: RecordId,
) -> DbResult<Option<T>> {
    let sql = handler.select_by_id_statement();
    let row = build_query(sql, vec![id.into()])
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(handler.table_name(), "retrieve_by_id", sql, e))?;

    row.map(|row| handler.read_row(&row)).transpose()
}

/// First column of the first row as an integer, e.g. for `SELECT COUNT(*)`
pub async fn retrieve_count<T>(conn: &mut PgConnection, query: &SelectQuery<T>) -> DbResult<i64> {
    let statement = query.statement()?;
    let sql = statement.numbered_sql()?;
    debug_log!("count on {}: {} {:?}", query.table(), sql, statement.params);

    let row = build_query(&sql, statement.params)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(query.table(), "retrieve_count", &sql, e))?;

    row.try_get::<i64, _>(0)
        .map_err(|e| DbError::from_sqlx(query.table(), "retrieve_count", &sql, e))
}

/// Delete a stored record and mark it transient again
pub async fn delete_object<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    record: &mut T,
) -> DbResult<()> {
    if !record.is_persisted() {
        return Err(DbError::NotPersisted {
            table: handler.table_name().to_string(),
        });
    }

    let sql = handler.delete_by_id_statement();
    debug_log!("delete {} record {}", handler.table_name(), record.id());

    let result = build_query(sql, vec![record.id().into()])
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(handler.table_name(), "delete", sql, e))?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            table: handler.table_name().to_string(),
            id: record.id().value(),
        });
    }

    record.set_id(RecordId::UNSET);
    Ok(())
}

/// Run a DELETE query, returning the number of rows removed
pub async fn delete_where<T>(conn: &mut PgConnection, query: &DeleteQuery<T>) -> DbResult<u64> {
    let statement = query.statement()?;
    let sql = statement.numbered_sql()?;
    debug_log!("delete from {}: {} {:?}", query.table(), sql, statement.params);

    let result = build_query(&sql, statement.params)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(query.table(), "delete_where", &sql, e))?;
    Ok(result.rows_affected())
}

/// Reload a stored record in place
pub async fn refresh<T: Record>(
    conn: &mut PgConnection,
    handler: &ClassHandler<T>,
    record: &mut T,
) -> DbResult<()> {
    if !record.is_persisted() {
        return Err(DbError::NotPersisted {
            table: handler.table_name().to_string(),
        });
    }

    let sql = handler.select_by_id_statement();
    let row = build_query(sql, vec![record.id().into()])
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(handler.table_name(), "refresh", sql, e))?;

    match row {
        Some(row) => handler.read_into(record, &row),
        None => Err(DbError::NotFound {
            table: handler.table_name().to_string(),
            id: record.id().value(),
        }),
    }
}

/// Run any statement, returning the number of rows affected
pub async fn execute(conn: &mut PgConnection, statement: &SqlStatement) -> DbResult<u64> {
    let sql = statement.numbered_sql()?;
    debug_log!("execute: {} {:?}", sql, statement.params);

    let result = build_query(&sql, statement.params.clone())
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx("<statement>", "execute", &sql, e))?;
    Ok(result.rows_affected())
}
