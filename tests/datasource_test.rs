//! Integration tests for pooled connection state

mod common;

use recordhaus::prelude::*;

#[tokio::test]
async fn test_fresh_connection_state() {
    let Some(data_source) = common::setup_data_source(2).await else {
        return;
    };
    data_source.health_check().await.unwrap();
    assert_eq!(data_source.default_isolation(), IsolationLevel::ReadCommitted);

    let mut conn = data_source.get_connection().await.unwrap();
    assert!(!conn.is_read_only().await.unwrap());
    assert_eq!(
        conn.isolation_level().await.unwrap(),
        IsolationLevel::ReadCommitted
    );
}

#[tokio::test]
async fn test_state_is_reset_before_reuse() {
    // A single connection, so the second borrow gets the same session
    let Some(data_source) = common::setup_data_source(1).await else {
        return;
    };

    let backend_pid = {
        let mut conn = data_source.get_connection().await.unwrap();
        conn.set_read_only(true).await.unwrap();
        conn.set_isolation_level(IsolationLevel::Serializable).await.unwrap();
        assert!(conn.is_read_only().await.unwrap());
        assert_eq!(
            conn.isolation_level().await.unwrap(),
            IsolationLevel::Serializable
        );
        sqlx::query_scalar::<_, i32>("SELECT pg_backend_pid()")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    };

    let mut conn = data_source.get_connection().await.unwrap();
    let reused_pid = sqlx::query_scalar::<_, i32>("SELECT pg_backend_pid()")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(reused_pid, backend_pid);
    assert!(!conn.is_read_only().await.unwrap());
    assert_eq!(
        conn.isolation_level().await.unwrap(),
        IsolationLevel::ReadCommitted
    );

    // Writes work again on the reused session
    sqlx::query("CREATE TEMPORARY TABLE it_hygiene (n INTEGER)")
        .execute(&mut *conn)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_close() {
    let Some(data_source) = common::setup_data_source(1).await else {
        return;
    };
    data_source.close().await;
    assert!(matches!(
        data_source.get_connection().await.unwrap_err(),
        DbError::Connectivity { .. }
    ));
}
