//! Shared setup for the database integration tests
//!
//! Tests connect to the database named by `DATABASE_URL` and return early
//! when it is not set.

#![allow(dead_code)]

use recordhaus::prelude::*;

pub fn database_url() -> Option<String> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("DATABASE_URL is not set, skipping database test");
            None
        }
    }
}

pub async fn setup_data_source(max_connections: u32) -> Option<DataSource> {
    let url = database_url()?;
    let mut config = DatabaseConfig::default();
    config.min_connections = 1;
    config.max_connections = max_connections;
    Some(
        DataSource::from_url(&url, &config)
            .await
            .expect("Failed to connect to database"),
    )
}

pub async fn setup_services() -> Option<DbServices> {
    let data_source = setup_data_source(5).await?;
    Some(DbServices::with_data_source(data_source, RetryConfig::default()))
}
