// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use anyhow::Context;
use oalink_config::DatabaseConfig;
use sqlx::{
    ConnectOptions, SqliteConnection, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::log::LevelFilter;

fn database_connect_options_from_config(
    config: &DatabaseConfig,
) -> Result<SqliteConnectOptions, anyhow::Error> {
    let options: SqliteConnectOptions = config
        .uri
        .parse()
        .context("could not parse database connection string")?;

    // SQLite reports a locked database instead of waiting, unless told otherwise
    let options = options
        .busy_timeout(config.connect_timeout)
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(100));

    Ok(options)
}

/// Create a database connection pool from the configuration
#[tracing::instrument(name = "db.connect", skip_all)]
pub async fn database_pool_from_config(
    config: &DatabaseConfig,
) -> Result<SqlitePool, anyhow::Error> {
    let options = database_connect_options_from_config(config)?;
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.into())
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect_with(options)
        .await
        .context("could not connect to the database")
}

/// Create a single database connection from the configuration
#[tracing::instrument(name = "db.connect", skip_all)]
pub async fn database_connection_from_config(
    config: &DatabaseConfig,
) -> Result<SqliteConnection, anyhow::Error> {
    database_connect_options_from_config(config)?
        .connect()
        .await
        .context("could not connect to the database")
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use oalink_storage::{RepositoryFactory, linked_login::LinkedLoginFilter};
    use oalink_storage_sqlite::{MIGRATOR, SqliteRepositoryFactory};

    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            uri: "sqlite::memory:".to_owned(),
            // Every connection to an in-memory database sees its own database
            max_connections: NonZeroU32::MIN,
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn pool_from_config_is_usable() {
        let pool = database_pool_from_config(&memory_config()).await.unwrap();
        MIGRATOR.run(&pool).await.unwrap();

        let factory = SqliteRepositoryFactory::new(pool);
        let mut repo = factory.create().await.unwrap();
        let count = repo
            .linked_login()
            .count(LinkedLoginFilter::new())
            .await
            .unwrap();
        repo.save().await.unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn connection_from_config_runs_migrations() {
        let mut conn = database_connection_from_config(&memory_config())
            .await
            .unwrap();
        MIGRATOR.run(&mut conn).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_uri_is_reported() {
        let config = DatabaseConfig {
            uri: "sqlite://does/not/exist/at/all.db?mode=ro".to_owned(),
            ..memory_config()
        };

        let err = database_connection_from_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("could not connect"));
    }
}
