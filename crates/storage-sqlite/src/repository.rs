// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use futures_util::{FutureExt, TryFutureExt, future::BoxFuture};
use oalink_storage::{
    BoxRepository, BoxRepositoryFactory, MapErr, Repository, RepositoryAccess, RepositoryError,
    RepositoryFactory, RepositoryTransaction, linked_login::LinkedLoginRepository,
};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::Instrument;

use crate::{
    DatabaseError, linked_login::SqliteLinkedLoginRepository,
    telemetry::DB_CLIENT_CONNECTIONS_CREATE_TIME_HISTOGRAM,
};

/// An implementation of the [`RepositoryFactory`] trait backed by a SQLite
/// connection pool.
#[derive(Clone)]
pub struct SqliteRepositoryFactory {
    pool: SqlitePool,
}

impl SqliteRepositoryFactory {
    /// Create a new [`SqliteRepositoryFactory`] from a SQLite connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Box the factory
    #[must_use]
    pub fn boxed(self) -> BoxRepositoryFactory {
        Box::new(self)
    }

    /// Get the underlying SQLite connection pool
    #[must_use]
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }
}

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        let start = std::time::Instant::now();
        let repo = SqliteRepository::from_pool(&self.pool)
            .await
            .map_err(RepositoryError::from_error)?
            .boxed();

        // Measure the time it took to create the connection
        let duration = start.elapsed();
        let duration_ms = duration.as_millis().try_into().unwrap_or(u64::MAX);
        DB_CLIENT_CONNECTIONS_CREATE_TIME_HISTOGRAM.record(duration_ms, &[]);

        Ok(repo)
    }
}

/// An implementation of the [`Repository`] trait backed by a SQLite
/// transaction.
pub struct SqliteRepository<C = Transaction<'static, Sqlite>> {
    conn: C,
}

impl SqliteRepository {
    /// Create a new [`SqliteRepository`] from a SQLite connection pool,
    /// starting a transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the transaction could not be started.
    pub async fn from_pool(pool: &SqlitePool) -> Result<Self, DatabaseError> {
        let txn = pool.begin().await?;
        Ok(Self::from_conn(txn))
    }

    /// Transform the repository into a type-erased [`BoxRepository`]
    pub fn boxed(self) -> BoxRepository {
        Box::new(MapErr::new(self, RepositoryError::from_error))
    }
}

impl<C> SqliteRepository<C> {
    /// Create a new [`SqliteRepository`] from an existing SQLite connection
    /// with a transaction
    pub fn from_conn(conn: C) -> Self {
        SqliteRepository { conn }
    }

    /// Consume this [`SqliteRepository`], returning the underlying connection.
    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl<C> Deref for SqliteRepository<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<C> DerefMut for SqliteRepository<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Repository<DatabaseError> for SqliteRepository {}

impl RepositoryTransaction for SqliteRepository {
    type Error = DatabaseError;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        let span = tracing::info_span!("db.save");
        self.conn
            .commit()
            .map_err(DatabaseError::from)
            .instrument(span)
            .boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        let span = tracing::info_span!("db.cancel");
        self.conn
            .rollback()
            .map_err(DatabaseError::from)
            .instrument(span)
            .boxed()
    }
}

impl<C> RepositoryAccess for SqliteRepository<C>
where
    C: AsMut<SqliteConnection> + Send,
{
    type Error = DatabaseError;

    fn linked_login<'c>(
        &'c mut self,
    ) -> Box<dyn LinkedLoginRepository<Error = Self::Error> + 'c> {
        Box::new(SqliteLinkedLoginRepository::new(self.conn.as_mut()))
    }
}
