// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Linked login cleanup

use std::sync::{Arc, LazyLock};

use oalink_data_model::Clock;
use oalink_storage::{RepositoryError, RepositoryFactory};
use opentelemetry::metrics::Counter;
use tracing::{debug, info};

use crate::METER;

static DELETED_COUNTER: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("oalink.linked_login.expired_deleted")
        .with_description("Number of linked logins deleted because their confirmation expired")
        .with_unit("{linked_login}")
        .build()
});

/// Deletes the linked logins whose confirmation token has expired
///
/// The current time is read from the [`Clock`] given at construction, so
/// tests can move it freely.
#[derive(Clone)]
pub struct ExpiredTokenReaper {
    repository_factory: Arc<dyn RepositoryFactory + Send + Sync>,
    clock: Arc<dyn Clock + Send>,
}

impl ExpiredTokenReaper {
    /// Create a new [`ExpiredTokenReaper`]
    pub fn new(
        repository_factory: impl RepositoryFactory + Send + Sync + 'static,
        clock: impl Clock + Send + 'static,
    ) -> Self {
        Self {
            repository_factory: Arc::new(repository_factory),
            clock: Arc::new(clock),
        }
    }

    /// Delete every linked login with a confirmation token which expired
    /// before now
    ///
    /// Returns the number of deleted linked logins. Links without a pending
    /// confirmation token are never touched.
    ///
    /// # Errors
    ///
    /// Returns the storage error as-is if the repository could not be
    /// created, or if the deletion or the commit failed. Nothing is retried.
    #[tracing::instrument(name = "job.delete_expired_confirmation_tokens", skip_all, err)]
    pub async fn delete_expired_confirmation_tokens(&self) -> Result<usize, RepositoryError> {
        let now = self.clock.now();

        let mut repo = self.repository_factory.create().await?;
        let count = repo
            .linked_login()
            .delete_expired_confirmation_tokens(now)
            .await?;
        repo.save().await?;

        if count == 0 {
            debug!("no expired confirmation tokens to clean up");
        } else {
            info!(count, "cleaned up expired confirmation tokens");
            DELETED_COUNTER.add(count.try_into().unwrap_or(u64::MAX), &[]);
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use oalink_data_model::clock::MockClock;
    use oalink_storage_sqlite::SqliteRepositoryFactory;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;
    use sqlx::SqlitePool;

    use super::*;
    use crate::test_utils::{count_links, insert_link};

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_expired_token_is_deleted(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);
        let reaper = ExpiredTokenReaper::new(factory.clone(), clock.clone());

        insert_link(
            &factory,
            &mut rng,
            &clock,
            "expired",
            Some(clock.now() - Duration::minutes(1)),
        )
        .await;

        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 1);
        assert_eq!(count_links(&factory).await, 0);
    }

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_future_token_is_kept(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);
        let reaper = ExpiredTokenReaper::new(factory.clone(), clock.clone());

        insert_link(
            &factory,
            &mut rng,
            &clock,
            "future",
            Some(clock.now() + Duration::minutes(40)),
        )
        .await;

        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 0);
        assert_eq!(count_links(&factory).await, 1);

        // Once the clock moved past the expiry, it goes away
        clock.advance(Duration::minutes(41));
        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 1);
        assert_eq!(count_links(&factory).await, 0);
    }

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_link_without_token_never_expires(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);
        let reaper = ExpiredTokenReaper::new(factory.clone(), clock.clone());

        insert_link(&factory, &mut rng, &clock, "never", None).await;

        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 0);
        assert_eq!(count_links(&factory).await, 1);

        clock.advance(Duration::days(365 * 50));
        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 0);
        assert_eq!(count_links(&factory).await, 1);
    }

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_token_expiring_now_is_kept(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);
        let reaper = ExpiredTokenReaper::new(factory.clone(), clock.clone());

        insert_link(&factory, &mut rng, &clock, "boundary", Some(clock.now())).await;

        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 0);
        assert_eq!(count_links(&factory).await, 1);

        clock.advance(Duration::milliseconds(1));
        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 1);
        assert_eq!(count_links(&factory).await, 0);
    }

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_sweep_is_idempotent(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);
        let reaper = ExpiredTokenReaper::new(factory.clone(), clock.clone());
        let now = clock.now();

        insert_link(&factory, &mut rng, &clock, "a", Some(now - Duration::minutes(1))).await;
        insert_link(&factory, &mut rng, &clock, "b", Some(now - Duration::minutes(40))).await;
        insert_link(&factory, &mut rng, &clock, "c", Some(now + Duration::minutes(40))).await;
        insert_link(&factory, &mut rng, &clock, "d", None).await;

        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 2);
        assert_eq!(count_links(&factory).await, 2);

        assert_eq!(reaper.delete_expired_confirmation_tokens().await.unwrap(), 0);
        assert_eq!(count_links(&factory).await, 2);
    }

    #[tokio::test]
    async fn test_storage_failure_is_surfaced() {
        // The schema was never applied, so the deletion itself fails
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let reaper = ExpiredTokenReaper::new(
            SqliteRepositoryFactory::new(pool.clone()),
            MockClock::default(),
        );
        let error = reaper.delete_expired_confirmation_tokens().await.unwrap_err();
        assert!(error.to_string().contains("linked_logins"));

        // And once the pool is closed, the repository can't even be created
        pool.close().await;
        assert!(reaper.delete_expired_confirmation_tokens().await.is_err());
    }
}
