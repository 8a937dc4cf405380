// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

use crate::ExpiredTokenReaper;

/// Runs an [`ExpiredTokenReaper`] on a fixed interval, until cancelled
///
/// The first sweep happens right away. A failed sweep is logged and retried on
/// the next tick.
pub struct ReaperWorker {
    reaper: ExpiredTokenReaper,
    interval: Duration,
    cancellation_token: CancellationToken,
}

impl ReaperWorker {
    /// Create a new [`ReaperWorker`]
    #[must_use]
    pub fn new(
        reaper: ExpiredTokenReaper,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            reaper,
            interval,
            cancellation_token,
        }
    }

    /// Run the worker until the cancellation token is cancelled
    ///
    /// Returns how many sweeps were attempted.
    pub async fn run(self) -> u64 {
        let mut interval = tokio::time::interval(self.interval);
        // If a sweep takes longer than the interval, don't try to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "Starting the expired confirmation token reaper");

        let mut sweeps = 0;
        loop {
            tokio::select! {
                biased;

                () = self.cancellation_token.cancelled() => {
                    break;
                }

                _ = interval.tick() => {}
            }

            sweeps += 1;
            let span = info_span!("worker.reaper.tick", sweep = sweeps);
            let res = self
                .reaper
                .delete_expired_confirmation_tokens()
                .instrument(span)
                .await;

            if let Err(e) = res {
                error!(
                    error = &e as &dyn std::error::Error,
                    "Failed to delete expired confirmation tokens, will retry on the next tick"
                );
            }
        }

        info!(sweeps, "Expired confirmation token reaper stopped");
        sweeps
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use oalink_data_model::{Clock, clock::MockClock};
    use oalink_storage_sqlite::SqliteRepositoryFactory;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;
    use sqlx::SqlitePool;

    use super::*;
    use crate::test_utils::{count_links, insert_link};

    /// Poll the store until it holds the expected number of links
    async fn wait_for_count(factory: &SqliteRepositoryFactory, expected: usize) -> bool {
        for _ in 0..100 {
            if count_links(factory).await == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_worker_sweeps_on_start(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);

        insert_link(
            &factory,
            &mut rng,
            &clock,
            "expired",
            Some(clock.now() - ChronoDuration::minutes(1)),
        )
        .await;

        let token = CancellationToken::new();
        let worker = ReaperWorker::new(
            ExpiredTokenReaper::new(factory.clone(), clock.clone()),
            // Long enough that only the initial sweep happens during the test
            Duration::from_secs(3600),
            token.clone(),
        );
        let handle = tokio::spawn(worker.run());

        assert!(wait_for_count(&factory, 0).await);

        token.cancel();
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[sqlx::test(migrator = "oalink_storage_sqlite::MIGRATOR")]
    async fn test_worker_sweeps_on_each_tick(pool: SqlitePool) {
        let factory = SqliteRepositoryFactory::new(pool);
        let clock = Arc::new(MockClock::default());
        let mut rng = ChaChaRng::seed_from_u64(42);

        insert_link(
            &factory,
            &mut rng,
            &clock,
            "future",
            Some(clock.now() + ChronoDuration::minutes(40)),
        )
        .await;
        insert_link(&factory, &mut rng, &clock, "never", None).await;

        let token = CancellationToken::new();
        let worker = ReaperWorker::new(
            ExpiredTokenReaper::new(factory.clone(), clock.clone()),
            Duration::from_millis(10),
            token.clone(),
        );
        let handle = tokio::spawn(worker.run());

        // Nothing expired yet, so nothing goes away
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count_links(&factory).await, 2);

        // Once the clock moved past the expiry, a later tick removes the link
        clock.advance(ChronoDuration::minutes(41));
        assert!(wait_for_count(&factory, 1).await);

        token.cancel();
        assert!(handle.await.unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_worker_keeps_running_after_failures() {
        // The schema is missing, so every sweep fails
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let token = CancellationToken::new();
        let worker = ReaperWorker::new(
            ExpiredTokenReaper::new(SqliteRepositoryFactory::new(pool), MockClock::default()),
            Duration::from_millis(5),
            token.clone(),
        );
        let handle = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        token.cancel();
        assert!(handle.await.unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_cancelled_worker_does_not_sweep() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let worker = ReaperWorker::new(
            ExpiredTokenReaper::new(SqliteRepositoryFactory::new(pool), MockClock::default()),
            Duration::from_secs(3600),
            token,
        );

        assert_eq!(worker.run().await, 0);
    }
}
