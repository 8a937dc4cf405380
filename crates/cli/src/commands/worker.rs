// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use oalink_config::{ConfigurationSection, RootConfig};
use oalink_storage::SystemClock;
use oalink_storage_sqlite::{MIGRATOR, SqliteRepositoryFactory};
use oalink_tasks::{ExpiredTokenReaper, ReaperWorker};
use tracing::{Instrument, info, info_span};

use crate::{shutdown::ShutdownManager, util::database_pool_from_config};

#[derive(Parser, Debug, Default)]
pub(super) struct Options {
    /// Apply pending database migrations before starting
    #[arg(long)]
    migrate: bool,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let shutdown = ShutdownManager::new()?;
        let span = info_span!("cli.worker.init").entered();
        let config = RootConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        // Connect to the database
        info!("Connecting to the database");
        let pool = database_pool_from_config(&config.database).await?;

        if self.migrate {
            info!("Running pending migrations");
            MIGRATOR
                .run(&pool)
                .instrument(info_span!("db.migrate"))
                .await
                .context("could not run migrations")?;
        }

        let reaper =
            ExpiredTokenReaper::new(SqliteRepositoryFactory::new(pool), SystemClock::default());
        let worker = ReaperWorker::new(
            reaper,
            config.reaper.interval,
            shutdown.soft_shutdown_token(),
        );

        shutdown.task_tracker().spawn(async move {
            let sweeps = worker.run().await;
            tracing::debug!(sweeps, "Reaper worker exited");
        });
        span.exit();

        shutdown.run().await;

        Ok(ExitCode::SUCCESS)
    }
}
