// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use oalink_config::{ConfigurationSectionExt, DatabaseConfig};
use oalink_storage::SystemClock;
use oalink_storage_sqlite::SqliteRepositoryFactory;
use oalink_tasks::ExpiredTokenReaper;
use tracing::{info, info_span};

use crate::util::database_pool_from_config;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Delete the linked logins whose confirmation token expired, once
    Sweep,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as SC;
        match self.subcommand {
            SC::Sweep => {
                let _span = info_span!("cli.reaper.sweep").entered();
                let config = DatabaseConfig::extract_or_default(figment)
                    .map_err(anyhow::Error::from_boxed)?;

                let pool = database_pool_from_config(&config).await?;
                let reaper = ExpiredTokenReaper::new(
                    SqliteRepositoryFactory::new(pool.clone()),
                    SystemClock::default(),
                );

                let deleted = reaper
                    .delete_expired_confirmation_tokens()
                    .await
                    .context("failed to delete expired confirmation tokens")?;
                info!(deleted, "Sweep done");
                println!("{deleted}");

                pool.close().await;
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}
