// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

mod config;
mod database;
mod reaper;
mod worker;

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Manage the database
    Database(self::database::Options),

    /// Run the expired confirmation token reaper once
    Reaper(self::reaper::Options),

    /// Periodically delete expired confirmation tokens, until signalled
    Worker(self::worker::Options),
}

#[derive(Parser, Debug)]
#[command(version)]
pub struct Options {
    /// Path to the configuration file
    #[arg(short, long, global = true, action = clap::ArgAction::Append)]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Subcommand,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            S::Config(c) => c.run(figment).await,
            S::Database(c) => c.run(figment).await,
            S::Reaper(c) => c.run(figment).await,
            S::Worker(c) => c.run(figment).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    ///
    /// Files are merged in the order they were given, and environment
    /// variables prefixed with `OALINK_` take precedence over all of them.
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the OALINK_CONFIG environment variable
            std::env::var("OALINK_CONFIG")
                // Default to "config.yaml"
                .unwrap_or_else(|_| "config.yaml".to_owned())
                // Split the file list on `:`
                .split(':')
                .map(Utf8PathBuf::from)
                .collect()
        } else {
            self.config.clone()
        };

        configs
            .into_iter()
            .fold(Figment::new(), |f, path| f.admerge(Yaml::file(path)))
            .merge(
                Env::prefixed("OALINK_")
                    .ignore(&["config"])
                    .split("__"),
            )
    }
}
