// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod database;
mod reaper;

pub use self::{database::DatabaseConfig, reaper::ReaperConfig};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Configuration of the expired confirmation token reaper
    #[serde(default, skip_serializing_if = "ReaperConfig::is_default")]
    pub reaper: ReaperConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.database.validate(figment)?;
        self.reaper.validate(figment)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use figment::{
        Figment, Jail,
        providers::{Env, Format, Yaml},
    };

    use super::*;

    #[test]
    fn load_empty_config() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "{}")?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = RootConfig::extract(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.database, DatabaseConfig::default());
            assert_eq!(config.reaper, ReaperConfig::default());

            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                indoc::indoc! {r"
                    database:
                      uri: sqlite://from-file.db
                    reaper:
                      interval: 600
                "},
            )?;
            jail.set_env("OALINK_DATABASE__URI", "sqlite://from-env.db");
            jail.set_env("OALINK_REAPER__INTERVAL", "30");

            let figment = Figment::new()
                .merge(Yaml::file("config.yaml"))
                .merge(Env::prefixed("OALINK_").split("__"));
            let config = RootConfig::extract(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.database.uri, "sqlite://from-env.db");
            assert_eq!(config.reaper.interval, Duration::from_secs(30));

            Ok(())
        });
    }

    #[test]
    fn invalid_section_fails_the_root() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                indoc::indoc! {r"
                    reaper:
                      interval: 0
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(RootConfig::extract(&figment).is_err());

            Ok(())
        });
    }

    #[test]
    fn dump_skips_default_reaper() {
        let dumped = serde_json::to_value(RootConfig::default()).unwrap();
        assert!(dumped.get("database").is_some());
        assert!(dumped.get("reaper").is_none());
    }
}
