// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{num::NonZeroU32, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error};
use serde_with::serde_as;

use crate::ConfigurationSection;

fn default_uri() -> String {
    "sqlite://oalink.db?mode=rwc".to_owned()
}

fn default_max_connections() -> NonZeroU32 {
    NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

#[allow(clippy::unnecessary_wraps)]
fn default_idle_timeout() -> Option<Duration> {
    Some(Duration::from_secs(10 * 60))
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_lifetime() -> Option<Duration> {
    Some(Duration::from_secs(30 * 60))
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            max_connections: default_max_connections(),
            min_connections: Default::default(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            max_lifetime: default_max_lifetime(),
        }
    }
}

/// Database connection configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseConfig {
    /// Connection URI of the SQLite database
    ///
    /// Use `?mode=rwc` to create the database file if it does not exist.
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Set the maximum number of connections the pool should maintain
    #[serde(default = "default_max_connections")]
    #[schemars(with = "u32", range(min = 1))]
    pub max_connections: NonZeroU32,

    /// Set the minimum number of connections the pool should maintain
    #[serde(default)]
    pub min_connections: u32,

    /// Set the amount of time to attempt connecting to the database
    #[schemars(with = "u64")]
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub connect_timeout: Duration,

    /// Set a maximum idle duration for individual connections
    #[schemars(with = "Option<u64>")]
    #[serde(
        default = "default_idle_timeout",
        skip_serializing_if = "Option::is_none"
    )]
    #[serde_as(as = "Option<serde_with::DurationSeconds<u64>>")]
    pub idle_timeout: Option<Duration>,

    /// Set the maximum lifetime of individual connections
    #[schemars(with = "Option<u64>")]
    #[serde(
        default = "default_max_lifetime",
        skip_serializing_if = "Option::is_none"
    )]
    #[serde_as(as = "Option<serde_with::DurationSeconds<u64>>")]
    pub max_lifetime: Option<Duration>,
}

impl ConfigurationSection for DatabaseConfig {
    const PATH: Option<&'static str> = Some("database");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let metadata = figment.find_metadata("database");

        let error_on_field = |mut error: figment::error::Error, field: &'static str| {
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec!["database".to_owned(), field.to_owned()];
            error
        };

        if !self.uri.starts_with("sqlite:") {
            return Err(error_on_field(
                figment::error::Error::custom("expected a `sqlite:` URI"),
                "uri",
            )
            .into());
        }

        if self.min_connections > self.max_connections.get() {
            return Err(error_on_field(
                figment::error::Error::custom("must not be greater than `max_connections`"),
                "min_connections",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };

    use super::*;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    database:
                      uri: sqlite:///var/lib/oalink/links.db
                      max_connections: 4
                      connect_timeout: 5
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = DatabaseConfig::extract(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.uri, "sqlite:///var/lib/oalink/links.db");
            assert_eq!(config.max_connections.get(), 4);
            assert_eq!(config.min_connections, 0);
            assert_eq!(config.connect_timeout, Duration::from_secs(5));
            assert_eq!(config.idle_timeout, Some(Duration::from_secs(600)));
            assert_eq!(config.max_lifetime, Some(Duration::from_secs(1800)));

            Ok(())
        });
    }

    #[test]
    fn reject_non_sqlite_uri() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    database:
                      uri: postgresql://localhost/oalink
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(DatabaseConfig::extract(&figment).is_err());

            Ok(())
        });
    }

    #[test]
    fn reject_min_above_max() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    database:
                      max_connections: 2
                      min_connections: 3
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(DatabaseConfig::extract(&figment).is_err());

            Ok(())
        });
    }
}
