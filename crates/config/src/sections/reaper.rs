// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::ConfigurationSection;

fn default_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn is_default_interval(value: &Duration) -> bool {
    *value == default_interval()
}

/// Configuration of the periodic deletion of expired confirmation tokens
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReaperConfig {
    /// Time between two sweeps, in seconds. Defaults to one hour.
    #[schemars(with = "u64", range(min = 1))]
    #[serde(
        default = "default_interval",
        skip_serializing_if = "is_default_interval"
    )]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl ReaperConfig {
    pub(crate) fn is_default(&self) -> bool {
        is_default_interval(&self.interval)
    }
}

impl ConfigurationSection for ReaperConfig {
    const PATH: Option<&'static str> = Some("reaper");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if self.interval.is_zero() {
            return Err("reaper.interval must be at least one second".into());
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
    use crate::ConfigurationSectionExt;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    reaper:
                      interval: 300
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = ReaperConfig::extract(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.interval, Duration::from_secs(300));

            Ok(())
        });
    }

    #[test]
    fn missing_section_uses_default() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "database: {}")?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = ReaperConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.interval, Duration::from_secs(3600));
            assert!(config.is_default());

            Ok(())
        });
    }

    #[test]
    fn zero_interval_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    reaper:
                      interval: 0
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let err = ReaperConfig::extract(&figment).unwrap_err();
            assert!(err.to_string().contains("interval"));

            Ok(())
        });
    }
}
