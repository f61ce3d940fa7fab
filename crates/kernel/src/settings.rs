use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "LIBRIS_ENV";
const CONFIG_DIR_ENV: &str = "LIBRIS_CONFIG_DIR";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("LIBRIS")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = environment.parse()?;
        settings.catalog.check()?;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "TelemetrySettings::default_level")]
    pub level: String,
}

impl TelemetrySettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Inclusive price bounds, in whole currency units.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PriceRangeSettings {
    pub min: u64,
    pub max: u64,
}

/// Upper bound for day-count windows, roughly ten thousand years.
const MAX_WINDOW_DAYS: i64 = 3_652_500;

/// Book catalog rules that vary between deployments.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// Name of the validation policy applied by the default endpoints.
    #[serde(default = "CatalogSettings::default_policy")]
    pub policy: String,
    /// Overrides the preset price range of every policy that checks one.
    #[serde(default)]
    pub price_range: Option<PriceRangeSettings>,
    #[serde(default = "CatalogSettings::default_recent_window_days")]
    pub recent_window_days: i64,
    #[serde(default = "CatalogSettings::default_recent_price_floor")]
    pub recent_price_floor: u64,
    #[serde(default = "CatalogSettings::default_max_age_days")]
    pub max_age_days: i64,
    #[serde(default = "CatalogSettings::default_min_year")]
    pub min_year: i32,
    #[serde(default = "CatalogSettings::default_page_size")]
    pub page_size: usize,
}

impl CatalogSettings {
    fn default_policy() -> String {
        "strict".to_string()
    }

    fn default_recent_window_days() -> i64 {
        365
    }

    fn default_recent_price_floor() -> u64 {
        20
    }

    fn default_max_age_days() -> i64 {
        36500
    }

    fn default_min_year() -> i32 {
        1450
    }

    fn default_page_size() -> usize {
        10
    }

    fn check(&self) -> anyhow::Result<()> {
        if let Some(range) = self.price_range {
            if range.min > range.max {
                return Err(anyhow!(
                    "catalog.price_range.min ({}) must not exceed catalog.price_range.max ({})",
                    range.min,
                    range.max
                ));
            }
        }
        if self.page_size == 0 {
            return Err(anyhow!("catalog.page_size must be at least 1"));
        }
        for (key, days) in [
            ("max_age_days", self.max_age_days),
            ("recent_window_days", self.recent_window_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(anyhow!(
                    "catalog.{key} ({days}) must be between 0 and {MAX_WINDOW_DAYS}"
                ));
            }
        }
        Ok(())
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            policy: Self::default_policy(),
            price_range: None,
            recent_window_days: Self::default_recent_window_days(),
            recent_price_floor: Self::default_recent_price_floor(),
            max_age_days: Self::default_max_age_days(),
            min_year: Self::default_min_year(),
            page_size: Self::default_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn test_default_catalog_rules() {
        let settings = Settings::default();
        assert_eq!(settings.catalog.policy, "strict");
        assert_eq!(settings.catalog.recent_window_days, 365);
        assert_eq!(settings.catalog.recent_price_floor, 20);
        assert_eq!(settings.catalog.min_year, 1450);
        assert_eq!(settings.catalog.page_size, 10);
        assert!(settings.catalog.price_range.is_none());
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn test_inverted_price_range_is_rejected() {
        let catalog = CatalogSettings {
            price_range: Some(PriceRangeSettings { min: 10, max: 5 }),
            ..CatalogSettings::default()
        };
        assert!(catalog.check().is_err());
    }

    #[test]
    fn test_out_of_range_day_windows_are_rejected() {
        for catalog in [
            CatalogSettings {
                max_age_days: 1_000_000_000,
                ..CatalogSettings::default()
            },
            CatalogSettings {
                max_age_days: -1,
                ..CatalogSettings::default()
            },
            CatalogSettings {
                recent_window_days: i64::MAX,
                ..CatalogSettings::default()
            },
        ] {
            assert!(catalog.check().is_err(), "{catalog:?}");
        }

        let catalog = CatalogSettings {
            max_age_days: MAX_WINDOW_DAYS,
            recent_window_days: 0,
            ..CatalogSettings::default()
        };
        assert!(catalog.check().is_ok());
    }

    #[test]
    fn test_missing_config_dir_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("libris-settings-missing");
        let settings = Settings::load_from(&dir, "staging").unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 8080);
    }
}
