//! Application-level configuration loading: store location and league rules.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::league_store::BackupPolicy;

/// Default location on disk where the application looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/league.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LEAGUE_SCORING_CONFIG_PATH";

/// File format of the league store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Single JSON document.
    #[default]
    Json,
    /// Workbook with one sheet per table.
    Xlsx,
}

impl StoreBackend {
    fn default_path(self) -> PathBuf {
        match self {
            StoreBackend::Json => PathBuf::from("league.json"),
            StoreBackend::Xlsx => PathBuf::from("league.xlsx"),
        }
    }
}

/// Where and how the league tables are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store format.
    pub backend: StoreBackend,
    /// League file location.
    pub path: PathBuf,
    /// Backup-before-write policy.
    pub backups: BackupPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: StoreBackend::default().default_path(),
            backups: BackupPolicy::default(),
        }
    }
}

/// Scoring and roster rules of the league.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LeagueRules {
    /// Race whose contributions are multiplied.
    pub season_final_race_id: String,
    /// Factor applied at the season final.
    pub final_multiplier: f64,
    /// Drivers per player.
    pub team_size: usize,
    /// Credit ceiling for a team.
    pub max_credits: u32,
}

impl LeagueRules {
    /// Multiplier applied to contributions scored at `race_id`.
    pub fn multiplier_for(&self, race_id: &str) -> f64 {
        if race_id == self.season_final_race_id {
            self.final_multiplier
        } else {
            1.0
        }
    }
}

impl Default for LeagueRules {
    fn default() -> Self {
        Self {
            season_final_race_id: "ABU".into(),
            final_multiplier: 2.0,
            team_size: 2,
            max_credits: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Where the league is stored.
    pub store: StoreConfig,
    /// Scoring and roster rules.
    pub rules: LeagueRules,
}

impl AppConfig {
    /// Load the configuration from the default location, honoring the environment override.
    pub fn load() -> Self {
        Self::load_from(resolve_config_path())
    }

    /// Load the configuration from `path`, falling back to built-in defaults.
    pub fn load_from(path: PathBuf) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        backend = ?config.store.backend,
                        store = %config.store.path.display(),
                        "loaded league configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    store: RawStoreConfig,
    rules: LeagueRules,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the `store` section.
struct RawStoreConfig {
    backend: StoreBackend,
    path: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    backups: bool,
}

impl Default for RawStoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            backup_dir: None,
            backups: true,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            store: value.store.into(),
            rules: value.rules,
        }
    }
}

impl From<RawStoreConfig> for StoreConfig {
    fn from(value: RawStoreConfig) -> Self {
        let backups = match (value.backups, value.backup_dir) {
            (false, _) => BackupPolicy::Disabled,
            (true, Some(directory)) => BackupPolicy::Directory(directory),
            (true, None) => BackupPolicy::Beside,
        };
        Self {
            path: value.path.unwrap_or_else(|| value.backend.default_path()),
            backend: value.backend,
            backups,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.rules.multiplier_for("ABU"), 2.0);
        assert_eq!(config.rules.multiplier_for("AUS"), 1.0);
    }

    #[test]
    fn store_section_selects_backend_and_backups() {
        let config = AppConfig::parse(
            r#"{
                "store": { "backend": "xlsx", "backup_dir": "backups" },
                "rules": { "max_credits": 6 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Xlsx);
        assert_eq!(config.store.path, PathBuf::from("league.xlsx"));
        assert_eq!(
            config.store.backups,
            BackupPolicy::Directory(PathBuf::from("backups"))
        );
        assert_eq!(config.rules.max_credits, 6);
        assert_eq!(config.rules.team_size, 2);
    }

    #[test]
    fn backups_can_be_disabled() {
        let config = AppConfig::parse(r#"{ "store": { "backups": false } }"#).unwrap();
        assert_eq!(config.store.backups, BackupPolicy::Disabled);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(PathBuf::from("does/not/exist.json"));
        assert_eq!(config, AppConfig::default());
    }
}
