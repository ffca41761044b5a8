//! Application configuration.
//!
//! Values come from, in priority order: command-line flags, environment
//! variables (a `.env` file is honored), then the defaults below.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::geo::DEFAULT_GEOJSON_URL;
use crate::transform::pipeline::{DataSources, ViewOptions, DEFAULT_PREVIEW_ROWS};

/// Department reference table.
pub const DEFAULT_DEPARTMENTS_PATH: &str = "data/departements-france.csv";

/// DVF extract for the year on display.
pub const DEFAULT_TRANSACTIONS_PATH: &str = "data/ValeursFoncieres-2023.txt";

/// HTTP port of `immo serve`.
pub const DEFAULT_PORT: u16 = 3000;

pub const ENV_DEPARTMENTS_PATH: &str = "IMMO_DEPARTMENTS_PATH";
pub const ENV_TRANSACTIONS_PATH: &str = "IMMO_TRANSACTIONS_PATH";
pub const ENV_PREVIEW_ROWS: &str = "IMMO_PREVIEW_ROWS";
pub const ENV_GEOJSON_URL: &str = "IMMO_GEOJSON_URL";
pub const ENV_PORT: &str = "IMMO_PORT";

/// Resolved dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub departments_path: PathBuf,
    pub transactions_path: PathBuf,
    pub preview_rows: usize,
    pub geojson_url: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            departments_path: PathBuf::from(DEFAULT_DEPARTMENTS_PATH),
            transactions_path: PathBuf::from(DEFAULT_TRANSACTIONS_PATH),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            geojson_url: DEFAULT_GEOJSON_URL.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl DashboardConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = var(ENV_DEPARTMENTS_PATH) {
            config.departments_path = PathBuf::from(path);
        }
        if let Some(path) = var(ENV_TRANSACTIONS_PATH) {
            config.transactions_path = PathBuf::from(path);
        }
        if let Some(url) = var(ENV_GEOJSON_URL) {
            config.geojson_url = url;
        }
        if let Some(rows) = var(ENV_PREVIEW_ROWS) {
            config.preview_rows = parse_var(ENV_PREVIEW_ROWS, &rows)?;
        }
        if let Some(port) = var(ENV_PORT) {
            config.port = parse_var(ENV_PORT, &port)?;
        }

        Ok(config)
    }

    /// Override source paths with command-line values, when given.
    pub fn with_paths(mut self, departments: Option<PathBuf>, transactions: Option<PathBuf>) -> Self {
        if let Some(p) = departments {
            self.departments_path = p;
        }
        if let Some(p) = transactions {
            self.transactions_path = p;
        }
        self
    }

    pub fn sources(&self) -> DataSources {
        DataSources::new(self.departments_path.clone(), self.transactions_path.clone())
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            preview_rows: self.preview_rows,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidVar {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.transactions_path, PathBuf::from("data/ValeursFoncieres-2023.txt"));
    }

    #[test]
    fn test_env_overrides() {
        let config = DashboardConfig::from_lookup(lookup(&[
            (ENV_TRANSACTIONS_PATH, "/srv/dvf/ValeursFoncieres-2022.txt"),
            (ENV_PREVIEW_ROWS, "25"),
            (ENV_PORT, " 8080 "),
            (ENV_GEOJSON_URL, ""),
        ]))
        .unwrap();

        assert_eq!(config.transactions_path, PathBuf::from("/srv/dvf/ValeursFoncieres-2022.txt"));
        assert_eq!(config.preview_rows, 25);
        assert_eq!(config.port, 8080);
        assert_eq!(config.geojson_url, DEFAULT_GEOJSON_URL);
    }

    #[test]
    fn test_invalid_number() {
        let err = DashboardConfig::from_lookup(lookup(&[(ENV_PREVIEW_ROWS, "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidVar {
                name: ENV_PREVIEW_ROWS.into(),
                value: "ten".into()
            }
        );
    }

    #[test]
    fn test_cli_paths_win() {
        let config = DashboardConfig::default().with_paths(Some(PathBuf::from("deps.csv")), None);
        let sources = config.sources();
        assert_eq!(sources.departments, PathBuf::from("deps.csv"));
        assert_eq!(sources.transactions, PathBuf::from(DEFAULT_TRANSACTIONS_PATH));
    }
}
