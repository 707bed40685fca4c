use std::path::{Path, PathBuf};

use hifz_core::config::EngineConfig;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_DB_URL: &str = "sqlite://hifz.sqlite3";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of the optional TOML config file.
///
/// ```toml
/// database_url = "sqlite://data/hifz.sqlite3"
///
/// [engine]
/// days_per_month = 30.0
/// behind_threshold = 0.25
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub engine: EngineConfig,
}

impl FileConfig {
    /// # Errors
    ///
    /// Returns `ConfigLoadError` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pick the database URL: command line, then `HIFZ_DB_URL`, then the config
/// file, then [`DEFAULT_DB_URL`].
#[must_use]
pub fn resolve_db_url(
    cli: Option<String>,
    env: Option<String>,
    file: Option<String>,
) -> String {
    cli.or(env)
        .or(file)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DB_URL.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_table() {
        let config: FileConfig = toml::from_str(
            r#"
                database_url = "sqlite://data/hifz.sqlite3"

                [engine]
                days_per_month = 28.0
            "#,
        )
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite://data/hifz.sqlite3"));
        assert!((config.engine.days_per_month - 28.0).abs() < f64::EPSILON);
        assert!((config.engine.behind_threshold - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("[engine]\ndays_per_year = 365").is_err());
        assert!(toml::from_str::<FileConfig>("verbose = true").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = FileConfig::load(Path::new("/nonexistent/hifz.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hifz.toml"));
    }

    #[test]
    fn db_url_precedence() {
        assert_eq!(
            resolve_db_url(Some("sqlite://a".into()), Some("sqlite://b".into()), None),
            "sqlite://a"
        );
        assert_eq!(
            resolve_db_url(None, Some("sqlite://b".into()), Some("sqlite://c".into())),
            "sqlite://b"
        );
        assert_eq!(resolve_db_url(None, None, Some("sqlite://c".into())), "sqlite://c");
        assert_eq!(resolve_db_url(None, None, None), DEFAULT_DB_URL);
    }
}
