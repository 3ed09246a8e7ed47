//! Configuration file parsing for `squad.toml`.
//!
//! ```toml
//! [database]
//! url = "sqlite://${DATA_DIR}/squad.db?foreign_keys=true"
//!
//! [pagination]
//! default_page_size = 20
//! max_page_size = 100
//! strategy = "optimized"
//!
//! [debug]
//! log_queries = true
//! ```
//!
//! `${VAR}` references are replaced from the environment before parsing,
//! and `SQUAD_DATABASE_URL` overrides `database.url` when loading from a file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use squad_query::error::QueryResult;
use squad_query::pager::PageStrategy;
use squad_query::pagination::PageRequest;

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "SQUAD_DATABASE_URL";

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this layout.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {key}: {message}")]
    Invalid {
        /// Dotted key.
        key: &'static str,
        /// What is wrong.
        message: String,
    },
}

/// Main configuration structure for `squad.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SquadConfig {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Paging defaults and limits.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Debug settings.
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database URL.
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

fn default_url() -> String {
    "sqlite::memory:".to_string()
}

/// Paging defaults and limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    /// Page size used when the caller gives none.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Largest page size a caller may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Total-count strategy for paged searches.
    #[serde(default)]
    pub strategy: PageStrategy,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            strategy: PageStrategy::default(),
        }
    }
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

/// Debug settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every search statement at info level.
    #[serde(default)]
    pub log_queries: bool,
}

impl SquadConfig {
    /// Load configuration from a file path, then apply
    /// [`with_env_overrides`](Self::with_env_overrides).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = content.parse()?;
        Ok(config.with_env_overrides())
    }

    /// Apply environment overrides: a non-blank [`DATABASE_URL_ENV`]
    /// replaces `database.url`.
    ///
    /// [`from_file`](Self::from_file) applies these; configurations parsed
    /// with [`FromStr`] or built in code opt in by calling this.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pagination = &self.pagination;
        if pagination.max_page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "pagination.max_page_size",
                message: "must be greater than zero".into(),
            });
        }
        if pagination.default_page_size == 0 || pagination.default_page_size > pagination.max_page_size {
            return Err(ConfigError::Invalid {
                key: "pagination.default_page_size",
                message: format!("must be between 1 and {}", pagination.max_page_size),
            });
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database.url",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Build a page request, using the default size when none is given and
    /// clamping to the maximum.
    ///
    /// An explicit size of zero is rejected.
    pub fn page_request(&self, page_index: u64, page_size: Option<u64>) -> QueryResult<PageRequest> {
        let size = page_size
            .unwrap_or(self.pagination.default_page_size)
            .min(self.pagination.max_page_size);
        PageRequest::of(page_index, size)
    }
}

impl FromStr for SquadConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }
}

/// Replace `${VAR}` with the value of `VAR`. Unset variables are left as
/// written.
fn expand_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return content.to_string();
    };
    re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = SquadConfig::default();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.pagination.strategy, PageStrategy::Optimized);
        assert!(!config.debug.log_queries);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config: SquadConfig = r#"
            [database]
            url = "sqlite://./squad.db"

            [pagination]
            default_page_size = 10
            max_page_size = 50
            strategy = "simple"

            [debug]
            log_queries = true
        "#
        .parse()
        .unwrap();

        assert_eq!(config.database.url, "sqlite://./squad.db");
        assert_eq!(config.pagination.max_page_size, 50);
        assert_eq!(config.pagination.strategy, PageStrategy::Simple);
        assert!(config.debug.log_queries);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SquadConfig = "".parse().unwrap();
        assert_eq!(config, SquadConfig::default());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = "[pagination]\npage_size = 5\n".parse::<SquadConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let err = "[pagination]\ndefault_page_size = 0\n".parse::<SquadConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "pagination.default_page_size", .. }));

        let err = "[pagination]\ndefault_page_size = 200\n".parse::<SquadConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_env_expansion() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("SQUAD_TEST_DATA_DIR", "/tmp/squad");
        }
        let config: SquadConfig = r#"
            [database]
            url = "sqlite://${SQUAD_TEST_DATA_DIR}/squad.db?x=${SQUAD_TEST_UNSET_VAR}"
        "#
        .parse()
        .unwrap();
        assert_eq!(
            config.database.url,
            "sqlite:///tmp/squad/squad.db?x=${SQUAD_TEST_UNSET_VAR}"
        );
    }

    #[test]
    fn test_page_request_clamps() {
        let config = SquadConfig::default();
        assert_eq!(config.page_request(2, None).unwrap().page_size(), 20);
        assert_eq!(config.page_request(0, Some(500)).unwrap().page_size(), 100);
        assert_eq!(config.page_request(1, Some(3)).unwrap().offset(), 3);
        assert!(config.page_request(0, Some(0)).unwrap_err().is_query_construction());
    }

    #[test]
    fn test_database_url_env_override() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[database]\nurl = \"sqlite://./from-file.db\"\n").unwrap();

        // SAFETY: no other test in this crate reads or writes this variable.
        unsafe {
            std::env::set_var(DATABASE_URL_ENV, "sqlite://./from-env.db");
        }
        let overridden = SquadConfig::default().with_env_overrides();
        let loaded = SquadConfig::from_file(file.path()).unwrap();
        let parsed: SquadConfig = "[database]\nurl = \"sqlite://./from-str.db\"\n".parse().unwrap();

        unsafe {
            std::env::set_var(DATABASE_URL_ENV, "   ");
        }
        let blank = SquadConfig::default().with_env_overrides();

        unsafe {
            std::env::remove_var(DATABASE_URL_ENV);
        }
        let unset = SquadConfig::from_file(file.path()).unwrap();

        assert_eq!(overridden.database.url, "sqlite://./from-env.db");
        assert_eq!(loaded.database.url, "sqlite://./from-env.db");
        assert_eq!(parsed.database.url, "sqlite://./from-str.db");
        assert_eq!(blank.database.url, "sqlite::memory:");
        assert_eq!(unset.database.url, "sqlite://./from-file.db");
    }

    #[test]
    fn test_from_file_missing() {
        let err = SquadConfig::from_file("/nonexistent/squad.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/squad.toml"));
    }
}
