//! Configuration management for the agency content server.
//!
//! Parses `agency.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `database.url`
//! - `content.templates_file`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override database URL.
    pub database_url: Option<String>,
    /// Override seeding of all template pages at startup.
    pub initialize_on_start: Option<bool>,
    /// Override live update push enabled flag.
    pub live_updates_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "agency.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Content store connection.
    pub database: DatabaseConfig,
    /// Template and page resolution settings.
    pub content: ContentConfig,
    /// Live update push configuration.
    pub live_updates: LiveUpdatesConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
        }
    }
}

/// Content store connection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    pub url: String,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://agency.db".to_owned(),
            max_connections: 5,
        }
    }
}

/// What to serve for a page with a template but no stored row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPage {
    /// Seed the page from its template on first request.
    #[default]
    Materialize,
    /// Serve the template read-only.
    Template,
}

/// Template and page resolution settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Seed every template page when the server starts.
    pub initialize_on_start: bool,
    /// Behavior for pages that were never materialized.
    pub missing_page: MissingPage,
    /// Extra page templates (TOML), merged over the built-in set.
    ///
    /// Relative paths are resolved against the config file's directory.
    pub templates_file: Option<PathBuf>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            initialize_on_start: true,
            missing_page: MissingPage::default(),
            templates_file: None,
        }
    }
}

/// Live update push configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveUpdatesConfig {
    /// Whether the content change WebSocket is served.
    pub enabled: bool,
}

impl Default for LiveUpdatesConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`database.url`").
        field: String,
        /// Error message (e.g., "${`DATABASE_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `agency.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the merged configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(url) = &settings.database_url {
            self.database.url.clone_from(url);
        }
        if let Some(initialize_on_start) = settings.initialize_on_start {
            self.content.initialize_on_start = initialize_on_start;
        }
        if let Some(enabled) = settings.live_updates_enabled {
            self.live_updates.enabled = enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_database()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_database(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.database.url, "database.url")?;
        if !self.database.url.starts_with("sqlite:") {
            return Err(ConfigError::Validation(
                "database.url must start with sqlite:".to_owned(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.database.url = expand::expand_env(&self.database.url, "database.url")?;

        if let Some(path) = self.content.templates_file.take() {
            let expanded = expand::expand_env(&path.to_string_lossy(), "content.templates_file")?;
            self.content.templates_file = Some(PathBuf::from(expanded));
        }

        Ok(())
    }

    /// Resolve relative paths against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(path) = self.content.templates_file.take() {
            self.content.templates_file = Some(config_dir.join(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7979);
        assert_eq!(config.database.url, "sqlite://agency.db");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.content.initialize_on_start);
        assert_eq!(config.content.missing_page, MissingPage::Materialize);
        assert!(config.live_updates.enabled);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 7979);
        assert_eq!(config.database.url, "sqlite://agency.db");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000

[database]
url = "sqlite:///srv/agency/content.db"
max_connections = 8

[content]
initialize_on_start = false
missing_page = "template"
templates_file = "templates.toml"

[live_updates]
enabled = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "sqlite:///srv/agency/content.db");
        assert_eq!(config.database.max_connections, 8);
        assert!(!config.content.initialize_on_start);
        assert_eq!(config.content.missing_page, MissingPage::Template);
        assert_eq!(
            config.content.templates_file,
            Some(PathBuf::from("templates.toml"))
        );
        assert!(!config.live_updates.enabled);
    }

    #[test]
    fn test_parse_unknown_missing_page_policy() {
        let toml = r#"
[content]
missing_page = "redirect"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[content]
templates_file = "content/templates.toml"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.content.templates_file,
            Some(PathBuf::from("/project/content/templates.toml"))
        );
    }

    #[test]
    fn test_resolve_paths_keeps_absolute() {
        let toml = r#"
[content]
templates_file = "/etc/agency/templates.toml"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.content.templates_file,
            Some(PathBuf::from("/etc/agency/templates.toml"))
        );
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(8080),
            database_url: Some("sqlite::memory:".to_owned()),
            initialize_on_start: Some(false),
            live_updates_enabled: Some(false),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(!config.content.initialize_on_start);
        assert!(!config.live_updates.enabled);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7979);
        assert!(config.content.initialize_on_start);
    }

    #[test]
    fn test_expand_env_vars_database_url() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("AGENCY_TEST_DB_DIR", "/data");
        }

        let toml = r#"
[database]
url = "sqlite://${AGENCY_TEST_DB_DIR}/agency.db"

[server]
host = "${AGENCY_TEST_UNSET_HOST:-0.0.0.0}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.database.url, "sqlite:///data/agency.db");
        assert_eq!(config.server.host, "0.0.0.0");

        unsafe {
            std::env::remove_var("AGENCY_TEST_DB_DIR");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("AGENCY_TEST_MISSING_URL");
        }

        let toml = r#"
[database]
url = "${AGENCY_TEST_MISSING_URL}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("AGENCY_TEST_MISSING_URL"));
        assert!(err.to_string().contains("database.url"));
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_server_host_empty() {
        let mut config = Config::default();
        config.server.host = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_validate_server_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_database_url_scheme() {
        let mut config = Config::default();
        config.database.url = "postgres://localhost/agency".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database.url"));
    }

    #[test]
    fn test_validate_database_max_connections_zero() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 8000\n\n[content]\ntemplates_file = \"extra.toml\""
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.config_path, Some(path.clone()));
        assert_eq!(
            config.content.templates_file,
            Some(dir.path().join("extra.toml"))
        );
    }

    #[test]
    fn test_load_cli_settings_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency.toml");
        std::fs::write(&path, "[server]\nport = 8000\n").unwrap();
        let settings = CliSettings {
            port: Some(9100),
            ..CliSettings::default()
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_load_rejects_invalid_cli_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency.toml");
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            database_url: Some(String::new()),
            ..CliSettings::default()
        };

        let result = Config::load(Some(&path), Some(&settings));

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/agency.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency.toml");
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
