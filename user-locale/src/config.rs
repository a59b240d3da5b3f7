use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::middleware::DEFAULT_COOKIE_NAME;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// `[locale]` section: how the user locale is resolved and persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Fallback when neither cookie nor Accept-Language yields a locale
    pub default_locale: String,
    /// Locales the application serves; empty accepts any locale
    pub accepted_locales: Vec<String>,
    pub cookie_name: String,
    /// Optional `Domain` attribute of the locale cookie (off by default)
    pub cookie_domain: Option<String>,
    /// Methods whose responses may set the cookie; empty means all
    pub cookie_methods: Vec<String>,
}

const KNOWN_METHODS: &[&str] =
    &["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "CONNECT", "TRACE"];

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Load from `path`, or from conf/config.toml / config.toml when not given
    /// 2. Override with environment variables (prefixed with APP_)
    /// 3. Validate the final configuration
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        // 1. Load from config file
        let mut config = match path.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(config_path) => Self::from_toml(&config_path)?,
            None => {
                tracing::warn!("Configuration file not found, using defaults");
                Config::default()
            },
        };

        // 2. Override with environment variables
        config.apply_env_overrides();

        // 3. Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_SERVER_HOST: Server host (default: 0.0.0.0)
    /// - APP_SERVER_PORT: Server port (default: 8080)
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,user_locale=debug")
    /// - APP_LOG_FILE: Log file path
    /// - APP_LOCALE_DEFAULT: Default locale (default: en)
    /// - APP_LOCALE_ACCEPTED: Comma-separated accepted locales (e.g., "en,fr,de")
    /// - APP_LOCALE_COOKIE_NAME: Locale cookie name (default: user-locale)
    /// - APP_LOCALE_COOKIE_DOMAIN: Locale cookie domain
    /// - APP_LOCALE_COOKIE_METHODS: Comma-separated methods allowed to set the cookie
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Some(port) = var("APP_SERVER_PORT") {
            match port.parse() {
                Ok(port) => {
                    self.server.port = port;
                    tracing::info!("Override server.port from env: {}", self.server.port);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_SERVER_PORT '{}': {} (keep {})",
                    port,
                    e,
                    self.server.port
                ),
            }
        }

        if let Some(level) = var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(file) = var("APP_LOG_FILE") {
            self.logging.file = Some(file).filter(|f| !f.is_empty());
            tracing::info!("Override logging.file from env: {:?}", self.logging.file);
        }

        if let Some(locale) = var("APP_LOCALE_DEFAULT") {
            self.locale.default_locale = locale;
            tracing::info!("Override locale.default_locale from env: {}", self.locale.default_locale);
        }

        if let Some(accepted) = var("APP_LOCALE_ACCEPTED") {
            self.locale.accepted_locales = parse_list(&accepted);
            tracing::info!(
                "Override locale.accepted_locales from env: {:?}",
                self.locale.accepted_locales
            );
        }

        if let Some(name) = var("APP_LOCALE_COOKIE_NAME") {
            self.locale.cookie_name = name;
            tracing::info!("Override locale.cookie_name from env: {}", self.locale.cookie_name);
        }

        if let Some(domain) = var("APP_LOCALE_COOKIE_DOMAIN") {
            self.locale.cookie_domain = Some(domain).filter(|d| !d.is_empty());
            tracing::info!("Override locale.cookie_domain from env: {:?}", self.locale.cookie_domain);
        }

        if let Some(methods) = var("APP_LOCALE_COOKIE_METHODS") {
            self.locale.cookie_methods = parse_list(&methods);
            tracing::info!(
                "Override locale.cookie_methods from env: {:?}",
                self.locale.cookie_methods
            );
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        // Validate server port
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        let locale = &self.locale;
        if locale.default_locale.trim().is_empty() {
            anyhow::bail!("locale.default_locale cannot be empty");
        }

        if locale.cookie_name.trim().is_empty() {
            anyhow::bail!("locale.cookie_name cannot be empty");
        }

        let default_locale = locale.default_locale.trim();
        if !locale.accepted_locales.is_empty()
            && !locale.accepted_locales.iter().any(|l| l.trim().eq_ignore_ascii_case(default_locale))
        {
            anyhow::bail!(
                "locale.default_locale '{}' must be one of locale.accepted_locales {:?}",
                locale.default_locale,
                locale.accepted_locales
            );
        }

        if let Some(method) = locale
            .cookie_methods
            .iter()
            .find(|m| !KNOWN_METHODS.contains(&m.trim().to_ascii_uppercase().as_str()))
        {
            anyhow::bail!("Unknown HTTP method in locale.cookie_methods: {}", method);
        }

        Ok(())
    }

    fn find_config_file() -> Option<PathBuf> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        possible_paths.into_iter().map(PathBuf::from).find(|path| path.exists())
    }

    fn from_toml(path: &Path) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,user_locale=debug".to_string(), file: None }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            accepted_locales: Vec::new(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_domain: None,
            cookie_methods: Vec::new(),
        }
    }
}

// Comma-separated env values; blanks are dropped
fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
