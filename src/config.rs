use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Upstream base URL used when nothing else is configured
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8000";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub cors: CorsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_max_body_bytes() -> usize { 1024 * 1024 }

/// Prediction backend the gateway forwards to
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Left unset, the HTTP client's own default applies
    pub timeout_secs: Option<u64>,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: None,
        }
    }
}

fn default_upstream_url() -> String { DEFAULT_UPSTREAM_URL.to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Comma separated list, only enforced in production
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl CorsSettings {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_environment() -> String { "development".to_string() }
fn default_allowed_origins() -> String {
    "http://localhost:3000,https://heartscan.vercel.app".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Text,
}

impl LogFormat {
    /// Unknown names fall back to plain text
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Text,
        }
    }
}

impl LoggingSettings {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.format)
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with HEARTSCAN__)
    /// 4. `API_URL` / `NEXT_PUBLIC_API_URL` for the upstream base URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., HEARTSCAN__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        apply_upstream_override(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        apply_upstream_override(settings)?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("HEARTSCAN")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Pick the upstream URL from the plain environment variables the frontend
/// deployment already sets. `API_URL` wins over `NEXT_PUBLIC_API_URL`.
pub fn resolve_upstream_url(api_url: Option<String>, public_api_url: Option<String>) -> Option<String> {
    api_url
        .filter(|u| !u.trim().is_empty())
        .or_else(|| public_api_url.filter(|u| !u.trim().is_empty()))
}

fn apply_upstream_override(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let upstream_url = resolve_upstream_url(
        env::var("API_URL").ok(),
        env::var("NEXT_PUBLIC_API_URL").ok(),
    );

    let mut builder = Config::builder().add_source(settings);
    if let Some(url) = upstream_url {
        builder = builder.set_override("upstream.base_url", url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.max_body_bytes, 1024 * 1024);
        assert_eq!(settings.upstream.base_url, "http://localhost:8000");
        assert!(settings.upstream.timeout_secs.is_none());
        assert!(!settings.cors.is_production());
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_empty_config_deserializes_to_defaults() {
        let settings: Settings = Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.upstream.base_url, DEFAULT_UPSTREAM_URL);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let settings: Settings = Config::builder()
            .set_override("upstream.timeout_secs", 15_i64)
            .unwrap()
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();
        assert_eq!(settings.upstream.timeout_secs, Some(15));
        assert_eq!(settings.upstream.base_url, DEFAULT_UPSTREAM_URL);
    }

    #[test]
    fn test_log_format_names() {
        assert_eq!(LoggingSettings::default().log_format(), LogFormat::Json);
        assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Text);
    }

    // Only test in this crate that touches these variables
    #[test]
    fn test_upstream_override_from_environment() {
        let base = || Config::builder().build().unwrap();
        let load = |config: Config| -> Settings {
            apply_upstream_override(config)
                .and_then(|c| c.try_deserialize())
                .unwrap()
        };

        std::env::remove_var("API_URL");
        std::env::set_var("NEXT_PUBLIC_API_URL", "http://public-api:8000");
        assert_eq!(load(base()).upstream.base_url, "http://public-api:8000");

        std::env::set_var("API_URL", "http://private-api:9000/");
        assert_eq!(load(base()).upstream.base_url, "http://private-api:9000/");

        let configured = Config::builder()
            .set_override("upstream.base_url", "http://from-file:7000")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(load(configured).upstream.base_url, "http://private-api:9000/");

        std::env::remove_var("API_URL");
        std::env::remove_var("NEXT_PUBLIC_API_URL");
        assert_eq!(load(base()).upstream.base_url, DEFAULT_UPSTREAM_URL);
    }

    #[test]
    fn test_resolve_upstream_url_precedence() {
        assert_eq!(
            resolve_upstream_url(Some("http://a:1".into()), Some("http://b:2".into())),
            Some("http://a:1".to_string())
        );
        assert_eq!(
            resolve_upstream_url(None, Some("http://b:2".into())),
            Some("http://b:2".to_string())
        );
        assert_eq!(resolve_upstream_url(Some("  ".into()), None), None);
        assert_eq!(resolve_upstream_url(None, None), None);
    }

    #[test]
    fn test_cors_origins_split() {
        let cors = CorsSettings {
            environment: "Production".to_string(),
            allowed_origins: "http://localhost:3000, https://heartscan.vercel.app,".to_string(),
        };
        assert!(cors.is_production());
        assert_eq!(
            cors.origins(),
            vec!["http://localhost:3000", "https://heartscan.vercel.app"]
        );
    }
}
