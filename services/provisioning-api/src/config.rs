use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;

use crate::db::DbConfig;

/// Deployment environment the service runs in.
///
/// Gates development-only conveniences such as outbound proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match std::env::var("PROV_ENVIRONMENT").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Sources inventory client configuration.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    /// Base URL including the API prefix, e.g. `https://sources.local/api/sources/v3.1`.
    pub url: String,

    /// Optional outbound proxy. Only honored in development.
    pub proxy_url: Option<String>,

    /// Service identity header value forwarded on every call.
    pub identity_header: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Deployment environment, used to validate the proxy setting.
    pub environment: Environment,
}

/// Image builder client configuration.
#[derive(Debug, Clone)]
pub struct ImageBuilderConfig {
    /// Base URL including the API prefix, e.g. `https://images.local/api/image-builder/v1`.
    pub url: String,

    /// Service identity header value forwarded on every call.
    pub identity_header: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub database: DbConfig,
    pub sources: SourcesConfig,
    pub image_builder: ImageBuilderConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("PROV_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()?;

        let log_level = std::env::var("PROV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("PROV_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let environment = Environment::from_env();

        let sources = SourcesConfig {
            url: std::env::var("PROV_SOURCES_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api/sources/v3.1".to_string()),
            proxy_url: std::env::var("PROV_SOURCES_PROXY_URL").ok(),
            identity_header: std::env::var("PROV_SOURCES_IDENTITY_HEADER").ok(),
            timeout: env_duration_secs("PROV_SOURCES_TIMEOUT_SECS", 30),
            environment,
        };

        let image_builder = ImageBuilderConfig {
            url: std::env::var("PROV_IMAGE_BUILDER_URL")
                .unwrap_or_else(|_| "http://localhost:3001/api/image-builder/v1".to_string()),
            identity_header: std::env::var("PROV_IMAGE_BUILDER_IDENTITY_HEADER").ok(),
            timeout: env_duration_secs("PROV_IMAGE_BUILDER_TIMEOUT_SECS", 30),
        };

        let database = DbConfig::from_env();

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            database,
            sources,
            image_builder,
        })
    }
}

fn env_duration_secs(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}
