//! Application configuration loaded from environment variables.

use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP listen port.
    pub port: u16,

    /// Interface to bind.
    pub host: String,

    /// Deployment environment name, reported by `/health`.
    pub environment: String,

    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    pub rust_log: String,
}

/// Raw variables as envy sees them.
///
/// `APP_ENV` and `NODE_ENV` are separate fields so that both may be set;
/// `APP_ENV` wins.
#[derive(Debug, Deserialize)]
struct EnvVars {
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default = "default_host")]
    bind_host: String,

    #[serde(default)]
    app_env: Option<String>,

    #[serde(default)]
    node_env: Option<String>,

    #[serde(default = "default_body_limit")]
    body_limit_bytes: usize,

    #[serde(default = "default_log_level")]
    rust_log: String,
}

impl From<EnvVars> for Config {
    fn from(vars: EnvVars) -> Self {
        Self {
            port: vars.port,
            host: vars.bind_host,
            environment: vars.app_env.or(vars.node_env).unwrap_or_else(default_environment),
            body_limit_bytes: vars.body_limit_bytes,
            rust_log: vars.rust_log,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_body_limit() -> usize {
    100 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            environment: default_environment(),
            body_limit_bytes: default_body_limit(),
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from `(NAME, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, EnvVars>(vars).map(Config::from)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("PORT must be between 1 and 65535".to_string());
        }

        if self.host.parse::<IpAddr>().is_err() {
            return Err(format!("BIND_HOST is not an IP address: {}", self.host));
        }

        if self.environment.trim().is_empty() {
            return Err("APP_ENV must not be empty".to_string());
        }

        if self.body_limit_bytes == 0 {
            return Err("BODY_LIMIT_BYTES must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Socket address to bind. Call after [`Config::validate`].
    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| format!("BIND_HOST is not an IP address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
