//! Server configuration.
//!
//! Settings come from an optional TOML file and are then overridden by the
//! environment variables `DATA_FILE_PATH`, `HOST`, `PORT`, and `PUBLIC_URL`.
//! Everything has a default, so the server starts with no file at all.
//!
//! ```toml
//! [data]
//! path = "./data/ODCAF_v1.0.csv"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//! public_url = "https://odcaf.example.com"
//!
//! [widget]
//! dist_dir = "./web/dist"
//!
//! [limits]
//! default_search = 20
//! default_filter = 50
//! max_results = 500
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data/ODCAF_v1.0.csv")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used to build widget links.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL clients should use to reach this server.
    pub fn base_url(&self) -> String {
        match self.public_url {
            Some(ref url) => url.clone(),
            None => format!("http://{}", self.bind_addr()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    /// Directory holding the built widget bundle (`app.js`, `app.css`).
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
        }
    }
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("./web/dist")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_search_limit")]
    pub default_search: usize,
    #[serde(default = "default_filter_limit")]
    pub default_filter: usize,
    /// Ceiling applied to any caller-supplied `maxResults` / `limit`.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_search: default_search_limit(),
            default_filter: default_filter_limit(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_limit() -> usize {
    odcaf_core::query::DEFAULT_SEARCH_LIMIT
}
fn default_filter_limit() -> usize {
    odcaf_core::query::DEFAULT_FILTER_LIMIT
}
fn default_max_results() -> usize {
    500
}

/// Load configuration from `path` (if given), apply environment overrides,
/// and validate.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate(&mut config)?;
    Ok(config)
}

/// Apply environment overrides read through `lookup`.
fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(path) = lookup("DATA_FILE_PATH").filter(|v| !v.is_empty()) {
        config.data.path = PathBuf::from(path);
    }
    if let Some(host) = lookup("HOST").filter(|v| !v.is_empty()) {
        config.server.host = host;
    }
    if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
    }
    if let Some(url) = lookup("PUBLIC_URL").filter(|v| !v.is_empty()) {
        config.server.public_url = Some(url);
    }
    Ok(())
}

fn validate(config: &mut Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("server.port must be > 0");
    }

    let limits = &config.limits;
    if limits.max_results < 1 || limits.default_search < 1 || limits.default_filter < 1 {
        anyhow::bail!("limits must all be >= 1");
    }
    if limits.default_search > limits.max_results || limits.default_filter > limits.max_results {
        anyhow::bail!("limits.default_search and limits.default_filter must not exceed limits.max_results");
    }

    if let Some(ref url) = config.server.public_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("server.public_url must start with http:// or https://, got '{}'", url);
        }
        config.server.public_url = Some(url.trim_end_matches('/').to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.data.path, PathBuf::from("./data/ODCAF_v1.0.csv"));
        assert_eq!(config.limits.default_search, 20);
        assert_eq!(config.limits.default_filter, 50);
        assert_eq!(config.limits.max_results, 500);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.widget.dist_dir, PathBuf::from("./web/dist"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env(
            &mut config,
            env(&[
                ("DATA_FILE_PATH", "/tmp/odcaf.csv"),
                ("HOST", "127.0.0.1"),
                ("PORT", "4000"),
                ("PUBLIC_URL", "https://odcaf.example.com/"),
            ]),
        )
        .unwrap();
        validate(&mut config).unwrap();

        assert_eq!(config.data.path, PathBuf::from("/tmp/odcaf.csv"));
        assert_eq!(config.server.bind_addr(), "127.0.0.1:4000");
        assert_eq!(config.server.base_url(), "https://odcaf.example.com");
    }

    #[test]
    fn test_invalid_port_env() {
        let mut config = Config::default();
        let err = apply_env(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_empty_env_ignored() {
        let mut config = Config::default();
        apply_env(&mut config, env(&[("HOST", ""), ("PORT", "")])).unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_default_exceeding_max_rejected() {
        let mut config = Config::default();
        config.limits.default_filter = 1000;
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn test_public_url_scheme_required() {
        let mut config = Config::default();
        config.server.public_url = Some("odcaf.example.com".to_string());
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn test_base_url_falls_back_to_bind() {
        let config = Config::default();
        assert_eq!(config.server.base_url(), "http://0.0.0.0:3000");
    }
}
