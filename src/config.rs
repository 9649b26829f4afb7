use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Models
    pub models_dir: PathBuf,
    pub engine_library: Option<PathBuf>,
    pub preload_artifacts: bool,
    pub load_timeout: Duration,
    pub hub_language: String,

    // Server
    pub ip: String,
    pub port: u16,

    // Activity log
    pub activity_log_max: usize,
    pub activity_log_retention: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            engine_library: None,
            preload_artifacts: false,
            load_timeout: Duration::from_secs(45),
            hub_language: "en".to_string(),
            ip: "127.0.0.1".to_string(),
            port: 3000,
            activity_log_max: 200,
            activity_log_retention: Duration::from_secs(20 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            // Models
            models_dir: std::env::var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            engine_library: std::env::var("ENGINE_LIBRARY")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            preload_artifacts: std::env::var("PRELOAD_ARTIFACTS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.preload_artifacts),
            load_timeout: std::env::var("LOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.load_timeout),
            hub_language: std::env::var("HUB_LANGUAGE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| crate::language::normalize(&v))
                .unwrap_or(defaults.hub_language),

            // Server
            ip: std::env::var("IP").unwrap_or(defaults.ip),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),

            // Activity log
            activity_log_max: std::env::var("ACTIVITY_LOG_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|max: &usize| *max > 0)
                .unwrap_or(defaults.activity_log_max),
            activity_log_retention: std::env::var("ACTIVITY_LOG_RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.activity_log_retention),
        })
    }

    /// Socket address the HTTP server binds to.
    pub fn server_addr(&self) -> Result<SocketAddr> {
        let address = format!("{}:{}", self.ip, self.port);
        address
            .parse()
            .with_context(|| format!("Failed to parse server address: {}", address))
    }
}
