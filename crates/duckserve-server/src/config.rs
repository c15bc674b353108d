use duckserve_engine::DatabaseOptions;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub metrics: MetricsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub query_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            query_path: "/query".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub chunk_size: usize,
    pub threads: Option<u32>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let defaults = DatabaseOptions::default();
        Self {
            path: defaults.path,
            chunk_size: defaults.chunk_size,
            threads: defaults.threads,
        }
    }
}

impl DatabaseConfig {
    pub fn options(&self) -> DatabaseOptions {
        DatabaseOptions {
            path: self.path.clone(),
            chunk_size: self.chunk_size,
            threads: self.threads,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:9898".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Self::validated(config)
    }

    pub fn validated(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(config)
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.log
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level: {}", self.log.level))
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|err| anyhow::anyhow!("invalid server.listen_addr: {err}"))?;
        if !self.server.query_path.starts_with('/') {
            return Err(anyhow::anyhow!("server.query_path must start with '/'"));
        }
        if matches!(self.server.query_path.as_str(), "/health" | "/ready") {
            return Err(anyhow::anyhow!(format!(
                "server.query_path {} collides with a health route",
                self.server.query_path
            )));
        }
        if self.database.path.is_empty() {
            return Err(anyhow::anyhow!("database.path must not be empty"));
        }
        if self.database.chunk_size == 0 {
            return Err(anyhow::anyhow!("database.chunk_size must be positive"));
        }
        if self.database.threads == Some(0) {
            return Err(anyhow::anyhow!("database.threads must be positive"));
        }
        if self.metrics.enabled {
            self.metrics
                .listen_addr
                .parse::<SocketAddr>()
                .map_err(|err| anyhow::anyhow!("invalid metrics.listen_addr: {err}"))?;
        }
        self.log_level()?;
        Ok(())
    }
}
