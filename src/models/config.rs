//! Configuration model loaded from external sources.

use serde::Deserialize;

fn default_max_upload_mb() -> usize {
    20
}

#[derive(Clone, Debug, Deserialize)]
/// Server settings shared across handlers and the notification worker.
pub struct ServerConfig {
    pub domain: String,
    pub address: String,
    pub port: u16,
    pub database_url: String,
    pub templates_dir: String,
    /// Directory receiving uploaded patient documents.
    pub uploads_dir: String,
    pub secret: String,
    pub auth_service_url: String,
    /// Endpoint the events PUB socket binds to and the worker connects to.
    pub zmq_events_pub: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(feature = "server")]
impl ServerConfig {
    /// Reads `config/default.yaml`, the `config/{APP_ENV}.yaml` profile and
    /// `APP_*` environment overrides, in that order.
    pub fn load() -> Result<Self, config::ConfigError> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".into());
        config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(config::Environment::with_prefix("APP"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_is_in_megabytes() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({
            "domain": "localhost",
            "address": "127.0.0.1",
            "port": 8080,
            "database_url": "app.db",
            "templates_dir": "templates/**/*",
            "uploads_dir": "uploads",
            "secret": "secret",
            "auth_service_url": "http://localhost:8000",
            "zmq_events_pub": "tcp://127.0.0.1:5560"
        }))
        .unwrap();
        assert_eq!(config.max_upload_mb, 20);
        assert_eq!(config.max_upload_bytes(), 20 * 1024 * 1024);
    }
}
