// Configuration module entry point
// Manages application configuration and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, PerformanceConfig, StoreBackend, StoreConfig};

/// Default config file (extension resolved by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the config file
    /// (optional), then `BMI_`-prefixed environment variables with `__`
    /// separating sections, e.g. `BMI_STORE__BACKEND=file`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "bmi-service/0.1")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("store.backend", "memory")?
            .set_default("store.table", "Users")?
            .set_default("store.key_field", "UserId")?
            .set_default("store.data_dir", "data")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("BMI")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.store.table, "Users");
        assert_eq!(cfg.store.key_field, "UserId");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.http.max_body_size, 1_048_576);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.routes.health.enabled);
        assert_eq!(cfg.routes.health.liveness_path, "/healthz");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[store]
backend = "file"
data_dir = "/var/lib/bmi"

[routes.health]
enabled = false
"#,
        )
        .unwrap();

        let base = dir.path().join("custom");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.data_dir, "/var/lib/bmi");
        assert_eq!(cfg.store.table, "Users");
        assert!(!cfg.routes.health.enabled);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[store]\nbackend = \"dynamo\"\n").unwrap();
        let base = dir.path().join("bad");
        assert!(Config::load_from(base.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("does-not-exist/config").unwrap();
        cfg.server.host = "0.0.0.0".to_string();
        cfg.server.port = 3000;
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "0.0.0.0:3000");
        cfg.server.host = "not an address".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
