use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Secret used by the Development preset only; Production refuses to start with it
pub const DEV_JWT_SECRET: &str = "desk-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JWT_SECRET must be set in {0:?}")]
    MissingSecret(Environment),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub workflow: WorkflowConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_attachment_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Open requests older than this count as SLA breaches in reports
    pub sla_hours: i64,
}

/// Settings handed to the document renderer at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Heading printed on exported request documents
    pub title: String,
    /// Pixels per font dot in PNG exports
    pub png_scale: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "REQUEST DESK".to_string(),
            png_scale: 2,
        }
    }
}

impl AppConfig {
    /// Preset from `APP_ENV`, then the YAML file named by `DESK_CONFIG_FILE`,
    /// then individual environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::preset(env::var("APP_ENV").ok().as_deref());

        if let Ok(path) = env::var("DESK_CONFIG_FILE") {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            config = config.with_yaml(&text)?;
        }

        let config = config.with_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn preset(app_env: Option<&str>) -> Self {
        match app_env {
            Some("production") | Some("prod") => Self::production(),
            Some("staging") | Some("stage") => Self::staging(),
            _ => Self::development(),
        }
    }

    /// Overlays a (possibly partial) YAML document onto this configuration
    pub fn with_yaml(self, text: &str) -> Result<Self, ConfigError> {
        let mut base = serde_yaml::to_value(&self)?;
        let overlay: serde_yaml::Value = serde_yaml::from_str(text)?;
        merge(&mut base, overlay);
        Ok(serde_yaml::from_value(base)?)
    }

    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = var("DESK_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("PORT").or_else(|| var("DESK_PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Some(v) = var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = var("DESK_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = var("DESK_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Storage overrides
        if let Some(v) = var("DESK_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = var("DESK_MAX_ATTACHMENT_BYTES") {
            self.storage.max_attachment_bytes = v.parse().unwrap_or(self.storage.max_attachment_bytes);
        }

        // Workflow overrides
        if let Some(v) = var("DESK_SLA_HOURS") {
            self.workflow.sla_hours = v.parse().unwrap_or(self.workflow.sla_hours);
        }

        // Export overrides
        if let Some(v) = var("DESK_EXPORT_TITLE") {
            self.export.title = v;
        }
        if let Some(v) = var("DESK_EXPORT_PNG_SCALE") {
            self.export.png_scale = v.parse().unwrap_or(self.export.png_scale);
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weak = self.security.jwt_secret.is_empty() || self.security.jwt_secret == DEV_JWT_SECRET;
        if weak && self.environment != Environment::Development {
            return Err(ConfigError::MissingSecret(self.environment));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                max_attachment_bytes: 10 * 1024 * 1024, // 10MB
            },
            workflow: WorkflowConfig { sla_hours: 72 },
            export: ExportConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("/var/lib/desk/uploads"),
                max_attachment_bytes: 10 * 1024 * 1024,
            },
            workflow: WorkflowConfig { sla_hours: 72 },
            export: ExportConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("/var/lib/desk/uploads"),
                max_attachment_bytes: 5 * 1024 * 1024, // 5MB
            },
            workflow: WorkflowConfig { sla_hours: 72 },
            export: ExportConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn merge(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::preset(None);
        assert!(config.is_development());
        assert_eq!(config.workflow.sla_hours, 72);
        assert_eq!(config.security.jwt_secret, DEV_JWT_SECRET);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let config = AppConfig::preset(Some("production"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSecret(Environment::Production))
        ));

        let vars = HashMap::from([("JWT_SECRET", "s3cret")]);
        let config = config.with_env_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_overlay_keeps_unnamed_fields() {
        let config = AppConfig::preset(None)
            .with_yaml("server:\n  port: 9090\nworkflow:\n  sla_hours: 48\n")
            .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.workflow.sla_hours, 48);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.export.png_scale, 2);
    }

    #[test]
    fn env_overrides_win_and_ignore_garbage() {
        let vars = HashMap::from([
            ("PORT", "3001"),
            ("DATABASE_MAX_CONNECTIONS", "not-a-number"),
            ("DESK_CORS_ORIGINS", "https://a.test, https://b.test,"),
            ("DATABASE_URL", "postgres://localhost/desk"),
            ("DESK_EXPORT_TITLE", "ACME SERVICE DESK"),
            ("DESK_EXPORT_PNG_SCALE", "big"),
        ]);
        let config = AppConfig::preset(None).with_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.security.cors_origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/desk"));
        assert_eq!(config.export.title, "ACME SERVICE DESK");
        assert_eq!(config.export.png_scale, 2);
    }
}
