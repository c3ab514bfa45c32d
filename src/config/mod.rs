use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
    pub admin: AdminSeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Homologation,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "production" | "prod" => Some(Environment::Production),
            "homologation" | "staging" | "stage" => Some(Environment::Homologation),
            "test" => Some(Environment::Test),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }

    /// Deployed environments emit JSON logs.
    pub fn json_logs(&self) -> bool {
        matches!(self, Environment::Production | Environment::Homologation)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub api_version: String,
    pub frontend_url: String,
}

impl ServerConfig {
    /// Route prefix shared by every versioned resource group, e.g. `/api/v1`.
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version.trim_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub code_secret: String,
    pub reset_code_ttl_minutes: i64,
    pub reset_max_attempts: i32,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_secure: bool,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub mail_from: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AdminSeedConfig {
    pub name: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Unknown environment '{0}'")]
    UnknownEnvironment(String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            Some(raw) => Environment::parse(raw.trim())
                .ok_or_else(|| ConfigError::UnknownEnvironment(raw.clone()))?,
            None => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Homologation => Self::homologation(),
            Environment::Test => Self::test(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup);

        config.validate()?;
        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("API_VERSION") {
            if !v.trim().is_empty() {
                self.server.api_version = v.trim().to_string();
            }
        }
        if let Some(v) = lookup("FRONTEND_URL") {
            self.server.frontend_url = v.trim_end_matches('/').to_string();
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("CODE_SECRET") {
            self.security.code_secret = v;
        }
        if let Some(v) = lookup("RESET_CODE_TTL_MINUTES") {
            self.security.reset_code_ttl_minutes = v.parse().unwrap_or(self.security.reset_code_ttl_minutes);
        }
        if let Some(v) = lookup("RESET_MAX_ATTEMPTS") {
            self.security.reset_max_attempts = v.parse().unwrap_or(self.security.reset_max_attempts);
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        } else if lookup("FRONTEND_URL").is_some() {
            self.security.cors_origins = vec![self.server.frontend_url.clone()];
        }

        // Mail overrides
        if let Some(v) = lookup("SMTP_HOST") {
            self.mail.smtp_host = Some(v);
        }
        if let Some(v) = lookup("SMTP_PORT") {
            self.mail.smtp_port = v.parse().unwrap_or(self.mail.smtp_port);
        }
        if let Some(v) = lookup("SMTP_SECURE") {
            self.mail.smtp_secure = v.parse().unwrap_or(self.mail.smtp_secure);
        }
        if let Some(v) = lookup("SMTP_USER") {
            self.mail.smtp_user = Some(v);
        }
        if let Some(v) = lookup("SMTP_PASS") {
            self.mail.smtp_pass = Some(v);
        }
        if let Some(v) = lookup("MAIL_FROM") {
            self.mail.mail_from = v;
        }

        // Storage overrides
        if let Some(v) = lookup("UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("UPLOAD_MAX_BYTES") {
            self.storage.max_upload_bytes = v.parse().unwrap_or(self.storage.max_upload_bytes);
        }

        // Admin seed
        if let Some(v) = lookup("ADMIN_NAME") {
            self.admin.name = v;
        }
        if let Some(v) = lookup("ADMIN_EMAIL") {
            self.admin.email = Some(v);
        }
        if let Some(v) = lookup("ADMIN_PASSWORD") {
            self.admin.password = Some(v);
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.security.code_secret.trim().is_empty() {
            return Err(ConfigError::Missing("CODE_SECRET"));
        }
        Ok(())
    }

    /// Database URL, required by every command that touches PostgreSQL.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database
            .url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                api_version: "v1".to_string(),
                frontend_url: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "development-jwt-secret".to_string(),
                jwt_expiry_hours: 72,
                jwt_issuer: "users".to_string(),
                jwt_audience: "login".to_string(),
                code_secret: "development-code-secret".to_string(),
                reset_code_ttl_minutes: 15,
                reset_max_attempts: 5,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_secure: false,
                smtp_user: None,
                smtp_pass: None,
                mail_from: "no-reply@localhost".to_string(),
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from("./uploads"),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            admin: AdminSeedConfig {
                name: "Administrator".to_string(),
                email: None,
                password: None,
            },
        }
    }

    /// Development defaults with short-lived tokens and a scratch upload dir.
    pub fn test() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Test;
        config.security.jwt_secret = "test-jwt-secret".to_string();
        config.security.code_secret = "test-code-secret".to_string();
        config.security.jwt_expiry_hours = 1;
        config.storage.uploads_dir = env::temp_dir().join("bastion-uploads");
        config
    }

    fn homologation() -> Self {
        let mut config = Self::production();
        config.environment = Environment::Homologation;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                api_version: "v1".to_string(),
                frontend_url: "https://app.example.com".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                // Deployed environments must supply their own secrets
                jwt_secret: String::new(),
                jwt_expiry_hours: 72,
                jwt_issuer: "users".to_string(),
                jwt_audience: "login".to_string(),
                code_secret: String::new(),
                reset_code_ttl_minutes: 15,
                reset_max_attempts: 5,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 465,
                smtp_secure: true,
                smtp_user: None,
                smtp_pass: None,
                mail_from: "no-reply@example.com".to_string(),
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from("./uploads"),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            admin: AdminSeedConfig {
                name: "Administrator".to_string(),
                email: None,
                password: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.api_prefix(), "/api/v1");
        assert_eq!(config.security.jwt_expiry_hours, 72);
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_production_requires_secrets() {
        let err = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let err = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CODE_SECRET")));
    }

    #[test]
    fn test_node_env_fallback_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("NODE_ENV", "homologation"),
            ("JWT_SECRET", "a"),
            ("CODE_SECRET", "b"),
            ("PORT", "8080"),
            ("API_VERSION", "v2"),
            ("FRONTEND_URL", "https://front.example.com/"),
            ("UPLOAD_MAX_BYTES", "not-a-number"),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Homologation);
        assert!(config.environment.json_logs());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.api_prefix(), "/api/v2");
        assert_eq!(config.server.frontend_url, "https://front.example.com");
        assert_eq!(config.security.cors_origins, vec!["https://front.example.com".to_string()]);
        // Unparseable numbers keep the preset value
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("APP_ENV", "moon")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(_)));
    }

    #[test]
    fn test_database_url_required_on_demand() {
        let config = AppConfig::test();
        assert!(matches!(config.database_url(), Err(ConfigError::Missing("DATABASE_URL"))));
    }
}
