use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Sql,
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" | "sqlite" | "postgres" => Ok(StorageKind::Sql),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerKind {
    Random,
    Http,
}

impl FromStr for CheckerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(CheckerKind::Random),
            "http" => Ok(CheckerKind::Http),
            other => Err(format!("unknown checker '{other}'")),
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub storage: StorageKind,
    pub database_url: String,
    /// Set when the database is a SQLite file; its directory is created on start.
    pub db_path: Option<String>,
    pub jwt_secret: String,
    pub jwt_expires_in: String,
    pub bcrypt_cost: u32,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub checker_kind: CheckerKind,
    pub checker_success_rate: f64,
    pub encryption_key: String,
    pub log_dir: String,
    pub environment: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: String,
}

// Secrets stay out of debug output.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("storage", &self.storage)
            .field("database_url", &self.database_url)
            .field("jwt_expires_in", &self.jwt_expires_in)
            .field("openai_configured", &self.openai_api_key.is_some())
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("checker_kind", &self.checker_kind)
            .field("checker_success_rate", &self.checker_success_rate)
            .field("log_dir", &self.log_dir)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    listen_addr: Option<String>,
    storage: Option<String>,
    database_url: Option<String>,
    db_path: Option<String>,
    jwt_secret: Option<String>,
    jwt_expires_in: Option<String>,
    bcrypt_cost: Option<u32>,
    openai_api_key: Option<String>,
    openai_base_url: Option<String>,
    openai_model: Option<String>,
    checker_kind: Option<String>,
    checker_success_rate: Option<f64>,
    encryption_key: Option<String>,
    log_dir: Option<String>,
    environment: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    admin_name: Option<String>,
}

impl PartialServerConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_db_path() -> String {
    "data/scrapewatch.db".to_string()
}

fn default_jwt_expires_in() -> String {
    "24h".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn parse_key<T: FromStr<Err = String>>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|reason| ConfigError::Invalid { key, reason })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    /// Loads the optional TOML file, then lets environment variables override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => PartialServerConfig::from_file(path_str)?,
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env()?;

        // 3. Merge: environment overrides file
        Self::merge(file_config, env_config)
    }

    pub fn merge(
        file: PartialServerConfig,
        env: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        let listen_addr = env
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or_else(default_listen_addr);
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "listen_addr",
                reason: e.to_string(),
            })?;

        let storage = match env.storage.or(file.storage) {
            Some(value) => parse_key("storage", &value)?,
            None => StorageKind::Sql,
        };

        let (database_url, db_path) = match non_empty(env.database_url.or(file.database_url)) {
            Some(url) => (url, None),
            None => {
                let path = env.db_path.or(file.db_path).unwrap_or_else(default_db_path);
                (format!("sqlite://{path}?mode=rwc"), Some(path))
            }
        };

        let jwt_secret = non_empty(env.jwt_secret.or(file.jwt_secret))
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expires_in = env
            .jwt_expires_in
            .or(file.jwt_expires_in)
            .unwrap_or_else(default_jwt_expires_in);
        if crate::services::auth_service::parse_duration(&jwt_expires_in).is_none() {
            return Err(ConfigError::Invalid {
                key: "jwt_expires_in",
                reason: format!("'{jwt_expires_in}' is not a duration like 24h, 30m or 3600"),
            });
        }

        let bcrypt_cost = env
            .bcrypt_cost
            .or(file.bcrypt_cost)
            .unwrap_or(bcrypt::DEFAULT_COST);
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "bcrypt_cost",
                reason: "must be between 4 and 31".to_string(),
            });
        }

        let checker_kind = match env.checker_kind.or(file.checker_kind) {
            Some(value) => parse_key("checker_kind", &value)?,
            None => CheckerKind::Random,
        };
        let checker_success_rate = env
            .checker_success_rate
            .or(file.checker_success_rate)
            .unwrap_or(0.5);
        if !(0.0..=1.0).contains(&checker_success_rate) {
            return Err(ConfigError::Invalid {
                key: "checker_success_rate",
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }

        let encryption_key = non_empty(env.encryption_key.or(file.encryption_key))
            .ok_or(ConfigError::Missing("ENCRYPTION_KEY"))?;
        if encryption_key.len() != 64 || hex::decode(&encryption_key).is_err() {
            return Err(ConfigError::Invalid {
                key: "encryption_key",
                reason: "must be 64 hex characters".to_string(),
            });
        }

        Ok(ServerConfig {
            listen_addr,
            storage,
            database_url,
            db_path,
            jwt_secret,
            jwt_expires_in,
            bcrypt_cost,
            openai_api_key: non_empty(env.openai_api_key.or(file.openai_api_key)),
            openai_base_url: env
                .openai_base_url
                .or(file.openai_base_url)
                .unwrap_or_else(default_openai_base_url),
            openai_model: env
                .openai_model
                .or(file.openai_model)
                .unwrap_or_else(default_openai_model),
            checker_kind,
            checker_success_rate,
            encryption_key,
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            environment: env
                .environment
                .or(file.environment)
                .unwrap_or_else(default_environment),
            admin_email: non_empty(env.admin_email.or(file.admin_email)),
            admin_password: non_empty(env.admin_password.or(file.admin_password)),
            admin_name: env
                .admin_name
                .or(file.admin_name)
                .unwrap_or_else(|| "Administrator".to_string()),
        })
    }

    /// In-memory storage, cheap bcrypt and a fixed secret.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let env = PartialServerConfig {
            storage: Some("memory".to_string()),
            jwt_secret: Some("test-secret".to_string()),
            encryption_key: Some(
                "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f".to_string(),
            ),
            bcrypt_cost: Some(4),
            environment: Some("test".to_string()),
            ..Default::default()
        };
        Self::merge(PartialServerConfig::default(), env).expect("test configuration is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100";

    fn env_from(pairs: &[(&str, &str)]) -> PartialServerConfig {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_given() {
        let config = ServerConfig::merge(
            PartialServerConfig::default(),
            env_from(&[("JWT_SECRET", "s3cret"), ("ENCRYPTION_KEY", KEY)]),
        )
        .unwrap();

        assert_eq!(config.listen_addr.port(), 3001);
        assert_eq!(config.storage, StorageKind::Sql);
        assert_eq!(config.database_url, "sqlite://data/scrapewatch.db?mode=rwc");
        assert_eq!(config.db_path.as_deref(), Some("data/scrapewatch.db"));
        assert_eq!(config.jwt_expires_in, "24h");
        assert_eq!(config.openai_model, "gpt-4");
        assert_eq!(config.checker_kind, CheckerKind::Random);
        assert_eq!(config.checker_success_rate, 0.5);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = ServerConfig::merge(PartialServerConfig::default(), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn missing_encryption_key_is_an_error() {
        let err = ServerConfig::merge(
            PartialServerConfig::default(),
            env_from(&[("JWT_SECRET", "s3cret"), ("ENVIRONMENT", "production")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ENCRYPTION_KEY")));
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "jwt_secret = \"from-file\"\nlisten_addr = \"127.0.0.1:4000\"\ndb_path = \"/tmp/file.db\""
        )
        .unwrap();
        let file_config = PartialServerConfig::from_file(file.path().to_str().unwrap()).unwrap();

        let config = ServerConfig::merge(
            file_config,
            env_from(&[
                ("JWT_SECRET", "from-env"),
                ("ENCRYPTION_KEY", KEY),
                ("DATABASE_URL", "postgres://localhost/scrapewatch"),
                ("CHECKER_KIND", "http"),
            ]),
        )
        .unwrap();

        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.listen_addr.port(), 4000);
        assert_eq!(config.database_url, "postgres://localhost/scrapewatch");
        assert!(config.db_path.is_none());
        assert_eq!(config.checker_kind, CheckerKind::Http);
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let err = PartialServerConfig::from_file("/nonexistent/scrapewatch.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scrapewatch.toml"));
    }

    #[test]
    fn rejects_bad_values() {
        let cases: &[(&str, &str)] = &[
            ("CHECKER_SUCCESS_RATE", "1.5"),
            ("JWT_EXPIRES_IN", "soon"),
            ("STORAGE", "mongo"),
        ];
        for (key, value) in cases {
            let result = ServerConfig::merge(
                PartialServerConfig::default(),
                env_from(&[("JWT_SECRET", "s"), ("ENCRYPTION_KEY", KEY), (key, value)]),
            );
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_malformed_encryption_key() {
        let result = ServerConfig::merge(
            PartialServerConfig::default(),
            env_from(&[("JWT_SECRET", "s"), ("ENCRYPTION_KEY", "abcd")]),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { key: "encryption_key", .. })));
    }

    #[test]
    fn test_config_uses_memory_storage() {
        let config = ServerConfig::for_tests();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.bcrypt_cost, 4);
    }
}
