/// Configuration management for the API server
///
/// Boot parameters come from the process environment; everything else is
/// layered with the `config` crate:
///
/// 1. `<app_home>/config/default.json` (optional)
/// 2. `<app_home>/config/<env>.json` (optional)
/// 3. `GATEHOUSE__*` environment variables, `__` separating sections
///
/// # Boot Parameters
///
/// - `GATEHOUSE_ENV`: environment name (default: `dev`)
/// - `GATEHOUSE_HOME`: application home directory (default: `.`)
/// - `GATEHOUSE_MIGRATION`: `m` to migrate, `r` to roll back, empty for none
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::config::{BootParams, Config};
///
/// # fn example() -> anyhow::Result<()> {
/// let boot = BootParams::from_env()?;
/// let config = Config::load(&boot)?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use config::{Environment, File};
use gatehouse_shared::{
    auth::jwt::{JwtKeys, DEFAULT_ISSUER, MIN_SECRET_LEN},
    db::{migrations::MigrationMode, pool::DatabaseConfig},
};
use serde::{Deserialize, Serialize};

/// Parameters fixed at process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParams {
    /// Environment name, selects `config/<env>.json`
    pub env: String,

    /// Directory holding `config/` and relative paths
    pub app_home: PathBuf,

    /// What to do with migrations before serving
    pub migration: MigrationMode,
}

impl Default for BootParams {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            app_home: PathBuf::from("."),
            migration: MigrationMode::None,
        }
    }
}

impl BootParams {
    /// Reads `GATEHOUSE_ENV`, `GATEHOUSE_HOME` and `GATEHOUSE_MIGRATION`
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let migration = match env::var("GATEHOUSE_MIGRATION") {
            Ok(raw) => raw
                .parse::<MigrationMode>()
                .map_err(|e| anyhow::anyhow!("invalid GATEHOUSE_MIGRATION: {}", e))?,
            Err(_) => MigrationMode::None,
        };

        Ok(Self {
            env: env::var("GATEHOUSE_ENV").unwrap_or(defaults.env),
            app_home: env::var("GATEHOUSE_HOME")
                .map(PathBuf::from)
                .unwrap_or(defaults.app_home),
            migration,
        })
    }

    /// Resolves `path` against the application home
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_home.join(path)
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,

    /// Connection pool
    pub database: DatabaseConfig,

    /// Logging
    pub log: LogConfig,

    /// Token signing
    pub jwt: JwtConfig,

    /// Filesystem layout
    pub dirs: DirsConfig,

    /// Reload static assets from disk on every request
    pub autoreload: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Write logs to this file instead of stdout
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "gatehouse_api=info,gatehouse_shared=info,tower_http=info".to_string(),
            file: None,
            json: false,
        }
    }
}

/// JWT configuration
///
/// When both key paths are set tokens are signed with RS256; otherwise the
/// shared `secret` is used with HS256.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 secret, at least 32 bytes
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// RS256 private key (PEM)
    pub private_key_path: Option<PathBuf>,

    /// RS256 public key (PEM)
    pub public_key_path: Option<PathBuf>,

    /// `iss` claim
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            private_key_path: None,
            public_key_path: None,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

impl JwtConfig {
    fn uses_rsa(&self) -> bool {
        self.private_key_path.is_some() && self.public_key_path.is_some()
    }

    /// Loads the signing keys, reading PEM files relative to `app_home`
    pub fn load_keys(&self, boot: &BootParams) -> anyhow::Result<JwtKeys> {
        match (&self.private_key_path, &self.public_key_path) {
            (Some(private), Some(public)) => {
                let private = boot.resolve(private);
                let public = boot.resolve(public);
                let private_pem = std::fs::read(&private)
                    .with_context(|| format!("reading JWT private key {}", private.display()))?;
                let public_pem = std::fs::read(&public)
                    .with_context(|| format!("reading JWT public key {}", public.display()))?;

                Ok(JwtKeys::from_rsa_pem(&private_pem, &public_pem, &self.issuer)?)
            }
            _ => Ok(JwtKeys::from_secret(&self.secret, &self.issuer)?),
        }
    }
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirsConfig {
    /// Base directory for the others
    pub base: PathBuf,

    /// Read-only resources (key files, seed data)
    pub resources: PathBuf,

    /// Static files served under `/public`
    pub public: PathBuf,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("."),
            resources: PathBuf::from("resources"),
            public: PathBuf::from("public"),
        }
    }
}

impl DirsConfig {
    /// Absolute location of the public directory
    pub fn public_dir(&self, boot: &BootParams) -> PathBuf {
        boot.resolve(self.base.join(&self.public))
    }
}

impl Config {
    /// Loads layered configuration for `boot`
    ///
    /// A `.env` file in the working directory is read first, so its values
    /// take part in the environment layer.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed, a value has the
    /// wrong type, or [`Config::validate`] fails.
    pub fn load(boot: &BootParams) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config_dir = boot.app_home.join("config");
        let default_file = config_dir.join("default");
        let env_file = config_dir.join(&boot.env);

        let config: Config = config::Config::builder()
            .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
            .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("GATEHOUSE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()
            .context("reading configuration")?
            .try_deserialize()
            .context("parsing configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Checks required values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url is required (GATEHOUSE__DATABASE__URL)");
        }

        if !self.jwt.uses_rsa() && self.jwt.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "jwt.secret must be at least {} bytes when no RSA key pair is configured",
                MIN_SECRET_LEN
            );
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.database.url = "postgresql://localhost/gatehouse_test".to_string();
        config.jwt.secret = "test-secret-key-at-least-32-bytes-long".to_string();
        config
    }

    #[test]
    fn test_bind_address() {
        let mut config = valid_config();
        config.server.host = "127.0.0.1".to_string();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut no_db = valid_config();
        no_db.database.url.clear();
        assert!(no_db.validate().is_err());

        let mut weak = valid_config();
        weak.jwt.secret = "short".to_string();
        assert!(weak.validate().is_err());

        weak.jwt.private_key_path = Some(PathBuf::from("keys/private.pem"));
        weak.jwt.public_key_path = Some(PathBuf::from("keys/public.pem"));
        assert!(weak.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "server": { "port": 9000 },
            "database": { "url": "postgresql://db/app", "max_connections": 4 },
            "log": { "level": "debug" },
            "autoreload": true
        }))
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.jwt.issuer, "gatehouse");
        assert!(config.autoreload);
    }

    #[test]
    fn test_load_keys_from_secret() {
        let keys = valid_config().jwt.load_keys(&BootParams::default()).unwrap();
        assert_eq!(keys.issuer(), "gatehouse");
    }

    #[test]
    fn test_load_keys_missing_pem() {
        let mut config = valid_config();
        config.jwt.private_key_path = Some(PathBuf::from("does/not/exist.pem"));
        config.jwt.public_key_path = Some(PathBuf::from("does/not/exist.pub"));
        assert!(config.jwt.load_keys(&BootParams::default()).is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let boot = BootParams {
            app_home: PathBuf::from("/srv/gatehouse"),
            ..Default::default()
        };

        assert_eq!(boot.resolve("keys/a.pem"), PathBuf::from("/srv/gatehouse/keys/a.pem"));
        assert_eq!(boot.resolve("/etc/a.pem"), PathBuf::from("/etc/a.pem"));
        assert_eq!(
            DirsConfig::default().public_dir(&boot),
            PathBuf::from("/srv/gatehouse/./public")
        );
    }
}
