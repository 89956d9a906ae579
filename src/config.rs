use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Gerrit host queried when neither the CLI nor the config file names one.
pub const DEFAULT_HOST: &str = "review.openstack.org";

const USER_ENV: &str = "GERRIT_USER";
const PASSWORD_ENV: &str = "GERRIT_HTTP_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No Gerrit {name} given; pass --{name}, set [gerrit] {name} in .gerrit-grab.toml, or export {env}")]
    MissingCredential { name: &'static str, env: &'static str },
}

/// Top-level configuration loaded from .gerrit-grab.toml.
///
/// All fields are optional; the tool works with CLI flags alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gerrit: GerritConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GerritConfig {
    /// Review-server hostname, no scheme.
    pub host: Option<String>,
    /// HTTP digest username.
    pub user: Option<String>,
    /// HTTP digest password.
    pub password: Option<String>,
}

/// Digest-auth credential pair handed to the query client.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Config {
    /// Load configuration from .gerrit-grab.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".gerrit-grab.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the host: CLI flag beats config file beats the built-in
    /// default.
    pub fn resolve_host(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.gerrit.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    /// Resolve the credential pair: CLI flag beats config file beats
    /// environment variable. A pair half that resolves nowhere is an error
    /// naming the missing half.
    pub fn resolve_credentials(
        &self,
        cli_user: Option<String>,
        cli_password: Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let user = cli_user
            .or_else(|| self.gerrit.user.clone())
            .or_else(|| std::env::var(USER_ENV).ok())
            .ok_or(ConfigError::MissingCredential {
                name: "user",
                env: USER_ENV,
            })?;

        let password = cli_password
            .or_else(|| self.gerrit.password.clone())
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .ok_or(ConfigError::MissingCredential {
                name: "password",
                env: PASSWORD_ENV,
            })?;

        Ok(Credentials { user, password })
    }
}
