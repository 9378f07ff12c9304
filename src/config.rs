use std::env;
use std::fmt;

const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:3000,http://localhost,http://localhost:80,http://127.0.0.1,http://127.0.0.1:3000";

/// Runtime configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub bcrypt_cost: u32,
    pub server_host: String,
    pub server_port: u16,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_max_connections = or_default("DATABASE_MAX_CONNECTIONS", "5");
        let access_token_expire_minutes = or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "30");
        let server_port = or_default("SERVER_PORT", "8000");
        let bcrypt_cost = or_default("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string());

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                value: jwt_secret,
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: database_max_connections.parse().map_err(|_| {
                ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    value: database_max_connections.clone(),
                }
            })?,
            jwt_secret,
            access_token_expire_minutes: match access_token_expire_minutes.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                        value: access_token_expire_minutes,
                    })
                }
            },
            bcrypt_cost: match bcrypt_cost.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BCRYPT_COST",
                        value: bcrypt_cost,
                    })
                }
            },
            server_host: or_default("SERVER_HOST", "127.0.0.1"),
            server_port: server_port.parse().map_err(|_| ConfigError::Invalid {
                key: "SERVER_PORT",
                value: server_port.clone(),
            })?,
            allowed_origins: or_default("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expire_minutes)
    }
}
