//! Application configuration

use std::env;
use std::time::Duration;

/// Which mapping store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStoreKind {
    Postgres,
    /// In-process store, empty at startup
    Memory,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    /// Scheme for redirect targets when no `X-Forwarded-Proto` is present
    pub default_scheme: String,

    // Storage
    pub mapping_store: MappingStoreKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Admin API
    pub admin_token: String,

    // Routing
    /// Path segment that prefixes slug-addressed sites, `s` in `/s/<slug>`
    pub site_prefix: String,
    /// Zero disables the domain cache
    pub domain_cache_ttl: Duration,
    pub canonicalize_platform_host: bool,
    pub permanent_redirects: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mapping_store = match env::var("MAPPING_STORE").as_deref() {
            Err(_) | Ok("postgres") => MappingStoreKind::Postgres,
            Ok("memory") => MappingStoreKind::Memory,
            Ok(_) => return Err(ConfigError::Invalid("MAPPING_STORE must be `postgres` or `memory`")),
        };

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if mapping_store == MappingStoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            default_scheme: {
                let scheme = env::var("DEFAULT_SCHEME").unwrap_or_else(|_| "https".to_string());
                if scheme != "http" && scheme != "https" {
                    return Err(ConfigError::Invalid("DEFAULT_SCHEME must be `http` or `https`"));
                }
                scheme
            },

            // Storage
            mapping_store,
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Admin API
            admin_token: {
                let token = env::var("ADMIN_TOKEN").map_err(|_| ConfigError::Missing("ADMIN_TOKEN"))?;
                if token.len() < 32 {
                    return Err(ConfigError::WeakSecret("ADMIN_TOKEN must be at least 32 characters"));
                }
                token
            },

            // Routing
            site_prefix: {
                let prefix = env::var("SITE_PREFIX").unwrap_or_else(|_| "s".to_string());
                if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                    return Err(ConfigError::Invalid("SITE_PREFIX must be a single path segment"));
                }
                prefix
            },
            domain_cache_ttl: Duration::from_secs(
                env::var("DOMAIN_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            ),
            canonicalize_platform_host: env::var("CANONICALIZE_PLATFORM_HOST")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            permanent_redirects: env::var("PERMANENT_REDIRECTS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "MAPPING_STORE",
        "DATABASE_URL",
        "ADMIN_TOKEN",
        "DEFAULT_SCHEME",
        "SITE_PREFIX",
        "DOMAIN_CACHE_TTL_SECS",
        "CANONICALIZE_PLATFORM_HOST",
        "PERMANENT_REDIRECTS",
    ];

    fn setup_minimal_config() {
        cleanup_config();
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("ADMIN_TOKEN", "test-admin-token-must-be-at-least-32-chars");
    }

    fn cleanup_config() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        setup_minimal_config();
        let config = Config::from_env().unwrap();
        assert_eq!(config.mapping_store, MappingStoreKind::Postgres);
        assert_eq!(config.default_scheme, "https");
        assert_eq!(config.site_prefix, "s");
        assert_eq!(config.domain_cache_ttl, Duration::from_secs(60));
        assert!(!config.canonicalize_platform_host);
        assert!(!config.permanent_redirects);
        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_admin_token_validation() {
        setup_minimal_config();
        env::remove_var("ADMIN_TOKEN");
        assert!(matches!(Config::from_env(), Err(ConfigError::Missing("ADMIN_TOKEN"))));

        env::set_var("ADMIN_TOKEN", "short");
        assert!(matches!(Config::from_env(), Err(ConfigError::WeakSecret(_))));
        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_memory_store_needs_no_database() {
        setup_minimal_config();
        env::remove_var("DATABASE_URL");
        assert!(matches!(Config::from_env(), Err(ConfigError::Missing("DATABASE_URL"))));

        env::set_var("MAPPING_STORE", "memory");
        let config = Config::from_env().unwrap();
        assert_eq!(config.mapping_store, MappingStoreKind::Memory);
        assert!(config.database_url.is_none());

        env::set_var("MAPPING_STORE", "sqlite");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));
        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_routing_options() {
        setup_minimal_config();
        env::set_var("SITE_PREFIX", "sites");
        env::set_var("DOMAIN_CACHE_TTL_SECS", "0");
        env::set_var("CANONICALIZE_PLATFORM_HOST", "true");
        env::set_var("PERMANENT_REDIRECTS", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.site_prefix, "sites");
        assert!(config.domain_cache_ttl.is_zero());
        assert!(config.canonicalize_platform_host);
        assert!(config.permanent_redirects);

        env::set_var("SITE_PREFIX", "a/b");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));

        env::set_var("SITE_PREFIX", "s");
        env::set_var("DEFAULT_SCHEME", "ftp");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));
        cleanup_config();
    }
}
