//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

use crate::locale::validate_locale;
use crate::resolve::FallbackPolicy;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enroll every registered type in eager association loading
    /// (default: false).
    pub auto_load: bool,

    /// Fallback policy for read-path locale resolution (default: none).
    pub fallback: FallbackPolicy,

    /// Application-configured fallback locale, consumed only when `fallback`
    /// is `app`. Owned by the host application.
    pub fallback_locale: Option<String>,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let auto_load = env::var("TRANSLATABLE_AUTO_LOAD")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .context("TRANSLATABLE_AUTO_LOAD must be true or false")?;

        let fallback = FallbackPolicy::parse(
            &env::var("TRANSLATABLE_FALLBACK").unwrap_or_default(),
        )?;

        let fallback_locale = match env::var("APP_FALLBACK_LOCALE") {
            Ok(locale) if !locale.trim().is_empty() => {
                let locale = locale.trim().to_string();
                validate_locale(&locale)
                    .with_context(|| format!("APP_FALLBACK_LOCALE '{locale}' is not a locale"))?;
                Some(locale)
            }
            _ => None,
        };

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        Ok(Self {
            auto_load,
            fallback,
            fallback_locale,
            database_url,
            database_max_connections,
        })
    }
}
