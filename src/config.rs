//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The backend URL and publishable key have no default and are checked by
/// [`Config::backend_settings`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Commerce backend base URL
    pub backend_url: Option<String>,
    /// Publishable API key sent with every backend call
    pub publishable_key: Option<String>,
    /// HTTP server port
    pub server_port: u16,
    /// Freshness window of the product list, in seconds
    pub products_ttl: u64,
    /// Freshness window of a single product, in seconds
    pub product_ttl: u64,
    /// Upper bound on one backend call in seconds, 0 disables the bound
    pub loader_timeout: u64,
    /// Maximum number of cached entries, 0 means unbounded
    pub max_entries: usize,
    /// File backing the persisted cart identifier
    pub cart_store_path: PathBuf,
}

/// Validated connection settings for the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Base URL without trailing slash
    pub base_url: String,
    pub publishable_key: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEDUSA_BACKEND_URL` - Commerce backend base URL (required)
    /// - `MEDUSA_PUBLISHABLE_KEY` - Publishable API key (required)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PRODUCTS_TTL` - Product list freshness in seconds (default: 300)
    /// - `PRODUCT_TTL` - Product detail freshness in seconds (default: 600)
    /// - `LOADER_TIMEOUT` - Backend call timeout in seconds (default: 30, 0 = none)
    /// - `MAX_ENTRIES` - Cache entry bound (default: 0 = unbounded)
    /// - `CART_STORE_PATH` - Cart identifier file (default: .storefront/cart.json)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend_url: env::var("MEDUSA_BACKEND_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            publishable_key: env::var("MEDUSA_PUBLISHABLE_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            products_ttl: parse_var("PRODUCTS_TTL").unwrap_or(defaults.products_ttl),
            product_ttl: parse_var("PRODUCT_TTL").unwrap_or(defaults.product_ttl),
            loader_timeout: parse_var("LOADER_TIMEOUT").unwrap_or(defaults.loader_timeout),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cart_store_path: env::var("CART_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cart_store_path),
        }
    }

    /// Returns the backend settings, failing if either required value is missing.
    pub fn backend_settings(&self) -> Result<BackendSettings, AppError> {
        let base_url = self.backend_url.as_deref().ok_or_else(|| {
            AppError::Configuration("Medusa backend URL is not configured".to_string())
        })?;
        let publishable_key = self.publishable_key.clone().ok_or_else(|| {
            AppError::Configuration("Medusa publishable API key is not configured".to_string())
        })?;

        Ok(BackendSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            publishable_key,
        })
    }

    pub fn products_ttl(&self) -> Duration {
        Duration::from_secs(self.products_ttl)
    }

    pub fn product_ttl(&self) -> Duration {
        Duration::from_secs(self.product_ttl)
    }

    /// Loader timeout, `None` when disabled.
    pub fn loader_timeout(&self) -> Option<Duration> {
        (self.loader_timeout > 0).then(|| Duration::from_secs(self.loader_timeout))
    }

    /// Cache capacity, `None` when unbounded.
    pub fn max_entries(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            publishable_key: None,
            server_port: 3000,
            products_ttl: 300,
            product_ttl: 600,
            loader_timeout: 30,
            max_entries: 0,
            cart_store_path: PathBuf::from(".storefront/cart.json"),
        }
    }
}
