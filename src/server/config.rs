//! Configuration loading for uraniad.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.urania/config.toml` (user)
//! 3. `/etc/urania/config.toml` (system)
//!
//! Cache and rate-limit knobs can be overridden per-environment without
//! touching the file (see [`Config::apply_env_overrides`]).
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.urania/secrets.toml` (user, must be 0600)
//! 2. `/etc/urania/secrets.toml` (system, must be 0600)
//! 3. `URANIA_API_KEY` environment variable

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::limiter::{LimiterConfig, TierLimit};
use crate::provider::RetryConfig;
use crate::{Result, UraniaError};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub limits: LimitsSection,
    pub provider: ProviderSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9752).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9752".to_string()
}

/// Interpretation cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Global cache switch (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entry time-to-live in seconds (default: 24 hours).
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Maximum cached entries (default: 10,000).
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    24 * 3600
}

fn default_cache_entries() -> u64 {
    10_000
}

/// Per-tier admission limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "TierSection::standard_default")]
    pub standard: TierSection,
    #[serde(default = "TierSection::strict_default")]
    pub strict: TierSection,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            standard: TierSection::standard_default(),
            strict: TierSection::strict_default(),
        }
    }
}

/// Ceiling and window for one tier.
#[derive(Debug, Clone, Deserialize)]
pub struct TierSection {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl TierSection {
    fn standard_default() -> Self {
        Self {
            max_requests: 120,
            window_secs: 60,
        }
    }

    fn strict_default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 3600,
        }
    }
}

impl Default for TierSection {
    fn default() -> Self {
        Self::standard_default()
    }
}

/// Interpretation service connection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSection {
    /// Base URL of the interpretation service.
    pub base_url: String,
    /// Model identifier forwarded on every request.
    pub model: String,
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 {
    60
}

/// Provider retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Attempts including the initial request (default: 3).
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}

/// Environment variable overrides for the tunable sections.
const ENV_OVERRIDES: &[&str] = &[
    "URANIA_CACHE_ENABLED",
    "URANIA_CACHE_TTL_SECS",
    "URANIA_STANDARD_MAX_REQUESTS",
    "URANIA_STANDARD_WINDOW_SECS",
    "URANIA_STRICT_MAX_REQUESTS",
    "URANIA_STRICT_WINDOW_SECS",
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.urania/config.toml`
    /// 3. `/etc/urania/config.toml`
    ///
    /// Environment overrides are applied after parsing.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            UraniaError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            UraniaError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `URANIA_*` environment overrides to the tunable sections.
    ///
    /// Cache enabled/TTL and per-tier ceilings/windows are deployment
    /// knobs; operators flip them without editing the config file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        for name in ENV_OVERRIDES {
            let Ok(value) = std::env::var(name) else {
                continue;
            };
            match *name {
                "URANIA_CACHE_ENABLED" => self.cache.enabled = parse_env(name, &value)?,
                "URANIA_CACHE_TTL_SECS" => self.cache.ttl_secs = parse_env(name, &value)?,
                "URANIA_STANDARD_MAX_REQUESTS" => {
                    self.limits.standard.max_requests = parse_env(name, &value)?;
                }
                "URANIA_STANDARD_WINDOW_SECS" => {
                    self.limits.standard.window_secs = parse_env(name, &value)?;
                }
                "URANIA_STRICT_MAX_REQUESTS" => {
                    self.limits.strict.max_requests = parse_env(name, &value)?;
                }
                "URANIA_STRICT_WINDOW_SECS" => {
                    self.limits.strict.window_secs = parse_env(name, &value)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(UraniaError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".urania").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/urania/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(UraniaError::Configuration(
            "No config file found. Create ~/.urania/config.toml or /etc/urania/config.toml"
                .to_string(),
        ))
    }

    /// Cache configuration for the gateway builder.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .enabled(self.cache.enabled)
            .ttl(Duration::from_secs(self.cache.ttl_secs))
            .max_entries(self.cache.max_entries)
    }

    /// Limiter configuration for the gateway builder.
    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig::new()
            .standard(TierLimit::new(
                self.limits.standard.max_requests,
                Duration::from_secs(self.limits.standard.window_secs),
            ))
            .strict(TierLimit::new(
                self.limits.strict.max_requests,
                Duration::from_secs(self.limits.strict.window_secs),
            ))
    }

    /// Retry configuration for the gateway builder.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new().max_attempts(self.retry.max_attempts)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| UraniaError::Configuration(format!("Invalid value for {name}: {value:?}")))
}

/// Secrets configuration (the interpretation service API key).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub provider: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.urania/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/urania/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (the key may come from
    /// the environment instead).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".urania").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = PathBuf::from("/etc/urania/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            UraniaError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            UraniaError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            UraniaError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(UraniaError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        // Permission check not available on non-Unix platforms
        Ok(())
    }

    /// The provider API key, falling back to `URANIA_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.provider
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var("URANIA_API_KEY").ok())
    }
}
