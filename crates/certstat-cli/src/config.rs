//! CLI configuration loading and resolution.
//!
//! Settings come from `~/.certstat/config.huml` with priority order:
//! CLI flags > environment variables > config file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use certstat_core::checker::{CheckerConfig, DEFAULT_CHECKER_URL};
use certstat_core::folders::{default_ignore, DEFAULT_P12_PASSWORD};

pub const ENV_CONFIG: &str = "CERTSTAT_CONFIG";
pub const ENV_CHECKER_URL: &str = "CERTSTAT_CHECKER_URL";
pub const ENV_DEFAULT_PASSWORD: &str = "CERTSTAT_DEFAULT_PASSWORD";

const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 90;

/// CLI configuration loaded from the config.huml file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    /// Checker site base URL.
    pub checker_url: Option<String>,
    /// p12 password for folders without a password.txt.
    pub default_password: Option<String>,
    /// Top-level directories that are not certificate folders.
    pub ignore: Option<Vec<String>>,
    /// Folders checked at the same time.
    pub concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub submit_timeout_secs: Option<u64>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub checker_url: Option<String>,
    pub default_password: Option<String>,
    pub concurrency: Option<usize>,
}

/// Resolved configuration after applying priority rules.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub checker_url: String,
    pub default_password: String,
    pub ignore: Vec<String>,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub submit_timeout: Duration,
}

impl ResolvedConfig {
    pub fn checker_config(&self) -> Result<CheckerConfig> {
        let mut config = CheckerConfig::new(&self.checker_url)
            .with_context(|| format!("Invalid checker URL '{}'", self.checker_url))?;
        config.request_timeout = self.request_timeout;
        config.submit_timeout = self.submit_timeout;
        Ok(config)
    }
}

/// Returns the config directory path (~/.certstat).
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".certstat"))
        .context("Could not determine home directory")
}

/// Returns the config file path, honoring `CERTSTAT_CONFIG`.
pub fn config_path() -> Result<PathBuf> {
    match std::env::var(ENV_CONFIG) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Ok(config_dir()?.join("config.huml")),
    }
}

/// Load configuration from the config file.
///
/// Returns `Ok(None)` if the config file doesn't exist.
/// Returns an error if the file exists but is invalid.
pub fn load_config() -> Result<Option<CliConfig>> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let config: CliConfig = huml_rs::serde::from_str(&content)
        .with_context(|| format!("Invalid HUML in {}", path.display()))?;

    validate_config(&config)?;
    check_file_permissions(&path);

    Ok(Some(config))
}

fn validate_config(config: &CliConfig) -> Result<()> {
    if let Some(url) = &config.checker_url {
        if url.trim().is_empty() {
            bail!("checker_url must not be empty");
        }
    }
    if config.concurrency == Some(0) {
        bail!("concurrency must be at least 1");
    }
    if config.request_timeout_secs == Some(0) || config.submit_timeout_secs == Some(0) {
        bail!("Timeouts must be at least 1 second");
    }
    Ok(())
}

/// Warn if the config file is readable by others (it may hold a password).
#[cfg(unix)]
fn check_file_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            tracing::warn!(
                "{} has overly permissive permissions ({:o}). Consider running: chmod 600 {}",
                path.display(),
                mode & 0o777,
                path.display()
            );
        }
    }
}

#[cfg(not(unix))]
fn check_file_permissions(_path: &std::path::Path) {}

/// Resolve configuration by applying priority rules.
///
/// Priority order (highest to lowest):
/// 1. CLI flags (`--checker-url`, `--default-password`, `--concurrency`)
/// 2. Environment variables (`CERTSTAT_CHECKER_URL`, `CERTSTAT_DEFAULT_PASSWORD`)
/// 3. Config file
/// 4. Built-in defaults
pub fn resolve_config(
    overrides: &ConfigOverrides,
    file_config: Option<CliConfig>,
) -> Result<ResolvedConfig> {
    let file = file_config.unwrap_or_default();

    let checker_url = overrides
        .checker_url
        .clone()
        .or_else(|| std::env::var(ENV_CHECKER_URL).ok())
        .or(file.checker_url)
        .unwrap_or_else(|| DEFAULT_CHECKER_URL.to_string());

    let default_password = overrides
        .default_password
        .clone()
        .or_else(|| std::env::var(ENV_DEFAULT_PASSWORD).ok())
        .or(file.default_password)
        .unwrap_or_else(|| DEFAULT_P12_PASSWORD.to_string());

    let concurrency = overrides
        .concurrency
        .or(file.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }

    url::Url::parse(&checker_url).with_context(|| format!("Invalid checker URL '{}'", checker_url))?;

    Ok(ResolvedConfig {
        checker_url,
        default_password,
        ignore: file.ignore.unwrap_or_else(default_ignore),
        concurrency,
        request_timeout: Duration::from_secs(
            file.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        ),
        submit_timeout: Duration::from_secs(
            file.submit_timeout_secs.unwrap_or(DEFAULT_SUBMIT_TIMEOUT_SECS),
        ),
    })
}
