//! `certstat config` commands for managing CLI configuration.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use certstat_core::checker::DEFAULT_CHECKER_URL;
use certstat_core::folders::default_ignore;

use crate::config::{config_path, load_config, CliConfig, ENV_CONFIG};
use crate::output::{print_key_value, print_success};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create a new config file with default settings
    Init {
        /// Checker site base URL
        #[arg(long)]
        checker_url: Option<String>,

        /// Default p12 password
        #[arg(long)]
        default_password: Option<String>,

        /// Folders checked at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Show the password (masked by default)
        #[arg(long)]
        show_password: bool,
    },

    /// Show config file path
    Path,
}

pub fn handle_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init {
            checker_url,
            default_password,
            concurrency,
            force,
        } => init_config(checker_url, default_password, concurrency, force),
        ConfigCommands::Show { show_password } => show_config(show_password),
        ConfigCommands::Path => show_path(),
    }
}

/// Create a new config file.
fn init_config(
    checker_url: Option<String>,
    default_password: Option<String>,
    concurrency: Option<usize>,
    force: bool,
) -> Result<()> {
    let path = config_path()?;

    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    if concurrency == Some(0) {
        bail!("--concurrency must be at least 1");
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty() && !d.exists()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        #[cfg(unix)]
        {
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }

    let config = CliConfig {
        checker_url: Some(checker_url.unwrap_or_else(|| DEFAULT_CHECKER_URL.to_string())),
        default_password,
        ignore: Some(default_ignore()),
        concurrency,
        request_timeout_secs: None,
        submit_timeout_secs: None,
    };

    write_config(&path, &config)?;

    print_success(&format!("Created config file at {}", path.display()));
    Ok(())
}

/// Display current configuration.
fn show_config(show_password: bool) -> Result<()> {
    let path = config_path()?;

    let Some(config) = load_config()? else {
        println!("No config file found at {}", path.display());
        println!();
        println!("Using defaults:");
        println!("  Checker: {}", DEFAULT_CHECKER_URL);
        println!();
        println!("Run 'certstat config init' to create a config file.");
        return Ok(());
    };

    println!("Config file: {}", path.display());
    println!();

    let unset = || "(not set)".to_string();
    print_key_value("Checker URL", config.checker_url.as_deref().unwrap_or("(default)"));
    let password = match &config.default_password {
        Some(p) if show_password => p.clone(),
        Some(p) => format!("{} (use --show-password to reveal)", mask_secret(p)),
        None => unset(),
    };
    print_key_value("Default password", &password);
    print_key_value(
        "Ignore",
        &config.ignore.as_ref().map_or_else(unset, |dirs| dirs.join(", ")),
    );
    print_key_value(
        "Concurrency",
        &config.concurrency.map_or_else(unset, |c| c.to_string()),
    );
    print_key_value(
        "Request timeout",
        &config.request_timeout_secs.map_or_else(unset, |s| format!("{}s", s)),
    );
    print_key_value(
        "Submit timeout",
        &config.submit_timeout_secs.map_or_else(unset, |s| format!("{}s", s)),
    );

    Ok(())
}

/// Show the config file path.
fn show_path() -> Result<()> {
    let path = config_path()?;
    println!("{}", path.display());

    if let Ok(env_path) = std::env::var(ENV_CONFIG) {
        println!();
        println!("Note: {} is set to: {}", ENV_CONFIG, env_path);
    }

    Ok(())
}

/// Mask a secret for display (first 2 and last 2 characters).
/// Secrets shorter than 8 characters are fully masked.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Write config to file with HUML formatting and owner-only permissions.
fn write_config(path: &Path, config: &CliConfig) -> Result<()> {
    let content = serialize_to_huml(config);

    fs::write(path, &content).with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Serialize config to HUML format.
///
/// huml-rs only deserializes, so the document is written by hand.
fn serialize_to_huml(config: &CliConfig) -> String {
    let mut output = String::new();

    output.push_str("%HUML v0.2.0\n");
    if let Some(url) = &config.checker_url {
        output.push_str(&format!("checker_url: {}\n", quote(url)));
    }
    if let Some(password) = &config.default_password {
        output.push_str(&format!("default_password: {}\n", quote(password)));
    }
    if let Some(concurrency) = config.concurrency {
        output.push_str(&format!("concurrency: {}\n", concurrency));
    }
    if let Some(secs) = config.request_timeout_secs {
        output.push_str(&format!("request_timeout_secs: {}\n", secs));
    }
    if let Some(secs) = config.submit_timeout_secs {
        output.push_str(&format!("submit_timeout_secs: {}\n", secs));
    }
    if let Some(ignore) = config.ignore.as_ref().filter(|dirs| !dirs.is_empty()) {
        let items: Vec<String> = ignore.iter().map(|d| quote(d)).collect();
        output.push_str(&format!("ignore:: {}\n", items.join(", ")));
    }

    output
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("nezushub.vip"), "ne...ip");
        assert_eq!(mask_secret("密码密码密码密码"), "密码...密码");
    }

    #[test]
    fn test_serialize_to_huml() {
        let config = CliConfig {
            checker_url: Some("https://checker.example.com/".to_string()),
            default_password: Some("pa\"ss".to_string()),
            ignore: Some(vec![".git".to_string(), "scripts".to_string()]),
            concurrency: Some(2),
            request_timeout_secs: None,
            submit_timeout_secs: Some(60),
        };

        let huml = serialize_to_huml(&config);

        assert!(huml.starts_with("%HUML v0.2.0\n"));
        assert!(huml.contains("checker_url: \"https://checker.example.com/\"\n"));
        assert!(huml.contains("default_password: \"pa\\\"ss\"\n"));
        assert!(huml.contains("concurrency: 2\n"));
        assert!(huml.contains("submit_timeout_secs: 60\n"));
        assert!(!huml.contains("request_timeout_secs"));
        assert!(huml.ends_with("ignore:: \".git\", \"scripts\"\n"));
    }

    #[test]
    fn test_init_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.huml");

        temp_env::with_var(ENV_CONFIG, Some(path.as_os_str()), || {
            init_config(None, Some("hunter2".to_string()), Some(3), false).unwrap();
            assert!(init_config(None, None, None, false).is_err());

            let config = load_config().unwrap().unwrap();
            assert_eq!(config.checker_url.as_deref(), Some(DEFAULT_CHECKER_URL));
            assert_eq!(config.default_password.as_deref(), Some("hunter2"));
            assert_eq!(config.concurrency, Some(3));
            assert_eq!(config.ignore, Some(default_ignore()));

            #[cfg(unix)]
            {
                let mode = fs::metadata(&path).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o600);
            }
        });
    }
}
