use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::config::{handle_config_command, ConfigCommands};

#[derive(Parser)]
#[command(name = "certstat")]
#[command(version = certstat_core::VERSION)]
#[command(about = "Check and document the status of enterprise signing certificates", long_about = None)]
struct Cli {
    /// Checker site base URL (overrides env and config file)
    #[arg(long, global = true)]
    checker_url: Option<String>,

    /// Password for folders without a password.txt (overrides env and config file)
    #[arg(long, global = true)]
    default_password: Option<String>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every certificate folder and update the report and README
    Check {
        /// Repository root containing the certificate folders
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// README to update (defaults to <root>/README.md)
        #[arg(long)]
        readme: Option<PathBuf>,

        /// Report file to write (defaults to <root>/certificates.json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Don't touch the README
        #[arg(long)]
        no_readme: bool,

        /// Folders checked at the same time
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print the README certificate table
    List {
        #[arg(long, default_value = "README.md")]
        readme: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show provisioning profile metadata for a certificate folder
    Inspect {
        folder: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check the README table for inconsistencies
    Lint {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// README to lint (defaults to <root>/README.md)
        #[arg(long)]
        readme: Option<PathBuf>,

        /// Compare statuses against this report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Fail on warnings too
        #[arg(long)]
        strict: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show rows that differ between two READMEs
    Compare {
        left: PathBuf,
        right: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// List certificate folders and whether each can be checked
    Folders {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "certstat=debug,certstat_core=debug"
    } else {
        "certstat=info,certstat_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (doesn't override existing env vars)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Config commands must work even when the config file is broken
    if let Commands::Config(cmd) = cli.command {
        return handle_config_command(cmd);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        output::print_warning(&format!("Failed to load config file: {:#}", e));
        None
    });

    let concurrency = match &cli.command {
        Commands::Check { concurrency, .. } => *concurrency,
        _ => None,
    };
    let overrides = config::ConfigOverrides {
        checker_url: cli.checker_url,
        default_password: cli.default_password,
        concurrency,
    };
    let resolved = config::resolve_config(&overrides, file_config)?;

    match cli.command {
        Commands::Check {
            root,
            readme,
            output,
            no_readme,
            ..
        } => {
            let args = commands::check::CheckArgs {
                readme: readme.unwrap_or_else(|| root.join("README.md")),
                output: output.unwrap_or_else(|| root.join("certificates.json")),
                update_readme: !no_readme,
                root,
            };
            commands::check::run(&resolved, args).await?
        }
        Commands::List { readme, json } => commands::list::run(&readme, json).await?,
        Commands::Inspect { folder, json } => commands::inspect::run(&folder, json).await?,
        Commands::Lint {
            root,
            readme,
            report,
            strict,
            json,
        } => {
            let readme = readme.unwrap_or_else(|| root.join("README.md"));
            commands::lint::run(&resolved, &root, &readme, report.as_deref(), strict, json).await?
        }
        Commands::Compare { left, right, json } => commands::compare::run(&left, &right, json).await?,
        Commands::Folders { root } => commands::folders::run(&resolved, &root).await?,
        Commands::Config(_) => unreachable!(), // Handled above
    }

    Ok(())
}
