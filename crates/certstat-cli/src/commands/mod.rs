//! CLI command implementations.

pub mod check;
pub mod compare;
pub mod config;
pub mod folders;
pub mod inspect;
pub mod lint;
pub mod list;

use std::path::Path;

use anyhow::{Context, Result};

use certstat_core::readme::ReadmeDocument;

/// Reads and parses a README.
pub(crate) async fn read_readme(path: &Path) -> Result<ReadmeDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ReadmeDocument::parse(&text))
}
