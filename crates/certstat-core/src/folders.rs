//! Certificate folder discovery.
//!
//! Each certificate lives in its own top-level folder holding a `.p12`, a
//! `.mobileprovision` and optionally a `password.txt`.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::Result;

/// Password used by the index when a folder has no `password.txt`.
pub const DEFAULT_P12_PASSWORD: &str = "nezushub.vip";

/// Top-level directories that never hold certificates.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[".git", ".github", "scripts", "__pycache__", "target"];

pub const PASSWORD_FILE: &str = "password.txt";

/// Files needed to check one certificate.
#[derive(Debug)]
pub struct CertificateBundle {
    /// Folder name, used as the report `source`.
    pub name: String,
    pub folder: PathBuf,
    pub p12_path: PathBuf,
    pub profile_path: PathBuf,
    pub password: SecretString,
}

impl CertificateBundle {
    /// Loads the bundle in `folder`.
    ///
    /// Returns `Ok(None)` when the folder lacks a `.p12` or a
    /// `.mobileprovision`; such folders are skipped rather than reported.
    pub async fn load(folder: &Path, default_password: &str) -> Result<Option<Self>> {
        let p12 = first_with_extension(folder, "p12").await?;
        let profile = first_with_extension(folder, "mobileprovision").await?;

        let (Some(p12_path), Some(profile_path)) = (p12, profile) else {
            tracing::warn!(
                "Skipping {} (missing .p12 or .mobileprovision)",
                folder.display()
            );
            return Ok(None);
        };

        let password = read_password(folder)
            .await?
            .unwrap_or_else(|| default_password.to_string());

        Ok(Some(Self {
            name: folder_name(folder),
            folder: folder.to_path_buf(),
            p12_path,
            profile_path,
            password: SecretString::from(password),
        }))
    }
}

/// Lists certificate folders directly under `root`.
///
/// Directories named in `ignore` are excluded. The result is sorted by
/// name, case-insensitively.
pub async fn discover(root: &Path, ignore: &[String]) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignore.iter().any(|i| i == &name) {
            continue;
        }
        folders.push(entry.path());
    }

    folders.sort_by_key(|p| folder_name(p).to_lowercase());
    tracing::debug!("Discovered {} folders under {}", folders.len(), root.display());
    Ok(folders)
}

/// Discovers folders under `root` and loads every complete bundle.
pub async fn collect_bundles(
    root: &Path,
    ignore: &[String],
    default_password: &str,
) -> Result<Vec<CertificateBundle>> {
    let mut bundles = Vec::new();
    for folder in discover(root, ignore).await? {
        if let Some(bundle) = CertificateBundle::load(&folder, default_password).await? {
            bundles.push(bundle);
        }
    }
    Ok(bundles)
}

/// Default ignore list as owned strings.
pub fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect()
}

pub fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.display().to_string())
}

/// First file in `folder` with the given extension, alphabetically.
async fn first_with_extension(folder: &Path, extension: &str) -> Result<Option<PathBuf>> {
    let mut matches = Vec::new();
    let mut entries = tokio::fs::read_dir(folder).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_ext = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches_ext && entry.file_type().await?.is_file() {
            matches.push(path);
        }
    }

    matches.sort();
    Ok(matches.into_iter().next())
}

async fn read_password(folder: &Path) -> Result<Option<String>> {
    let path = folder.join(PASSWORD_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
