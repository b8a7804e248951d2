//! `certstat lint`: consistency checks over the README table.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use console::style;

use certstat_core::folders::CertificateBundle;
use certstat_core::lint::{has_failures, lint_readme, LintOptions, Severity};
use certstat_core::models::CertificateReport;
use certstat_core::readme::ReadmeDocument;
use certstat_core::signing::{read_provisioning_profile, ProfileMetadata};

use crate::config::ResolvedConfig;
use crate::output::print_success;

pub async fn run(
    config: &ResolvedConfig,
    root: &Path,
    readme: &Path,
    report: Option<&Path>,
    strict: bool,
    json: bool,
) -> Result<()> {
    let doc = super::read_readme(readme).await?;

    let report = match report {
        Some(path) => Some(
            CertificateReport::load(path)
                .await
                .with_context(|| format!("Failed to read report {}", path.display()))?,
        ),
        None => None,
    };

    let options = LintOptions {
        root: Some(root.to_path_buf()),
        report,
        profiles: load_profiles(&doc, root, config).await,
        ..Default::default()
    };
    let findings = lint_readme(&doc, &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else if findings.is_empty() {
        print_success(&format!("{}: no problems found", readme.display()));
    } else {
        for finding in &findings {
            let marker = match finding.severity {
                Severity::Error => style("error").red().bold(),
                Severity::Warning => style("warning").yellow().bold(),
            };
            println!("{} [{}] {}", marker, finding.company, finding.message);
        }
        println!();
        println!("{} finding(s)", findings.len());
    }

    if has_failures(&findings, strict) {
        bail!("Lint failed");
    }
    Ok(())
}

/// Reads the provisioning profile of every folder the table links to.
/// Folders that can't be read are skipped; lint reports missing folders itself.
async fn load_profiles(
    doc: &ReadmeDocument,
    root: &Path,
    config: &ResolvedConfig,
) -> BTreeMap<String, ProfileMetadata> {
    let mut profiles = BTreeMap::new();

    for folder in doc.listings().filter_map(|l| l.download_folder()) {
        if profiles.contains_key(&folder) {
            continue;
        }
        let path = root.join(&folder);
        if !path.is_dir() {
            continue;
        }
        let bundle = match CertificateBundle::load(&path, &config.default_password).await {
            Ok(Some(bundle)) => bundle,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                continue;
            }
        };
        match read_provisioning_profile(&bundle.profile_path).await {
            Ok(profile) => {
                profiles.insert(folder, profile);
            }
            Err(e) => tracing::warn!("Skipping profile in {}: {}", folder, e),
        }
    }

    profiles
}
