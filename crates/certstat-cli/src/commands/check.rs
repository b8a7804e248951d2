//! `certstat check`: run every folder through the checker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use certstat_core::checker::{run_checks, CheckerClient};
use certstat_core::folders::collect_bundles;
use certstat_core::models::{CertificateReport, CheckEntry, ListingStatus};

use crate::config::ResolvedConfig;
use crate::output::{print_info, print_key_value, print_section, print_success, print_warning, styled_status};

pub struct CheckArgs {
    pub root: PathBuf,
    pub readme: PathBuf,
    pub output: PathBuf,
    pub update_readme: bool,
}

/// Tally of a finished run.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    signed: usize,
    revoked: usize,
    unknown: usize,
    failed: usize,
}

impl Summary {
    fn from_entries(entries: &[CheckEntry]) -> Self {
        let mut summary = Summary::default();
        for entry in entries {
            if entry.is_error() {
                summary.failed += 1;
                continue;
            }
            match entry.certificate_status().map(ListingStatus::from_checker_status) {
                Some(ListingStatus::Signed) => summary.signed += 1,
                Some(ListingStatus::Revoked) => summary.revoked += 1,
                _ => summary.unknown += 1,
            }
        }
        summary
    }
}

pub async fn run(config: &ResolvedConfig, args: CheckArgs) -> Result<()> {
    let bundles = collect_bundles(&args.root, &config.ignore, &config.default_password)
        .await
        .with_context(|| format!("Failed to scan {}", args.root.display()))?;

    if bundles.is_empty() {
        print_warning(&format!("No certificate folders found in {}", args.root.display()));
    }

    let client = CheckerClient::new(config.checker_config()?).context("Failed to build checker client")?;
    tracing::info!(
        "Checking {} folder(s) against {}",
        bundles.len(),
        client.config().base_url
    );

    let progress = ProgressBar::new(bundles.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let entries = run_checks(Arc::new(client), bundles, config.concurrency, |entry| {
        progress.inc(1);
        progress.set_message(entry.source.clone());
        progress.println(entry_line(entry));
    })
    .await;
    progress.finish_and_clear();

    let report = CertificateReport::new(entries);
    report
        .save(&args.output)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    print_success(&format!("Wrote {}", args.output.display()));

    if args.update_readme {
        update_readme(&args.readme, &report).await?;
    }

    let summary = Summary::from_entries(&report.certificates);
    print_section("Summary");
    print_key_value("Signed", &summary.signed.to_string());
    print_key_value("Revoked", &summary.revoked.to_string());
    print_key_value("Unknown", &summary.unknown.to_string());
    print_key_value("Errors", &summary.failed.to_string());

    Ok(())
}

async fn update_readme(path: &std::path::Path, report: &CertificateReport) -> Result<()> {
    if !path.exists() {
        print_warning(&format!("{} not found; skipping update", path.display()));
        return Ok(());
    }

    let mut doc = super::read_readme(path).await?;
    if !doc.has_table() {
        print_info(&format!("No table found in {}; skipping update", path.display()));
        return Ok(());
    }

    let matched = doc.apply_results(report);
    tokio::fs::write(path, doc.render())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    print_success(&format!(
        "Updated {} row(s) in {}",
        matched,
        path.display()
    ));
    Ok(())
}

fn entry_line(entry: &CheckEntry) -> String {
    match (&entry.error, entry.certificate_status()) {
        (Some(error), _) => format!("{} {}: {}", style("✗").red(), entry.source, error),
        (None, Some(status)) => format!(
            "{} {}: {}",
            style("✓").green(),
            entry.source,
            styled_status(ListingStatus::from_checker_status(status))
        ),
        (None, None) => format!(
            "{} {}: {}",
            style("?").yellow(),
            entry.source,
            styled_status(ListingStatus::Unknown)
        ),
    }
}
