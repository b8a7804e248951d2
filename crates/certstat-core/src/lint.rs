//! Consistency checks for the README certificate table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{CertificateListing, CertificateReport, ListingStatus};
use crate::readme::ReadmeDocument;
use crate::signing::ProfileMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LintKind {
    MissingDownloadLink,
    UnparseableDownloadLink,
    MissingFolder,
    UnrecognizedStatus,
    UnparseableDate,
    ExpiredButSigned,
    ExpiredProfile,
    StatusMismatch,
}

impl LintKind {
    pub fn severity(&self) -> Severity {
        match self {
            LintKind::MissingDownloadLink | LintKind::MissingFolder => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    pub company: String,
    pub kind: LintKind,
    pub severity: Severity,
    pub message: String,
}

impl LintFinding {
    fn new(listing: &CertificateListing, kind: LintKind, message: String) -> Self {
        Self {
            company: listing.company.clone(),
            kind,
            severity: kind.severity(),
            message,
        }
    }
}

/// What to check the table against.
#[derive(Debug, Clone)]
pub struct LintOptions {
    /// Repository root; download folders are checked for existence when set.
    pub root: Option<PathBuf>,
    /// Last checker results; statuses are compared when set.
    pub report: Option<CertificateReport>,
    /// Provisioning profiles keyed by folder name.
    pub profiles: BTreeMap<String, ProfileMetadata>,
    pub now: DateTime<Utc>,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            root: None,
            report: None,
            profiles: BTreeMap::new(),
            now: Utc::now(),
        }
    }
}

/// Runs every check over every table row.
pub fn lint_readme(doc: &ReadmeDocument, options: &LintOptions) -> Vec<LintFinding> {
    doc.listings()
        .flat_map(|listing| lint_listing(listing, options))
        .collect()
}

/// Whether the findings should fail the run.
pub fn has_failures(findings: &[LintFinding], strict: bool) -> bool {
    findings
        .iter()
        .any(|f| strict || f.severity == Severity::Error)
}

fn lint_listing(listing: &CertificateListing, options: &LintOptions) -> Vec<LintFinding> {
    let mut findings = Vec::new();

    if listing.download_link.trim().is_empty() {
        findings.push(LintFinding::new(
            listing,
            LintKind::MissingDownloadLink,
            "Row has no download link".to_string(),
        ));
    } else {
        match listing.download_folder() {
            None => findings.push(LintFinding::new(
                listing,
                LintKind::UnparseableDownloadLink,
                format!("Cannot resolve a folder from {}", listing.download_link),
            )),
            Some(folder) => {
                if let Some(root) = &options.root {
                    if !root.join(&folder).is_dir() {
                        findings.push(LintFinding::new(
                            listing,
                            LintKind::MissingFolder,
                            format!("Download folder '{}' does not exist", folder),
                        ));
                    }
                }
            }
        }
    }

    if ListingStatus::from_cell(&listing.status).is_none() {
        findings.push(LintFinding::new(
            listing,
            LintKind::UnrecognizedStatus,
            format!("Unrecognized status '{}'", listing.status),
        ));
    }

    for (label, text) in [("Valid From", &listing.valid_from), ("Valid To", &listing.valid_to)] {
        let blank = text.trim().is_empty() || text.trim().eq_ignore_ascii_case("unknown");
        if !blank && crate::models::parse_validity(text).is_none() {
            findings.push(LintFinding::new(
                listing,
                LintKind::UnparseableDate,
                format!("{} '{}' is not a recognized timestamp", label, text),
            ));
        }
    }

    if listing.status() == ListingStatus::Signed {
        if let Some(valid_to) = listing.valid_to_date() {
            if valid_to.with_timezone(&Utc) < options.now {
                findings.push(LintFinding::new(
                    listing,
                    LintKind::ExpiredButSigned,
                    format!("Marked signed but expired on {}", listing.valid_to),
                ));
            }
        }
    }

    if listing.status() == ListingStatus::Signed {
        let profile = listing
            .download_folder()
            .and_then(|folder| options.profiles.get(&folder));
        if let Some(profile) = profile.filter(|p| p.is_expired(options.now)) {
            let expired_on = profile
                .expires_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            findings.push(LintFinding::new(
                listing,
                LintKind::ExpiredProfile,
                format!("Profile '{}' expired on {}", profile.name, expired_on),
            ));
        }
    }

    if let Some(report) = &options.report {
        let checked = report
            .find_for_company(&listing.company)
            .and_then(|entry| entry.certificate_status());
        if let Some(checked) = checked {
            let expected = ListingStatus::from_checker_status(checked);
            if listing.status() != expected {
                findings.push(LintFinding::new(
                    listing,
                    LintKind::StatusMismatch,
                    format!(
                        "Table says {} but the last check reported '{}'",
                        listing.status(),
                        checked
                    ),
                ));
            }
        }
    }

    findings
}
