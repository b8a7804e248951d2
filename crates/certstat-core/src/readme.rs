//! Reading and rewriting the README certificate table.
//!
//! The rewrite is line-oriented: only the status and validity cells of
//! matched rows and the line after each "Recommend Certificate" marker change.

use crate::models::{CertificateListing, CertificateReport, ListingStatus};

const TABLE_HEADER: &str = "| Company | Type | Status |";
const RECOMMEND_MARKER: &str = "Recommend Certificate";

/// A table row and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub line_index: usize,
    pub listing: CertificateListing,
}

/// A README split into lines, with its certificate table located.
#[derive(Debug, Clone)]
pub struct ReadmeDocument {
    lines: Vec<String>,
    rows: Vec<TableRow>,
}

impl ReadmeDocument {
    /// Parses README text. A document without a table has no rows.
    pub fn parse(text: &str) -> Self {
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let rows = find_rows(&lines);
        Self { lines, rows }
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn listings(&self) -> impl Iterator<Item = &CertificateListing> {
        self.rows.iter().map(|r| &r.listing)
    }

    pub fn has_table(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Writes check results into the matching rows.
    ///
    /// A row matches the first entry whose folder name contains the company
    /// name, case-insensitively. Returns the number of rows matched.
    pub fn apply_results(&mut self, report: &CertificateReport) -> usize {
        let mut matched = 0;

        for row in &mut self.rows {
            let Some(entry) = report.find_for_company(&row.listing.company) else {
                tracing::debug!("No check result for {}", row.listing.company);
                continue;
            };
            matched += 1;

            let status = entry.certificate_status().unwrap_or("Unknown");
            if let Some(badge) = status_badge(status) {
                row.listing.status = badge.to_string();
            }
            row.listing.valid_from = entry.valid_from().unwrap_or("Unknown").to_string();
            row.listing.valid_to = entry.valid_to().unwrap_or("Unknown").to_string();

            let line = &mut self.lines[row.line_index];
            *line = rewrite_row(line, &row.listing);
        }

        self.update_recommended();
        matched
    }

    /// Rewrites the line after each "Recommend Certificate" marker as
    /// `**<name> - <status>**`, using the first row whose company contains the name.
    pub fn update_recommended(&mut self) {
        for i in 0..self.lines.len() {
            if !self.lines[i].contains(RECOMMEND_MARKER) || i + 1 >= self.lines.len() {
                continue;
            }
            let name = recommended_name(&self.lines[i + 1]);
            if name.is_empty() {
                continue;
            }

            let status = self
                .rows
                .iter()
                .find(|r| r.listing.company.contains(&name))
                .map_or(ListingStatus::Unknown, |r| r.listing.status());

            let label = match status {
                ListingStatus::Signed => "✅ Signed",
                ListingStatus::Revoked => "❌ Revoked",
                ListingStatus::Unknown => "⚠️ Unknown",
            };
            self.lines[i + 1] = format!("**{} - {}**", name, label);
        }
    }

    /// Joins the lines back together. An untouched document renders unchanged.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

fn find_rows(lines: &[String]) -> Vec<TableRow> {
    let Some(start) = lines.iter().position(|l| l.starts_with(TABLE_HEADER)) else {
        return Vec::new();
    };

    // Skip the header and its |---| separator.
    lines
        .iter()
        .enumerate()
        .skip(start + 2)
        .take_while(|(_, line)| line.starts_with('|') && !line.starts_with("|---"))
        .filter_map(|(line_index, line)| {
            CertificateListing::from_cells(&split_cells(line))
                .map(|listing| TableRow { line_index, listing })
        })
        .collect()
}

/// Cells between the outer pipes, trimmed.
fn split_cells(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|c| c.trim().to_string())
        .collect()
}

/// Table badge for a checker status; `None` keeps the current cell.
pub fn status_badge(status: &str) -> Option<&'static str> {
    match status.to_lowercase().as_str() {
        "valid" => Some("✅ Signed"),
        "revoked" => Some("❌ Revoked"),
        "unknown" => Some("⚠️ Status: Unknown"),
        _ => None,
    }
}

fn rewrite_row(line: &str, listing: &CertificateListing) -> String {
    let mut parts: Vec<String> = line.split('|').map(str::to_string).collect();
    let replacements = [
        (3, &listing.status),
        (4, &listing.valid_from),
        (5, &listing.valid_to),
        (6, &listing.download_link),
    ];
    for (index, value) in replacements {
        if let Some(part) = parts.get_mut(index) {
            *part = format!(" {} ", value);
        }
    }
    parts.join("|")
}

/// Recovers the certificate name from a recommended line, including one a
/// previous run already decorated (`**Name - ✅ Signed**`).
fn recommended_name(line: &str) -> String {
    let trimmed = line.trim();
    let inner = trimmed
        .strip_prefix("**")
        .and_then(|s| s.strip_suffix("**"))
        .unwrap_or(trimmed);

    match inner.rsplit_once(" - ") {
        Some((name, suffix)) if ListingStatus::from_cell(suffix).is_some() => name.trim().to_string(),
        _ => inner.trim().to_string(),
    }
}
