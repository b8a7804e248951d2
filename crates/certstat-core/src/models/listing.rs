//! Certificate listing as it appears in the README table.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;
use url::Url;

/// Status asserted by a README row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Signed,
    Revoked,
    Unknown,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Signed => "signed",
            ListingStatus::Revoked => "revoked",
            ListingStatus::Unknown => "unknown",
        }
    }

    /// Recognizes a status cell, ignoring emoji decorations.
    ///
    /// Returns `None` when the text names none of the known statuses.
    /// Negated forms (`Invalid`, `Not Signed`) are not recognized.
    pub fn from_cell(cell: &str) -> Option<Self> {
        const NEGATED: &[&str] = &["invalid", "unsigned", "not signed", "not valid"];

        let lower = cell.to_lowercase();
        if lower.contains("revoked") {
            Some(ListingStatus::Revoked)
        } else if lower.contains("unknown") {
            Some(ListingStatus::Unknown)
        } else if NEGATED.iter().any(|n| lower.contains(n)) {
            None
        } else if lower.contains("signed") || lower.contains("valid") {
            Some(ListingStatus::Signed)
        } else {
            None
        }
    }

    /// Maps a checker `CertificateStatus` value onto a listing status.
    pub fn from_checker_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "valid" | "good" | "signed" => ListingStatus::Signed,
            "revoked" => ListingStatus::Revoked,
            _ => ListingStatus::Unknown,
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the certificate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateListing {
    pub company: String,
    #[serde(rename = "type")]
    pub cert_type: String,
    /// Status cell text, verbatim.
    pub status: String,
    pub valid_from: String,
    pub valid_to: String,
    pub download_link: String,
}

impl CertificateListing {
    /// Builds a listing from trimmed table cells. Needs at least five cells.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        if cells.len() < 5 {
            return None;
        }
        Some(Self {
            company: cells[0].clone(),
            cert_type: cells[1].clone(),
            status: cells[2].clone(),
            valid_from: cells[3].clone(),
            valid_to: cells[4].clone(),
            download_link: cells.get(5).cloned().unwrap_or_default(),
        })
    }

    /// Parsed status; unrecognized text counts as unknown.
    pub fn status(&self) -> ListingStatus {
        ListingStatus::from_cell(&self.status).unwrap_or(ListingStatus::Unknown)
    }

    pub fn valid_from_date(&self) -> Option<DateTime<FixedOffset>> {
        parse_validity(&self.valid_from)
    }

    pub fn valid_to_date(&self) -> Option<DateTime<FixedOffset>> {
        parse_validity(&self.valid_to)
    }

    /// The URL inside the download cell, if any.
    pub fn download_url(&self) -> Option<&str> {
        extract_link_target(&self.download_link)
    }

    /// Repository folder the download link points at.
    pub fn download_folder(&self) -> Option<String> {
        self.download_url().and_then(folder_from_download_url)
    }
}

/// Parses the validity timestamps found in README variants.
///
/// Accepts RFC 3339 (as written by the checker normalizer), the GMT string
/// form (`Wed, 08 Feb 2023 11:07:10 GMT`), and `DD/MM/YY HH:MM`. Naive
/// timestamps, with or without a trailing `GMT`/`UTC`, are taken as UTC.
pub fn parse_validity(text: &str) -> Option<DateTime<FixedOffset>> {
    let s = text.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("unknown") {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }

    // `2020-04-09T20:50:26 GMT` from a checker date without an offset
    let s = ["GMT", "UTC"]
        .iter()
        .find_map(|zone| s.strip_suffix(zone))
        .map_or(s, str::trim_end);

    const NAIVE_FORMATS: &[&str] = &[
        "%d/%m/%y %H:%M",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Pulls the target out of a markdown link, or returns a bare URL as-is.
fn extract_link_target(cell: &str) -> Option<&str> {
    let cell = cell.trim();
    if let Some(start) = cell.find("](") {
        let rest = &cell[start + 2..];
        // Folder names carry parentheses, so match the closing one by depth.
        let mut depth = 1usize;
        let end = rest.char_indices().find_map(|(i, c)| {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            (depth == 0).then_some(i)
        })?;
        let target = rest[..end].trim();
        return (!target.is_empty()).then_some(target);
    }
    if cell.starts_with("http://") || cell.starts_with("https://") {
        return Some(cell);
    }
    None
}

/// Resolves the folder a download-directory link points at.
///
/// The link wraps a repository tree URL in its `url` query parameter, e.g.
/// `https://download-directory.github.io/?url=https://github.com/o/r/tree/main/Folder%20Name`.
/// A bare tree URL is accepted too.
pub fn folder_from_download_url(link: &str) -> Option<String> {
    let outer = Url::parse(link).ok()?;
    // Percent-decode only; form decoding would turn a literal `+` into a space.
    let tree_url = outer
        .query()
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("url=")))
        .map(|v| {
            urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string())
        })
        .unwrap_or_else(|| link.to_string());

    let tree = Url::parse(&tree_url).ok()?;
    let segments: Vec<&str> = tree.path_segments()?.filter(|s| !s.is_empty()).collect();
    let tree_pos = segments.iter().position(|s| *s == "tree")?;

    // Skip "tree" and the branch name.
    let folder: Vec<String> = segments
        .get(tree_pos + 2..)?
        .iter()
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect();

    if folder.is_empty() {
        None
    } else {
        Some(folder.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_status_from_cell() {
        assert_eq!(ListingStatus::from_cell("✅ Signed"), Some(ListingStatus::Signed));
        assert_eq!(ListingStatus::from_cell("❌ Revoked"), Some(ListingStatus::Revoked));
        assert_eq!(ListingStatus::from_cell("❓ Unknown"), Some(ListingStatus::Unknown));
        assert_eq!(
            ListingStatus::from_cell("⚠️ Status: Unknown"),
            Some(ListingStatus::Unknown)
        );
        assert_eq!(ListingStatus::from_cell("pending"), None);
        assert_eq!(ListingStatus::from_cell("✅ Valid"), Some(ListingStatus::Signed));
        assert_eq!(ListingStatus::from_cell("❌ Invalid"), None);
        assert_eq!(ListingStatus::from_cell("Not Signed"), None);
        assert_eq!(ListingStatus::from_cell("unsigned"), None);
    }

    #[test]
    fn test_negated_status_counts_as_unknown() {
        let listing = CertificateListing::from_cells(&cells(&[
            "Alpha",
            "Enterprise Certificate",
            "❌ Invalid",
            "",
            "",
        ]))
        .unwrap();
        assert_eq!(listing.status(), ListingStatus::Unknown);
    }

    #[test]
    fn test_status_from_checker() {
        assert_eq!(ListingStatus::from_checker_status("Valid"), ListingStatus::Signed);
        assert_eq!(ListingStatus::from_checker_status(" REVOKED "), ListingStatus::Revoked);
        assert_eq!(ListingStatus::from_checker_status("??"), ListingStatus::Unknown);
    }

    #[test]
    fn test_from_cells_requires_five() {
        assert!(CertificateListing::from_cells(&cells(&["a", "b", "c", "d"])).is_none());

        let listing = CertificateListing::from_cells(&cells(&[
            "China Telecom",
            "Enterprise Certificate",
            "✅ Signed",
            "01/02/24 10:00",
            "01/02/27 10:00",
        ]))
        .unwrap();
        assert_eq!(listing.company, "China Telecom");
        assert_eq!(listing.download_link, "");
        assert_eq!(listing.status(), ListingStatus::Signed);
    }

    #[test]
    fn test_parse_validity_gmt_string() {
        let dt = parse_validity("Wed, 08 Feb 2023 11:07:10 GMT").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 2);
        assert_eq!(dt.hour(), 11);
    }

    #[test]
    fn test_parse_validity_short_form() {
        let dt = parse_validity("07/02/26 19:07").unwrap();
        assert_eq!(dt.year(), 2026);
        assert_eq!(dt.month(), 2);
        assert_eq!(dt.day(), 7);
        assert_eq!(dt.minute(), 7);
    }

    #[test]
    fn test_parse_validity_normalized() {
        let dt = parse_validity("2026-02-07T19:07:09+08:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_parse_validity_reads_normalized_checker_dates() {
        for raw in ["2020-04-09 20:50:26 GMT", "2020-04-09 20:50:26 UTC", "2020-04-09 20:50:26"] {
            let normalized = crate::checker::normalize_date(raw).unwrap();
            let dt = parse_validity(&normalized)
                .unwrap_or_else(|| panic!("cannot parse {:?}", normalized));
            assert_eq!(dt.year(), 2020);
            assert_eq!(dt.hour(), 20);
            assert_eq!(dt.offset().local_minus_utc(), 0);
        }

        let with_offset = crate::checker::normalize_date("2023-02-08 19:07:10 GMT+08:00").unwrap();
        assert_eq!(
            parse_validity(&with_offset).unwrap().offset().local_minus_utc(),
            8 * 3600
        );
    }

    #[test]
    fn test_parse_validity_unknown() {
        assert!(parse_validity("Unknown").is_none());
        assert!(parse_validity("").is_none());
        assert!(parse_validity("sometime soon").is_none());
    }

    #[test]
    fn test_download_folder() {
        let listing = CertificateListing::from_cells(&cells(&[
            "Commission on Elections (2)",
            "Enterprise Certificate",
            "❌ Revoked",
            "",
            "",
            "[Download](https://download-directory.github.io/?url=https://github.com/owner/certs/tree/main/Commission%20on%20Elections%20(2))",
        ]))
        .unwrap();

        assert_eq!(
            listing.download_folder().as_deref(),
            Some("Commission on Elections (2)")
        );
    }

    #[test]
    fn test_folder_from_download_url() {
        let folder = folder_from_download_url(
            "https://download-directory.github.io/?url=https%3A%2F%2Fgithub.com%2Fowner%2Fcerts%2Ftree%2Fmain%2FChina%2520Telecom",
        );
        assert_eq!(folder.as_deref(), Some("China Telecom"));

        let bare = folder_from_download_url("https://github.com/owner/certs/tree/main/Nested/Dir");
        assert_eq!(bare.as_deref(), Some("Nested/Dir"));

        let plus = folder_from_download_url(
            "https://download-directory.github.io/?url=https://github.com/owner/certs/tree/main/A+B",
        );
        assert_eq!(plus.as_deref(), Some("A+B"));

        let with_other_params = folder_from_download_url(
            "https://download-directory.github.io/?filename=x&url=https://github.com/owner/certs/tree/main/C%2B%2B",
        );
        assert_eq!(with_other_params.as_deref(), Some("C++"));

        assert!(folder_from_download_url("https://github.com/owner/certs").is_none());
        assert!(folder_from_download_url("not a url").is_none());
    }
}
