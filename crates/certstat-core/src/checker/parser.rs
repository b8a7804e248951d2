//! Parsing of the checker's HTML response.
//!
//! The checker answers with a page containing a single alert `div` whose
//! lines (separated by `<br>`) are `Key: value` pairs. Certificate fields
//! come first, then the provisioning profile, its binding certificates, the
//! permission list and the device limit.

use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::models::{BindingCertificate, CertificateInfo, ProfileInfo};

static DIV_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("static selector"));

static TOKEN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="__RequestVerificationToken"]"#).expect("static selector")
});

/// `Certificate 1`, `Certificate2`, ... headers inside the binding block.
static BINDING_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^certificate\s*\d+").expect("static regex"));

static GMT_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GMT([+-])").expect("static regex"));

static TRAILING_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d{2}:\d{2})$").expect("static regex"));

/// Structured content of a checker response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub certificate: CertificateInfo,
    pub profile: ProfileInfo,
    /// Text lines of the alert block, whitespace-collapsed.
    pub lines: Vec<String>,
}

/// Extracts the anti-forgery token from the checker's form page.
pub fn extract_verification_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TOKEN_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(|v| v.to_string())
}

/// Parses a checker response page.
///
/// Returns `None` when the page has no alert block, which the checker
/// produces when it could not read the submitted files.
pub fn parse_checker_html(html: &str) -> Option<ParsedResponse> {
    let document = Html::parse_document(html);
    let alert = document
        .select(&DIV_SELECTOR)
        .find(|div| div.value().classes().any(|c| c.contains("alert")))?;

    let lines = alert_lines(alert);
    let (certificate, profile) = parse_lines(&lines);

    Some(ParsedResponse {
        certificate,
        profile,
        lines,
    })
}

/// Splits the alert block into text lines on `<br>` boundaries.
fn alert_lines(alert: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for child in alert.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    current.push(text.to_string());
                }
            }
            Node::Element(element) if element.name() == "br" => {
                flush_line(&mut current, &mut lines);
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    let text = element
                        .text()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if !text.is_empty() {
                        current.push(text);
                    }
                }
            }
            _ => {}
        }
    }
    flush_line(&mut current, &mut lines);

    lines
}

fn flush_line(current: &mut Vec<String>, lines: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let joined = clean_value(&current.join(" "));
    if !joined.is_empty() {
        lines.push(joined);
    }
    current.clear();
}

/// Splits `Key: value` on the first ASCII or full-width colon.
fn split_kv(line: &str) -> (&str, &str) {
    match line.find([':', '：']) {
        Some(pos) => {
            let sep_len = line[pos..].chars().next().map_or(1, char::len_utf8);
            (line[..pos].trim(), line[pos + sep_len..].trim())
        }
        None => (line.trim(), ""),
    }
}

/// Collapses runs of whitespace into single spaces.
fn clean_value(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a lowercased key names a certificate number of the given encoding.
fn is_number_key(key_lower: &str, encoding: &str) -> bool {
    key_lower
        .find("certificate number")
        .is_some_and(|pos| key_lower[pos..].contains(encoding))
}

/// Markers that close the binding-certificate block.
fn is_section_end(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("certificate matching status")
        || lower.contains("permission status")
        || lower.contains("devices limit")
}

fn parse_lines(lines: &[String]) -> (CertificateInfo, ProfileInfo) {
    let mut cert = CertificateInfo::default();
    let mut profile = ProfileInfo::default();

    // The first pair of dates belongs to the certificate, the second to the profile.
    let mut cert_effective_seen = false;
    let mut cert_expiration_seen = false;
    let mut profile_effective_seen = false;
    let mut profile_expiration_seen = false;

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let (key, value) = split_kv(line);
        let lk = key.to_lowercase();
        let val = clean_value(value);

        if lk.starts_with("certname") || lk.starts_with("cert name") {
            cert.cert_name = Some(val);
        } else if lk.starts_with("effective date") && !cert_effective_seen {
            cert.effective_date = normalize_date(&val);
            cert_effective_seen = true;
        } else if lk.starts_with("expiration date") && !cert_expiration_seen {
            cert.expiration_date = normalize_date(&val);
            cert_expiration_seen = true;
        } else if lk.starts_with("issuer") {
            cert.issuer = Some(val);
        } else if lk.starts_with("country") {
            cert.country = Some(val);
        } else if lk.starts_with("organization") {
            cert.organization = Some(val);
        } else if is_number_key(&lk, "hex") {
            cert.certificate_number.hex = Some(val);
        } else if is_number_key(&lk, "decimal") {
            cert.certificate_number.decimal = Some(val);
        } else if lk.starts_with("certificate status") {
            cert.certificate_status = Some(val);
        } else if lk.starts_with("revocation time") {
            cert.revocation_time = normalize_date(&val);
        } else if lk.starts_with("mp name") || lk.starts_with("mpname") {
            profile.mp_name = Some(val);
        } else if lk.starts_with("app id") || lk.starts_with("appid") {
            profile.app_id = Some(val);
        } else if lk.starts_with("identifier") {
            profile.identifier = Some(val);
        } else if lk.starts_with("platform") {
            profile.platform = Some(val);
        } else if lk.starts_with("effective date")
            && !profile_effective_seen
            && profile.mp_name.is_some()
        {
            profile.effective_date = normalize_date(&val);
            profile_effective_seen = true;
        } else if lk.starts_with("expiration date")
            && !profile_expiration_seen
            && profile.mp_name.is_some()
        {
            profile.expiration_date = normalize_date(&val);
            profile_expiration_seen = true;
        } else if lk.starts_with("binding certificates") {
            let (bindings, next) = parse_binding_block(lines, i + 1);
            profile.binding_certificates.extend(bindings);
            // Resume at the line that closed the block.
            i = next;
            continue;
        } else if lk.starts_with("certificate matching status") {
            profile.certificate_matching_status = Some(val);
        } else if lk.starts_with("permission status") {
            let mut j = i + 1;
            while j < lines.len() && !lines[j].to_lowercase().contains("devices limit") {
                if lines[j].contains([':', '：']) {
                    let (name, value) = split_kv(&lines[j]);
                    profile
                        .permission_status
                        .insert(name.to_string(), value.to_string());
                }
                j += 1;
            }
            i = j;
            continue;
        } else if line.to_lowercase().contains("devices limit") {
            profile.devices_limit = Some(val);
        }

        i += 1;
    }

    (cert, profile)
}

/// Parses `Certificate <n>` sub-blocks starting at `start`.
///
/// Returns the entries and the index of the first line after the block.
fn parse_binding_block(lines: &[String], start: usize) -> (Vec<BindingCertificate>, usize) {
    let mut entries = Vec::new();
    let mut j = start;

    while j < lines.len() {
        let line = &lines[j];
        if BINDING_HEADER.is_match(line) {
            let mut entry = BindingCertificate::default();
            let mut k = j + 1;
            while k < lines.len() && !BINDING_HEADER.is_match(&lines[k]) {
                let (key, value) = split_kv(&lines[k]);
                let lk = key.to_lowercase();
                if lk.starts_with("certificate status") {
                    entry.certificate_status = Some(clean_value(value));
                } else if is_number_key(&lk, "hex") {
                    entry.certificate_number.hex = Some(clean_value(value));
                } else if is_number_key(&lk, "decimal") {
                    entry.certificate_number.decimal = Some(clean_value(value));
                } else if is_section_end(key) {
                    break;
                }
                k += 1;
            }
            entries.push(entry);
            j = k;
            continue;
        }
        if is_section_end(line) {
            break;
        }
        j += 1;
    }

    (entries, j)
}

/// Normalizes checker timestamps to an ISO-like form.
///
/// `2023-02-08 19:07:10 GMT+08:00` and `2025-04-09 20:50:26+08:00` both
/// become `YYYY-MM-DDTHH:MM:SS+08:00`. Without an offset only the first space
/// is replaced by `T`.
pub fn normalize_date(text: &str) -> Option<String> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    let s = GMT_OFFSET.replace_all(s, "$1").replace("  ", " ");

    if let Some(tz) = TRAILING_OFFSET.captures(&s).and_then(|c| c.get(1)) {
        let core = s[..tz.start()].trim().replacen(' ', "T", 1);
        return Some(format!("{}{}", core, tz.as_str()));
    }

    Some(s.replacen(' ', "T", 1))
}
