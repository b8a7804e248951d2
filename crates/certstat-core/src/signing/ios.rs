//! Offline provisioning profile inspection.
//!
//! A `.mobileprovision` is a CMS envelope around an XML plist. The plist is
//! stored unencrypted, so its metadata can be read without verifying the
//! signature by slicing out the `<?xml ... </plist>` range.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CertStatError, Result};

const PLIST_START: &[u8] = b"<?xml";
const PLIST_END: &[u8] = b"</plist>";

/// Distribution type of a provisioning profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Development,
    Adhoc,
    Appstore,
    Enterprise,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Development => "development",
            ProfileType::Adhoc => "adhoc",
            ProfileType::Appstore => "appstore",
            ProfileType::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata extracted from a provisioning profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileMetadata {
    /// Profile name.
    pub name: String,
    /// Profile UUID.
    pub uuid: String,
    pub profile_type: ProfileType,
    /// App ID name.
    pub app_id_name: Option<String>,
    /// Team ID.
    pub team_id: Option<String>,
    /// Team name, usually the enterprise's legal name.
    pub team_name: Option<String>,
    /// Bundle identifier pattern, without the team prefix.
    pub bundle_identifier: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of explicitly provisioned devices.
    pub device_count: usize,
}

impl ProfileMetadata {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// Reads and parses the provisioning profile at `path`.
pub async fn read_provisioning_profile(path: &Path) -> Result<ProfileMetadata> {
    let data = tokio::fs::read(path).await?;
    parse_provisioning_profile(&data)
}

/// Parses provisioning profile bytes, signed envelope or bare plist.
pub fn parse_provisioning_profile(data: &[u8]) -> Result<ProfileMetadata> {
    let plist_bytes = extract_plist(data)
        .ok_or_else(|| CertStatError::InvalidProfile("No embedded plist found".to_string()))?;
    parse_profile_plist(plist_bytes)
}

fn extract_plist(data: &[u8]) -> Option<&[u8]> {
    let start = find_subslice(data, PLIST_START)?;
    let end = find_subslice(&data[start..], PLIST_END)? + start + PLIST_END.len();
    Some(&data[start..end])
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_profile_plist(plist_bytes: &[u8]) -> Result<ProfileMetadata> {
    let plist: plist::Value = plist::from_bytes(plist_bytes)
        .map_err(|e| CertStatError::InvalidProfile(format!("Failed to parse profile plist: {}", e)))?;

    let dict = plist
        .as_dictionary()
        .ok_or_else(|| CertStatError::InvalidProfile("Profile plist is not a dictionary".to_string()))?;

    let uuid = dict
        .get("UUID")
        .and_then(|v| v.as_string())
        .ok_or_else(|| CertStatError::InvalidProfile("Profile missing UUID".to_string()))?
        .to_string();

    let name = dict
        .get("Name")
        .and_then(|v| v.as_string())
        .unwrap_or("Unnamed Profile")
        .to_string();

    let string_field = |key: &str| {
        dict.get(key)
            .and_then(|v| v.as_string())
            .map(|s| s.to_string())
    };

    let team_id = dict
        .get("TeamIdentifier")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_string())
        .map(|s| s.to_string());

    // application-identifier is "<TEAMID>.<bundle id>"
    let bundle_identifier = dict
        .get("Entitlements")
        .and_then(|v| v.as_dictionary())
        .and_then(|ents| ents.get("application-identifier"))
        .and_then(|v| v.as_string())
        .map(|s| match s.split_once('.') {
            Some((_, rest)) => rest.to_string(),
            None => s.to_string(),
        });

    let device_count = dict
        .get("ProvisionedDevices")
        .and_then(|v| v.as_array())
        .map_or(0, |arr| arr.len());

    Ok(ProfileMetadata {
        name,
        uuid,
        profile_type: determine_profile_type(dict),
        app_id_name: string_field("AppIDName"),
        team_id,
        team_name: string_field("TeamName"),
        bundle_identifier,
        created_at: date_field(dict, "CreationDate"),
        expires_at: date_field(dict, "ExpirationDate"),
        device_count,
    })
}

fn date_field(dict: &plist::Dictionary, key: &str) -> Option<DateTime<Utc>> {
    dict.get(key).and_then(|v| v.as_date()).and_then(|d| {
        let system_time: SystemTime = d.clone().into();
        system_time
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()
            .and_then(|dur| DateTime::from_timestamp(dur.as_secs() as i64, 0))
    })
}

/// Determines the profile type from the plist dictionary.
fn determine_profile_type(dict: &plist::Dictionary) -> ProfileType {
    if dict.get("ProvisionsAllDevices").and_then(|v| v.as_boolean()) == Some(true) {
        return ProfileType::Enterprise;
    }

    let get_task_allow = dict
        .get("Entitlements")
        .and_then(|v| v.as_dictionary())
        .and_then(|ents| ents.get("get-task-allow"))
        .and_then(|v| v.as_boolean())
        .unwrap_or(false);

    if get_task_allow {
        return ProfileType::Development;
    }

    let has_devices = dict
        .get("ProvisionedDevices")
        .and_then(|v| v.as_array())
        .is_some_and(|arr| !arr.is_empty());

    if has_devices {
        ProfileType::Adhoc
    } else {
        ProfileType::Appstore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTERPRISE_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>AppIDName</key>
    <string>Wildcard</string>
    <key>CreationDate</key>
    <date>2025-02-07T11:07:09Z</date>
    <key>Entitlements</key>
    <dict>
        <key>application-identifier</key>
        <string>ABCDE12345.*</string>
        <key>get-task-allow</key>
        <false/>
    </dict>
    <key>ExpirationDate</key>
    <date>2026-02-07T11:07:09Z</date>
    <key>Name</key>
    <string>CT Enterprise</string>
    <key>ProvisionsAllDevices</key>
    <true/>
    <key>TeamIdentifier</key>
    <array>
        <string>ABCDE12345</string>
    </array>
    <key>TeamName</key>
    <string>China Telecom Co., Ltd</string>
    <key>UUID</key>
    <string>0f8a3c1e-1111-2222-3333-444455556666</string>
</dict>
</plist>"#;

    fn wrapped(plist: &str) -> Vec<u8> {
        // Mimic the CMS envelope around the plist.
        let mut data = vec![0x30, 0x82, 0x1f, 0x00, 0x06, 0x09];
        data.extend_from_slice(plist.as_bytes());
        data.extend_from_slice(&[0xa0, 0x82, 0x0d, 0x00]);
        data
    }

    #[test]
    fn test_parse_enterprise_profile() {
        let meta = parse_provisioning_profile(&wrapped(ENTERPRISE_PLIST)).unwrap();

        assert_eq!(meta.name, "CT Enterprise");
        assert_eq!(meta.uuid, "0f8a3c1e-1111-2222-3333-444455556666");
        assert_eq!(meta.profile_type, ProfileType::Enterprise);
        assert_eq!(meta.team_id.as_deref(), Some("ABCDE12345"));
        assert_eq!(meta.team_name.as_deref(), Some("China Telecom Co., Ltd"));
        assert_eq!(meta.bundle_identifier.as_deref(), Some("*"));
        assert_eq!(meta.app_id_name.as_deref(), Some("Wildcard"));
        assert_eq!(meta.device_count, 0);
        assert_eq!(
            meta.expires_at.map(|t| t.to_rfc3339()),
            Some("2026-02-07T11:07:09+00:00".to_string())
        );
    }

    #[test]
    fn test_is_expired() {
        let meta = parse_provisioning_profile(ENTERPRISE_PLIST.as_bytes()).unwrap();
        let before = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z").unwrap().with_timezone(&Utc);

        assert!(!meta.is_expired(before));
        assert!(meta.is_expired(after));
    }

    #[test]
    fn test_missing_plist() {
        let result = parse_provisioning_profile(b"\x30\x82 not a profile");
        assert!(matches!(result, Err(CertStatError::InvalidProfile(_))));
    }

    #[test]
    fn test_missing_uuid() {
        let plist = ENTERPRISE_PLIST.replace("<key>UUID</key>", "<key>NotUUID</key>");
        let result = parse_provisioning_profile(plist.as_bytes());
        assert!(result.unwrap_err().to_string().contains("UUID"));
    }

    #[test]
    fn test_determine_profile_type_development() {
        let mut dict = plist::Dictionary::new();
        let mut ents = plist::Dictionary::new();
        ents.insert("get-task-allow".to_string(), plist::Value::Boolean(true));
        dict.insert("Entitlements".to_string(), plist::Value::Dictionary(ents));
        dict.insert(
            "ProvisionedDevices".to_string(),
            plist::Value::Array(vec![plist::Value::String("device1".to_string())]),
        );

        assert_eq!(determine_profile_type(&dict), ProfileType::Development);
    }

    #[test]
    fn test_determine_profile_type_adhoc() {
        let mut dict = plist::Dictionary::new();
        dict.insert(
            "ProvisionedDevices".to_string(),
            plist::Value::Array(vec![plist::Value::String("device1".to_string())]),
        );

        assert_eq!(determine_profile_type(&dict), ProfileType::Adhoc);
    }

    #[test]
    fn test_determine_profile_type_appstore() {
        let dict = plist::Dictionary::new();
        assert_eq!(determine_profile_type(&dict), ProfileType::Appstore);
    }
}
