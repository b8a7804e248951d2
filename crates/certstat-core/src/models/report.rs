//! Checker results and the `certificates.json` document.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Certificate serial number as reported by the checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateNumber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<String>,
}

impl CertificateNumber {
    pub fn is_empty(&self) -> bool {
        self.hex.is_none() && self.decimal.is_none()
    }
}

/// Details of the signing certificate inside the p12.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateInfo {
    pub cert_name: Option<String>,
    pub effective_date: Option<String>,
    pub expiration_date: Option<String>,
    pub issuer: Option<String>,
    pub country: Option<String>,
    pub organization: Option<String>,
    #[serde(default)]
    pub certificate_number: CertificateNumber,
    pub certificate_status: Option<String>,
    pub revocation_time: Option<String>,
}

/// A certificate the provisioning profile is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BindingCertificate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_status: Option<String>,
    #[serde(default, skip_serializing_if = "CertificateNumber::is_empty")]
    pub certificate_number: CertificateNumber,
}

/// Details of the provisioning profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileInfo {
    #[serde(rename = "MPName")]
    pub mp_name: Option<String>,
    #[serde(rename = "AppID")]
    pub app_id: Option<String>,
    pub identifier: Option<String>,
    pub platform: Option<String>,
    pub effective_date: Option<String>,
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub binding_certificates: Vec<BindingCertificate>,
    pub certificate_matching_status: Option<String>,
    #[serde(default)]
    pub permission_status: BTreeMap<String, String>,
    pub devices_limit: Option<String>,
}

/// Result of checking one certificate folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEntry {
    #[serde(rename = "Certificate")]
    pub certificate: Option<CertificateInfo>,
    #[serde(rename = "ProvisioningProfile")]
    pub provisioning_profile: Option<ProfileInfo>,
    /// Folder name the entry was produced from.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckEntry {
    pub fn success(
        source: impl Into<String>,
        certificate: CertificateInfo,
        profile: ProfileInfo,
        raw: Vec<String>,
    ) -> Self {
        Self {
            certificate: Some(certificate),
            provisioning_profile: Some(profile),
            source: source.into(),
            raw: Some(raw),
            error: None,
        }
    }

    pub fn failure(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            certificate: None,
            provisioning_profile: None,
            source: source.into(),
            raw: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Certificate status reported by the checker, if any.
    pub fn certificate_status(&self) -> Option<&str> {
        self.certificate
            .as_ref()
            .and_then(|c| c.certificate_status.as_deref())
    }

    /// Start of validity: the profile's date, falling back to the certificate's.
    pub fn valid_from(&self) -> Option<&str> {
        self.provisioning_profile
            .as_ref()
            .and_then(|p| p.effective_date.as_deref())
            .or_else(|| {
                self.certificate
                    .as_ref()
                    .and_then(|c| c.effective_date.as_deref())
            })
    }

    /// End of validity: the profile's date, falling back to the certificate's.
    pub fn valid_to(&self) -> Option<&str> {
        self.provisioning_profile
            .as_ref()
            .and_then(|p| p.expiration_date.as_deref())
            .or_else(|| {
                self.certificate
                    .as_ref()
                    .and_then(|c| c.expiration_date.as_deref())
            })
    }
}

/// The `certificates.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateReport {
    pub certificates: Vec<CheckEntry>,
}

impl CertificateReport {
    pub fn new(certificates: Vec<CheckEntry>) -> Self {
        Self { certificates }
    }

    /// Finds the entry whose folder name contains `company`, case-insensitively.
    pub fn find_for_company(&self, company: &str) -> Option<&CheckEntry> {
        let needle = company.to_lowercase();
        self.certificates
            .iter()
            .find(|e| !e.source.is_empty() && e.source.to_lowercase().contains(&needle))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_json_pretty()?).await?;
        tracing::debug!("Wrote {} entries to {}", self.certificates.len(), path.display());
        Ok(())
    }
}
