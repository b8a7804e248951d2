//! HTTP client for the p12 checker site.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use url::Url;

use super::parser::{extract_verification_token, parse_checker_html};
use super::CertificateChecker;
use crate::error::{CertStatError, Result};
use crate::folders::CertificateBundle;
use crate::models::CheckEntry;

pub const DEFAULT_CHECKER_URL: &str = "https://check-p12.applep12.com/";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const TOKEN_FIELD: &str = "__RequestVerificationToken";

/// Checker connection settings.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub base_url: Url,
    /// Timeout for fetching the form page.
    pub request_timeout: Duration,
    /// Timeout for the upload; the checker contacts Apple's OCSP responder
    /// before answering.
    pub submit_timeout: Duration,
    pub user_agent: String,
}

impl CheckerConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Self::default()
        })
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_CHECKER_URL).expect("default checker URL is valid"),
            request_timeout: Duration::from_secs(20),
            submit_timeout: Duration::from_secs(90),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Client for the remote checker.
///
/// Every bundle is checked in its own session: the anti-forgery token is tied
/// to the cookie issued with the form page.
#[derive(Debug, Clone)]
pub struct CheckerClient {
    config: CheckerConfig,
    headers: HeaderMap,
}

impl CheckerClient {
    pub fn new(config: CheckerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(REFERER, header_value(config.base_url.as_str())?);
        headers.insert(
            ORIGIN,
            header_value(&config.base_url.origin().ascii_serialization())?,
        );

        Ok(Self { config, headers })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    fn new_session(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(self.headers.clone())
            .build()?)
    }

    /// Fetches the form page and returns its verification token.
    pub async fn fetch_token(&self, session: &reqwest::Client) -> Result<String> {
        tracing::debug!("GET {}", self.config.base_url);
        let response = session
            .get(self.config.base_url.clone())
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let body = ensure_success(response).await?;

        extract_verification_token(&body).ok_or(CertStatError::TokenNotFound)
    }

    /// Uploads the bundle and returns the response page.
    pub async fn submit(
        &self,
        session: &reqwest::Client,
        token: &str,
        bundle: &CertificateBundle,
    ) -> Result<String> {
        let p12 = file_part(&bundle.p12_path, "application/x-pkcs12").await?;
        let profile = file_part(&bundle.profile_path, "application/octet-stream").await?;

        let form = Form::new()
            .part("P12File", p12)
            .part("MobileProvisionFile", profile)
            .text("P12PassWord", bundle.password.expose_secret().to_string())
            .text(TOKEN_FIELD, token.to_string());

        tracing::debug!("POST {} for {}", self.config.base_url, bundle.name);
        let response = session
            .post(self.config.base_url.clone())
            .multipart(form)
            .timeout(self.config.submit_timeout)
            .send()
            .await?;

        ensure_success(response).await
    }

    /// Runs a full check of one bundle, propagating failures.
    pub async fn try_check(&self, bundle: &CertificateBundle) -> Result<CheckEntry> {
        let session = self.new_session()?;
        let token = self.fetch_token(&session).await?;
        let html = self.submit(&session, &token, bundle).await?;

        Ok(match parse_checker_html(&html) {
            Some(parsed) => CheckEntry::success(
                bundle.name.clone(),
                parsed.certificate,
                parsed.profile,
                parsed.lines,
            ),
            None => CheckEntry::failure(bundle.name.clone(), "No certificate info found in response"),
        })
    }
}

#[async_trait]
impl CertificateChecker for CheckerClient {
    async fn check_bundle(&self, bundle: &CertificateBundle) -> CheckEntry {
        tracing::info!(
            "Checking {} -> {} + {}",
            bundle.name,
            file_name(&bundle.p12_path),
            file_name(&bundle.profile_path)
        );
        match self.try_check(bundle).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Error checking {}: {}", bundle.name, e);
                CheckEntry::failure(bundle.name.clone(), e.to_string())
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| CertStatError::Configuration(format!("Invalid header value {:?}: {}", value, e)))
}

async fn file_part(path: &std::path::Path, mime: &str) -> Result<Part> {
    let data = tokio::fs::read(path).await?;
    Ok(Part::bytes(data)
        .file_name(file_name(path))
        .mime_str(mime)?)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn ensure_success(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CertStatError::CheckerStatus {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }
    Ok(body)
}
