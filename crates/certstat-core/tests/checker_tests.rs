//! Checker client tests against an in-process mock of the checker site.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use certstat_core::checker::{run_checks, CertificateChecker, CheckerClient, CheckerConfig};
use certstat_core::folders::{collect_bundles, default_ignore, CertificateBundle, DEFAULT_P12_PASSWORD};
use certstat_core::models::CertificateReport;
use certstat_core::readme::ReadmeDocument;

const FORM_PAGE: &str = r#"<html><body>
<form method="post" enctype="multipart/form-data">
  <input name="__RequestVerificationToken" type="hidden" value="mock-token" />
</form></body></html>"#;

const RESULT_PAGE: &str = r#"<html><body>
<div class="alert alert-success">
  CertName: iPhone Distribution: China Telecom Co., Ltd<br>
  Effective Date: 2023-02-08 19:07:10 GMT+08:00<br>
  Expiration Date: 2026-02-07 19:07:09 GMT+08:00<br>
  Certificate Status: Valid<br>
  MP Name: CT Enterprise<br>
  Effective Date: 2025-04-09 20:50:26+08:00<br>
  Expiration Date: 2026-02-07 19:07:09+08:00<br>
  Devices Limit: Unlimited
</div></body></html>"#;

#[derive(Clone, Copy)]
enum Mode {
    Ok,
    NoToken,
    ServerError,
    NoAlert,
}

struct MockState {
    mode: Mode,
    submissions: Mutex<Vec<String>>,
}

async fn form_page(State(state): State<Arc<MockState>>) -> Response {
    let page = match state.mode {
        Mode::NoToken => "<html><body>maintenance</body></html>",
        _ => FORM_PAGE,
    };
    ([(SET_COOKIE, "session=abc; Path=/")], Html(page)).into_response()
}

async fn submit(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    let cookie = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !cookie.contains("session=abc") {
        return (StatusCode::BAD_REQUEST, "missing session").into_response();
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("multipart/form-data") {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected multipart").into_response();
    }

    state
        .submissions
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&body).into_owned());

    match state.mode {
        Mode::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Mode::NoAlert => Html("<html><body><div class=\"card\">Upload again</div></body></html>").into_response(),
        _ => Html(RESULT_PAGE).into_response(),
    }
}

async fn spawn_checker(mode: Mode) -> (String, Arc<MockState>) {
    let state = Arc::new(MockState {
        mode,
        submissions: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/", get(form_page).post(submit))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), state)
}

fn client(base_url: &str) -> CheckerClient {
    CheckerClient::new(CheckerConfig::new(base_url).unwrap()).unwrap()
}

fn write_bundle(folder: &Path, password: Option<&str>) {
    std::fs::create_dir_all(folder).unwrap();
    std::fs::write(folder.join("cert.p12"), b"p12-bytes").unwrap();
    std::fs::write(folder.join("embedded.mobileprovision"), b"profile-bytes").unwrap();
    if let Some(password) = password {
        std::fs::write(folder.join("password.txt"), password).unwrap();
    }
}

async fn load_bundle(folder: &Path) -> CertificateBundle {
    CertificateBundle::load(folder, DEFAULT_P12_PASSWORD)
        .await
        .unwrap()
        .unwrap()
}

// =============================================================================
// Single bundle
// =============================================================================

#[tokio::test]
async fn check_submits_form_and_parses_result() {
    let (url, state) = spawn_checker(Mode::Ok).await;
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("China Telecom");
    write_bundle(&folder, Some("hunter2"));

    let entry = client(&url).check_bundle(&load_bundle(&folder).await).await;

    assert!(entry.error.is_none(), "unexpected error: {:?}", entry.error);
    assert_eq!(entry.source, "China Telecom");
    assert_eq!(entry.certificate_status(), Some("Valid"));
    assert_eq!(entry.valid_from(), Some("2025-04-09T20:50:26+08:00"));
    assert_eq!(
        entry.provisioning_profile.as_ref().unwrap().devices_limit.as_deref(),
        Some("Unlimited")
    );
    assert!(!entry.raw.as_ref().unwrap().is_empty());

    let submissions = state.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    let body = &submissions[0];
    assert!(body.contains(r#"name="P12File"; filename="cert.p12""#));
    assert!(body.contains(r#"name="MobileProvisionFile"; filename="embedded.mobileprovision""#));
    assert!(body.contains("application/x-pkcs12"));
    assert!(body.contains(r#"name="P12PassWord""#));
    assert!(body.contains("hunter2"));
    assert!(body.contains("mock-token"));
    assert!(body.contains("p12-bytes"));
}

#[tokio::test]
async fn missing_token_is_recorded_as_error() {
    let (url, state) = spawn_checker(Mode::NoToken).await;
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), None);

    let entry = client(&url).check_bundle(&load_bundle(dir.path()).await).await;

    assert!(entry.certificate.is_none());
    assert!(entry.provisioning_profile.is_none());
    assert!(entry.error.unwrap().contains("__RequestVerificationToken"));
    assert!(state.submissions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn server_error_is_recorded_as_error() {
    let (url, _state) = spawn_checker(Mode::ServerError).await;
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), None);

    let entry = client(&url).check_bundle(&load_bundle(dir.path()).await).await;

    assert!(entry.error.unwrap().contains("500"));
}

#[tokio::test]
async fn response_without_alert_is_recorded_as_error() {
    let (url, _state) = spawn_checker(Mode::NoAlert).await;
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), None);

    let entry = client(&url).check_bundle(&load_bundle(dir.path()).await).await;

    assert_eq!(entry.error.as_deref(), Some("No certificate info found in response"));
}

// =============================================================================
// Repository run
// =============================================================================

#[tokio::test]
async fn repository_run_updates_report_and_readme() {
    let (url, state) = spawn_checker(Mode::Ok).await;
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_bundle(&root.join("China Telecom"), None);
    std::fs::create_dir_all(root.join("Incomplete")).unwrap();
    std::fs::create_dir_all(root.join("scripts")).unwrap();

    let readme = "| Company | Type | Status | Valid From | Valid To | Download |\n\
|---|---|---|---|---|---|\n\
| China Telecom | Enterprise Certificate | ❓ Unknown | Unknown | Unknown | [Download](x) |\n\
\n\
Recommend Certificate\n\
China Telecom\n";

    let bundles = collect_bundles(root, &default_ignore(), DEFAULT_P12_PASSWORD)
        .await
        .unwrap();
    assert_eq!(bundles.len(), 1);

    let entries = run_checks(Arc::new(client(&url)), bundles, 2, |_| {}).await;
    let report = CertificateReport::new(entries);
    let report_path = root.join("certificates.json");
    report.save(&report_path).await.unwrap();

    let loaded = CertificateReport::load(&report_path).await.unwrap();
    assert_eq!(loaded, report);

    let mut doc = ReadmeDocument::parse(readme);
    assert_eq!(doc.apply_results(&loaded), 1);
    let rendered = doc.render();

    assert!(rendered.contains("| China Telecom | Enterprise Certificate | ✅ Signed | 2025-04-09T20:50:26+08:00 | 2026-02-07T19:07:09+08:00 | [Download](x) |"));
    assert!(rendered.contains("**China Telecom - ✅ Signed**"));

    // Default password is sent when the folder has no password.txt.
    assert!(state.submissions.lock().unwrap()[0].contains(DEFAULT_P12_PASSWORD));
}
