//! Remote certificate checking.
//!
//! `CheckerClient` talks to the checker site; `run_checks` drives a batch of
//! bundles through any `CertificateChecker` with bounded concurrency.

pub mod client;
pub mod parser;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::folders::CertificateBundle;
use crate::models::CheckEntry;

pub use client::{CheckerClient, CheckerConfig, DEFAULT_CHECKER_URL};
pub use parser::{normalize_date, parse_checker_html, ParsedResponse};

/// Checks one certificate bundle.
///
/// Implementations never fail: errors are recorded on the returned entry so a
/// batch always yields one entry per bundle.
#[async_trait]
pub trait CertificateChecker: Send + Sync {
    async fn check_bundle(&self, bundle: &CertificateBundle) -> CheckEntry;
}

/// Checks every bundle, at most `concurrency` at a time.
///
/// `on_done` is called as each entry completes. Entries are returned in the
/// order of `bundles`.
pub async fn run_checks<C, F>(
    checker: Arc<C>,
    bundles: Vec<CertificateBundle>,
    concurrency: usize,
    mut on_done: F,
) -> Vec<CheckEntry>
where
    C: CertificateChecker + 'static,
    F: FnMut(&CheckEntry),
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, bundle) in bundles.into_iter().enumerate() {
        let checker = Arc::clone(&checker);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let name = bundle.name.clone();
            // A panicking check still yields an entry for its bundle.
            let entry = match tokio::spawn(async move { checker.check_bundle(&bundle).await }).await {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::error!("Check of {} failed: {}", name, e);
                    CheckEntry::failure(name, e.to_string())
                }
            };
            (index, entry)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, entry)) => {
                on_done(&entry);
                results.push((index, entry));
            }
            Err(e) => tracing::error!("Check task failed: {}", e),
        }
    }

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use secrecy::SecretString;

    struct FakeChecker {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl CertificateChecker for FakeChecker {
        async fn check_bundle(&self, bundle: &CertificateBundle) -> CheckEntry {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            // Later bundles finish first.
            if bundle.name == "boom" {
                panic!("checker crashed");
            }
            let delay = if bundle.name == "a" { 30 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            CheckEntry::failure(bundle.name.clone(), "fake")
        }
    }

    fn bundle(name: &str) -> CertificateBundle {
        CertificateBundle {
            name: name.to_string(),
            folder: name.into(),
            p12_path: format!("{}/cert.p12", name).into(),
            profile_path: format!("{}/cert.mobileprovision", name).into(),
            password: SecretString::from("pw".to_string()),
        }
    }

    #[tokio::test]
    async fn test_run_checks_preserves_order() {
        let checker = Arc::new(FakeChecker {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let mut seen = Vec::new();

        let entries = run_checks(
            Arc::clone(&checker),
            vec![bundle("a"), bundle("b"), bundle("c")],
            3,
            |e| seen.push(e.source.clone()),
        )
        .await;

        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_run_checks_bounds_concurrency() {
        let checker = Arc::new(FakeChecker {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });

        let entries = run_checks(
            Arc::clone(&checker),
            vec![bundle("a"), bundle("b"), bundle("c"), bundle("d")],
            1,
            |_| {},
        )
        .await;

        assert_eq!(entries.len(), 4);
        assert_eq!(checker.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_checks_records_panicked_check() {
        let checker = Arc::new(FakeChecker {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let mut seen = 0;

        let entries = run_checks(
            Arc::clone(&checker),
            vec![bundle("a"), bundle("boom"), bundle("c")],
            2,
            |_| seen += 1,
        )
        .await;

        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "boom", "c"]);
        assert_eq!(seen, 3);
        assert!(entries[1].certificate.is_none());
        assert!(entries[1].error.as_deref().unwrap().contains("panic"));
    }
}
