//! Contract tests: the expiry sweep through the full delete path
//!
//! The pure threshold math lives in `expiry`'s unit tests; these verify
//! that `sweep` wires expiry into provider deletes and store removal.

mod common;

use chrono::{Duration, Utc};
use common::*;
use nsherd_core::Reconciler;
use nsherd_core::record::{Record, SourceRef};
use nsherd_core::traits::executor::DnsAction;

fn aged_record(hostname: &str, ttl: Option<u64>, age_secs: i64) -> Record {
    Record {
        hostname: hostname.to_string(),
        endpoints: vec!["public".to_string()],
        sources: vec![SourceRef::new("docker", "container", "1")],
        found: Utc::now() - Duration::seconds(age_secs),
        ttl,
        provider: None,
    }
}

#[tokio::test]
async fn sweep_deletes_expired_records() {
    let executor = MockExecutor::new();
    let mut reconciler = reconciler_with(&executor, StaticResolver::new(&["cloudflare"]), "1.2.3.4");

    // ttl 10, interval 10 -> threshold 5 -> expiry at age 15
    reconciler
        .store_mut()
        .insert(aged_record("a.example.com", Some(10), 60));

    let outcome = reconciler.sweep().await;

    assert_eq!(outcome.expired, vec!["a.example.com".to_string()]);
    assert!(!outcome.errors);
    assert!(reconciler.store().get("a.example.com").is_none());

    let deletes = executor.ops_of(DnsAction::Delete);
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].domain, "example.com");
    assert_eq!(deletes[0].name, "a");
    assert_eq!(deletes[0].content, "1.2.3.4");
}

#[tokio::test]
async fn fresh_records_survive_the_sweep() {
    let executor = MockExecutor::new();
    let mut reconciler = reconciler_with(&executor, StaticResolver::new(&["cloudflare"]), "1.2.3.4");

    reconciler
        .store_mut()
        .insert(aged_record("a.example.com", Some(10), 5));

    let outcome = reconciler.sweep().await;

    assert!(outcome.expired.is_empty());
    assert!(executor.ops().is_empty());
    assert!(reconciler.store().get("a.example.com").is_some());
}

#[tokio::test]
async fn ttl_zero_records_are_never_swept() {
    let executor = MockExecutor::new();
    let mut reconciler = reconciler_with(&executor, StaticResolver::new(&["cloudflare"]), "1.2.3.4");

    reconciler
        .store_mut()
        .insert(aged_record("here.example.com", Some(0), 1_000_000));

    let outcome = reconciler.sweep().await;

    assert!(outcome.expired.is_empty());
    assert!(reconciler.store().get("here.example.com").is_some());
}

#[tokio::test]
async fn slow_polling_widens_the_grace_window() {
    // ttl 10, interval 60 -> threshold 55 -> expiry at age 65. A record
    // last confirmed 64 seconds ago must survive, or the poll cadence
    // would delete and recreate it every cycle.
    let executor = MockExecutor::new();
    let mut reconciler = Reconciler::new(
        Box::new(MockExecutor::sharing_counters_with(&executor)),
        Box::new(StaticResolver::new(&["cloudflare"])),
        nsherd_core::Settings {
            default_ttl: 10,
            update_interval: 60,
            ..nsherd_core::Settings::default()
        },
    );
    reconciler.update_endpoints(public_table("1.2.3.4"));

    reconciler
        .store_mut()
        .insert(aged_record("a.example.com", Some(10), 64));
    assert!(reconciler.sweep().await.expired.is_empty());

    reconciler
        .store_mut()
        .insert(aged_record("a.example.com", Some(10), 65));
    assert_eq!(
        reconciler.sweep().await.expired,
        vec!["a.example.com".to_string()]
    );
}

#[tokio::test]
async fn failed_sweep_delete_reports_error_and_retries_later() {
    let executor = MockExecutor::new();
    let mut reconciler = reconciler_with(&executor, StaticResolver::new(&["cloudflare"]), "1.2.3.4");

    reconciler
        .store_mut()
        .insert(aged_record("a.example.com", Some(10), 60));
    executor.set_failing(true);

    let outcome = reconciler.sweep().await;
    assert!(outcome.errors);
    assert!(reconciler.store().get("a.example.com").is_some());

    // Provider recovers; the next sweep collects the record again.
    executor.set_failing(false);
    let outcome = reconciler.sweep().await;
    assert!(!outcome.errors);
    assert!(reconciler.store().get("a.example.com").is_none());
}
