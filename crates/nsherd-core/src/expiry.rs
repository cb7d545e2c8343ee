//! Expiry computation for the garbage-collection sweep
//!
//! A record expires once it has gone unconfirmed for longer than its TTL
//! plus a grace threshold. The threshold grows whenever the poll interval
//! approaches or exceeds the TTL: without it, a record whose source is
//! polled less often than its TTL would be deleted and immediately
//! recreated every cycle.
//!
//! The functions here are pure over an explicit `now` so tests control the
//! clock; the reconciler's sweep wires them to `Utc::now()`.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Settings;
use crate::record::Record;
use crate::store::RecordStore;

/// Base grace period in seconds applied on top of every TTL
const BASE_THRESHOLD: u64 = 5;

/// Grace threshold in seconds for a given TTL and poll interval
///
/// `threshold = 5 + max(0, update_interval - ttl)`, e.g. ttl 10 with a
/// 60-second poll interval yields 55.
pub fn expiry_threshold(ttl: u64, update_interval: u64) -> u64 {
    BASE_THRESHOLD + update_interval.saturating_sub(ttl)
}

/// Whether a record is past its TTL plus grace threshold at `now`
///
/// A record without its own TTL uses the default; a TTL of zero is
/// permanently exempt.
pub fn is_expired(record: &Record, settings: &Settings, now: DateTime<Utc>) -> bool {
    let ttl = record.ttl.unwrap_or(settings.default_ttl);
    if ttl == 0 {
        return false;
    }

    let threshold = expiry_threshold(ttl, settings.update_interval);
    let age = (now - record.found).num_seconds();
    age >= (ttl + threshold) as i64
}

/// Hostnames of every record in the store that has expired at `now`
pub fn collect_expired(store: &RecordStore, settings: &Settings, now: DateTime<Utc>) -> Vec<String> {
    let mut expired: Vec<String> = store
        .iter()
        .filter(|record| is_expired(record, settings, now))
        .map(|record| {
            warn!(
                hostname = %record.hostname,
                ttl = record.ttl.unwrap_or(settings.default_ttl),
                age = (now - record.found).num_seconds(),
                "record expired"
            );
            record.hostname.clone()
        })
        .collect();
    expired.sort();
    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::record::{Record, SourceRef};

    fn settings(ttl: u64, update_interval: u64) -> Settings {
        Settings {
            default_ttl: ttl,
            update_interval,
            ..Settings::default()
        }
    }

    fn record_found_secs_ago(ttl: Option<u64>, secs: i64, now: DateTime<Utc>) -> Record {
        Record {
            hostname: "a.example.com".to_string(),
            endpoints: vec!["public".to_string()],
            sources: vec![SourceRef::new("docker", "container", "1")],
            found: now - Duration::seconds(secs),
            ttl,
            provider: None,
        }
    }

    #[test]
    fn threshold_grows_with_slow_polling() {
        assert_eq!(expiry_threshold(10, 10), 5);
        assert_eq!(expiry_threshold(10, 60), 55);
        // Fast polling never shrinks the base grace period
        assert_eq!(expiry_threshold(60, 10), 5);
    }

    #[test]
    fn record_expires_at_ttl_plus_threshold_exactly() {
        // ttl=10, interval=60 -> threshold 55 -> expiry at age 65
        let now = Utc::now();
        let cfg = settings(10, 60);

        let fresh = record_found_secs_ago(Some(10), 64, now);
        assert!(!is_expired(&fresh, &cfg, now));

        let stale = record_found_secs_ago(Some(10), 65, now);
        assert!(is_expired(&stale, &cfg, now));
    }

    #[test]
    fn ttl_zero_never_expires() {
        let now = Utc::now();
        let cfg = settings(10, 3600);
        let record = record_found_secs_ago(Some(0), 1_000_000, now);

        assert!(!is_expired(&record, &cfg, now));
    }

    #[test]
    fn missing_ttl_falls_back_to_default() {
        let now = Utc::now();
        let cfg = settings(10, 10);

        // default ttl 10, interval 10 -> threshold 5 -> expiry at 15
        let record = record_found_secs_ago(None, 15, now);
        assert!(is_expired(&record, &cfg, now));

        let record = record_found_secs_ago(None, 14, now);
        assert!(!is_expired(&record, &cfg, now));
    }

    #[test]
    fn future_found_timestamp_is_not_expired() {
        let now = Utc::now();
        let cfg = settings(10, 10);
        let record = record_found_secs_ago(Some(10), -30, now);

        assert!(!is_expired(&record, &cfg, now));
    }

    #[test]
    fn collect_expired_returns_sorted_hostnames() {
        let now = Utc::now();
        let cfg = settings(10, 10);
        let mut store = RecordStore::new();

        let mut b = record_found_secs_ago(Some(10), 100, now);
        b.hostname = "b.example.com".to_string();
        let a = record_found_secs_ago(Some(10), 100, now);
        let mut fresh = record_found_secs_ago(Some(10), 0, now);
        fresh.hostname = "c.example.com".to_string();

        store.insert(b);
        store.insert(a);
        store.insert(fresh);

        assert_eq!(
            collect_expired(&store, &cfg, now),
            vec!["a.example.com".to_string(), "b.example.com".to_string()]
        );
    }
}
