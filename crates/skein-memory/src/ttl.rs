//! Time-to-live tagging for short-term memories.
//!
//! Expiry is a read-time rule, not a background sweep: a short-term record is
//! absent once `now - stored_at >= ttl`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{MemoryError, Result};
use crate::types::{META_MEMORY_TYPE, META_STORED_AT, META_TTL, MemoryTier, Metadata};

/// Default short-term TTL in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A shared clock.
pub type SharedClock = Arc<dyn Clock>;

/// `stored_at + ttl`, or `None` when the sum is not representable.
fn deadline(stored_at: DateTime<Utc>, ttl_secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(ttl_secs).ok()?;
    stored_at.checked_add_signed(chrono::Duration::try_seconds(secs)?)
}

/// Tag metadata as a short-term memory with the given TTL.
///
/// The TTL must be at least one second and its deadline must fit in a
/// timestamp.
pub fn stamp_short_term(metadata: &mut Metadata, ttl_secs: u64, now: DateTime<Utc>) -> Result<()> {
    if ttl_secs == 0 {
        return Err(MemoryError::InvalidArgument(
            "ttl must be at least one second".to_string(),
        ));
    }
    if deadline(now, ttl_secs).is_none() {
        return Err(MemoryError::InvalidArgument(format!(
            "ttl of {ttl_secs}s is out of range"
        )));
    }
    metadata.insert(
        META_MEMORY_TYPE.to_string(),
        Value::from(MemoryTier::ShortTerm.as_str()),
    );
    metadata.insert(META_TTL.to_string(), Value::from(ttl_secs));
    metadata.insert(
        META_STORED_AT.to_string(),
        Value::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Ok(())
}

/// Tag metadata as a long-term memory. Any TTL from an earlier short-term
/// save is dropped.
pub fn stamp_long_term(metadata: &mut Metadata, now: DateTime<Utc>) {
    metadata.insert(
        META_MEMORY_TYPE.to_string(),
        Value::from(MemoryTier::LongTerm.as_str()),
    );
    metadata.remove(META_TTL);
    metadata.insert(
        META_STORED_AT.to_string(),
        Value::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
}

/// When a short-term record stops being visible, if it carries TTL tags.
///
/// A stored TTL whose deadline overflows is treated as no deadline.
pub fn expires_at(metadata: &Metadata) -> Option<DateTime<Utc>> {
    if metadata.get(META_MEMORY_TYPE).and_then(Value::as_str) != Some(MemoryTier::ShortTerm.as_str())
    {
        return None;
    }
    let ttl = metadata.get(META_TTL).and_then(Value::as_u64)?;
    let stored_at = metadata
        .get(META_STORED_AT)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);
    deadline(stored_at, ttl)
}

/// Whether a record with this metadata is expired at `now`.
///
/// Records without complete TTL tags never expire.
pub fn is_expired(metadata: &Metadata, now: DateTime<Utc>) -> bool {
    expires_at(metadata).is_some_and(|deadline| now >= deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_stamp_short_term() {
        let mut meta = Metadata::new();
        stamp_short_term(&mut meta, 60, t0()).unwrap();
        assert_eq!(meta[META_MEMORY_TYPE], "short_term");
        assert_eq!(meta[META_TTL], 60);
        assert_eq!(meta[META_STORED_AT], "2025-01-01T12:00:00.000Z");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut meta = Metadata::new();
        let err = stamp_short_term(&mut meta, 0, t0()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(meta.is_empty());
    }

    #[test]
    fn test_huge_ttl_rejected() {
        for ttl in [u64::MAX, i64::MAX as u64, 10_000_000_000_000] {
            let mut meta = Metadata::new();
            let err = stamp_short_term(&mut meta, ttl, t0()).unwrap_err();
            assert!(err.is_invalid_argument(), "ttl {ttl}");
            assert!(meta.is_empty());
        }
    }

    #[test]
    fn test_stored_huge_ttl_does_not_panic() {
        let mut meta = Metadata::new();
        stamp_short_term(&mut meta, 60, t0()).unwrap();
        meta.insert(META_TTL.to_string(), Value::from(u64::MAX));
        assert!(expires_at(&meta).is_none());
        assert!(!is_expired(&meta, t0()));

        meta.insert(META_TTL.to_string(), Value::from(10_000_000_000_000u64));
        assert!(!is_expired(&meta, t0() + chrono::Duration::days(365)));
    }

    #[test]
    fn test_expiry_boundary() {
        let mut meta = Metadata::new();
        stamp_short_term(&mut meta, 60, t0()).unwrap();

        assert!(!is_expired(&meta, t0()));
        assert!(!is_expired(&meta, t0() + chrono::Duration::seconds(59)));
        assert!(is_expired(&meta, t0() + chrono::Duration::seconds(60)));
        assert!(is_expired(&meta, t0() + chrono::Duration::hours(2)));
    }

    #[test]
    fn test_long_term_never_expires() {
        let mut meta = Metadata::new();
        stamp_short_term(&mut meta, 1, t0()).unwrap();
        stamp_long_term(&mut meta, t0());
        assert!(meta.get(META_TTL).is_none());
        assert!(!is_expired(&meta, t0() + chrono::Duration::days(365)));
    }

    #[test]
    fn test_incomplete_tags_never_expire() {
        let mut meta = Metadata::new();
        meta.insert(META_MEMORY_TYPE.to_string(), Value::from("short_term"));
        meta.insert(META_TTL.to_string(), Value::from(1));
        assert!(expires_at(&meta).is_none());
        assert!(!is_expired(&meta, t0()));
    }
}
