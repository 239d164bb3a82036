//! Replay-cache decoration (spec §4.2.3).
//!
//! `jose::validate_jwt` calls back into `is_replayed` during validation;
//! this module owns the complementary write side — marking a `jti` used
//! once validation succeeds — and the TTL floor computation shared by
//! both.

use time::OffsetDateTime;

use crate::interfaces::ReplayCache;
use crate::jose::MIN_REPLAY_CACHE_TTL_SECS;

/// `TTL = (expires_at - now) + clock_skew`, floored to the configured
/// minimum (spec §4.2.3, default 10s).
pub fn ttl_for(expires_at: OffsetDateTime, clock_skew: time::Duration, minimum: time::Duration) -> time::Duration {
    let now = OffsetDateTime::now_utc();
    let raw = (expires_at - now) + clock_skew;
    let floor = minimum.max(time::Duration::seconds(MIN_REPLAY_CACHE_TTL_SECS));
    raw.max(floor)
}

/// Marks `jti` as used if it carries a usable lifetime; a `jti` already
/// expired by the time this runs needs no cache entry at all.
pub async fn mark_used<C: ReplayCache + ?Sized>(cache: &C, jti: &str, expires_at: OffsetDateTime, clock_skew: time::Duration, minimum: time::Duration) {
    let ttl = ttl_for(expires_at, clock_skew, minimum);
    if ttl > time::Duration::ZERO {
        let _ = cache.mark_used(jti, ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_to_minimum() {
        let now = OffsetDateTime::now_utc();
        let ttl = ttl_for(now + time::Duration::seconds(1), time::Duration::ZERO, time::Duration::seconds(10));
        assert!(ttl >= time::Duration::seconds(10));
    }
}
