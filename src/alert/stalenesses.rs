/// Feed staleness detection.
///
/// DSCOVR solar wind products update every minute and OVATION every five.
/// When a feed silently stops advancing, the dashboard would keep showing
/// the last values as if they were current; these checks let the snapshot
/// flag that.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so staleness is deterministic in tests.

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if `observed_at` is older than `max_age_minutes`
/// relative to `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  ->  stale
///   age == max_age_minutes ->  not stale
///
/// Observations from the future (clock skew) are never stale.
pub fn is_stale_at(observed_at: DateTime<Utc>, max_age_minutes: u64, now: DateTime<Utc>) -> bool {
    let age = (now - observed_at).num_minutes();
    age > 0 && age as u64 > max_age_minutes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-05-10 18:30:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 18, 30, 0).unwrap()
    }

    fn minutes_ago(m: i64) -> DateTime<Utc> {
        fixed_now() - chrono::Duration::minutes(m)
    }

    // --- Not stale ----------------------------------------------------------

    #[test]
    fn test_reading_5_minutes_old_is_not_stale() {
        assert!(!is_stale_at(minutes_ago(5), 30, fixed_now()));
    }

    #[test]
    fn test_reading_exactly_at_threshold_is_not_stale() {
        assert!(
            !is_stale_at(minutes_ago(30), 30, fixed_now()),
            "staleness is strictly greater than, not >="
        );
    }

    #[test]
    fn test_future_reading_is_not_stale() {
        assert!(!is_stale_at(fixed_now() + chrono::Duration::minutes(3), 0, fixed_now()));
    }

    // --- Stale --------------------------------------------------------------

    #[test]
    fn test_reading_one_minute_past_threshold_is_stale() {
        assert!(is_stale_at(minutes_ago(31), 30, fixed_now()));
    }

    #[test]
    fn test_same_reading_stale_under_tight_threshold_not_under_loose() {
        let observed = minutes_ago(45);
        assert!(is_stale_at(observed, 20, fixed_now()));
        assert!(!is_stale_at(observed, 60, fixed_now()));
    }
}
