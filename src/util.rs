//! Shared utility functions.

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Token expiry is compared across processes, so this is wall time rather than
/// a monotonic clock. A clock set before 1970 reads as 0.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Convert a duration in seconds to a human-readable string.
///
/// >= 86400s -> "Xd", >= 3600s -> "Xh", >= 60s -> "Xm", otherwise -> "Xs".
pub fn human_duration(secs: u64) -> String {
    if secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration_seconds() {
        assert_eq!(human_duration(0), "0s");
        assert_eq!(human_duration(59), "59s");
    }

    #[test]
    fn test_human_duration_minutes_and_hours() {
        assert_eq!(human_duration(90), "1m");
        assert_eq!(human_duration(3599), "59m");
        assert_eq!(human_duration(3600), "1h");
        assert_eq!(human_duration(86399), "23h");
    }

    #[test]
    fn test_human_duration_days() {
        assert_eq!(human_duration(86400), "1d");
        assert_eq!(human_duration(7 * 86400), "7d");
    }

    #[test]
    fn test_now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
