use time::{Duration, PrimitiveDateTime};

pub(crate) fn compute_expires_at(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
) -> PrimitiveDateTime {
    started_at + Duration::minutes(i64::from(duration_minutes.max(0)))
}

/// Whole seconds left before `expires_at`, never negative.
pub(crate) fn remaining_seconds(now: PrimitiveDateTime, expires_at: PrimitiveDateTime) -> i64 {
    (expires_at - now).whole_seconds().max(0)
}

pub(crate) fn submit_deadline(
    expires_at: PrimitiveDateTime,
    grace_period_seconds: u64,
) -> PrimitiveDateTime {
    expires_at + Duration::seconds(grace_period_seconds.min(i64::MAX as u64) as i64)
}

/// Submissions are accepted until the attempt deadline plus a short grace for network jitter.
pub(crate) fn within_submit_window(
    now: PrimitiveDateTime,
    expires_at: PrimitiveDateTime,
    grace_period_seconds: u64,
) -> bool {
    now <= submit_deadline(expires_at, grace_period_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn expiry_adds_duration() {
        let start = datetime!(2025-05-01 09:00:00);
        assert_eq!(compute_expires_at(start, 90), datetime!(2025-05-01 10:30:00));
    }

    #[test]
    fn remaining_never_negative() {
        let expires = datetime!(2025-05-01 10:00:00);
        assert_eq!(remaining_seconds(datetime!(2025-05-01 09:59:00), expires), 60);
        assert_eq!(remaining_seconds(datetime!(2025-05-01 10:05:00), expires), 0);
    }

    #[test]
    fn remaining_truncates_partial_seconds() {
        let expires = datetime!(2025-05-01 10:00:00);
        assert_eq!(remaining_seconds(datetime!(2025-05-01 09:59:59.400), expires), 0);
        assert_eq!(remaining_seconds(datetime!(2025-05-01 09:59:58.900), expires), 1);
    }

    #[test]
    fn grace_window_is_inclusive() {
        let expires = datetime!(2025-05-01 10:00:00);
        assert!(within_submit_window(datetime!(2025-05-01 10:00:30), expires, 30));
        assert!(!within_submit_window(datetime!(2025-05-01 10:00:31), expires, 30));
        assert!(!within_submit_window(datetime!(2025-05-01 10:00:01), expires, 0));
    }
}
