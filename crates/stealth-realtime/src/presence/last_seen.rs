//! Human-readable last-seen text.

use chrono::{DateTime, Datelike, Utc};

/// Render how long ago a user was last reachable.
///
/// Buckets: under a minute, minutes, hours, days (under a week), then the
/// calendar date as `M/D/YYYY`.
pub fn format_last_seen(now: DateTime<Utc>, last_seen: Option<DateTime<Utc>>) -> String {
    let Some(last_seen) = last_seen else {
        return "Last seen a long time ago".to_string();
    };

    let seconds = (now - last_seen).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "Last seen just now".to_string()
    } else if minutes < 60 {
        format!("Last seen {}", ago(minutes, "minute"))
    } else if hours < 24 {
        format!("Last seen {}", ago(hours, "hour"))
    } else if days < 7 {
        format!("Last seen {}", ago(days, "day"))
    } else {
        format!(
            "Last seen {}/{}/{}",
            last_seen.month(),
            last_seen.day(),
            last_seen.year()
        )
    }
}

fn ago(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(seconds_ago: i64) -> String {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        format_last_seen(now, Some(now - Duration::seconds(seconds_ago)))
    }

    #[test]
    fn test_never_seen() {
        assert_eq!(format_last_seen(Utc::now(), None), "Last seen a long time ago");
    }

    #[test]
    fn test_minute_boundary() {
        assert_eq!(at(0), "Last seen just now");
        assert_eq!(at(59), "Last seen just now");
        assert_eq!(at(60), "Last seen 1 minute ago");
        assert_eq!(at(90), "Last seen 1 minute ago");
        assert_eq!(at(120), "Last seen 2 minutes ago");
    }

    #[test]
    fn test_hours_and_days() {
        assert_eq!(at(59 * 60), "Last seen 59 minutes ago");
        assert_eq!(at(60 * 60), "Last seen 1 hour ago");
        assert_eq!(at(23 * 3600), "Last seen 23 hours ago");
        assert_eq!(at(24 * 3600), "Last seen 1 day ago");
        assert_eq!(at(6 * 86_400), "Last seen 6 days ago");
    }

    #[test]
    fn test_calendar_date_after_a_week() {
        assert_eq!(at(7 * 86_400), "Last seen 3/8/2024");
    }

    #[test]
    fn test_clock_skew_reads_as_just_now() {
        assert_eq!(at(-30), "Last seen just now");
    }
}
