//! Time and rate formatting for logs and status output

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ramsey_miner::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// assert_eq!(format_duration(Duration::from_secs(150)), "2m30s");
/// assert_eq!(format_duration(Duration::from_secs(7260)), "2h01m");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if duration.as_millis() >= 1000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{:.2}ms", duration.as_secs_f64() * 1_000.0)
    }
}

/// Format a rate (rounds per second)
///
/// # Examples
///
/// ```
/// use ramsey_miner::util::time::format_rate;
///
/// assert_eq!(format_rate(0.25), "0.25");
/// assert_eq!(format_rate(500.0), "500");
/// assert_eq!(format_rate(1500.0), "1.50K");
/// ```
pub fn format_rate(rate: f64) -> String {
    if rate < 10.0 {
        format!("{:.2}", rate)
    } else if rate < 1_000.0 {
        format!("{:.0}", rate)
    } else if rate < 1_000_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else {
        format!("{:.2}M", rate / 1_000_000.0)
    }
}

/// Events per second over `duration`, zero for an empty interval.
pub fn calculate_rate(events: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        events as f64 / seconds
    } else {
        0.0
    }
}

/// How long ago `then` was, relative to `now`. Future timestamps read as zero.
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - then).to_std().unwrap_or_default();
    format!("{} ago", format_duration(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_calculate_rate() {
        assert_eq!(calculate_rate(10, Duration::from_secs(4)), 2.5);
        assert_eq!(calculate_rate(10, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_age() {
        let then = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 3, 5).unwrap();
        assert_eq!(format_age(then, now), "3m05s ago");
        assert_eq!(format_age(now, then), "0.00ms ago");
    }
}
