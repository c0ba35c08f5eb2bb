//! Time sources and `HH:MM:SS` parsing/formatting.

use chrono::{DateTime, Local};

use super::{AppError, Result};

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock, shareable between a board and its driver.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: std::sync::Arc<std::sync::atomic::AtomicI64>,
}

#[cfg(test)]
impl ManualClock {
    #[must_use]
    pub fn at(now_ms: i64) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::atomic::AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Milliseconds between two epoch timestamps, clamped at zero.
#[must_use]
pub fn span_ms(from: i64, to: i64) -> u64 {
    u64::try_from(to.saturating_sub(from)).unwrap_or(0)
}

/// Parse a manual time entry of the form `H+:MM:SS` into milliseconds.
///
/// Hours are unbounded; minutes and seconds are exactly two digits and
/// must be below 60.
///
/// # Errors
/// `InvalidTimeFormat` when the shape is wrong, `InvalidTimeRange` when
/// minutes or seconds are 60 or more.
pub fn parse_hms(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let format_err = || AppError::InvalidTimeFormat {
        input: input.to_string(),
    };

    let mut parts = trimmed.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format_err());
    };

    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(h) || !all_digits(m) || !all_digits(s) || m.len() != 2 || s.len() != 2 {
        return Err(format_err());
    }

    let hours: u64 = h.parse().map_err(|_| format_err())?;
    let minutes: u64 = m.parse().map_err(|_| format_err())?;
    let seconds: u64 = s.parse().map_err(|_| format_err())?;

    if minutes >= 60 || seconds >= 60 {
        return Err(AppError::InvalidTimeRange {
            input: input.to_string(),
        });
    }

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .and_then(|total| total.checked_mul(1000))
        .ok_or_else(format_err)
}

/// Format milliseconds as `HH:MM:SS`; hours grow past two digits as needed.
#[must_use]
pub fn format_hms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Human relative time for a past timestamp.
#[must_use]
pub fn format_relative(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minutes = diff / 60_000;
    let hours = diff / 3_600_000;
    let days = diff / 86_400_000;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        local_datetime(timestamp_ms).map_or_else(
            || "-".to_string(),
            |dt| dt.format("%Y-%m-%d").to_string(),
        )
    }
}

/// Convert epoch milliseconds into local time.
#[must_use]
pub fn local_datetime(timestamp_ms: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.with_timezone(&Local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hms_accepts_unbounded_hours() {
        assert_eq!(parse_hms("61:00:00").unwrap(), 61 * 3600 * 1000);
        assert_eq!(parse_hms("0:00:00").unwrap(), 0);
        assert_eq!(parse_hms("01:02:03").unwrap(), 3_723_000);
        assert_eq!(parse_hms("123:59:59").unwrap(), (123 * 3600 + 59 * 60 + 59) * 1000);
    }

    #[test]
    fn test_parse_hms_rejects_out_of_range() {
        assert!(matches!(
            parse_hms("1:60:00"),
            Err(AppError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            parse_hms("1:00:60"),
            Err(AppError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn test_parse_hms_rejects_malformed() {
        for input in ["", "1:2:3", "aa:bb:cc", "1:00", "1:00:00:00", "-1:00:00", "1:0a:00"] {
            assert!(
                matches!(parse_hms(input), Err(AppError::InvalidTimeFormat { .. })),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3_723_999), "01:02:03");
        assert_eq!(format_hms(100 * 3600 * 1000), "100:00:00");
    }

    #[test]
    fn test_format_relative() {
        let now = 10 * 86_400_000;
        assert_eq!(format_relative(now - 30_000, now), "Just now");
        assert_eq!(format_relative(now - 5 * 60_000, now), "5m ago");
        assert_eq!(format_relative(now - 3 * 3_600_000, now), "3h ago");
        assert_eq!(format_relative(now - 2 * 86_400_000, now), "2d ago");
    }

    #[test]
    fn test_span_clamps_negative() {
        assert_eq!(span_ms(100, 50), 0);
        assert_eq!(span_ms(50, 100), 50);
    }

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::at(1_000);
        let handle = clock.clone();
        handle.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
    }
}
