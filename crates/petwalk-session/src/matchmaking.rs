//! Serverless matchmaking by time bucket.
//!
//! Clients that start walking within the same UTC time window compute the
//! same bucket string and therefore try the same room names in the same
//! order:
//!
//! ```text
//! WalkRoom_20260217_1030_0   ← everyone tries this first
//! WalkRoom_20260217_1030_1   ← overflow once _0 is full
//! ...
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for bucket computation.
pub trait WallClock: Send + Sync + 'static {
    fn now(&self) -> SystemTime;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant. For tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl WallClock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

const SECS_PER_DAY: u64 = 86_400;

/// Formats `now` as `YYYYMMDD_HHMM` in UTC, with the minute-of-day
/// truncated down to a multiple of `width_minutes`.
///
/// A width of 0 is treated as 1. Times before the Unix epoch clamp to it.
pub fn time_bucket(now: SystemTime, width_minutes: u32) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = (secs / SECS_PER_DAY) as i64;
    let minute_of_day = ((secs % SECS_PER_DAY) / 60) as u32;

    let width = width_minutes.clamp(1, 24 * 60);
    let bucket_minute = minute_of_day / width * width;

    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}{month:02}{day:02}_{:02}{:02}",
        bucket_minute / 60,
        bucket_minute % 60
    )
}

/// Room name for candidate `index` in `bucket`.
pub fn candidate_name(prefix: &str, bucket: &str, index: u32) -> String {
    format!("{prefix}{bucket}_{index}")
}

/// The `count` candidate names for `bucket`, in the order they are tried.
pub fn candidates<'a>(
    prefix: &'a str,
    bucket: &'a str,
    count: u32,
) -> impl Iterator<Item = String> + 'a {
    (0..count).map(move |index| candidate_name(prefix, bucket, index))
}

/// Converts days since 1970-01-01 to a proleptic Gregorian (year, month, day).
///
/// Howard Hinnant's `civil_from_days`.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
