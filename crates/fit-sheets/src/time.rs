//! Local-day bucket boundaries for upstream queries

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{FitError, Result};

/// UTC instants of the first and last microsecond of `date` in `tz`.
pub fn day_bounds_local(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
    (
        local_to_utc(date.and_time(NaiveTime::MIN), tz),
        local_to_utc(date.and_time(last), tz),
    )
}

/// UTC bounds covering the `days` local days ending with `today`.
///
/// `days` of zero is treated as one. A window reaching past the earliest
/// representable date is an invalid parameter.
pub fn sync_window(today: NaiveDate, days: u32, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let span = u64::from(days.max(1)) - 1;
    let first = today.checked_sub_days(Days::new(span)).ok_or_else(|| {
        FitError::invalid_param(format!("--days {} reaches before the earliest supported date", days))
    })?;
    let (start, _) = day_bounds_local(first, tz);
    let (_, end) = day_bounds_local(today, tz);
    Ok((start, end))
}

/// Resolve a local wall-clock time, taking the earlier instant on DST overlaps.
/// Times inside a DST gap are shifted forward by the gap.
fn local_to_utc(naive: chrono::NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}
