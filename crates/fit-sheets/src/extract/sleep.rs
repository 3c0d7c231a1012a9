//! Sleep sessions to Sleep-tab rows

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::merge::SLEEP_COLUMNS;
use crate::models::{DataPoint, SegmentDataset, Session, SessionList};
use crate::table::{Cell, Row, Table, DATE_COLUMN};

/// A sleep stage segment touching a session
struct Stage {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    awake: bool,
}

/// Build Sleep-tab rows, one per session, ordered by session start.
///
/// A session's bounds are widened by any stage segment touching it, so
/// awake time logged just before or after the session counts. Rows are
/// dated by the local day the session starts. A session without an end is
/// in progress and only carries its date and start time.
pub fn extract_sleep(sessions: &SessionList, segments: &SegmentDataset, tz: Tz) -> Table {
    let mut ordered: Vec<&Session> = sessions.session.iter().collect();
    ordered.sort_by_key(|s| s.start_time_millis);

    let mut table = Table::new(SLEEP_COLUMNS);
    for session in ordered {
        if let Some(row) = sleep_row(session, &segments.point, tz) {
            table.push_row(row);
        }
    }
    table
}

fn sleep_row(session: &Session, points: &[DataPoint], tz: Tz) -> Option<Row> {
    let start = session.start()?;
    let mut row = Row::new();
    row.set(DATE_COLUMN, Cell::Date(start.with_timezone(&tz).date_naive()));

    let Some(end) = session.end() else {
        row.set("start_time", time_of_day(start, tz));
        return Some(row);
    };

    let mut stages: Vec<Stage> = points
        .iter()
        .filter_map(|p| {
            Some(Stage {
                start: p.start()?,
                end: p.end()?,
                awake: p.is_awake_stage(),
            })
        })
        .filter(|s| s.start <= end && s.end >= start)
        .collect();
    stages.sort_by_key(|s| s.start);

    let span_start = stages.iter().map(|s| s.start).fold(start, |a, b| a.min(b));
    let span_end = stages.iter().map(|s| s.end).fold(end, |a, b| a.max(b));
    let span = span_end - span_start;

    row.set("start_time", time_of_day(span_start, tz));
    row.set("end_time", time_of_day(span_end, tz));

    if stages.is_empty() {
        row.set("sleep_total_min", Cell::Int(minutes(span)));
        row.set("wake_up_count", Cell::Int(0));
        row.set("time_awake_min", Cell::Int(0));
        return Some(row);
    }

    let awake = stages
        .iter()
        .filter(|s| s.awake)
        .fold(Duration::zero(), |acc, s| acc + (s.end - s.start));
    let asleep = (span - awake).max(Duration::zero());

    row.set("sleep_total_min", Cell::Int(minutes(asleep)));
    row.set("wake_up_count", Cell::Int(wake_up_count(&stages)));
    row.set("time_awake_min", Cell::Int(minutes(awake)));
    if span > Duration::zero() {
        let pct = asleep.num_seconds() as f64 / span.num_seconds() as f64 * 100.0;
        row.set("Sleep_consistency", Cell::Float((pct * 10.0).round() / 10.0));
    }
    Some(row)
}

/// Contiguous awake runs after the first non-awake stage.
/// Expects `stages` sorted by start.
fn wake_up_count(stages: &[Stage]) -> i64 {
    let Some(onset) = stages.iter().find(|s| !s.awake).map(|s| s.start) else {
        return 0;
    };

    let mut count = 0;
    let mut run_end: Option<DateTime<Utc>> = None;
    for stage in stages.iter().filter(|s| s.awake && s.start >= onset) {
        match run_end {
            Some(e) if stage.start <= e => run_end = Some(e.max(stage.end)),
            _ => {
                count += 1;
                run_end = Some(stage.end);
            }
        }
    }
    count
}

fn minutes(d: Duration) -> i64 {
    (d.num_seconds() as f64 / 60.0).round() as i64
}

fn time_of_day(instant: DateTime<Utc>, tz: Tz) -> Cell {
    Cell::Text(instant.with_timezone(&tz).format("%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn nanos(secs: i64) -> String {
        (secs * 1_000_000_000).to_string()
    }

    fn segment(start: i64, end: i64, stage: i64) -> serde_json::Value {
        json!({"startTimeNanos": nanos(start), "endTimeNanos": nanos(end), "value": [{"intVal": stage}]})
    }

    // 2025-10-15 21:55 .. 2025-10-16 06:10 UTC
    const T2155: i64 = 1_760_565_300;
    const T2200: i64 = 1_760_565_600;
    const T2205: i64 = 1_760_565_900;
    const T0100: i64 = 1_760_576_400;
    const T0600: i64 = 1_760_594_400;
    const T0610: i64 = 1_760_595_000;

    fn night() -> (SessionList, SegmentDataset) {
        let sessions: SessionList = serde_json::from_value(json!({
            "session": [{
                "startTimeMillis": (T2200 * 1000).to_string(),
                "endTimeMillis": (T0600 * 1000).to_string()
            }]
        }))
        .unwrap();
        let segments: SegmentDataset = serde_json::from_value(json!({
            "point": [
                segment(T2155, T2205, 1),
                segment(T2205, T0100, 5),
                segment(T0100, T0600, 1),
                segment(T0600, T0610, 1),
            ]
        }))
        .unwrap();
        (sessions, segments)
    }

    #[test]
    fn test_wake_segments_extend_bounds() {
        let (sessions, segments) = night();
        let table = extract_sleep(&sessions, &segments, Tz::UTC);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "start_time"), &Cell::text("21:55:00"));
        assert_eq!(table.get(0, "end_time"), &Cell::text("06:10:00"));
        assert_eq!(
            table.get(0, "date"),
            &Cell::Date(NaiveDate::from_ymd_opt(2025, 10, 15).unwrap())
        );
    }

    #[test]
    fn test_awake_time_and_consistency() {
        let (sessions, segments) = night();
        let table = extract_sleep(&sessions, &segments, Tz::UTC);

        assert_eq!(table.get(0, "time_awake_min"), &Cell::Int(320));
        assert_eq!(table.get(0, "sleep_total_min"), &Cell::Int(175));
        // 01:00-06:00 and 06:00-06:10 form one run; 21:55 is before onset
        assert_eq!(table.get(0, "wake_up_count"), &Cell::Int(1));
        let Cell::Float(consistency) = table.get(0, "Sleep_consistency") else {
            panic!("expected numeric consistency");
        };
        assert!(*consistency <= 100.0);
        assert_eq!(*consistency, 35.4);
    }

    #[test]
    fn test_in_progress_session() {
        let sessions: SessionList = serde_json::from_value(json!({
            "session": [{"startTimeMillis": "1759879800000"}]
        }))
        .unwrap();
        let table = extract_sleep(&sessions, &SegmentDataset::default(), Tz::UTC);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "start_time"), &Cell::text("23:30:00"));
        assert!(table.get(0, "end_time").is_blank());
        assert!(table.get(0, "sleep_total_min").is_blank());
        assert_eq!(table.columns().len(), SLEEP_COLUMNS.len());
    }

    #[test]
    fn test_session_without_stages() {
        let sessions: SessionList = serde_json::from_value(json!({
            "session": [{
                "startTimeMillis": (T2200 * 1000).to_string(),
                "endTimeMillis": (T0600 * 1000).to_string()
            }]
        }))
        .unwrap();
        let table = extract_sleep(&sessions, &SegmentDataset::default(), Tz::UTC);

        assert_eq!(table.get(0, "sleep_total_min"), &Cell::Int(480));
        assert_eq!(table.get(0, "wake_up_count"), &Cell::Int(0));
        assert!(table.get(0, "Sleep_consistency").is_blank());
    }
}
