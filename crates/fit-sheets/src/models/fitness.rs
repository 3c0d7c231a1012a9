//! Fitness API payload models
//!
//! These structures represent the aggregate, session and dataset responses
//! returned by the fitness REST API. Timestamps arrive as decimal strings, so
//! they are parsed leniently into integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Sleep stage value for "awake" in sleep segment points
pub const SLEEP_STAGE_AWAKE: i64 = 1;

/// Sleep stage value for "out of bed"
pub const SLEEP_STAGE_OUT_OF_BED: i64 = 3;

/// Response of the dataset aggregate endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    /// One bucket per day of the requested range
    #[serde(default)]
    pub bucket: Vec<Bucket>,
}

/// A time bucket of aggregated data
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Bucket start in epoch milliseconds
    #[serde(deserialize_with = "lenient_i64")]
    pub start_time_millis: i64,

    /// Bucket end in epoch milliseconds
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub end_time_millis: Option<i64>,

    #[serde(default)]
    pub dataset: Vec<Dataset>,
}

/// Points of one data source inside a bucket
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub data_source_id: Option<String>,

    #[serde(default)]
    pub point: Vec<DataPoint>,
}

/// A single sample or aggregated value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub start_time_nanos: Option<i64>,

    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub end_time_nanos: Option<i64>,

    #[serde(default)]
    pub data_type_name: Option<String>,

    #[serde(default)]
    pub value: Vec<PointValue>,
}

/// A typed value; exactly one field is usually present
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointValue {
    #[serde(default)]
    pub int_val: Option<i64>,

    #[serde(default)]
    pub fp_val: Option<f64>,
}

/// Response of the sessions endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionList {
    #[serde(default)]
    pub session: Vec<Session>,
}

/// A recorded session such as a night of sleep
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(deserialize_with = "lenient_i64")]
    pub start_time_millis: i64,

    /// Missing while the session is still in progress
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub end_time_millis: Option<i64>,

    #[serde(default)]
    pub activity_type: Option<i64>,
}

/// Raw points of a single data source over a time range
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDataset {
    #[serde(default)]
    pub data_source_id: Option<String>,

    #[serde(default)]
    pub point: Vec<DataPoint>,
}

impl Bucket {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_time_millis)
    }

    /// All points across every dataset of the bucket
    pub fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.dataset.iter().flat_map(|d| d.point.iter())
    }
}

impl DataPoint {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start_time_nanos.and_then(from_nanos)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_time_nanos.and_then(from_nanos)
    }

    /// First integer value, if any
    pub fn int_value(&self) -> Option<i64> {
        self.value.first().and_then(|v| v.int_val)
    }

    /// First floating point value, if any
    pub fn fp_value(&self) -> Option<f64> {
        self.value.first().and_then(|v| v.fp_val)
    }

    /// Whether this sleep segment marks the user as awake
    pub fn is_awake_stage(&self) -> bool {
        matches!(
            self.int_value(),
            Some(SLEEP_STAGE_AWAKE) | Some(SLEEP_STAGE_OUT_OF_BED)
        )
    }
}

impl Session {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_time_millis)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_time_millis.and_then(DateTime::from_timestamp_millis)
    }
}

fn from_nanos(nanos: i64) -> Option<DateTime<Utc>> {
    let secs = nanos.div_euclid(1_000_000_000);
    let sub = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, sub)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum {
    Num(i64),
    Str(String),
}

impl StrOrNum {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            StrOrNum::Num(n) => Ok(n),
            StrOrNum::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected integer timestamp, got '{}'", s))),
        }
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    StrOrNum::deserialize(deserializer)?.into_i64()
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<StrOrNum>::deserialize(deserializer)? {
        Some(StrOrNum::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => v.into_i64().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregate_parsing_with_string_millis() {
        let payload = json!({
            "bucket": [{
                "startTimeMillis": "1760486400000",
                "endTimeMillis": "1760572800000",
                "dataset": [{"point": [{"value": [{"intVal": 2500}]}]}]
            }]
        });
        let resp: AggregateResponse = serde_json::from_value(payload).unwrap();
        let bucket = &resp.bucket[0];
        assert_eq!(bucket.start_time_millis, 1_760_486_400_000);
        assert_eq!(bucket.end_time_millis, Some(1_760_572_800_000));
        assert_eq!(bucket.points().next().unwrap().int_value(), Some(2500));
    }

    #[test]
    fn test_session_without_end_is_in_progress() {
        let payload = json!({"session": [{"startTimeMillis": 1760486400000i64, "activityType": 72}]});
        let list: SessionList = serde_json::from_value(payload).unwrap();
        assert!(list.session[0].end().is_none());
        assert!(list.session[0].start().is_some());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let payload = json!({"session": [{"startTimeMillis": "soon"}]});
        assert!(serde_json::from_value::<SessionList>(payload).is_err());
    }

    #[test]
    fn test_awake_stage_detection() {
        let point: DataPoint = serde_json::from_value(json!({
            "startTimeNanos": "1760486400000000000",
            "endTimeNanos": "1760487000000000000",
            "value": [{"intVal": 1}]
        }))
        .unwrap();
        assert!(point.is_awake_stage());
        assert_eq!(
            (point.end().unwrap() - point.start().unwrap()).num_minutes(),
            10
        );
    }
}
