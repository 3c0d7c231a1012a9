//! Fitness API client for authenticated requests
//!
//! This module provides a small client for the fitness REST API using a
//! bearer access token: daily aggregates, sleep sessions and sleep stage
//! segments.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::client::token::AccessToken;
use crate::error::{FitError, Result};
use crate::models::{AggregateResponse, SegmentDataset, SessionList};

/// Production API host
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// User agent for API requests
const API_USER_AGENT: &str = concat!("fit-sheets/", env!("CARGO_PKG_VERSION"));

const USER_PATH: &str = "/fitness/v1/users/me";

/// Step count deltas
pub const STEP_COUNT_TYPE: &str = "com.google.step_count.delta";

/// Heart rate samples
pub const HEART_RATE_TYPE: &str = "com.google.heart_rate.bpm";

/// Merged sleep stage segments
pub const SLEEP_SEGMENT_SOURCE: &str =
    "derived:com.google.sleep.segment:com.google.android.gms:merged";

/// Session activity type for sleep
const SLEEP_ACTIVITY_TYPE: u32 = 72;

/// One aggregate bucket per day
const DAY_MILLIS: i64 = 86_400_000;

/// Fitness API client
pub struct FitClient {
    client: Client,
    base_url: String,
}

impl FitClient {
    /// Create a new API client for the production host
    pub fn new() -> Result<Self> {
        Self::new_with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new API client with a custom base URL (for testing)
    pub fn new_with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the full URL for a given path
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build headers with authorization
    fn build_headers(&self, token: &AccessToken) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        let auth = HeaderValue::from_str(&token.authorization_header())
            .map_err(|_| FitError::config("Access token contains characters not allowed in a header"))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    /// Make an authenticated GET request and deserialize the JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path);
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers(token)?)
            .query(query)
            .send()
            .await?;

        let response = self.handle_response_status(response).await?;
        response.json().await.map_err(|e| {
            FitError::invalid_response(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Make an authenticated POST request with a JSON body
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers(token)?)
            .json(body)
            .send()
            .await?;

        let response = self.handle_response_status(response).await?;
        response.json().await.map_err(|e| {
            FitError::invalid_response(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Aggregate one data type into daily buckets starting at `start`
    pub async fn aggregate(
        &self,
        token: &AccessToken,
        data_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AggregateResponse> {
        let body = json!({
            "aggregateBy": [{ "dataTypeName": data_type }],
            "bucketByTime": { "durationMillis": DAY_MILLIS },
            "startTimeMillis": start.timestamp_millis(),
            "endTimeMillis": end.timestamp_millis(),
        });
        self.post_json(token, &format!("{}/dataset:aggregate", USER_PATH), &body)
            .await
    }

    /// Sleep sessions overlapping the range
    pub async fn sleep_sessions(
        &self,
        token: &AccessToken,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SessionList> {
        let query = [
            ("startTime", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("endTime", end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("activityType", SLEEP_ACTIVITY_TYPE.to_string()),
        ];
        self.get_json(token, &format!("{}/sessions", USER_PATH), &query)
            .await
    }

    /// Sleep stage segments within the range
    pub async fn sleep_segments(
        &self,
        token: &AccessToken,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SegmentDataset> {
        let path = segments_path(start, end)?;
        self.get_json(token, &path, &[]).await
    }

    /// Handle response status codes and convert to errors
    async fn handle_response_status(&self, response: Response) -> Result<Response> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                Ok(response)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FitError::NotAuthenticated),
            StatusCode::TOO_MANY_REQUESTS => Err(FitError::RateLimited),
            StatusCode::NOT_FOUND => Err(FitError::NotFound(response.url().path().to_string())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(FitError::Api {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}

fn segments_path(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String> {
    let start_ns = start
        .timestamp_nanos_opt()
        .ok_or_else(|| FitError::invalid_param("range start out of bounds"))?;
    let end_ns = end
        .timestamp_nanos_opt()
        .ok_or_else(|| FitError::invalid_param("range end out of bounds"))?;
    Ok(format!(
        "{}/dataSources/{}/datasets/{}-{}",
        USER_PATH, SLEEP_SEGMENT_SOURCE, start_ns, end_ns
    ))
}
