use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;

use crate::{
    error::ClientError,
    model::{Coordinate, ForecastResult, LocationCandidate},
};

pub mod meteoblue;

pub use meteoblue::MeteoblueClient;

/// Read-only access to the weather service.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Look up places by name. Ordering is the provider's.
    async fn search(
        &self,
        query: &str,
        api_key: &str,
    ) -> Result<Vec<LocationCandidate>, ClientError>;

    /// Fetch the hourly and current forecast packages for a point.
    async fn forecast(
        &self,
        coordinate: &Coordinate,
        api_key: &str,
    ) -> Result<ForecastResult, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Turn a non-2xx response body into a message: `{error, message}` JSON
/// first, then the raw text, then a generic status line.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    let fallback = format!("API request failed with status {status}");

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .filter(|s| !s.is_empty())
            .or(parsed.message.filter(|s| !s.is_empty()))
            .unwrap_or(fallback),
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                fallback
            } else {
                truncate_body(text)
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
