use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    config::{Config, DEFAULT_BASE_URL},
    error::ClientError,
    model::{Coordinate, ForecastResult, LocationCandidate, SearchResponse},
    units::UnitPreferences,
};

use super::{WeatherClient, error_message};

const SEARCH_PATH: &str = "/ns1/search";
const FORECAST_PATH: &str = "/packages/basic-1h_current";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MeteoblueClient {
    http: Client,
    base_url: String,
    units: UnitPreferences,
}

impl MeteoblueClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(REQUEST_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            units: UnitPreferences::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = Self::with_base_url(config.base_url()).with_units(config.units);
        match config.request_timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    /// Unit preferences sent along with forecast requests.
    pub fn with_units(mut self, units: UnitPreferences) -> Self {
        self.units = units;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn forecast_query(
        &self,
        coordinate: &Coordinate,
        api_key: &str,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("lat", coordinate.lat.to_string()),
            ("lon", coordinate.lon.to_string()),
            ("apikey", api_key.to_string()),
        ];

        if let Some(elevation) = coordinate.elevation.filter(|e| e.is_finite()) {
            query.push(("asl", elevation.to_string()));
        }

        query.extend(
            self.units
                .query_pairs()
                .into_iter()
                .map(|(key, value)| (key, value.to_string())),
        );

        query
    }
}

impl Default for MeteoblueClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherClient for MeteoblueClient {
    async fn search(
        &self,
        query: &str,
        api_key: &str,
    ) -> Result<Vec<LocationCandidate>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::validation("Location query cannot be empty"));
        }
        if api_key.trim().is_empty() {
            return Err(ClientError::validation("API key is required"));
        }

        tracing::debug!(%query, "searching locations");

        let res = self
            .http
            .get(self.url(SEARCH_PATH))
            .query(&[("query", query), ("apikey", api_key)])
            .send()
            .await?;

        let parsed: SearchResponse = read_json(res).await?;
        let results = parsed.results.unwrap_or_default();

        tracing::debug!(count = results.len(), "location search finished");
        Ok(results)
    }

    async fn forecast(
        &self,
        coordinate: &Coordinate,
        api_key: &str,
    ) -> Result<ForecastResult, ClientError> {
        if api_key.trim().is_empty() {
            return Err(ClientError::validation("API key is required"));
        }
        if !coordinate.is_finite() {
            return Err(ClientError::validation("Invalid latitude or longitude"));
        }

        tracing::debug!(
            lat = coordinate.lat,
            lon = coordinate.lon,
            elevation = ?coordinate.elevation,
            "fetching forecast"
        );

        let res = self
            .http
            .get(self.url(FORECAST_PATH))
            .query(&self.forecast_query(coordinate, api_key))
            .send()
            .await?;

        read_json(res).await
    }
}

fn http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
        tracing::warn!(%err, "http client setup failed, requests have no timeout");
        Client::new()
    })
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        let message = error_message(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), %message, "meteoblue request failed");
        return Err(ClientError::Request {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
