//! "Where am I" lookups.
//!
//! A [`LocationProvider`] answers with a single fresh [`Coordinate`] or a
//! [`GeolocationError`]. Two providers ship with the crate:
//! - [`IpLocator`] asks an IP geolocation service over HTTP
//! - [`StaticLocator`] always answers with a configured coordinate

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{config::Config, error::GeolocationError, model::Coordinate};

/// How a position should be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Upper bound for the whole lookup, connect to decoded body.
    pub timeout: Duration,
    /// Oldest cached fix that may be reused. Zero means always ask again.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// A raw fix as reported by a positioning source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl From<Position> for Coordinate {
    /// Altitude is rounded to whole metres; missing or non-finite means absent.
    fn from(pos: Position) -> Self {
        let elevation = pos.altitude.filter(|a| a.is_finite()).map(f64::round);
        Coordinate::new(pos.latitude, pos.longitude).with_elevation(elevation)
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn current_coordinate(&self) -> Result<Coordinate, GeolocationError>;
}

/// Answers with a fixed coordinate, e.g. from `--lat/--lon` or `[home]`.
#[derive(Debug, Clone, Copy)]
pub struct StaticLocator {
    coordinate: Coordinate,
}

impl StaticLocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for StaticLocator {
    async fn current_coordinate(&self) -> Result<Coordinate, GeolocationError> {
        if self.coordinate.is_finite() {
            Ok(self.coordinate)
        } else {
            Err(GeolocationError::PositionUnavailable)
        }
    }
}

/// Resolves the machine's approximate position from its public IP.
#[derive(Debug, Clone)]
pub struct IpLocator {
    http: Client,
    endpoint: String,
    options: PositionOptions,
}

#[derive(Debug, Deserialize)]
struct IpLookup {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    altitude: Option<f64>,
}

impl IpLocator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_options(endpoint, PositionOptions::default())
    }

    pub fn with_options(endpoint: impl Into<String>, options: PositionOptions) -> Self {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "http client setup failed, using defaults");
                Client::new()
            });

        Self {
            http,
            endpoint: endpoint.into(),
            options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.locator_url())
    }

    async fn lookup(&self) -> Result<Coordinate, GeolocationError> {
        let mut request = self.http.get(&self.endpoint);
        if self.options.maximum_age.is_zero() {
            request = request
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let res = request.send().await.map_err(transport_error)?;

        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeolocationError::PermissionDenied);
            }
            status if !status.is_success() => {
                return Err(GeolocationError::Unknown(format!(
                    "lookup failed with status {status}"
                )));
            }
            _ => {}
        }

        let lookup: IpLookup = res.json().await.map_err(transport_error)?;
        position_from_lookup(lookup).map(Coordinate::from)
    }
}

#[async_trait]
impl LocationProvider for IpLocator {
    async fn current_coordinate(&self) -> Result<Coordinate, GeolocationError> {
        tokio::time::timeout(self.options.timeout, self.lookup())
            .await
            .map_err(|_| GeolocationError::Timeout)?
    }
}

fn transport_error(err: reqwest::Error) -> GeolocationError {
    if err.is_timeout() {
        GeolocationError::Timeout
    } else {
        GeolocationError::Unknown(err.to_string())
    }
}

fn position_from_lookup(lookup: IpLookup) -> Result<Position, GeolocationError> {
    if lookup.status.as_deref() == Some("fail") {
        tracing::warn!(message = ?lookup.message, "ip lookup reported failure");
        return Err(GeolocationError::PositionUnavailable);
    }

    match (lookup.lat, lookup.lon) {
        (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
            Ok(Position {
                latitude,
                longitude,
                altitude: lookup.altitude,
            })
        }
        _ => Err(GeolocationError::PositionUnavailable),
    }
}
