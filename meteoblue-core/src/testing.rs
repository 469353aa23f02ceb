//! Scripted collaborators for controller tests.

use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Semaphore;

use crate::{
    client::WeatherClient,
    config::Config,
    error::{ClientError, GeolocationError},
    location::LocationProvider,
    model::{Coordinate, ForecastPackage, ForecastResult, LocationCandidate, PackageUnits, TimeStep},
};

pub fn config_with_key() -> Config {
    let mut cfg = Config::default();
    cfg.set_api_key("TEST_KEY".into());
    cfg
}

pub fn berlin() -> LocationCandidate {
    LocationCandidate {
        id: "2950159".into(),
        name: "Berlin".into(),
        country: "Germany".into(),
        admin1: Some("Land Berlin".into()),
        admin2: None,
        latitude: 52.52,
        longitude: 13.41,
        elevation: Some(34.0),
        timezone: Some("Europe/Berlin".into()),
    }
}

pub fn sample_forecast() -> ForecastResult {
    let step = |time: &str, temperature: f64, pictocode: u16| TimeStep {
        time: time.into(),
        temperature: Some(temperature),
        felttemperature: Some(temperature - 1.5),
        pictocode: Some(pictocode),
        windspeed: Some(11.6),
        precipitation: Some(0.0),
        relativehumidity: Some(64.0),
        ..Default::default()
    };

    let units = PackageUnits {
        temperature: Some("°C".into()),
        windspeed: Some("km/h".into()),
        precipitation: Some("mm".into()),
        ..Default::default()
    };

    ForecastResult {
        metadata: None,
        basic: Some(ForecastPackage {
            units: units.clone(),
            data_1h: vec![
                step("2024-05-01 10:00", 14.2, 1),
                step("2024-05-01 11:00", 15.1, 3),
            ],
        }),
        current: Some(ForecastPackage {
            units,
            data_1h: vec![step("2024-05-01 10:20", 14.6, 1)],
        }),
    }
}

#[derive(Debug, Default)]
pub struct MockClient {
    searches: Mutex<Vec<String>>,
    forecasts: Mutex<Vec<Coordinate>>,
    search_result: Mutex<Option<Result<Vec<LocationCandidate>, ClientError>>>,
    forecast_result: Mutex<Option<Result<ForecastResult, ClientError>>>,
    search_gate: Option<Arc<Semaphore>>,
    forecast_gate: Option<Arc<Semaphore>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_results(self, results: Vec<LocationCandidate>) -> Self {
        self.set_search_result(Ok(results));
        self
    }

    pub fn with_search_error(self, err: ClientError) -> Self {
        self.set_search_result(Err(err));
        self
    }

    /// Hold every search until `gate` hands out a permit.
    pub fn gate_search(mut self, gate: Arc<Semaphore>) -> Self {
        self.search_gate = Some(gate);
        self
    }

    pub fn gate_forecast(mut self, gate: Arc<Semaphore>) -> Self {
        self.forecast_gate = Some(gate);
        self
    }

    pub fn set_search_result(&self, result: Result<Vec<LocationCandidate>, ClientError>) {
        *self.search_result.lock().unwrap() = Some(result);
    }

    pub fn set_forecast_result(&self, result: Result<ForecastResult, ClientError>) {
        *self.forecast_result.lock().unwrap() = Some(result);
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn forecast_calls(&self) -> Vec<Coordinate> {
        self.forecasts.lock().unwrap().clone()
    }
}

async fn pass(gate: &Semaphore) {
    if let Ok(permit) = gate.acquire().await {
        permit.forget();
    }
}

#[async_trait]
impl WeatherClient for MockClient {
    async fn search(
        &self,
        query: &str,
        _api_key: &str,
    ) -> Result<Vec<LocationCandidate>, ClientError> {
        self.searches.lock().unwrap().push(query.to_string());
        if let Some(gate) = &self.search_gate {
            pass(gate).await;
        }
        let scripted = self.search_result.lock().unwrap().clone();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn forecast(
        &self,
        coordinate: &Coordinate,
        _api_key: &str,
    ) -> Result<ForecastResult, ClientError> {
        self.forecasts.lock().unwrap().push(*coordinate);
        if let Some(gate) = &self.forecast_gate {
            pass(gate).await;
        }
        let scripted = self.forecast_result.lock().unwrap().clone();
        scripted.unwrap_or_else(|| Ok(sample_forecast()))
    }
}

#[derive(Debug)]
pub struct MockLocator {
    result: Result<Coordinate, GeolocationError>,
    calls: AtomicUsize,
}

impl MockLocator {
    pub fn answering(result: Result<Coordinate, GeolocationError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for MockLocator {
    async fn current_coordinate(&self) -> Result<Coordinate, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
