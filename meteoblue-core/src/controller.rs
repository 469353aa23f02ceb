//! View-state controller: the single authority for what the screen shows.
//!
//! User intents (`on_query_changed`, `select_location`, ...) mutate state
//! synchronously and may start background work through the [`TaskManager`].
//! Background work reports back as an [`Outcome`]; the owner of the controller
//! pumps those with [`ViewStateController::next_outcome`] and
//! [`ViewStateController::apply`] (or just [`ViewStateController::settle`]).
//!
//! Every request carries a [`RequestToken`]. Mode transitions bump the
//! generation, and each request kind remembers the serial of its latest
//! request; an outcome whose token no longer matches is dropped silently.
//! `loading` means "at least one call is outstanding", so it is released on
//! every settle, stale or not.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;

use crate::{
    client::WeatherClient,
    config::Config,
    error::{ClientError, GeolocationError},
    location::LocationProvider,
    model::{Coordinate, ForecastResult, LocationCandidate},
    tasks::{TaskKey, TaskManager},
};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this never reach the network.
pub const MIN_QUERY_LEN: usize = 2;

pub const API_KEY_MISSING: &str =
    "Please configure your meteoblue API key in the preferences.";

const SEARCH_TIMER: TaskKey = TaskKey::new("location_search");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ShowSearch,
    ShowForecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    generation: u64,
    serial: u64,
}

/// Result of background work, applied on the controller's task.
#[derive(Debug)]
pub enum Outcome {
    SearchDebounceElapsed {
        query: String,
        ticket: u64,
    },
    SearchDidSettle {
        token: RequestToken,
        result: Result<Vec<LocationCandidate>, ClientError>,
    },
    LocationDidSettle {
        token: RequestToken,
        result: Result<Coordinate, GeolocationError>,
    },
    ForecastDidSettle {
        token: RequestToken,
        result: Result<ForecastResult, ClientError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStyle {
    Animated,
    Success,
    Failure,
}

/// A transient notification for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub style: ToastStyle,
    pub title: String,
    pub message: Option<String>,
}

/// What should be rendered right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewState<'a> {
    ApiKeyMissing {
        message: &'a str,
    },
    Searching {
        query: &'a str,
        results: &'a [LocationCandidate],
        loading: bool,
        error: Option<&'a str>,
    },
    LocationResolving {
        loading: bool,
    },
    ForecastReady {
        location: Option<&'a LocationCandidate>,
        forecast: &'a ForecastResult,
        loading: bool,
        error: Option<&'a str>,
    },
    Empty {
        loading: bool,
        error: Option<&'a str>,
    },
}

pub struct ViewStateController {
    api_key: Option<String>,
    client: Arc<dyn WeatherClient>,
    locator: Arc<dyn LocationProvider>,
    tasks: TaskManager<Outcome>,
    rx: mpsc::UnboundedReceiver<Outcome>,

    query: String,
    results: Vec<LocationCandidate>,
    selected: Option<LocationCandidate>,
    forecast: Option<ForecastResult>,
    /// Point of the most recent forecast request, used by `refresh`.
    forecast_coordinate: Option<Coordinate>,
    mode: Mode,
    error: Option<String>,
    in_flight: usize,

    generation: u64,
    serial: u64,
    debounce_ticket: u64,
    // Serial of the latest request per kind; 0 means none outstanding.
    latest_search: u64,
    latest_locate: u64,
    latest_forecast: u64,

    toasts: Vec<Toast>,
}

impl ViewStateController {
    pub fn new(
        config: &Config,
        client: Arc<dyn WeatherClient>,
        locator: Arc<dyn LocationProvider>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let api_key = config.api_key().map(str::to_string);
        let error = api_key.is_none().then(|| API_KEY_MISSING.to_string());

        Self {
            api_key,
            client,
            locator,
            tasks: TaskManager::new(tx),
            rx,
            query: String::new(),
            results: Vec::new(),
            selected: None,
            forecast: None,
            forecast_coordinate: None,
            mode: Mode::ShowSearch,
            error,
            in_flight: 0,
            generation: 0,
            serial: 0,
            debounce_ticket: 0,
            latest_search: 0,
            latest_locate: 0,
            latest_forecast: 0,
            toasts: Vec::new(),
        }
    }

    // ===== Intents =====

    pub fn on_query_changed(&mut self, text: &str) {
        self.query = text.to_string();

        if !is_searchable(text) {
            self.tasks.cancel(&SEARCH_TIMER);
            self.results.clear();
            self.enter_search();
            return;
        }

        if self.api_key.is_none() {
            return;
        }

        self.enter_search();
        self.debounce_ticket = self.next_serial();
        self.tasks.debounce(
            SEARCH_TIMER,
            SEARCH_DEBOUNCE,
            Outcome::SearchDebounceElapsed {
                query: text.to_string(),
                ticket: self.debounce_ticket,
            },
        );
    }

    pub fn search(&mut self, query: &str) {
        let Some(api_key) = self.require_api_key() else {
            return;
        };
        if query.trim().is_empty() {
            tracing::debug!("ignoring blank search query");
            return;
        }

        let token = self.token();
        self.latest_search = token.serial;
        self.begin_call();

        let client = Arc::clone(&self.client);
        let query = query.to_string();
        tracing::debug!(%query, serial = token.serial, "starting location search");
        self.tasks.spawn(async move {
            let result = client.search(&query, &api_key).await;
            Outcome::SearchDidSettle { token, result }
        });
    }

    pub fn select_location(&mut self, candidate: LocationCandidate) {
        if self.require_api_key().is_none() {
            return;
        }

        let coordinate = candidate.coordinate();
        self.enter(Mode::ShowForecast);
        self.selected = Some(candidate);
        self.fetch_forecast(coordinate.lat, coordinate.lon, coordinate.elevation);
    }

    pub fn use_current_location(&mut self) {
        if self.require_api_key().is_none() {
            return;
        }

        self.enter(Mode::ShowForecast);

        let token = self.token();
        self.latest_locate = token.serial;
        self.begin_call();
        self.toast(ToastStyle::Animated, "Getting location...", None);

        let locator = Arc::clone(&self.locator);
        tracing::debug!(serial = token.serial, "resolving current location");
        self.tasks.spawn(async move {
            let result = locator.current_coordinate().await;
            Outcome::LocationDidSettle { token, result }
        });
    }

    pub fn fetch_forecast(&mut self, lat: f64, lon: f64, elevation: Option<f64>) {
        let Some(api_key) = self.require_api_key() else {
            return;
        };

        let coordinate = Coordinate::new(lat, lon).with_elevation(elevation);
        if !coordinate.is_finite() {
            let message = ClientError::validation("Invalid latitude or longitude").to_string();
            self.forecast = None;
            self.fail("Weather Fetch Failed", message);
            return;
        }

        if self.mode == Mode::ShowSearch {
            self.enter(Mode::ShowForecast);
        }

        let token = self.token();
        self.latest_forecast = token.serial;
        self.forecast_coordinate = Some(coordinate);
        self.begin_call();
        self.toast(ToastStyle::Animated, "Fetching weather...", None);

        let client = Arc::clone(&self.client);
        tracing::debug!(lat, lon, ?elevation, serial = token.serial, "starting forecast fetch");
        self.tasks.spawn(async move {
            let result = client.forecast(&coordinate, &api_key).await;
            Outcome::ForecastDidSettle { token, result }
        });
    }

    /// Re-fetch the forecast currently on screen. Returns `false` when there
    /// is nothing to refresh.
    pub fn refresh(&mut self) -> bool {
        if self.mode != Mode::ShowForecast || self.latest_locate != 0 {
            return false;
        }

        let coordinate = match (&self.selected, self.forecast_coordinate) {
            (Some(candidate), _) => candidate.coordinate(),
            (None, Some(coordinate)) => coordinate,
            (None, None) => return false,
        };

        self.fetch_forecast(coordinate.lat, coordinate.lon, coordinate.elevation);
        true
    }

    pub fn new_search(&mut self) {
        self.tasks.cancel(&SEARCH_TIMER);
        self.enter(Mode::ShowSearch);
        self.query.clear();
        self.results.clear();
        if self.api_key.is_some() {
            self.error = None;
        }
    }

    // ===== Outcomes =====

    /// Wait for the next outcome, or `None` once nothing is outstanding.
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        if self.is_idle() {
            return None;
        }
        self.rx.recv().await
    }

    /// Apply outcomes until no timer or call is outstanding.
    pub async fn settle(&mut self) {
        while let Some(outcome) = self.next_outcome().await {
            self.apply(outcome);
        }
    }

    /// Apply one outcome. Returns `true` when the view may have changed.
    pub fn apply(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::SearchDebounceElapsed { query, ticket } => {
                if ticket != self.debounce_ticket {
                    return false;
                }
                self.tasks.finish(&SEARCH_TIMER);
                if query != self.query {
                    tracing::trace!(%query, "debounced query no longer current");
                    return false;
                }
                self.search(&query);
                true
            }

            Outcome::SearchDidSettle { token, result } => {
                self.end_call();
                if !self.is_current(token, self.latest_search) {
                    tracing::trace!(?token, "dropping stale search result");
                    return true;
                }
                self.latest_search = 0;

                match result {
                    Ok(results) => {
                        tracing::debug!(count = results.len(), "search results stored");
                        self.enter_search();
                        self.results = results;
                    }
                    Err(err) => self.fail("Search Failed", err.to_string()),
                }
                true
            }

            Outcome::LocationDidSettle { token, result } => {
                self.end_call();
                if !self.is_current(token, self.latest_locate) {
                    tracing::trace!(?token, "dropping stale location");
                    return true;
                }
                self.latest_locate = 0;

                match result {
                    Ok(coordinate) => {
                        self.fetch_forecast(coordinate.lat, coordinate.lon, coordinate.elevation)
                    }
                    Err(err) => self.fail("Location Error", err.to_string()),
                }
                true
            }

            Outcome::ForecastDidSettle { token, result } => {
                self.end_call();
                if !self.is_current(token, self.latest_forecast) {
                    tracing::trace!(?token, "dropping stale forecast");
                    return true;
                }
                self.latest_forecast = 0;

                match result {
                    Ok(forecast) => {
                        self.forecast = Some(forecast);
                        self.error = None;
                        self.toast(ToastStyle::Success, "Weather updated", None);
                    }
                    Err(err) => {
                        self.forecast = None;
                        self.fail("Weather Fetch Failed", err.to_string());
                    }
                }
                true
            }
        }
    }

    // ===== Read access =====

    pub fn view(&self) -> ViewState<'_> {
        let loading = self.is_loading();
        let error = self.error.as_deref();

        if self.api_key.is_none() {
            return ViewState::ApiKeyMissing {
                message: API_KEY_MISSING,
            };
        }

        match self.mode {
            Mode::ShowForecast => match &self.forecast {
                Some(forecast) => ViewState::ForecastReady {
                    location: self.selected.as_ref(),
                    forecast,
                    loading,
                    error,
                },
                None if self.latest_locate != 0 || self.latest_forecast != 0 => {
                    ViewState::LocationResolving { loading }
                }
                None => ViewState::Empty { loading, error },
            },
            Mode::ShowSearch => {
                if !self.results.is_empty() || is_searchable(&self.query) {
                    ViewState::Searching {
                        query: &self.query,
                        results: &self.results,
                        loading,
                        error,
                    }
                } else {
                    ViewState::Empty { loading, error }
                }
            }
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[LocationCandidate] {
        &self.results
    }

    pub fn selected_location(&self) -> Option<&LocationCandidate> {
        self.selected.as_ref()
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        self.forecast.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && !self.tasks.is_pending(&SEARCH_TIMER)
    }

    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    // ===== Internals =====

    fn require_api_key(&mut self) -> Option<String> {
        if self.api_key.is_none() {
            self.error = Some(API_KEY_MISSING.to_string());
        }
        self.api_key.clone()
    }

    fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    fn token(&mut self) -> RequestToken {
        RequestToken {
            generation: self.generation,
            serial: self.next_serial(),
        }
    }

    fn is_current(&self, token: RequestToken, latest: u64) -> bool {
        token.generation == self.generation && token.serial == latest
    }

    /// Switch modes, invalidating every outstanding request.
    fn enter(&mut self, mode: Mode) {
        self.tasks.cancel(&SEARCH_TIMER);
        // A timer that already fired may still be queued; 0 never matches it.
        self.debounce_ticket = 0;
        self.generation += 1;
        self.mode = mode;
        self.selected = None;
        self.forecast = None;
        self.forecast_coordinate = None;
        self.latest_search = 0;
        self.latest_locate = 0;
        self.latest_forecast = 0;
        tracing::trace!(generation = self.generation, ?mode, "mode transition");
    }

    fn enter_search(&mut self) {
        if self.mode == Mode::ShowForecast {
            self.enter(Mode::ShowSearch);
        }
    }

    fn begin_call(&mut self) {
        self.in_flight += 1;
        self.error = None;
    }

    fn end_call(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn fail(&mut self, title: &str, message: String) {
        tracing::warn!(%title, %message, "operation failed");
        self.error = Some(message.clone());
        self.toast(ToastStyle::Failure, title, Some(message));
    }

    fn toast(&mut self, style: ToastStyle, title: &str, message: Option<String>) {
        self.toasts.push(Toast {
            style,
            title: title.to_string(),
            message,
        });
    }
}

fn is_searchable(text: &str) -> bool {
    text.chars().count() >= MIN_QUERY_LEN && !text.trim().is_empty()
}
