//! The interactive loop behind `meteoblue show`.
//!
//! Prompts play the part of a list UI: every answer becomes one controller
//! intent, the controller settles, and the resulting view is printed.

use std::fmt;

use anyhow::Result;
use inquire::{InquireError, Select, Text};
use meteoblue_core::{
    LocationCandidate, Mode, Presenter, ViewState, ViewStateController,
    presenter::{self, Row},
};

use crate::render;

/// Where a session begins.
#[derive(Debug, Clone, PartialEq)]
pub enum Start {
    Prompt,
    Query(String),
    CurrentLocation,
    Point {
        lat: f64,
        lon: f64,
        elevation: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Maps Esc and Ctrl-C to `None`.
pub fn optional<T>(answer: Result<T, InquireError>) -> Result<Option<T>> {
    match answer {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

enum SearchChoice {
    Candidate(LocationCandidate),
    NewQuery,
    CurrentLocation,
    Quit,
}

impl fmt::Display for SearchChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchChoice::Candidate(c) => write!(
                f,
                "{}  {}  ({})",
                c.name,
                presenter::candidate_subtitle(c),
                presenter::candidate_accessory(c)
            ),
            SearchChoice::NewQuery => f.write_str("Search again"),
            SearchChoice::CurrentLocation => f.write_str("Use current location"),
            SearchChoice::Quit => f.write_str("Quit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Refresh,
    HourDetails,
    CurrentLocation,
    NewSearch,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Refresh => "Refresh",
            Action::HourDetails => "View hour details",
            Action::CurrentLocation => "Use current location",
            Action::NewSearch => "Search new location",
            Action::Quit => "Quit",
        })
    }
}

struct HourChoice {
    index: usize,
    row: Row,
}

impl fmt::Display for HourChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} {}", self.row.title, self.row.subtitle)
    }
}

pub struct Session {
    ctl: ViewStateController,
    presenter: Presenter,
    /// Cleared after showing hour details so the forecast is not reprinted.
    redraw: bool,
}

impl Session {
    pub fn new(ctl: ViewStateController, presenter: Presenter) -> Self {
        Self {
            ctl,
            presenter,
            redraw: true,
        }
    }

    pub async fn run(mut self, start: Start) -> Result<()> {
        if let ViewState::ApiKeyMissing { message } = self.ctl.view() {
            render::api_key_missing(message);
            return Ok(());
        }

        match start {
            Start::Prompt => {}
            Start::Query(query) => self.type_query(&query).await,
            Start::CurrentLocation => {
                self.ctl.use_current_location();
                self.settle().await;
            }
            Start::Point {
                lat,
                lon,
                elevation,
            } => {
                self.ctl.fetch_forecast(lat, lon, elevation);
                self.settle().await;
            }
        }

        loop {
            let flow = match self.ctl.mode() {
                Mode::ShowSearch => self.search_step().await?,
                Mode::ShowForecast => self.forecast_step().await?,
            };
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Print what the intent queued, wait for every call, then print the rest.
    async fn settle(&mut self) {
        self.flush_toasts();
        self.ctl.settle().await;
        self.flush_toasts();
        self.redraw = true;
    }

    fn flush_toasts(&mut self) {
        for toast in self.ctl.drain_toasts() {
            render::toast(&toast);
        }
    }

    async fn type_query(&mut self, text: &str) {
        self.ctl.on_query_changed(text);
        self.settle().await;
    }

    async fn prompt_query(&mut self) -> Result<Flow> {
        let answer = optional(
            Text::new("Search for a city:")
                .with_help_message("at least 2 characters, Esc to quit")
                .prompt(),
        )?;

        match answer {
            Some(text) => {
                self.type_query(&text).await;
                Ok(Flow::Continue)
            }
            None => Ok(Flow::Quit),
        }
    }

    async fn search_step(&mut self) -> Result<Flow> {
        let results = match self.ctl.view() {
            ViewState::Searching {
                query,
                results,
                error,
                ..
            } => {
                render::search(query, results, error);
                results.to_vec()
            }
            ViewState::Empty { error, .. } => {
                render::empty(error);
                Vec::new()
            }
            ViewState::ApiKeyMissing { message } => {
                render::api_key_missing(message);
                return Ok(Flow::Quit);
            }
            ViewState::LocationResolving { .. } | ViewState::ForecastReady { .. } => Vec::new(),
        };

        if results.is_empty() {
            return self.prompt_query().await;
        }

        let mut choices: Vec<SearchChoice> =
            results.into_iter().map(SearchChoice::Candidate).collect();
        choices.extend([
            SearchChoice::NewQuery,
            SearchChoice::CurrentLocation,
            SearchChoice::Quit,
        ]);

        let Some(choice) = optional(Select::new("Pick a location:", choices).prompt())? else {
            return Ok(Flow::Quit);
        };

        match choice {
            SearchChoice::Candidate(candidate) => {
                self.ctl.select_location(candidate);
                self.settle().await;
            }
            SearchChoice::NewQuery => {
                self.ctl.new_search();
                return self.prompt_query().await;
            }
            SearchChoice::CurrentLocation => {
                self.ctl.use_current_location();
                self.settle().await;
            }
            SearchChoice::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    async fn forecast_step(&mut self) -> Result<Flow> {
        if matches!(self.ctl.view(), ViewState::LocationResolving { .. }) {
            self.settle().await;
            return Ok(Flow::Continue);
        }

        let has_forecast = self.ctl.forecast().is_some();
        if self.redraw {
            match self.ctl.view() {
                ViewState::ForecastReady {
                    location,
                    forecast,
                    error,
                    ..
                } => render::forecast(&self.presenter, location, forecast, error),
                ViewState::Empty { error, .. } => render::empty(error),
                _ => {}
            }
        }
        self.redraw = true;

        let mut actions = vec![Action::Refresh];
        if has_forecast {
            actions.push(Action::HourDetails);
        }
        actions.extend([Action::CurrentLocation, Action::NewSearch, Action::Quit]);

        let Some(action) = optional(Select::new("Actions:", actions).prompt())? else {
            return Ok(Flow::Quit);
        };

        match action {
            Action::Refresh => {
                if self.ctl.refresh() {
                    self.settle().await;
                } else {
                    render::notice("Nothing to refresh yet.");
                }
            }
            Action::HourDetails => {
                self.hour_details()?;
                self.redraw = false;
            }
            Action::CurrentLocation => {
                self.ctl.use_current_location();
                self.settle().await;
            }
            Action::NewSearch => {
                self.ctl.new_search();
                return self.prompt_query().await;
            }
            Action::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn hour_details(&self) -> Result<()> {
        let Some(forecast) = self.ctl.forecast() else {
            return Ok(());
        };

        let choices: Vec<HourChoice> = self
            .presenter
            .hourly_rows(forecast)
            .into_iter()
            .enumerate()
            .map(|(index, row)| HourChoice { index, row })
            .collect();
        if choices.is_empty() {
            render::notice("No hourly data.");
            return Ok(());
        }

        let Some(picked) = optional(Select::new("Which hour?", choices).prompt())? else {
            return Ok(());
        };

        if let Some(step) = forecast.hourly().get(picked.index) {
            render::markdown(&self.presenter.detail_markdown(step, forecast.basic_units()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_prompts_become_none() {
        let cancelled: Result<String, InquireError> = Err(InquireError::OperationCanceled);
        assert!(optional(cancelled).unwrap().is_none());

        let interrupted: Result<String, InquireError> = Err(InquireError::OperationInterrupted);
        assert!(optional(interrupted).unwrap().is_none());

        let answered: Result<String, InquireError> = Ok("Basel".into());
        assert_eq!(optional(answered).unwrap().as_deref(), Some("Basel"));
    }

    #[test]
    fn other_prompt_errors_propagate() {
        let broken: Result<String, InquireError> = Err(InquireError::NotTTY);
        assert!(optional(broken).is_err());
    }

    #[test]
    fn action_labels() {
        assert_eq!(Action::HourDetails.to_string(), "View hour details");
        assert_eq!(SearchChoice::NewQuery.to_string(), "Search again");
    }
}
