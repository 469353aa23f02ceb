//! Core library for the `meteoblue` CLI.
//!
//! This crate defines:
//! - Configuration & unit preferences
//! - The meteoblue HTTP client and "where am I" lookups
//! - The view-state controller that drives search, location and forecast
//! - Pure formatting of forecast data for display
//!
//! It is used by `meteoblue-cli`, but the controller has no terminal
//! dependencies and can sit behind any front end.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod model;
pub mod presenter;
pub mod tasks;
pub mod units;

#[cfg(test)]
mod testing;

pub use client::{MeteoblueClient, WeatherClient};
pub use config::Config;
pub use controller::{Mode, Toast, ToastStyle, ViewState, ViewStateController};
pub use error::{ClientError, GeolocationError};
pub use location::{IpLocator, LocationProvider, StaticLocator};
pub use model::{Coordinate, ForecastResult, LocationCandidate, TimeStep};
pub use presenter::Presenter;
pub use units::UnitPreferences;
