//! Turns forecast data into display text.
//!
//! Everything here is pure: no I/O and no controller state. Any absent or
//! non-finite number renders as [`NOT_AVAILABLE`].

use chrono::NaiveDateTime;

use crate::{
    model::{ForecastResult, LocationCandidate, PackageUnits, TimeStep},
    units::UnitPreferences,
};

pub const NOT_AVAILABLE: &str = "N/A";
pub const HOURLY_LIMIT: usize = 24;

const PRESSURE_FALLBACK: &str = "hPa";
const TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Coarse weather category derived from a pictogram code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIcon {
    Clear,
    Cloud,
    Rain,
    Unknown,
}

impl WeatherIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherIcon::Clear => "clear",
            WeatherIcon::Cloud => "cloud",
            WeatherIcon::Rain => "rain",
            WeatherIcon::Unknown => "unknown",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            WeatherIcon::Clear => "☀",
            WeatherIcon::Cloud => "☁",
            WeatherIcon::Rain => "☂",
            WeatherIcon::Unknown => "?",
        }
    }
}

pub fn weather_icon(pictocode: Option<u16>) -> WeatherIcon {
    match pictocode {
        None => WeatherIcon::Unknown,
        Some(1) => WeatherIcon::Clear,
        Some(2..=4) => WeatherIcon::Cloud,
        Some(5..=9) => WeatherIcon::Rain,
        Some(_) => WeatherIcon::Cloud,
    }
}

/// One line of a list section.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub title: String,
    pub subtitle: String,
    pub icon: Option<WeatherIcon>,
}

impl Row {
    fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            icon: None,
        }
    }

    fn with_icon(mut self, icon: WeatherIcon) -> Self {
        self.icon = Some(icon);
        self
    }
}

// Adding 0.0 turns a rounded -0 into 0.
fn rounded(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.round() + 0.0)
}

pub fn format_temperature(value: Option<f64>, unit: &str) -> String {
    match rounded(value) {
        Some(v) => format!("{v:.0}{unit}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_wind_speed(value: Option<f64>, unit: &str) -> String {
    match rounded(value) {
        Some(v) => format!("{v:.0} {unit}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_precipitation(value: Option<f64>, unit: &str) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.1} {unit}", v + 0.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match rounded(value) {
        Some(v) => format!("{v:.0}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_direction(value: Option<f64>) -> String {
    match rounded(value) {
        Some(v) => format!("{v:.0}°"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_pressure(value: Option<f64>, unit: &str) -> String {
    format_wind_speed(value, unit)
}

pub fn format_index(value: Option<f64>) -> String {
    match rounded(value) {
        Some(v) => format!("{v:.0}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// "Now 10:00" for the first hour, "Wed 11:00" after that.
pub fn hour_title(raw: &str, index: usize) -> String {
    match parse_time(raw) {
        Some(t) if index == 0 => format!("Now {}", t.format("%H:%M")),
        Some(t) => t.format("%a %H:%M").to_string(),
        None => raw.to_string(),
    }
}

fn long_time(raw: &str) -> String {
    parse_time(raw)
        .map(|t| t.format("%a %-d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// "Germany, Land Berlin", skipping empty parts.
pub fn candidate_subtitle(candidate: &LocationCandidate) -> String {
    [Some(candidate.country.as_str()), candidate.admin1.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn candidate_accessory(candidate: &LocationCandidate) -> String {
    format!("{:.2}, {:.2}", candidate.latitude, candidate.longitude)
}

pub fn location_label(location: Option<&LocationCandidate>) -> String {
    match location {
        Some(loc) if loc.country.trim().is_empty() => loc.name.clone(),
        Some(loc) => format!("{}, {}", loc.name, loc.country),
        None => "Current Location".to_string(),
    }
}

fn pick(provided: Option<&str>, fallback: &str) -> String {
    provided
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Unit labels for one package, with gaps filled from the user's preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub temperature: String,
    pub felt_temperature: String,
    pub windspeed: String,
    pub precipitation: String,
    pub pressure: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Presenter {
    units: UnitPreferences,
}

impl Presenter {
    pub fn new(units: UnitPreferences) -> Self {
        Self { units }
    }

    pub fn labels(&self, provided: Option<&PackageUnits>) -> Labels {
        let temperature = self.units.temperature.label();
        let field = |get: fn(&PackageUnits) -> Option<&str>| provided.and_then(get);

        Labels {
            temperature: pick(field(|u| u.temperature.as_deref()), temperature),
            felt_temperature: pick(
                field(|u| u.felttemperature.as_deref())
                    .or(field(|u| u.temperature.as_deref())),
                temperature,
            ),
            windspeed: pick(
                field(|u| u.windspeed.as_deref()),
                self.units.windspeed.label(),
            ),
            precipitation: pick(
                field(|u| u.precipitation.as_deref()),
                self.units.precipitation.label(),
            ),
            pressure: pick(field(|u| u.sealevelpressure.as_deref()), PRESSURE_FALLBACK),
        }
    }

    /// Headline row for the current conditions, if the forecast has any.
    pub fn current_summary(&self, forecast: &ForecastResult, label: &str) -> Option<Row> {
        let step = forecast.current_step()?;
        let labels = self.labels(forecast.current_units());
        Some(
            Row::new(label, format_temperature(step.temperature, &labels.temperature))
                .with_icon(weather_icon(step.pictocode)),
        )
    }

    /// Pressure and UV index rows only appear when the provider sent them.
    pub fn current_details(&self, forecast: &ForecastResult) -> Vec<Row> {
        let Some(step) = forecast.current_step() else {
            return Vec::new();
        };
        let labels = self.labels(forecast.current_units().or(forecast.basic_units()));

        let mut rows = vec![
            Row::new(
                "Temperature",
                format_temperature(step.temperature, &labels.temperature),
            ),
            Row::new(
                "Feels Like",
                format_temperature(step.felttemperature, &labels.felt_temperature),
            ),
            Row::new(
                "Wind Speed",
                format_wind_speed(step.windspeed, &labels.windspeed),
            ),
            Row::new("Relative Humidity", format_percent(step.relativehumidity)),
        ];

        if step.sealevelpressure.is_some_and(f64::is_finite) {
            rows.push(Row::new(
                "Pressure",
                format_pressure(step.sealevelpressure, &labels.pressure),
            ));
        }
        if step.uvindex.is_some_and(f64::is_finite) {
            rows.push(Row::new("UV Index", format_index(step.uvindex)));
        }

        rows
    }

    pub fn hourly_rows(&self, forecast: &ForecastResult) -> Vec<Row> {
        let labels = self.labels(forecast.basic_units());

        forecast
            .hourly()
            .iter()
            .take(HOURLY_LIMIT)
            .enumerate()
            .map(|(index, step)| {
                let subtitle = format!(
                    "{} • {} • {}",
                    format_temperature(step.temperature, &labels.temperature),
                    format_precipitation(step.precipitation, &labels.precipitation),
                    format_wind_speed(step.windspeed, &labels.windspeed),
                );
                Row::new(hour_title(&step.time, index), subtitle)
                    .with_icon(weather_icon(step.pictocode))
            })
            .collect()
    }

    pub fn detail_markdown(&self, step: &TimeStep, units: Option<&PackageUnits>) -> String {
        let labels = self.labels(units);
        let lines = [
            format!(
                "**Temperature:** {}",
                format_temperature(step.temperature, &labels.temperature)
            ),
            format!(
                "**Feels Like:** {}",
                format_temperature(step.felttemperature, &labels.felt_temperature)
            ),
            format!(
                "**Precipitation:** {}",
                format_precipitation(step.precipitation, &labels.precipitation)
            ),
            format!(
                "**Wind Speed:** {}",
                format_wind_speed(step.windspeed, &labels.windspeed)
            ),
            format!("**Wind Direction:** {}", format_direction(step.winddirection)),
            format!("**Humidity:** {}", format_percent(step.relativehumidity)),
            format!(
                "**Pressure:** {}",
                format_pressure(step.sealevelpressure, &labels.pressure)
            ),
            format!("**UV Index:** {}", format_index(step.uvindex)),
            format!("**Predictability:** {}", format_percent(step.predictability)),
        ];

        format!(
            "# Weather Details\n\n**Time:** {}\n\n{}\n",
            long_time(&step.time),
            lines.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{berlin, sample_forecast};
    use crate::units::{PrecipitationUnit, TemperatureUnit, WindspeedUnit};

    #[test]
    fn numbers_are_rounded_with_units() {
        assert_eq!(format_temperature(Some(14.6), "°C"), "15°C");
        assert_eq!(format_temperature(Some(-0.3), "°C"), "0°C");
        assert_eq!(format_wind_speed(Some(11.6), "km/h"), "12 km/h");
        assert_eq!(format_precipitation(Some(1.26), "mm"), "1.3 mm");
        assert_eq!(format_precipitation(Some(0.0), "mm"), "0.0 mm");
        assert_eq!(format_direction(Some(269.7)), "270°");
        assert_eq!(format_pressure(Some(1013.2), "hPa"), "1013 hPa");
        assert_eq!(format_percent(Some(0.0)), "0%");
        assert_eq!(format_index(Some(3.4)), "3");
    }

    #[test]
    fn missing_or_non_finite_values_render_not_available() {
        assert_eq!(format_temperature(None, "°C"), "N/A");
        assert_eq!(format_temperature(Some(f64::NAN), "°C"), "N/A");
        assert_eq!(format_wind_speed(Some(f64::INFINITY), "km/h"), "N/A");
        assert_eq!(format_precipitation(None, "mm"), "N/A");
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(format_direction(None), "N/A");
        assert_eq!(format_index(Some(f64::NEG_INFINITY)), "N/A");
    }

    #[test]
    fn pictogram_codes_map_to_icons() {
        assert_eq!(weather_icon(Some(1)), WeatherIcon::Clear);
        assert_eq!(weather_icon(Some(3)), WeatherIcon::Cloud);
        assert_eq!(weather_icon(Some(6)), WeatherIcon::Rain);
        assert_eq!(weather_icon(Some(9)), WeatherIcon::Rain);
        assert_eq!(weather_icon(Some(31)), WeatherIcon::Cloud);
        assert_eq!(weather_icon(None), WeatherIcon::Unknown);
        assert_eq!(weather_icon(None).as_str(), "unknown");
    }

    #[test]
    fn labels_fall_back_to_preferences() {
        let presenter = Presenter::new(UnitPreferences {
            temperature: TemperatureUnit::Fahrenheit,
            windspeed: WindspeedUnit::Kn,
            precipitation: PrecipitationUnit::Inch,
        });

        let labels = presenter.labels(None);
        assert_eq!(labels.temperature, "°F");
        assert_eq!(labels.felt_temperature, "°F");
        assert_eq!(labels.windspeed, "kn");
        assert_eq!(labels.precipitation, "in");
        assert_eq!(labels.pressure, "hPa");

        let provided = PackageUnits {
            temperature: Some("°C".into()),
            windspeed: Some("  ".into()),
            ..Default::default()
        };
        let labels = presenter.labels(Some(&provided));
        assert_eq!(labels.temperature, "°C");
        assert_eq!(labels.felt_temperature, "°C");
        assert_eq!(labels.windspeed, "kn");
    }

    #[test]
    fn hourly_rows_use_now_for_first_hour() {
        let rows = Presenter::default().hourly_rows(&sample_forecast());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Now 10:00");
        assert_eq!(rows[1].title, "Wed 11:00");
        assert_eq!(rows[0].subtitle, "14°C • 0.0 mm • 12 km/h");
        assert_eq!(rows[0].icon, Some(WeatherIcon::Clear));
        assert_eq!(rows[1].icon, Some(WeatherIcon::Cloud));
    }

    #[test]
    fn hourly_rows_are_capped() {
        let mut forecast = sample_forecast();
        let package = forecast.basic.as_mut().unwrap();
        let step = package.data_1h[0].clone();
        package.data_1h = vec![step; 48];

        assert_eq!(
            Presenter::default().hourly_rows(&forecast).len(),
            HOURLY_LIMIT
        );
    }

    #[test]
    fn unparseable_time_is_shown_verbatim() {
        assert_eq!(hour_title("tomorrow-ish", 3), "tomorrow-ish");
    }

    #[test]
    fn current_details_skip_missing_pressure_and_uv() {
        let presenter = Presenter::default();
        let mut forecast = sample_forecast();

        let titles: Vec<_> = presenter
            .current_details(&forecast)
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(
            titles,
            ["Temperature", "Feels Like", "Wind Speed", "Relative Humidity"]
        );

        let step = &mut forecast.current.as_mut().unwrap().data_1h[0];
        step.sealevelpressure = Some(1012.6);
        step.uvindex = Some(0.0);

        let rows = presenter.current_details(&forecast);
        assert_eq!(rows[4], Row::new("Pressure", "1013 hPa"));
        assert_eq!(rows[5], Row::new("UV Index", "0"));
    }

    #[test]
    fn current_summary_uses_label_and_icon() {
        let row = Presenter::default()
            .current_summary(&sample_forecast(), "Berlin, Germany")
            .unwrap();
        assert_eq!(row.title, "Berlin, Germany");
        assert_eq!(row.subtitle, "15°C");
        assert_eq!(row.icon, Some(WeatherIcon::Clear));

        assert!(
            Presenter::default()
                .current_summary(&ForecastResult::default(), "x")
                .is_none()
        );
    }

    #[test]
    fn detail_markdown_lists_every_field() {
        let step = TimeStep {
            time: "2024-05-01 10:00".into(),
            temperature: Some(14.2),
            winddirection: Some(270.0),
            ..Default::default()
        };

        let md = Presenter::default().detail_markdown(&step, None);
        assert!(md.starts_with("# Weather Details\n\n**Time:** Wed 1 May 2024, 10:00\n\n"));
        assert!(md.contains("**Temperature:** 14°C"));
        assert!(md.contains("**Wind Direction:** 270°"));
        assert!(md.contains("**Precipitation:** N/A"));
        assert!(md.contains("**Pressure:** N/A"));
        assert!(md.contains("**Predictability:** N/A"));
    }

    #[test]
    fn candidate_text() {
        let mut loc = berlin();
        assert_eq!(candidate_subtitle(&loc), "Germany, Land Berlin");
        assert_eq!(candidate_accessory(&loc), "52.52, 13.41");
        assert_eq!(location_label(Some(&loc)), "Berlin, Germany");
        assert_eq!(location_label(None), "Current Location");

        loc.admin1 = None;
        assert_eq!(candidate_subtitle(&loc), "Germany");
    }
}
