//! Terminal output for controller views.

use chrono::Local;
use meteoblue_core::{
    ForecastResult, LocationCandidate, Presenter, Toast, ToastStyle,
    presenter::{self, Row},
};

pub fn api_key_missing(message: &str) {
    eprintln!("{message}");
    eprintln!("Run `meteoblue configure` or set METEOBLUE_API_KEY.");
}

pub fn notice(message: &str) {
    println!("{message}");
}

pub fn toast(toast: &Toast) {
    let line = toast_line(toast);
    match toast.style {
        ToastStyle::Failure => eprintln!("{line}"),
        ToastStyle::Animated | ToastStyle::Success => println!("{line}"),
    }
}

fn toast_line(toast: &Toast) -> String {
    let marker = match toast.style {
        ToastStyle::Animated => "…",
        ToastStyle::Success => "✓",
        ToastStyle::Failure => "✗",
    };

    match &toast.message {
        Some(message) => format!("{marker} {}: {message}", toast.title),
        None => format!("{marker} {}", toast.title),
    }
}

fn section(title: &str, subtitle: Option<&str>) {
    match subtitle {
        Some(subtitle) => println!("\n== {title} ({subtitle}) =="),
        None => println!("\n== {title} =="),
    }
}

fn row_line(row: &Row) -> String {
    let icon = row.icon.map(|i| i.symbol()).unwrap_or(" ");
    format!("  {icon} {:<18} {}", row.title, row.subtitle)
}

pub fn search(query: &str, results: &[LocationCandidate], error: Option<&str>) {
    section("Search Locations", (!query.is_empty()).then_some(query));

    if let Some(error) = error {
        eprintln!("  {error}");
    }
    if results.is_empty() {
        println!("  No locations found.");
        return;
    }

    for candidate in results {
        println!(
            "  {:<24} {:<32} {}",
            candidate.name,
            presenter::candidate_subtitle(candidate),
            presenter::candidate_accessory(candidate)
        );
    }
}

pub fn empty(error: Option<&str>) {
    match error {
        Some(error) => eprintln!("\n{error}"),
        None => println!("\nSearch for a city to see its forecast."),
    }
}

pub fn forecast(
    presenter: &Presenter,
    location: Option<&LocationCandidate>,
    forecast: &ForecastResult,
    error: Option<&str>,
) {
    let label = presenter::location_label(location);
    let fetched = Local::now().format("%H:%M").to_string();

    section("Current Conditions", Some(&fetched));
    match presenter.current_summary(forecast, &label) {
        Some(row) => println!("{}", row_line(&row)),
        None => println!("  {label}: no current data"),
    }
    if let Some(updated) = forecast
        .metadata
        .as_ref()
        .and_then(|m| m.modelrun_updated_utc.as_deref())
    {
        println!("    model run updated {updated} UTC");
    }

    let details = presenter.current_details(forecast);
    if !details.is_empty() {
        section("Current Details", None);
        for row in &details {
            println!("{}", row_line(row));
        }
    }

    let hours = format!("{} hours", forecast.hourly().len());
    section("Hourly Forecast", Some(&hours));
    for row in presenter.hourly_rows(forecast) {
        println!("{}", row_line(&row));
    }

    if let Some(error) = error {
        eprintln!("\n{error}");
    }
    println!();
}

pub fn markdown(text: &str) {
    println!();
    for line in text.lines() {
        let line = line.trim_start_matches("# ").replace("**", "");
        println!("  {line}");
    }
    println!();
}
