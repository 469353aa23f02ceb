use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Temperature unit requested from meteoblue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Value of the `temperature` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        }
    }

    /// Label used when the provider response does not declare a unit.
    pub fn label(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub const fn all() -> &'static [TemperatureUnit] {
        &[TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit]
    }
}

/// Wind speed unit requested from meteoblue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindspeedUnit {
    Mph,
    #[default]
    Kmh,
    Ms,
    Kn,
}

impl WindspeedUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindspeedUnit::Mph => "mph",
            WindspeedUnit::Kmh => "kmh",
            WindspeedUnit::Ms => "ms",
            WindspeedUnit::Kn => "kn",
        }
    }

    /// meteoblue spells metres per second `ms-1`.
    pub fn query_value(&self) -> &'static str {
        match self {
            WindspeedUnit::Ms => "ms-1",
            other => other.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WindspeedUnit::Mph => "mph",
            WindspeedUnit::Kmh => "km/h",
            WindspeedUnit::Ms => "m/s",
            WindspeedUnit::Kn => "kn",
        }
    }

    pub const fn all() -> &'static [WindspeedUnit] {
        &[
            WindspeedUnit::Kmh,
            WindspeedUnit::Mph,
            WindspeedUnit::Ms,
            WindspeedUnit::Kn,
        ]
    }
}

/// Precipitation amount unit requested from meteoblue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationUnit {
    Inch,
    #[default]
    Mm,
}

impl PrecipitationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecipitationUnit::Inch => "inch",
            PrecipitationUnit::Mm => "mm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrecipitationUnit::Inch => "in",
            PrecipitationUnit::Mm => "mm",
        }
    }

    pub const fn all() -> &'static [PrecipitationUnit] {
        &[PrecipitationUnit::Mm, PrecipitationUnit::Inch]
    }
}

/// The three unit preferences a user can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitPreferences {
    #[serde(default, rename = "temperature_unit")]
    pub temperature: TemperatureUnit,
    #[serde(default, rename = "windspeed_unit")]
    pub windspeed: WindspeedUnit,
    #[serde(default, rename = "precipitation_unit")]
    pub precipitation: PrecipitationUnit,
}

impl UnitPreferences {
    /// Query parameters appended to forecast requests.
    pub fn query_pairs(&self) -> [(&'static str, &'static str); 3] {
        [
            ("temperature", self.temperature.as_str()),
            ("windspeed", self.windspeed.query_value()),
            ("precipitationamount", self.precipitation.as_str()),
        ]
    }
}

macro_rules! impl_unit_parsing {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = anyhow::Error;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                let wanted = value.trim();
                <$ty>::all()
                    .iter()
                    .copied()
                    .find(|unit| unit.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let supported: Vec<&str> =
                            <$ty>::all().iter().map(|unit| unit.as_str()).collect();
                        anyhow::anyhow!(
                            "Unknown {} unit '{value}'. Supported units: {}.",
                            $what,
                            supported.join(", ")
                        )
                    })
            }
        }
    };
}

impl_unit_parsing!(TemperatureUnit, "temperature");
impl_unit_parsing!(WindspeedUnit, "wind speed");
impl_unit_parsing!(PrecipitationUnit, "precipitation");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_as_str_roundtrip() {
        for unit in WindspeedUnit::all() {
            let parsed = WindspeedUnit::try_from(unit.as_str()).expect("roundtrip should succeed");
            assert_eq!(*unit, parsed);
        }
        assert_eq!(TemperatureUnit::try_from("f").unwrap(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn unknown_unit_error() {
        let err = PrecipitationUnit::try_from("furlong").unwrap_err();
        assert!(err.to_string().contains("Unknown precipitation unit"));
    }

    #[test]
    fn defaults_match_metric_labels() {
        let prefs = UnitPreferences::default();
        assert_eq!(prefs.temperature.label(), "°C");
        assert_eq!(prefs.windspeed.label(), "km/h");
        assert_eq!(prefs.precipitation.label(), "mm");
    }

    #[test]
    fn query_pairs_use_provider_spelling() {
        let prefs = UnitPreferences {
            temperature: TemperatureUnit::Fahrenheit,
            windspeed: WindspeedUnit::Ms,
            precipitation: PrecipitationUnit::Inch,
        };
        assert_eq!(
            prefs.query_pairs(),
            [
                ("temperature", "F"),
                ("windspeed", "ms-1"),
                ("precipitationamount", "inch"),
            ]
        );
    }
}
