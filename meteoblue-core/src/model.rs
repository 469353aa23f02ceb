use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::collections::BTreeMap;

/// A single place returned by the location search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub admin2: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl LocationCandidate {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude).with_elevation(self.elevation)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Option<Vec<LocationCandidate>>,
}

/// Point a forecast is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
        }
    }

    /// Non-finite elevations are dropped.
    pub fn with_elevation(mut self, elevation: Option<f64>) -> Self {
        self.elevation = elevation.filter(|e| e.is_finite());
        self
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// One hourly entry of a forecast package. Every measurement is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeStep {
    pub time: String,
    pub precipitation: Option<f64>,
    pub snowfraction: Option<f64>,
    pub rainspot: Option<String>,
    pub temperature: Option<f64>,
    pub felttemperature: Option<f64>,
    #[serde(deserialize_with = "pictogram_code")]
    pub pictocode: Option<u16>,
    pub windspeed: Option<f64>,
    pub winddirection: Option<f64>,
    pub relativehumidity: Option<f64>,
    pub sealevelpressure: Option<f64>,
    pub totalcloudcover: Option<f64>,
    pub uvindex: Option<f64>,
    pub predictability: Option<f64>,
    pub isdaylight: Option<f64>,
}

/// Unit labels declared by the provider for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageUnits {
    pub time: Option<String>,
    pub precipitation: Option<String>,
    pub snowfraction: Option<String>,
    pub temperature: Option<String>,
    pub felttemperature: Option<String>,
    pub windspeed: Option<String>,
    pub winddirection: Option<String>,
    pub relativehumidity: Option<String>,
    pub sealevelpressure: Option<String>,
    pub totalcloudcover: Option<String>,
    pub pictocode: Option<String>,
    pub uvindex: Option<String>,
    pub predictability: Option<String>,
    pub isdaylight: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastPackage {
    #[serde(default)]
    pub units: PackageUnits,
    #[serde(default, deserialize_with = "series")]
    pub data_1h: Vec<TimeStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub modelrun_init_utc: Option<String>,
    pub modelrun_updated_utc: Option<String>,
    pub location: Option<MetadataLocation>,
}

/// Response of the `basic-1h_current` package request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastResult {
    pub metadata: Option<Metadata>,
    pub basic: Option<ForecastPackage>,
    pub current: Option<ForecastPackage>,
}

impl ForecastResult {
    /// The current-conditions snapshot, if the provider sent one.
    pub fn current_step(&self) -> Option<&TimeStep> {
        self.current.as_ref().and_then(|p| p.data_1h.first())
    }

    pub fn hourly(&self) -> &[TimeStep] {
        self.basic.as_ref().map(|p| p.data_1h.as_slice()).unwrap_or(&[])
    }

    pub fn basic_units(&self) -> Option<&PackageUnits> {
        self.basic.as_ref().map(|p| &p.units)
    }

    pub fn current_units(&self) -> Option<&PackageUnits> {
        self.current.as_ref().map(|p| &p.units)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Accepts `3`, `3.0` or `null`; anything that is not a small non-negative
/// integer is treated as absent.
fn pictogram_code<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite() && v.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(v))
        .map(|v| v as u16))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesRepr {
    Rows(Vec<TimeStep>),
    Columns(BTreeMap<String, Vec<serde_json::Value>>),
}

/// meteoblue ships `data_1h` column-oriented; row arrays are accepted too.
fn series<'de, D>(deserializer: D) -> Result<Vec<TimeStep>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<SeriesRepr>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(SeriesRepr::Rows(rows)) => Ok(rows),
        Some(SeriesRepr::Columns(columns)) => columns_to_rows(columns).map_err(D::Error::custom),
    }
}

fn columns_to_rows(
    columns: BTreeMap<String, Vec<serde_json::Value>>,
) -> Result<Vec<TimeStep>, serde_json::Error> {
    let len = columns.get("time").map(Vec::len).unwrap_or(0);

    (0..len)
        .map(|i| {
            let row: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .filter_map(|(key, values)| values.get(i).map(|v| (key.clone(), v.clone())))
                .collect();
            serde_json::from_value(serde_json::Value::Object(row))
        })
        .collect()
}
