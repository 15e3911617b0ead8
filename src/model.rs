/// Core data types for the water quality index service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O: only types, their accessors, and the error enums the
/// collaborators (store, generator, renderer) report through.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// The nine physicochemical parameters that make up the index.
///
/// Declaration order is significant: it is the order used when reporting
/// missing parameters and the order of `parameters::PARAMETER_REGISTRY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Parameter {
    #[serde(rename = "OD")]
    Od,
    #[serde(rename = "COLIFORMES")]
    Coliformes,
    #[serde(rename = "DBO")]
    Dbo,
    #[serde(rename = "NITROGENIO_TOTAL")]
    NitrogenioTotal,
    #[serde(rename = "FOSFORO_TOTAL")]
    FosforoTotal,
    #[serde(rename = "TURBIDEZ")]
    Turbidez,
    #[serde(rename = "TDS")]
    Tds,
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "TEMPERATURA")]
    Temperatura,
}

impl Parameter {
    pub const COUNT: usize = 9;

    /// Every parameter, in declaration order.
    pub const ALL: [Parameter; Parameter::COUNT] = [
        Parameter::Od,
        Parameter::Coliformes,
        Parameter::Dbo,
        Parameter::NitrogenioTotal,
        Parameter::FosforoTotal,
        Parameter::Turbidez,
        Parameter::Tds,
        Parameter::Ph,
        Parameter::Temperatura,
    ];

    /// Position in declaration order, used to index fixed-size tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical name, as it appears in missing-parameter messages.
    pub const fn name(self) -> &'static str {
        match self {
            Parameter::Od => "OD",
            Parameter::Coliformes => "COLIFORMES",
            Parameter::Dbo => "DBO",
            Parameter::NitrogenioTotal => "NITROGENIO_TOTAL",
            Parameter::FosforoTotal => "FOSFORO_TOTAL",
            Parameter::Turbidez => "TURBIDEZ",
            Parameter::Tds => "TDS",
            Parameter::Ph => "pH",
            Parameter::Temperatura => "TEMPERATURA",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Raw measurements
// ---------------------------------------------------------------------------

/// An untyped value as it comes out of the record store or a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String), // may carry "7,5", "1.200", "pH: 7.2 units", ...
    Null,
}

/// Raw per-parameter values for a single sample.
///
/// A parameter with no entry is treated exactly like `RawValue::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMeasurement {
    values: BTreeMap<Parameter, RawValue>,
}

impl RawMeasurement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, parameter: Parameter, value: RawValue) -> Self {
        self.values.insert(parameter, value);
        self
    }

    pub fn insert(&mut self, parameter: Parameter, value: RawValue) {
        self.values.insert(parameter, value);
    }

    pub fn get(&self, parameter: Parameter) -> Option<&RawValue> {
        self.values.get(&parameter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &RawValue)> {
        self.values.iter().map(|(p, v)| (*p, v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Normalized measurements
// ---------------------------------------------------------------------------

/// The outcome of normalizing one raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Present(f64),
    Missing,
}

impl Reading {
    pub fn value(self) -> Option<f64> {
        match self {
            Reading::Present(v) => Some(v),
            Reading::Missing => None,
        }
    }
}

/// One `Reading` for every parameter. There is no way to build a partial
/// map: unset entries are `Reading::Missing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMeasurement {
    readings: [Reading; Parameter::COUNT],
}

impl Default for NormalizedMeasurement {
    fn default() -> Self {
        Self {
            readings: [Reading::Missing; Parameter::COUNT],
        }
    }
}

impl NormalizedMeasurement {
    /// All nine parameters present, values given in declaration order.
    pub fn from_values(values: [f64; Parameter::COUNT]) -> Self {
        Self {
            readings: values.map(Reading::Present),
        }
    }

    pub fn get(&self, parameter: Parameter) -> Reading {
        self.readings[parameter.index()]
    }

    pub fn set(&mut self, parameter: Parameter, reading: Reading) {
        self.readings[parameter.index()] = reading;
    }

    /// Builder-style `set`.
    pub fn with(mut self, parameter: Parameter, reading: Reading) -> Self {
        self.set(parameter, reading);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, Reading)> + '_ {
        Parameter::ALL.iter().map(|p| (*p, self.get(*p)))
    }

    /// Missing parameters, in declaration order.
    pub fn missing(&self) -> Vec<Parameter> {
        self.iter()
            .filter(|(_, r)| *r == Reading::Missing)
            .map(|(p, _)| p)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Index result
// ---------------------------------------------------------------------------

/// Result of scoring a normalized measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum WqiResult {
    /// Aggregate index in [0, 100].
    Score(f64),
    /// At least one parameter was missing; lists all of them in
    /// declaration order. No partial score is produced.
    Failure(Vec<Parameter>),
}

impl WqiResult {
    pub fn score(&self) -> Option<f64> {
        match self {
            WqiResult::Score(v) => Some(*v),
            WqiResult::Failure(_) => None,
        }
    }

    /// Human-readable description of a failure, e.g.
    /// `"Missing parameters: OD, DBO"`. `None` for a score.
    pub fn missing_message(&self) -> Option<String> {
        match self {
            WqiResult::Score(_) => None,
            WqiResult::Failure(missing) => {
                let names: Vec<&str> = missing.iter().map(|p| p.name()).collect();
                Some(format!("Missing parameters: {}", names.join(", ")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Record store keys and filters
// ---------------------------------------------------------------------------

/// Identifies exactly one monitoring sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleKey {
    pub city: String,
    pub river: String,
    pub point: String,
    pub date: String, // ISO 8601 calendar date, e.g. "2024-03-18"
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}@{}", self.city, self.river, self.point, self.date)
    }
}

/// Filters for the monitoring time series. Every field is optional; an
/// empty filter returns every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringFilter {
    pub city: Option<String>,
    pub river: Option<String>,
    /// Keep only rows where this parameter was recorded.
    pub parameter: Option<Parameter>,
    #[serde(default)]
    pub points: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Filters for the per-sample index listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IqaFilter {
    pub city: Option<String>,
    pub river: Option<String>,
    #[serde(default)]
    pub points: Vec<String>,
}

/// A sample row as returned for index listings.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub city: String,
    pub river: String,
    pub point: String,
    pub date: String,
    pub raw: RawMeasurement,
}

// ---------------------------------------------------------------------------
// News and analysis requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Free-form request for a generated analysis of user-supplied values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub collection_site: Option<String>,
    pub water_body_type: Option<String>,
    pub weather_conditions: Option<String>,
    pub human_activities: Option<String>,
    pub usage: Option<String>,
    pub coordinates: Option<String>,
    pub collection_date: Option<String>,
    pub collection_time: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matches the (city, river, point, date) key.
    #[error("Sample not found: {0}")]
    NotFound(SampleKey),
    #[error("News item not found.")]
    NewsNotFound(i64),
    /// A date filter or key could not be parsed as `YYYY-MM-DD`.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Database query error: {0}")]
    Query(#[from] postgres::Error),
    /// A row came back in a shape we could not decode.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors raised by the text-generation client.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Non-2xx HTTP response from the completions API.
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("No completion text returned")]
    EmptyResponse,
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
}

/// Errors raised while rendering a PDF report.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
