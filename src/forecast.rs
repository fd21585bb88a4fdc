//! Per-office forecast documents (`forecast/{code}.json`).
//!
//! The endpoint returns an array of documents: the short-range forecast first,
//! then the weekly one. Each document holds several time series, and each
//! series lists per-area values. Only the headline weather sentence of the
//! first area of the first series of the first document is surfaced here.

use chrono::{DateTime, FixedOffset};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::JmaClient;
use crate::error::{FetchError, Result};

/// First document of a forecast response.
///
/// Only the headline path is decoded strictly; series and areas stay raw
/// until an accessor reaches them, and metadata that fails to decode is
/// dropped rather than failing the whole document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDocument {
    #[serde(default, deserialize_with = "lenient")]
    pub publishing_office: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub report_datetime: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    time_series: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    areas: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaForecast {
    #[serde(default, deserialize_with = "lenient")]
    pub area: Option<AreaRef>,
    /// Absent on precipitation and temperature series.
    #[serde(default)]
    weathers: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaRef {
    pub name: String,
    pub code: String,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl ForecastDocument {
    pub fn first_series(&self) -> Result<TimeSeries> {
        let series = self
            .time_series
            .first()
            .ok_or(FetchError::MissingField("timeSeries"))?;
        Ok(TimeSeries::deserialize(series)?)
    }
}

impl TimeSeries {
    pub fn first_area(&self) -> Result<AreaForecast> {
        let area = self.areas.first().ok_or(FetchError::MissingField("areas"))?;
        Ok(AreaForecast::deserialize(area)?)
    }
}

impl AreaForecast {
    pub fn headline(&self) -> Result<&str> {
        self.weathers
            .first()
            .and_then(Value::as_str)
            .ok_or(FetchError::MissingField("weathers"))
    }
}

/// Headline forecast for one office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastReport {
    pub publishing_office: Option<String>,
    pub report_datetime: Option<DateTime<FixedOffset>>,
    /// Sub-area the headline belongs to, e.g. 東京地方.
    pub area_name: Option<String>,
    pub weather: String,
}

/// Parses a forecast response, decoding only its first document. Later
/// documents (the weekly outlook) are never inspected.
pub fn parse_forecast(body: &str) -> Result<ForecastDocument> {
    let documents: Vec<Value> = serde_json::from_str(body)?;
    let first = documents
        .into_iter()
        .next()
        .ok_or(FetchError::MissingField("document"))?;
    Ok(serde_json::from_value(first)?)
}

fn headline_area(document: &ForecastDocument) -> Result<AreaForecast> {
    document.first_series()?.first_area()
}

/// `timeSeries[0].areas[0].weathers[0]` of the first document, failing on
/// the first missing level.
pub fn extract_weather(document: &ForecastDocument) -> Result<String> {
    Ok(headline_area(document)?.headline()?.to_string())
}

pub fn extract_report(document: &ForecastDocument) -> Result<ForecastReport> {
    let area = headline_area(document)?;
    Ok(ForecastReport {
        publishing_office: document.publishing_office.clone(),
        report_datetime: document.report_datetime,
        weather: area.headline()?.to_string(),
        area_name: area.area.map(|a| a.name),
    })
}

/// Office codes are digit strings upstream; anything outside ASCII
/// alphanumerics would alter the request path.
pub fn validate_region_code(code: &str) -> Result<()> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FetchError::InvalidRegionCode(code.to_string()));
    }
    Ok(())
}

impl JmaClient {
    async fn fetch_forecast_document(&self, region_code: &str) -> Result<ForecastDocument> {
        validate_region_code(region_code)?;
        let url = self.endpoints().forecast_url(region_code);
        let body = self.get_text(&url).await?;
        parse_forecast(&body)
    }

    pub async fn fetch_forecast_report(&self, region_code: &str) -> Result<ForecastReport> {
        let report = extract_report(&self.fetch_forecast_document(region_code).await?)?;
        debug!(region_code, weather = %report.weather, "forecast report fetched");
        Ok(report)
    }

    /// Fetches the headline weather sentence for `region_code`. One request,
    /// no retry, no caching.
    pub async fn fetch_forecast(&self, region_code: &str) -> Result<String> {
        let weather = extract_weather(&self.fetch_forecast_document(region_code).await?)?;
        debug!(region_code, %weather, "forecast fetched");
        Ok(weather)
    }
}
