/*
 *  weather.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Current conditions: fetch, parse and the reading handed to the renderer
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

use flate2::read::GzDecoder;
use log::{debug, error, info, warn};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::classify::{classify, WeatherCategory};
use crate::config::WeatherSettings;
use crate::location::Location;

pub const NO_DATA: &str = "No data";
pub const PARSE_ERROR: &str = "Parse error";
pub const API_ERROR: &str = "API error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Metric,
    #[default]
    Imperial,
}

impl Units {
    /// Value of the OpenWeatherMap `units` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    /// Value of the Open-Meteo `temperature_unit` query parameter.
    fn open_meteo_unit(self) -> &'static str {
        match self {
            Units::Metric => "celsius",
            Units::Imperial => "fahrenheit",
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "f" | "fahrenheit" | "imperial" => Ok(Units::Imperial),
            "c" | "celsius" | "metric" => Ok(Units::Metric),
            other => Err(format!("unknown units '{other}', expected metric or imperial")),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Why a reading carries no temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingFault {
    /// Transport failure, nothing came back
    NoData,
    /// Payload was not what we expected
    ParseError,
    /// Provider answered with a non-200 code
    ApiError,
}

/// The weather as the renderer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub category: WeatherCategory,
    pub description: String,
    /// Formatted for display, e.g. "71.3°F"; empty when there is no data
    pub temperature_label: String,
    pub temperature: Option<f64>,
    pub units: Units,
    pub fault: Option<ReadingFault>,
}

impl WeatherReading {
    pub fn new(description: &str, temperature: f64, units: Units) -> Self {
        Self {
            category: classify(description),
            description: description.to_string(),
            temperature_label: format_temperature(temperature, units),
            temperature: Some(temperature),
            units,
            fault: None,
        }
    }

    fn faulted(fault: ReadingFault, description: &str, units: Units) -> Self {
        Self {
            category: classify(description),
            description: description.to_string(),
            temperature_label: String::new(),
            temperature: None,
            units,
            fault: Some(fault),
        }
    }

    pub fn no_data(units: Units) -> Self {
        Self::faulted(ReadingFault::NoData, NO_DATA, units)
    }

    pub fn parse_error(units: Units) -> Self {
        Self::faulted(ReadingFault::ParseError, PARSE_ERROR, units)
    }

    pub fn api_error(message: &str, units: Units) -> Self {
        Self::faulted(ReadingFault::ApiError, message, units)
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// An empty label means there is nothing worth keeping on screen.
    pub fn has_usable_temperature(&self) -> bool {
        !self.temperature_label.is_empty()
    }

    pub fn should_draw_temperature(&self) -> bool {
        self.fault.is_none() && self.has_usable_temperature()
    }

    /// Temperature in °F whatever the display units, for the colour gradient.
    pub fn fahrenheit(&self) -> Option<f64> {
        let t = self.temperature.filter(|t| t.is_finite())?;
        Some(match self.units {
            Units::Imperial => t,
            Units::Metric => t * 9.0 / 5.0 + 32.0,
        })
    }

    /// Replace the temperature, keeping description and category.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature_label = format_temperature(temperature, self.units);
        self.temperature = Some(temperature);
        self
    }
}

pub fn format_temperature(value: f64, units: Units) -> String {
    format!("{:.1}{}", value, units.suffix())
}

#[derive(Debug, Error)]
pub enum WeatherApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing weather data: {0}")]
    MissingData(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Turn an OpenWeatherMap current-conditions payload into a reading.
///
/// Never fails: an empty payload, a non-200 `cod` and anything malformed
/// each map to a faulted reading with an empty temperature label.
pub fn parse_primary(payload: &str, units: Units) -> WeatherReading {
    if payload.trim().is_empty() {
        return WeatherReading::no_data(units);
    }
    let json: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            debug!("weather payload is not JSON: {e}");
            return WeatherReading::parse_error(units);
        }
    };

    // cod arrives as 200 on success but as "404" on errors
    let cod = match &json["cod"] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(cod) = cod else {
        return WeatherReading::parse_error(units);
    };
    if cod != 200 {
        let message = json["message"].as_str().unwrap_or(API_ERROR);
        return WeatherReading::api_error(message, units);
    }

    let Some(current) = json["weather"].get(0) else {
        return WeatherReading::parse_error(units);
    };
    let description = current["description"].as_str().unwrap_or("Unknown");
    // no zero default: a reading without a temperature is a parse error,
    // description included
    match json["main"]["temp"].as_f64() {
        Some(temp) => WeatherReading::new(description, temp, units),
        None => WeatherReading::parse_error(units),
    }
}

/// Temperature from an Open-Meteo payload, either API generation.
pub fn parse_secondary(payload: &str) -> Result<f64, WeatherApiError> {
    let json: Value = serde_json::from_str(payload)?;
    json["current"]["temperature_2m"]
        .as_f64()
        .or_else(|| json["current_weather"]["temperature"].as_f64())
        .ok_or_else(|| WeatherApiError::MissingData("current temperature".into()))
}

/// Fold the secondary temperature into a primary reading.
///
/// The secondary value wins whenever it exists; the description and
/// category always come from the primary. A faulted primary is left alone.
pub fn augment(primary: WeatherReading, secondary: Result<f64, WeatherApiError>) -> WeatherReading {
    if primary.is_fault() {
        return primary;
    }
    match secondary {
        Ok(temp) => primary.with_temperature(temp),
        Err(e) => {
            warn!("secondary temperature unavailable, keeping {}: {e}", primary.temperature_label);
            primary
        }
    }
}

/// Anything that can produce the current weather.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn current(&mut self) -> WeatherReading;
}

pub struct WeatherClient {
    client: Client,
    primary_url: String,
    secondary_url: Option<String>,
    api_key: String,
    latitude: f64,
    longitude: f64,
    units: Units,
}

impl WeatherClient {
    pub fn new(settings: &WeatherSettings, location: &Location) -> Result<Self, WeatherApiError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        if settings.api_key.trim().is_empty() {
            return Err(WeatherApiError::InvalidInput("no API key specified".into()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Accept-Encoding", header::HeaderValue::from_static("deflate, gzip"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(settings.timeout.min(Duration::from_millis(1500)))
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            primary_url: settings.primary_url.clone(),
            secondary_url: settings.secondary_url.clone(),
            api_key: settings.api_key.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            units: settings.units,
        })
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, reqwest::Error> {
        let raw = self.client
            .get(url)
            .query(query)
            .send()
            .await?
            .bytes()
            .await?;

        // Try gzip first, fall back to plain text
        let mut decoder = GzDecoder::new(&raw[..]);
        let mut decoded = String::new();
        Ok(match decoder.read_to_string(&mut decoded) {
            Ok(_) => decoded,
            Err(_) => String::from_utf8_lossy(&raw).into_owned(),
        })
    }

    /// Raw primary payload; transport failures come back empty.
    pub async fn fetch_primary(&self) -> String {
        let query = [
            ("lat", self.latitude.to_string()),
            ("lon", self.longitude.to_string()),
            ("appid", self.api_key.clone()),
            ("units", self.units.as_query().to_string()),
        ];
        match self.get_text(&self.primary_url, &query).await {
            Ok(text) => text,
            Err(e) => {
                error!("weather fetch failed: {e}");
                String::new()
            }
        }
    }

    pub async fn fetch_secondary(&self) -> Result<f64, WeatherApiError> {
        let url = self.secondary_url.as_deref()
            .ok_or_else(|| WeatherApiError::InvalidInput("no secondary source".into()))?;
        let query = [
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("current", "temperature_2m".to_string()),
            ("temperature_unit", self.units.open_meteo_unit().to_string()),
        ];
        let text = self.get_text(url, &query).await?;
        parse_secondary(&text)
    }
}

impl WeatherSource for WeatherClient {
    async fn current(&mut self) -> WeatherReading {
        let payload = self.fetch_primary().await;
        let reading = parse_primary(&payload, self.units);
        if reading.is_fault() || self.secondary_url.is_none() {
            info!("weather: {} {}", reading.description, reading.temperature_label);
            return reading;
        }
        let reading = augment(reading, self.fetch_secondary().await);
        info!("weather: {} {}", reading.description, reading.temperature_label);
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWM_OK: &str = r#"{
        "coord": {"lon": -122.42, "lat": 37.77},
        "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}],
        "main": {"temp": 71.34, "feels_like": 70.9, "humidity": 60},
        "cod": 200
    }"#;

    #[test]
    fn test_parse_primary_ok() {
        let r = parse_primary(OWM_OK, Units::Imperial);
        assert_eq!(r.fault, None);
        assert_eq!(r.description, "scattered clouds");
        assert_eq!(r.category, WeatherCategory::PartlyCloudy);
        assert_eq!(r.temperature_label, "71.3°F");
        assert!(r.should_draw_temperature());
    }

    #[test]
    fn test_parse_primary_metric_suffix() {
        let r = parse_primary(OWM_OK, Units::Metric);
        assert_eq!(r.temperature_label, "71.3°C");
    }

    #[test]
    fn test_empty_payload_is_no_data() {
        for payload in ["", "   \n"] {
            let r = parse_primary(payload, Units::Imperial);
            assert_eq!(r.fault, Some(ReadingFault::NoData));
            assert_eq!(r.description, NO_DATA);
            assert!(r.temperature_label.is_empty());
        }
    }

    #[test]
    fn test_malformed_payload_is_parse_error() {
        for payload in ["{}", "not json", "[1,2]", r#"{"cod":200}"#, r#"{"cod":200,"weather":[]}"#,
                        r#"{"cod":200,"weather":[{"description":"rain"}],"main":{}}"#] {
            let r = parse_primary(payload, Units::Imperial);
            assert_eq!(r.fault, Some(ReadingFault::ParseError), "{payload}");
            assert_eq!(r.description, PARSE_ERROR);
            assert!(!r.has_usable_temperature());
        }
    }

    #[test]
    fn test_api_error_uses_message() {
        let r = parse_primary(r#"{"cod":"401","message":"Invalid API key"}"#, Units::Imperial);
        assert_eq!(r.fault, Some(ReadingFault::ApiError));
        assert_eq!(r.description, "Invalid API key");
        assert!(r.temperature_label.is_empty());

        let r = parse_primary(r#"{"cod":429}"#, Units::Imperial);
        assert_eq!(r.description, API_ERROR);
    }

    #[test]
    fn test_string_cod_200_accepted() {
        let payload = r#"{"cod":"200","weather":[{"description":"clear sky"}],"main":{"temp":50}}"#;
        let r = parse_primary(payload, Units::Imperial);
        assert_eq!(r.category, WeatherCategory::Clear);
        assert_eq!(r.temperature_label, "50.0°F");
    }

    #[test]
    fn test_missing_temperature_discards_description() {
        for main in [r#"{}"#, r#"{"temp":null}"#, r#"{"temp":"71"}"#] {
            let payload = format!(r#"{{"cod":200,"weather":[{{"description":"light snow"}}],"main":{main}}}"#);
            let r = parse_primary(&payload, Units::Imperial);
            assert_eq!(r.fault, Some(ReadingFault::ParseError), "{payload}");
            assert_eq!(r.description, PARSE_ERROR);
            assert_eq!(r.category, WeatherCategory::Unknown);
            assert_eq!(r.temperature, None);
        }
    }

    #[test]
    fn test_missing_description_is_unknown() {
        let payload = r#"{"cod":200,"weather":[{}],"main":{"temp":12.0}}"#;
        let r = parse_primary(payload, Units::Metric);
        assert_eq!(r.description, "Unknown");
        assert_eq!(r.category, WeatherCategory::Unknown);
        assert_eq!(r.temperature_label, "12.0°C");
    }

    #[test]
    fn test_parse_secondary_both_shapes() {
        assert_eq!(parse_secondary(r#"{"current":{"temperature_2m":68.2}}"#).unwrap(), 68.2);
        assert_eq!(parse_secondary(r#"{"current_weather":{"temperature":-3.5}}"#).unwrap(), -3.5);
        assert!(matches!(parse_secondary("{}"), Err(WeatherApiError::MissingData(_))));
        assert!(matches!(parse_secondary("<html>"), Err(WeatherApiError::Json(_))));
    }

    // Preserved behaviour: the secondary temperature replaces the primary one
    // with no consistency check, while description/category stay primary.
    #[test]
    fn test_secondary_overwrites_primary_temperature() {
        let primary = parse_primary(OWM_OK, Units::Imperial);
        let merged = augment(primary.clone(), Ok(40.0));
        assert_eq!(merged.temperature_label, "40.0°F");
        assert_eq!(merged.temperature, Some(40.0));
        assert_eq!(merged.description, primary.description);
        assert_eq!(merged.category, primary.category);
    }

    #[test]
    fn test_secondary_failure_keeps_primary() {
        let primary = parse_primary(OWM_OK, Units::Imperial);
        let merged = augment(primary.clone(), Err(WeatherApiError::MissingData("x".into())));
        assert_eq!(merged, primary);
    }

    #[test]
    fn test_secondary_never_revives_a_fault() {
        let merged = augment(WeatherReading::no_data(Units::Imperial), Ok(70.0));
        assert!(merged.temperature_label.is_empty());
        assert_eq!(merged.fault, Some(ReadingFault::NoData));
    }

    #[test]
    fn test_fahrenheit_conversion() {
        assert_eq!(WeatherReading::new("clear", 100.0, Units::Metric).fahrenheit(), Some(212.0));
        assert_eq!(WeatherReading::new("clear", 66.0, Units::Imperial).fahrenheit(), Some(66.0));
        assert_eq!(WeatherReading::parse_error(Units::Imperial).fahrenheit(), None);
        assert_eq!(WeatherReading::new("clear", f64::NAN, Units::Imperial).fahrenheit(), None);
    }

    #[test]
    fn test_units_from_str() {
        assert_eq!("C".parse::<Units>().unwrap(), Units::Metric);
        assert_eq!("imperial".parse::<Units>().unwrap(), Units::Imperial);
        assert!("kelvin".parse::<Units>().is_err());
    }
}
