/*
 *  location.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Where the weather is fetched for: config coordinates or GeoIP
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

use log::{info, warn};
use std::fmt;
use std::time::Duration;

/// Location information with coordinates
#[derive(Debug, Clone)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub region: Option<String>,
    pub source: LocationSource,
}

/// Source of location data
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    UserConfig,
    GeoIP,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            LocationSource::UserConfig => "config",
            LocationSource::GeoIP => "geoip",
        };
        if let (Some(city), Some(region)) = (&self.city, &self.region) {
            write!(f, "{}, {} ", city, region)?;
        }
        write!(f, "({:.4}, {:.4}) [{}]", self.latitude, self.longitude, source)
    }
}

#[derive(Debug)]
pub enum LocationError {
    GeoIPFailed(String),
    InvalidCoordinates(f64, f64),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::GeoIPFailed(e) => write!(f, "GeoIP lookup failed: {}", e),
            LocationError::InvalidCoordinates(lat, lon) => write!(f, "Invalid coordinates {}, {}", lat, lon),
        }
    }
}

impl std::error::Error for LocationError {}

/// Configured coordinates, if both halves are present.
pub fn from_config(lat: Option<f64>, lon: Option<f64>) -> Option<Result<Location, LocationError>> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
                Some(Ok(Location {
                    latitude: lat,
                    longitude: lon,
                    city: None,
                    region: None,
                    source: LocationSource::UserConfig,
                }))
            } else {
                Some(Err(LocationError::InvalidCoordinates(lat, lon)))
            }
        }
        (None, None) => None,
        _ => {
            warn!("only one of lat/lon configured, ignoring both");
            None
        }
    }
}

/// Get location from config or fallback to GeoIP lookup
pub async fn get_location(
    config_lat: Option<f64>,
    config_lon: Option<f64>,
    timeout: Duration,
) -> Result<Location, LocationError> {
    if let Some(configured) = from_config(config_lat, config_lon) {
        let loc = configured?;
        info!("Using location from config: {}", loc);
        return Ok(loc);
    }

    info!("No location in config, attempting GeoIP lookup...");
    match crate::geoloc::fetch_location(timeout).await {
        Ok(geo) => {
            let loc = Location {
                latitude: geo.latitude,
                longitude: geo.longitude,
                city: Some(geo.city),
                region: Some(geo.region_code),
                source: LocationSource::GeoIP,
            };
            info!("GeoIP lookup successful: {}", loc);
            Ok(loc)
        }
        Err(e) => {
            warn!("GeoIP lookup failed: {}", e);
            Err(LocationError::GeoIPFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_location() {
        let loc = get_location(Some(40.7128), Some(-74.0060), Duration::from_millis(10)).await.unwrap();
        assert_eq!(loc.latitude, 40.7128);
        assert_eq!(loc.longitude, -74.0060);
        assert_eq!(loc.source, LocationSource::UserConfig);
    }

    #[tokio::test]
    async fn test_invalid_coordinates() {
        let result = get_location(Some(100.0), Some(-74.0), Duration::from_millis(10)).await;
        assert!(matches!(result, Err(LocationError::InvalidCoordinates(..))));
    }

    #[test]
    fn test_half_configured_is_ignored() {
        assert!(from_config(Some(10.0), None).is_none());
        assert!(from_config(None, None).is_none());
    }

    #[test]
    fn test_display() {
        let loc = Location {
            latitude: 1.5,
            longitude: -2.25,
            city: Some("Leeds".into()),
            region: Some("ENG".into()),
            source: LocationSource::GeoIP,
        };
        assert_eq!(loc.to_string(), "Leeds, ENG (1.5000, -2.2500) [geoip]");
    }
}
