/*
 *  geoloc.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  IP geolocation lookup (ipapi.co)
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

use serde::Deserialize;
use std::time::Duration;
use reqwest::{Client, header, Error};

pub const GEOIP_URL: &str = "https://ipapi.co/json/";

#[derive(Debug, Deserialize)]
pub struct GeoLocation {
    pub city: String,
    pub region_code: String,
    #[allow(dead_code)]
    country_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Look up where this box is from its public IP.
pub async fn fetch_location(timeout: Duration) -> Result<GeoLocation, Error> {
    const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));
    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
    headers.insert("Accept", header::HeaderValue::from_static("application/json"));
    headers.insert("Connection", header::HeaderValue::from_static("close"));

    let client = Client::builder()
        .connect_timeout(timeout / 2)
        .default_headers(headers)
        .timeout(timeout)
        .build()?;

    let geo = client
        .get(GEOIP_URL)
        .send()
        .await?
        .error_for_status()? // none 2xx raise
        .json::<GeoLocation>()
        .await?;

    Ok(geo)
}
