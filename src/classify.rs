/*
 *  classify.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Weather description classification and temperature heat-map colours
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

use embedded_graphics::pixelcolor::Rgb888;
use serde::{Deserialize, Serialize};

/// Icon category derived from a free-text weather description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCategory {
    Clear,
    PartlyCloudy,
    Cloudy,
    Thunder,
    Drizzle,
    Rain,
    Haze,
    Ash,
    Smoke,
    Snow,
    FogOrMist,
    Unknown,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 12] = [
        WeatherCategory::Clear,
        WeatherCategory::PartlyCloudy,
        WeatherCategory::Cloudy,
        WeatherCategory::Thunder,
        WeatherCategory::Drizzle,
        WeatherCategory::Rain,
        WeatherCategory::Haze,
        WeatherCategory::Ash,
        WeatherCategory::Smoke,
        WeatherCategory::Snow,
        WeatherCategory::FogOrMist,
        WeatherCategory::Unknown,
    ];

    /// Only the sky-cover categories change with day phase.
    pub fn has_night_variant(self) -> bool {
        matches!(
            self,
            WeatherCategory::Clear | WeatherCategory::PartlyCloudy | WeatherCategory::Cloudy
        )
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub patterns: &'static [&'static str],
    pub category: WeatherCategory,
}

/// Ordered substring rules, first match wins.
///
/// Row order is the priority: the partly-cloudy phrases must be tested
/// before the bare "cloud" row or every partial cover reads as overcast.
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule { patterns: &["clear"], category: WeatherCategory::Clear },
    ClassificationRule {
        patterns: &["partly", "few cloud", "light cloud", "scattered cloud"],
        category: WeatherCategory::PartlyCloudy,
    },
    ClassificationRule { patterns: &["cloud", "overcast"], category: WeatherCategory::Cloudy },
    ClassificationRule { patterns: &["thunder"], category: WeatherCategory::Thunder },
    ClassificationRule { patterns: &["drizzle"], category: WeatherCategory::Drizzle },
    ClassificationRule { patterns: &["rain"], category: WeatherCategory::Rain },
    ClassificationRule { patterns: &["haze"], category: WeatherCategory::Haze },
    ClassificationRule { patterns: &["ash"], category: WeatherCategory::Ash },
    ClassificationRule { patterns: &["smoke"], category: WeatherCategory::Smoke },
    ClassificationRule { patterns: &["snow", "sleet"], category: WeatherCategory::Snow },
    ClassificationRule { patterns: &["fog", "mist"], category: WeatherCategory::FogOrMist },
];

/// Classify a weather description against [`CLASSIFICATION_RULES`].
pub fn classify(description: &str) -> WeatherCategory {
    let desc = description.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| desc.contains(p)))
        .map(|rule| rule.category)
        .unwrap_or(WeatherCategory::Unknown)
}

pub const TEMP_GRADIENT_MIN_F: f64 = 32.0;
pub const TEMP_GRADIENT_MAX_F: f64 = 100.0;

const BLUE: (f64, f64, f64) = (0.0, 0.0, 255.0);
const CYAN: (f64, f64, f64) = (0.0, 255.0, 255.0);
const ORANGE: (f64, f64, f64) = (255.0, 165.0, 0.0);
const RED: (f64, f64, f64) = (255.0, 0.0, 0.0);

fn lerp(from: (f64, f64, f64), to: (f64, f64, f64), s: f64) -> Rgb888 {
    let ch = |a: f64, b: f64| (a + (b - a) * s).round().clamp(0.0, 255.0) as u8;
    Rgb888::new(ch(from.0, to.0), ch(from.1, to.1), ch(from.2, to.2))
}

/// Heat-map colour for a Fahrenheit temperature.
///
/// Three linear segments over [32, 100]: blue to cyan, cyan to orange,
/// orange to red, breaking at 1/3 and 2/3 of the normalised range.
pub fn color_for_temperature(fahrenheit: f64) -> Rgb888 {
    let span = TEMP_GRADIENT_MAX_F - TEMP_GRADIENT_MIN_F;
    let t = ((fahrenheit - TEMP_GRADIENT_MIN_F) / span).clamp(0.0, 1.0);

    if t <= 1.0 / 3.0 {
        lerp(BLUE, CYAN, t * 3.0)
    } else if t <= 2.0 / 3.0 {
        lerp(CYAN, ORANGE, (t - 1.0 / 3.0) * 3.0)
    } else {
        lerp(ORANGE, RED, (t - 2.0 / 3.0) * 3.0)
    }
}
