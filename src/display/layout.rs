/*
 *  display/layout.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel geometry and the fixed anchors of the clock/weather layout
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
use embedded_graphics::prelude::{Point, RgbColor};
use serde::{Deserialize, Serialize};

use crate::icons::ICON_SIZE;

use super::text::{font_height, Font};

/// Physical panel chain: `chain` square panels of `cols`x`rows` side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelGeometry {
    pub rows: u32,
    pub cols: u32,
    pub chain: u32,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        // two 64x64 panels, one 128x64 canvas
        Self { rows: 64, cols: 64, chain: 2 }
    }
}

impl PanelGeometry {
    pub fn width(&self) -> u32 { self.cols * self.chain }
    pub fn height(&self) -> u32 { self.rows }
}

/// Where everything lands on the canvas.
///
/// Text y values are baselines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    /// Width of the left (weather) panel
    pub left_panel_width: u32,
    /// First column of the right (calendar) panel
    pub right_panel_x: i32,
    /// Top-left of the weather icon
    pub icon_origin: Point,
    pub temperature_baseline: i32,
    pub day_origin: Point,
    pub date_origin: Point,
    pub time_baseline: i32,
}

impl LayoutConfig {
    pub fn for_panels(geometry: &PanelGeometry) -> Self {
        let width = geometry.width();
        let height = geometry.height() as i32;
        let left = geometry.cols;
        let right_x = left as i32;
        let label_x = right_x + 6;

        Self {
            width,
            height: geometry.height(),
            left_panel_width: left,
            right_panel_x: right_x,
            icon_origin: Point::new((left as i32 - ICON_SIZE as i32) / 2, 24),
            temperature_baseline: height - 2,
            day_origin: Point::new(label_x, height - 14),
            date_origin: Point::new(label_x, height - 2),
            time_baseline: 20,
        }
    }

    /// Horizontal centre of the icon box.
    pub fn icon_center_x(&self) -> i32 {
        self.icon_origin.x + ICON_SIZE as i32 / 2
    }

    /// Ways the chosen fonts collide with the fixed anchors, empty when they fit.
    pub fn font_conflicts(&self, clock: Font, text: Font) -> Vec<String> {
        let mut conflicts = Vec::new();
        let clock_h = font_height(clock);
        if clock_h as i32 > self.icon_origin.y {
            conflicts.push(format!(
                "clock font is {}px tall, the icon starts at row {}",
                clock_h, self.icon_origin.y
            ));
        }
        let text_h = font_height(text);
        let row_gap = self.date_origin.y - self.day_origin.y;
        if (row_gap as i64) < text_h as i64 {
            conflicts.push(format!(
                "text font is {}px tall, day and date rows are {}px apart",
                text_h, row_gap
            ));
        }
        conflicts
    }
}

/// Colours for everything that is not an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Live clock text
    pub clock: Rgb888,
    /// Day/date labels and the solid temperature text
    pub labels: Rgb888,
    /// Temperature outline when no gradient colour can be computed
    pub temperature: Rgb888,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            clock: Rgb888::WHITE,
            labels: Rgb888::WHITE,
            temperature: Rgb888::CYAN,
        }
    }
}
