/*
 *  display/static_layer.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the cached static frame: weather icon, temperature and calendar
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

use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use log::{debug, warn};

use crate::classify::color_for_temperature;
use crate::clock::DayPhase;
use crate::icons::{IconStore, ICON_SIZE};
use crate::weather::WeatherReading;

use super::error::DisplayError;
use super::framebuffer::Frame;
use super::layout::{LayoutConfig, Theme};
use super::text::{draw_text, measure_width, Font};

/// One-pixel offsets for the temperature outline.
const OUTLINE: [(i32, i32); 8] = [
    (0, -1), (1, -1), (1, 0), (1, 1),
    (0, 1), (-1, 1), (-1, 0), (-1, -1),
];

/// What made it onto the static frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub icon: bool,
    pub temperature: bool,
    pub labels: bool,
}

pub struct StaticLayerBuilder {
    icons: IconStore,
    font: Font,
    layout: LayoutConfig,
    theme: Theme,
}

impl StaticLayerBuilder {
    pub fn new(icons: IconStore, font: Font, layout: LayoutConfig, theme: Theme) -> Self {
        Self { icons, font, layout, theme }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Clear `target` and redraw every static element.
    ///
    /// Drawing is best-effort: whatever cannot be placed is logged and
    /// skipped, and the partially drawn frame is still used.
    pub fn rebuild(
        &self,
        target: Option<&mut Frame>,
        reading: &WeatherReading,
        day: &str,
        date: &str,
        phase: DayPhase,
    ) -> RebuildReport {
        match self.try_rebuild(target, reading, day, date, phase) {
            Ok(report) => report,
            Err(e) => {
                warn!("static rebuild skipped: {}", e);
                RebuildReport::default()
            }
        }
    }

    /// As [`rebuild`](Self::rebuild), but a missing frame is an error.
    pub fn try_rebuild(
        &self,
        target: Option<&mut Frame>,
        reading: &WeatherReading,
        day: &str,
        date: &str,
        phase: DayPhase,
    ) -> Result<RebuildReport, DisplayError> {
        let frame = target.ok_or(DisplayError::MissingBuffer)?;
        frame.blank();

        let icon = match self.draw_icon(frame, reading, phase) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        };
        let report = RebuildReport {
            icon,
            temperature: self.draw_temperature(frame, reading),
            labels: self.draw_labels(frame, day, date),
        };
        debug!("static layer rebuilt: {:?}", report);
        Ok(report)
    }

    fn draw_icon(&self, frame: &mut Frame, reading: &WeatherReading, phase: DayPhase) -> Result<(), DisplayError> {
        let origin = self.layout.icon_origin;
        let bounds = Rectangle::new(Point::zero(), frame.size());
        let icon_box = Rectangle::new(origin, Size::new_equal(ICON_SIZE));
        if bounds.intersection(&icon_box).is_zero_sized() {
            return Err(DisplayError::DrawingError(format!(
                "icon at {:?} falls outside the {}x{} frame",
                origin, frame.width(), frame.height()
            )));
        }
        self.icons.icon(reading.category, phase).draw(frame, origin);
        Ok(())
    }

    fn draw_temperature(&self, frame: &mut Frame, reading: &WeatherReading) -> bool {
        if !reading.should_draw_temperature() {
            return false;
        }
        let label = reading.temperature_label.as_str();
        let width = measure_width(self.font, label) as i32;
        let x = self.layout.icon_center_x() - width / 2;
        let y = self.layout.temperature_baseline;

        let outline = reading
            .fahrenheit()
            .map(color_for_temperature)
            .unwrap_or(self.theme.temperature);
        for (dx, dy) in OUTLINE {
            draw_text(frame, self.font, x + dx, y + dy, outline, label);
        }
        draw_text(frame, self.font, x, y, self.theme.labels, label) > 0
    }

    fn draw_labels(&self, frame: &mut Frame, day: &str, date: &str) -> bool {
        let color: Rgb888 = self.theme.labels;
        let d = self.layout.day_origin;
        let dt = self.layout.date_origin;
        let day_w = draw_text(frame, self.font, d.x, d.y, color, day);
        let date_w = draw_text(frame, self.font, dt.x, dt.y, color, date);
        day_w > 0 && date_w > 0
    }
}
