/*
 *  display/overlay.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per-tick clock overlay on top of the cached static frame
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

use super::error::DisplayError;
use super::framebuffer::Frame;
use super::layout::LayoutConfig;
use super::text::{draw_text, measure_width, Font};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeOutcome {
    Composed,
    /// Nothing to show this tick, the working frame was not touched
    Skipped,
}

pub struct OverlayCompositor {
    font: Font,
    color: Rgb888,
    width: u32,
    baseline: i32,
}

impl OverlayCompositor {
    pub fn new(font: Font, layout: &LayoutConfig, color: Rgb888) -> Self {
        Self { font, color, width: layout.width, baseline: layout.time_baseline }
    }

    /// Copy `static_frame` into `working` and draw the time centred on top.
    ///
    /// An empty label means the clock could not be read; the tick is skipped
    /// rather than showing a blank or stale time.
    pub fn compose(
        &self,
        static_frame: &Frame,
        working: &mut Frame,
        time_label: &str,
    ) -> Result<ComposeOutcome, DisplayError> {
        if time_label.is_empty() {
            return Ok(ComposeOutcome::Skipped);
        }
        working.copy_from(static_frame)?;

        let w = measure_width(self.font, time_label) as i32;
        let x = (self.width as i32 - w) / 2;
        draw_text(working, self.font, x, self.baseline, self.color, time_label);
        Ok(ComposeOutcome::Composed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::layout::PanelGeometry;
    use crate::display::text::font_by_name;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::Rectangle;

    fn compositor() -> OverlayCompositor {
        let layout = LayoutConfig::for_panels(&PanelGeometry::default());
        OverlayCompositor::new(font_by_name("10x20").unwrap(), &layout, Rgb888::WHITE)
    }

    fn lit_columns(frame: &Frame, rows: core::ops::Range<i32>) -> Vec<i32> {
        (0..frame.width() as i32)
            .filter(|&x| rows.clone().any(|y| frame.pixel(x, y).is_some_and(|c| c != Rgb888::BLACK)))
            .collect()
    }

    #[test]
    fn test_time_is_centred() {
        let c = compositor();
        let stat = Frame::new(128, 64);
        let mut work = Frame::new(128, 64);
        assert_eq!(c.compose(&stat, &mut work, "12:00:00").unwrap(), ComposeOutcome::Composed);

        // 8 glyphs of 10px, so the text box is x 24..104
        let cols = lit_columns(&work, 0..24);
        assert!(!cols.is_empty());
        assert!(cols[0] >= 24);
        assert!(*cols.last().unwrap() < 104);
    }

    #[test]
    fn test_static_content_survives() {
        let c = compositor();
        let mut stat = Frame::new(128, 64);
        stat.set_pixel(5, 60, Rgb888::GREEN);
        stat.set_pixel(120, 50, Rgb888::BLUE);
        let mut work = Frame::new(128, 64);
        c.compose(&stat, &mut work, "9:41:00").unwrap();
        assert_eq!(work.pixel(5, 60), Some(Rgb888::GREEN));
        assert_eq!(work.pixel(120, 50), Some(Rgb888::BLUE));
        // static frame itself is untouched by the overlay
        assert_eq!(stat.lit_pixels(), 2);
    }

    #[test]
    fn test_previous_working_contents_discarded() {
        let c = compositor();
        let stat = Frame::new(128, 64);
        let mut work = Frame::new(128, 64);
        work.set_pixel(0, 63, Rgb888::RED);
        c.compose(&stat, &mut work, "1:00:00").unwrap();
        assert_eq!(work.pixel(0, 63), Some(Rgb888::BLACK));
        let below_clock = Rectangle::new(Point::new(0, 24), Size::new(128, 40));
        assert_eq!(work.lit_pixels_in(&below_clock), 0);
    }

    #[test]
    fn test_empty_label_skips() {
        let c = compositor();
        let stat = Frame::new(128, 64);
        let mut work = Frame::new(128, 64);
        work.set_pixel(3, 3, Rgb888::RED);
        assert_eq!(c.compose(&stat, &mut work, "").unwrap(), ComposeOutcome::Skipped);
        assert_eq!(work.pixel(3, 3), Some(Rgb888::RED));
    }

    #[test]
    fn test_size_mismatch_is_error() {
        let c = compositor();
        let stat = Frame::new(64, 64);
        let mut work = Frame::new(128, 64);
        assert!(matches!(
            c.compose(&stat, &mut work, "1:00:00"),
            Err(DisplayError::BufferSizeMismatch { .. })
        ));
    }
}
